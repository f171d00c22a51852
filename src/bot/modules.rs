use crate::bot::Data;
use crate::error::ModuleError;
use crate::game::daily::DailyData;
use poise::serenity_prelude::Http;
use std::sync::Arc;
use tracing::info;

/// A group of commands that can be switched on and off while the bot runs.
///
/// Commands name their module through their `category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Module {
    Misc,
    Timers,
    Data,
    Dev,
}

impl Module {
    pub const ALL: [Module; 4] = [Module::Misc, Module::Timers, Module::Data, Module::Dev];

    pub fn name(&self) -> &'static str {
        match self {
            Module::Misc => "misc",
            Module::Timers => "timers",
            Module::Data => "data",
            Module::Dev => "dev",
        }
    }

    pub fn parse(name: &str) -> Result<Self, ModuleError> {
        let name = name.trim().to_lowercase();
        Module::ALL
            .into_iter()
            .find(|m| m.name() == name)
            .ok_or(ModuleError::Unknown(name))
    }
}

impl Data {
    pub async fn is_loaded(&self, module: Module) -> bool {
        self.modules.read().await.contains(&module)
    }

    pub async fn loaded_modules(&self) -> Vec<Module> {
        let mut loaded: Vec<Module> = self.modules.read().await.iter().copied().collect();
        loaded.sort();
        loaded
    }

    pub async fn unloaded_modules(&self) -> Vec<Module> {
        let loaded = self.modules.read().await;
        Module::ALL
            .into_iter()
            .filter(|m| !loaded.contains(m))
            .collect()
    }

    pub async fn load_module(&self, http: Arc<Http>, module: Module) -> Result<(), ModuleError> {
        if self.is_loaded(module).await {
            return Err(ModuleError::AlreadyLoaded(module.name()));
        }

        self.activate(http, module).await?;
        self.modules.write().await.insert(module);
        info!("Loaded module {}", module.name());
        Ok(())
    }

    pub async fn unload_module(&self, module: Module) -> Result<(), ModuleError> {
        if module == Module::Dev {
            return Err(ModuleError::Protected(module.name()));
        }
        if !self.modules.write().await.remove(&module) {
            return Err(ModuleError::NotLoaded(module.name()));
        }

        self.deactivate(module).await;
        info!("Unloaded module {}", module.name());
        Ok(())
    }

    pub async fn reload_module(&self, http: Arc<Http>, module: Module) -> Result<(), ModuleError> {
        if !self.is_loaded(module).await {
            return Err(ModuleError::NotLoaded(module.name()));
        }

        self.deactivate(module).await;
        if let Err(e) = self.activate(http, module).await {
            self.modules.write().await.remove(&module);
            return Err(e);
        }
        info!("Reloaded module {}", module.name());
        Ok(())
    }

    async fn activate(&self, http: Arc<Http>, module: Module) -> Result<(), ModuleError> {
        match module {
            Module::Misc => {
                let daily = DailyData::load(&self.config.data.daily_path)?;
                *self.daily.write().await = daily;
            }
            Module::Timers => self.scheduler.start(http).await,
            Module::Data | Module::Dev => {}
        }
        Ok(())
    }

    async fn deactivate(&self, module: Module) {
        if module == Module::Timers {
            self.scheduler.stop().await;
        }
    }
}
