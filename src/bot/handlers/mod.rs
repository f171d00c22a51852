use crate::bot::{Data, Error};
use poise::serenity_prelude as serenity;

pub async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    _data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("Bot logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Command(command),
        } => {
            let known = framework
                .options()
                .commands
                .iter()
                .any(|c| c.name == command.data.name);
            if !known {
                tracing::warn!(
                    "Received unknown command /{} from {}",
                    command.data.name,
                    command.user.name
                );
            }
        }
        _ => {}
    }
    Ok(())
}
