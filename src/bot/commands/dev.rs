use crate::bot::interactions::ReactivePaginator;
use crate::bot::modules::Module;
use crate::bot::{ApplicationContext, Context, Error};
use crate::database::models::{QueryOutput, SqlArg};
use crate::database::queries;
use crate::error::ModuleError;
use crate::utils::format::{BLURPLE, ZERO_WIDTH_SPACE, remove_codeblock, trim};
use crate::utils::merge_stream::MergeStream;
use crate::utils::paginator::Paginator;
use crate::utils::table::render_grid;
use poise::serenity_prelude as serenity;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info};

const MODAL_TIMEOUT: Duration = Duration::from_secs(600);
/// Longer output is sent as a file.
const MAX_INLINE_OUTPUT: usize = 1900;

#[derive(Debug, Clone, Default, poise::Modal)]
#[name = "SQL Eval"]
pub struct SqlModal {
    #[name = "Query"]
    #[paragraph]
    pub query: String,
    #[name = "Semicolon-separated SQL args"]
    pub args: Option<String>,
}

#[derive(Debug, Clone, Default, poise::Modal)]
#[name = "Eval"]
pub struct CodeModal {
    #[name = "Code to evaluate"]
    #[paragraph]
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum PresenceStatus {
    Online,
    Idle,
    #[name = "Do Not Disturb"]
    DoNotDisturb,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ActivityKind {
    Playing,
    Listening,
    Watching,
    Competing,
}

/// Developer tools.
#[poise::command(
    slash_command,
    category = "dev",
    owners_only,
    default_member_permissions = "ADMINISTRATOR",
    subcommands("module", "sync", "shutdown", "sql", "eval", "shell", "presence")
)]
pub async fn dev(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Module related commands.
#[poise::command(
    slash_command,
    category = "dev",
    owners_only,
    subcommands("load", "unload", "reload", "list")
)]
pub async fn module(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

async fn autocomplete_unloaded<'a>(
    ctx: Context<'_>,
    partial: &'a str,
) -> impl Iterator<Item = String> + 'a {
    ctx.data()
        .unloaded_modules()
        .await
        .into_iter()
        .map(|m| m.name().to_string())
        .filter(move |name| name.contains(partial))
}

async fn autocomplete_loaded<'a>(
    ctx: Context<'_>,
    partial: &'a str,
) -> impl Iterator<Item = String> + 'a {
    ctx.data()
        .loaded_modules()
        .await
        .into_iter()
        .map(|m| m.name().to_string())
        .filter(move |name| name.contains(partial))
}

/// Loads a module, or every unloaded module when none is given.
#[poise::command(slash_command, category = "dev", owners_only, ephemeral)]
pub async fn load(
    ctx: Context<'_>,
    #[autocomplete = "autocomplete_unloaded"] name: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let http = ctx.serenity_context().http.clone();

    let targets = match name {
        Some(name) => vec![(name.clone(), Module::parse(&name))],
        None => data
            .unloaded_modules()
            .await
            .into_iter()
            .map(|m| (m.name().to_string(), Ok(m)))
            .collect(),
    };

    let mut results = Vec::new();
    for (name, module) in targets {
        let result = match module {
            Ok(module) => data.load_module(http.clone(), module).await,
            Err(e) => Err(e),
        };
        results.push((name, result));
    }

    send_module_report(ctx, results).await
}

#[poise::command(slash_command, category = "dev", owners_only, ephemeral)]
pub async fn unload(
    ctx: Context<'_>,
    #[autocomplete = "autocomplete_loaded"] name: String,
) -> Result<(), Error> {
    let result = match Module::parse(&name) {
        Ok(module) => ctx.data().unload_module(module).await,
        Err(e) => Err(e),
    };
    send_module_report(ctx, vec![(name, result)]).await
}

/// Reloads a module, or every loaded module when none is given.
#[poise::command(slash_command, category = "dev", owners_only, ephemeral)]
pub async fn reload(
    ctx: Context<'_>,
    #[autocomplete = "autocomplete_loaded"] name: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let http = ctx.serenity_context().http.clone();

    let targets = match name {
        Some(name) => vec![(name.clone(), Module::parse(&name))],
        None => data
            .loaded_modules()
            .await
            .into_iter()
            .map(|m| (m.name().to_string(), Ok(m)))
            .collect(),
    };

    let mut results = Vec::new();
    for (name, module) in targets {
        let result = match module {
            Ok(module) => data.reload_module(http.clone(), module).await,
            Err(e) => Err(e),
        };
        results.push((name, result));
    }

    send_module_report(ctx, results).await
}

#[poise::command(slash_command, category = "dev", owners_only, ephemeral)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let loaded = ctx.data().loaded_modules().await;
    let unloaded = ctx.data().unloaded_modules().await;

    let names = |modules: &[Module]| {
        modules
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut embed = serenity::CreateEmbed::new()
        .title("Modules")
        .color(BLURPLE)
        .field("\u{1f4e5} Loaded", names(&loaded), true);
    if !unloaded.is_empty() {
        embed = embed.field("\u{1f4e4} Unloaded", names(&unloaded), true);
    }
    let scheduler = if ctx.data().scheduler.is_running().await {
        "running"
    } else {
        "stopped"
    };
    embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
        "Reminder scheduler: {}",
        scheduler
    )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn send_module_report(
    ctx: Context<'_>,
    results: Vec<(String, Result<(), ModuleError>)>,
) -> Result<(), Error> {
    let (succeeded, failed) = module_report(&results);

    let mut embed = serenity::CreateEmbed::new()
        .description(ZERO_WIDTH_SPACE)
        .color(if failed.is_empty() { 0x2ecc71 } else { 0xe74c3c });
    if !succeeded.is_empty() {
        embed = embed.field("Succeeded", succeeded.join("\n"), true);
    }
    if !failed.is_empty() {
        embed = embed.field("Failed", failed.join("\n"), true);
    }
    if results.is_empty() {
        embed = embed.description("Nothing to do.");
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn module_report(results: &[(String, Result<(), ModuleError>)]) -> (Vec<String>, Vec<String>) {
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for (name, result) in results {
        match result {
            Ok(()) => succeeded.push(name.clone()),
            Err(e) => {
                error!("Module operation on {} failed: {}", name, e);
                failed.push(format!("{}: {}", name, e));
            }
        }
    }
    (succeeded, failed)
}

/// Registers the application commands again, globally or in one guild.
#[poise::command(slash_command, category = "dev", owners_only, ephemeral)]
pub async fn sync(
    ctx: Context<'_>,
    #[description = "Only sync this guild."] guild_id: Option<String>,
) -> Result<(), Error> {
    let guild = match guild_id {
        Some(id) => {
            let guild = id
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|id| *id != 0)
                .map(serenity::GuildId::new)
                .filter(|guild| ctx.serenity_context().cache.guild(*guild).is_some());
            match guild {
                Some(guild) => Some(guild),
                None => {
                    ctx.say("No guild by that ID found.").await?;
                    return Ok(());
                }
            }
        }
        None => None,
    };

    ctx.defer_ephemeral().await?;

    let commands = &ctx.framework().options().commands;
    let result = match guild {
        Some(guild) => {
            poise::builtins::register_in_guild(ctx.serenity_context(), commands, guild).await
        }
        None => poise::builtins::register_globally(ctx.serenity_context(), commands).await,
    };

    match result {
        Ok(()) => {
            let count = poise::builtins::create_application_commands(commands).len();
            info!("Synced {} commands", count);
            ctx.say(format!("Synced `{}` commands successfully.", count))
                .await?;
        }
        Err(e) => {
            ctx.say(format!(
                "Failed to sync commands.\n{}",
                trim(&e.to_string(), Some(1850), true, "…")
            ))
            .await?;
        }
    }
    Ok(())
}

#[poise::command(slash_command, category = "dev", owners_only, ephemeral)]
pub async fn shutdown(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("ok").await?;
    info!("Shutdown requested by {}", ctx.author().name);
    ctx.framework().shard_manager().shutdown_all().await;
    Ok(())
}

/// Runs a SQL statement against the bot's database.
#[poise::command(slash_command, category = "dev", owners_only)]
pub async fn sql(ctx: ApplicationContext<'_>) -> Result<(), Error> {
    let draft = ctx.data().sql_draft.lock().await.clone();
    let Some(modal) = poise::execute_modal(ctx, Some(draft), Some(MODAL_TIMEOUT)).await? else {
        return Ok(());
    };
    *ctx.data().sql_draft.lock().await = modal.clone();

    let args = SqlArg::parse_list(modal.args.as_deref().unwrap_or_default());
    let reply = match queries::run_statement(&ctx.data().pool, &modal.query, &args).await {
        Ok(output) => {
            let table = format_query_output(&output);
            if table.chars().count() > MAX_INLINE_OUTPUT {
                poise::CreateReply::default()
                    .content("Output too long...")
                    .attachment(serenity::CreateAttachment::bytes(
                        table.into_bytes(),
                        "output.txt",
                    ))
            } else {
                poise::CreateReply::default().content(format!("```sql\n{}\n```", table))
            }
        }
        Err(e) => poise::CreateReply::default().content(format!(
            "```sql\n{}\n```",
            trim(&format!("{:#}", e), Some(MAX_INLINE_OUTPUT), false, "…")
        )),
    };

    ctx.send(reply.ephemeral(true)).await?;
    Ok(())
}

fn format_query_output(output: &QueryOutput) -> String {
    if output.columns.is_empty() {
        return format!("{} rows affected", output.rows_affected);
    }
    render_grid(&output.columns, &output.rows)
}

/// Runs code through the configured interpreter.
#[poise::command(slash_command, category = "dev", owners_only)]
pub async fn eval(ctx: ApplicationContext<'_>) -> Result<(), Error> {
    let Some((program, args)) = ctx.data().config.dev.eval_command.split_first() else {
        ctx.send(
            poise::CreateReply::default()
                .content("Eval is disabled.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let Some(modal) = poise::execute_modal::<_, _, CodeModal>(ctx, None, Some(MODAL_TIMEOUT)).await?
    else {
        return Ok(());
    };

    let (language, code) = remove_codeblock(&modal.code);
    let mut command = Command::new(program);
    command.args(args).arg(code.trim());

    run_and_paginate(ctx, command, language.unwrap_or("py")).await
}

/// Runs a shell command on the host.
#[poise::command(slash_command, category = "dev", owners_only)]
pub async fn shell(ctx: ApplicationContext<'_>) -> Result<(), Error> {
    let Some(modal) = poise::execute_modal::<_, _, CodeModal>(ctx, None, Some(MODAL_TIMEOUT)).await?
    else {
        return Ok(());
    };

    let (_, code) = remove_codeblock(&modal.code);
    let (command, language) = shell_command(code.trim());

    run_and_paginate(ctx, command, language).await
}

#[cfg(windows)]
fn shell_command(code: &str) -> (Command, &'static str) {
    let mut command = Command::new("powershell");
    command.arg("-Command").arg(code);
    (command, "powershell")
}

#[cfg(not(windows))]
fn shell_command(code: &str) -> (Command, &'static str) {
    let mut command = Command::new("sh");
    command.arg("-c").arg(code);
    (command, "sh")
}

async fn run_and_paginate(
    ctx: ApplicationContext<'_>,
    mut command: Command,
    language: &str,
) -> Result<(), Error> {
    let pages = match collect_output(&mut command, language).await {
        Ok(pages) => pages,
        Err(e) => vec![trim(&format!("{:#}", e), None, true, "…")],
    };

    ReactivePaginator::new(pages)
        .allowed_users(vec![ctx.author().id])
        .ephemeral(true)
        .send(poise::Context::Application(ctx))
        .await
}

/// Merged output of `command` as code block pages, ending with its exit status.
async fn collect_output(command: &mut Command, language: &str) -> anyhow::Result<Vec<String>> {
    let mut stream = MergeStream::spawn(command)?;
    let mut paginator = Paginator::code_block(MAX_INLINE_OUTPUT, language);

    while let Some(line) = stream.next_line().await {
        paginator.append_line(&trim(&line, Some(1800), false, "…"))?;
    }
    let status = stream.wait().await?;
    paginator.append_line(&format!("[{}]", status))?;

    Ok(paginator.pages())
}

/// Changes the bot's status and activity.
#[poise::command(slash_command, category = "dev", owners_only, ephemeral)]
pub async fn presence(
    ctx: Context<'_>,
    status: Option<PresenceStatus>,
    kind: Option<ActivityKind>,
    text: Option<String>,
) -> Result<(), Error> {
    let activity = match presence_activity(kind, text.as_deref()) {
        Ok(activity) => activity,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let status = match status.unwrap_or(PresenceStatus::Online) {
        PresenceStatus::Online => serenity::OnlineStatus::Online,
        PresenceStatus::Idle => serenity::OnlineStatus::Idle,
        PresenceStatus::DoNotDisturb => serenity::OnlineStatus::DoNotDisturb,
        PresenceStatus::Offline => serenity::OnlineStatus::Invisible,
    };

    ctx.serenity_context().set_presence(activity, status);
    ctx.say("Done").await?;
    Ok(())
}

fn presence_activity(
    kind: Option<ActivityKind>,
    text: Option<&str>,
) -> Result<Option<serenity::ActivityData>, &'static str> {
    match (kind, text) {
        (None, _) => Ok(None),
        (Some(_), None) => Err("`text` must be specified with `kind`"),
        (Some(kind), Some(text)) => Ok(Some(match kind {
            ActivityKind::Playing => serenity::ActivityData::playing(text),
            ActivityKind::Listening => serenity::ActivityData::listening(text),
            ActivityKind::Watching => serenity::ActivityData::watching(text),
            ActivityKind::Competing => serenity::ActivityData::competing(text),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_needs_text() {
        assert_eq!(
            presence_activity(Some(ActivityKind::Playing), None).unwrap_err(),
            "`text` must be specified with `kind`"
        );
        assert!(presence_activity(None, None).unwrap().is_none());

        let activity = presence_activity(Some(ActivityKind::Watching), Some("the ley lines"))
            .unwrap()
            .unwrap();
        assert_eq!(activity.name, "the ley lines");
    }

    #[test]
    fn module_report_splits_results() {
        let results = vec![
            ("misc".to_string(), Ok(())),
            ("dev".to_string(), Err(ModuleError::Protected("dev"))),
        ];
        let (succeeded, failed) = module_report(&results);
        assert_eq!(succeeded, vec!["misc"]);
        assert_eq!(failed, vec!["dev: `dev` cannot be unloaded"]);
    }

    #[test]
    fn statements_without_columns_report_changes() {
        let output = QueryOutput {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: 3,
        };
        assert_eq!(format_query_output(&output), "3 rows affected");

        let output = QueryOutput {
            columns: vec!["a".to_string()],
            rows: vec![vec![None]],
            rows_affected: 0,
        };
        assert!(format_query_output(&output).contains("| null |"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_output_ends_with_exit_status() {
        let (mut command, language) = shell_command("echo hi; exit 3");
        let pages = collect_output(&mut command, language).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert!(pages[0].starts_with("```sh\nhi\n"));
        assert!(pages[0].contains("[exit status: 3]"));
    }
}
