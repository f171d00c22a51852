use crate::bot::interactions::ReactivePaginator;
use crate::bot::{Context, Error};
use crate::database::models::{InventoryCounts, StoredArtifact};
use crate::database::queries;
use crate::game::artifact::{ScanData, format_stat, stat_name};
use crate::utils::format::{thousands, trim};
use crate::utils::paginator::{PageOverflow, Paginator};
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

/// Largest export accepted by `/data import`.
const MAX_IMPORT_BYTES: u32 = 8 * 1024 * 1024;

/// Longest error detail echoed back to the user.
const MAX_DEBUG_LENGTH: usize = 1000;
/// Longest single entry in `/data artifacts`, leaving room for the newline.
const MAX_ENTRY_LENGTH: usize = 1900;

const DECODE_FAILED: &str =
    "An error occurred decoding the file. Double check your input and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Slot {
    #[name = "Flower"]
    Flower,
    #[name = "Plume"]
    Plume,
    #[name = "Sands"]
    Sands,
    #[name = "Goblet"]
    Goblet,
    #[name = "Circlet"]
    Circlet,
}

impl Slot {
    fn key(&self) -> &'static str {
        match self {
            Slot::Flower => "flower",
            Slot::Plume => "plume",
            Slot::Sands => "sands",
            Slot::Goblet => "goblet",
            Slot::Circlet => "circlet",
        }
    }
}

/// Manage your imported game data.
#[poise::command(
    slash_command,
    category = "data",
    subcommands("import", "purge", "artifacts")
)]
pub async fn data(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Import your data from a scanner export file.
#[poise::command(slash_command, category = "data", ephemeral)]
pub async fn import(
    ctx: Context<'_>,
    #[description = "The exported JSON file."] file: serenity::Attachment,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    if file.size > MAX_IMPORT_BYTES {
        ctx.say(DECODE_FAILED).await?;
        return Ok(());
    }

    let scan = match file.download().await {
        Ok(bytes) => ScanData::parse(&bytes),
        Err(e) => {
            warn!("Failed to download import from {}: {:?}", ctx.author().name, e);
            ctx.say(DECODE_FAILED).await?;
            return Ok(());
        }
    };
    let scan = match scan {
        Ok(scan) => scan,
        Err(e) => {
            info!("Rejected import from {}: {}", ctx.author().name, e);
            ctx.say(DECODE_FAILED).await?;
            return Ok(());
        }
    };

    let user_id = ctx.author().id.get() as i64;
    let saved = match scan.validate() {
        Ok(artifacts) => queries::replace_inventory(
            &ctx.data().pool,
            user_id,
            &artifacts,
            &scan.weapons,
            &scan.characters,
        )
        .await
        .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match saved {
        Ok(counts) => {
            info!(
                "Imported {} artifacts for {}",
                counts.artifacts,
                ctx.author().name
            );
            ctx.say(format!("Data updated successfully.\n{}", counts_summary(counts)))
                .await?;
        }
        Err(e) => {
            ctx.say(save_failed(&e)).await?;
        }
    }
    Ok(())
}

/// Delete all of your imported data.
#[poise::command(slash_command, category = "data", ephemeral)]
pub async fn purge(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get() as i64;
    let counts = queries::purge_inventory(&ctx.data().pool, user_id).await?;

    if counts == InventoryCounts::default() {
        ctx.say("You have no imported data.").await?;
    } else {
        ctx.say(format!("Deleted your imported data.\n{}", counts_summary(counts)))
            .await?;
    }
    Ok(())
}

/// Look up your imported artifacts.
#[poise::command(slash_command, category = "data")]
pub async fn artifacts(
    ctx: Context<'_>,
    #[description = "Only show artifacts in this slot."] slot: Option<Slot>,
    #[description = "Only show artifacts of this set, e.g. `GladiatorsFinale`."] set: Option<String>,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get() as i64;
    let found = queries::user_artifacts(
        &ctx.data().pool,
        user_id,
        slot.map(|s| s.key()),
        set.as_deref(),
    )
    .await?;

    if found.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No artifacts found. Import some with `/data import`.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ReactivePaginator::new(artifact_pages(&found)?)
        .allowed_users(vec![ctx.author().id])
        .send(ctx)
        .await
}

fn save_failed(error: &str) -> String {
    format!(
        "An error occurred saving the data. Double check your input and try again.\nDebug: `{}`",
        trim(error, Some(MAX_DEBUG_LENGTH), false, "…")
    )
}

fn artifact_pages(artifacts: &[StoredArtifact]) -> Result<Vec<String>, PageOverflow> {
    let mut paginator = Paginator::default();
    for artifact in artifacts {
        paginator.append_line(&trim(
            &artifact_entry(artifact),
            Some(MAX_ENTRY_LENGTH),
            false,
            "…",
        ))?;
    }
    Ok(paginator.pages())
}

fn counts_summary(counts: InventoryCounts) -> String {
    format!(
        "- Artifacts: {}\n- Weapons: {}\n- Characters: {}",
        thousands(counts.artifacts as i64),
        thousands(counts.weapons as i64),
        thousands(counts.characters as i64)
    )
}

fn artifact_entry(artifact: &StoredArtifact) -> String {
    let mut header = format!(
        "**{}** {} {} +{}",
        artifact.set_key,
        artifact.slot_key,
        "★".repeat(artifact.rarity.clamp(0, 5) as usize),
        artifact.level
    );
    if !artifact.location.is_empty() {
        header.push_str(&format!(" on {}", artifact.location));
    }
    if artifact.locked {
        header.push_str(" 🔒");
    }

    let mut lines = vec![header, format!("Main: {}", stat_name(&artifact.main_stat_key))];
    lines.extend(
        artifact
            .substats
            .iter()
            .map(|(key, value)| format!("- {}", format_stat(key, *value))),
    );
    lines.join("\n")
}
