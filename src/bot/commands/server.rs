use crate::bot::{Context, Error};
use crate::database::queries;
use crate::game::Region;
use crate::game::daily::{Availability, DailyData};
use crate::utils::format::BLURPLE;
use crate::utils::time::relative;
use chrono::{Datelike, Utc};
use poise::ChoiceParameter;
use poise::serenity_prelude as serenity;

/// Genshin Impact server-related commands.
#[poise::command(slash_command, category = "misc", subcommands("update", "today"))]
pub async fn server(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Updates your selected server for other server-related commands.
#[poise::command(slash_command, category = "misc", ephemeral)]
pub async fn update(
    ctx: Context<'_>,
    #[description = "The server you play on"] region: Region,
) -> Result<(), Error> {
    let user_id = ctx.author().id.get() as i64;
    queries::set_user_region(&ctx.data().pool, user_id, region).await?;

    ctx.say(format!("Updated server to: {}", region.name())).await?;
    Ok(())
}

/// Shows information about what is available today (domains etc).
#[poise::command(slash_command, category = "misc")]
pub async fn today(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get() as i64;
    let region = queries::get_user_region(&ctx.data().pool, user_id)
        .await?
        .unwrap_or(Region::America);

    let embed = {
        let daily = ctx.data().daily.read().await;
        today_embed(&daily, region, Utc::now())
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn today_embed(daily: &DailyData, region: Region, now: chrono::DateTime<Utc>) -> serenity::CreateEmbed {
    let weekday = region.game_day(now).weekday();

    let mut embed = serenity::CreateEmbed::new()
        .title("Available Today")
        .description(format!("Resets {}", relative(region.today_reset(now))))
        .color(BLURPLE)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Server: {}",
            region.title()
        )));

    for (name, value, inline) in today_fields(daily, weekday) {
        embed = embed.field(name, value, inline);
    }
    embed
}

/// Embed fields for `weekday`: one per talent book, then the weapon materials.
fn today_fields(daily: &DailyData, weekday: chrono::Weekday) -> Vec<(String, String, bool)> {
    match daily.availability(weekday) {
        Availability::Everything => vec![
            ("Talent Books".to_string(), "All!".to_string(), false),
            ("Weapon Materials".to_string(), "All!".to_string(), false),
        ],
        Availability::Rotation { talents, weapons } => {
            let mut fields: Vec<(String, String, bool)> = talents
                .iter()
                .map(|domain| {
                    let characters = domain
                        .characters
                        .iter()
                        .map(|(name, element)| format!("{}{}", daily.emoji_prefix(element), name))
                        .collect::<Vec<_>>()
                        .join("\n");
                    (
                        format!("{}{}", daily.emoji_prefix(domain.book), domain.book),
                        characters,
                        true,
                    )
                })
                .collect();

            let weapons = weapons
                .iter()
                .map(|w| format!("{}{}", daily.emoji_prefix(w), w))
                .collect::<Vec<_>>()
                .join("\n");
            fields.push(("Weapon Materials".to_string(), weapons, false));
            fields
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn daily() -> DailyData {
        DailyData::parse(include_str!("../../../data/daily.json")).unwrap()
    }

    #[test]
    fn sunday_has_everything() {
        let fields = today_fields(&daily(), Weekday::Sun);
        assert_eq!(fields.len(), 2);
        assert!(fields.iter().all(|(_, value, _)| value == "All!"));
    }

    #[test]
    fn weekdays_list_books_then_weapons() {
        let fields = today_fields(&daily(), Weekday::Mon);

        assert_eq!(fields.len(), 4);
        assert!(fields[0].0.ends_with("Freedom"));
        assert!(fields[0].1.contains("Amber"));
        assert!(fields[0].2);

        let (name, value, inline) = &fields[3];
        assert_eq!(name, "Weapon Materials");
        assert!(value.contains("Decarabian"));
        assert!(!inline);
    }
}
