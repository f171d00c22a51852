use crate::bot::{Context, Error};
use crate::utils::format::ZERO_WIDTH_SPACE;
use crate::utils::paginator::PageState;
use poise::serenity_prelude as serenity;
use std::time::Duration;

/// Buttons are removed once nobody has pressed one for this long.
const TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    First,
    Previous,
    Next,
    Last,
    Stop,
}

impl Action {
    const ALL: [Action; 5] = [
        Action::First,
        Action::Previous,
        Action::Next,
        Action::Last,
        Action::Stop,
    ];

    fn id(&self) -> &'static str {
        match self {
            Action::First => "first",
            Action::Previous => "previous",
            Action::Next => "next",
            Action::Last => "last",
            Action::Stop => "stop",
        }
    }

    fn emoji(&self) -> char {
        match self {
            Action::First => '⏮',
            Action::Previous => '◀',
            Action::Next => '▶',
            Action::Last => '⏭',
            Action::Stop => '⏹',
        }
    }

    fn enabled(&self, state: &PageState) -> bool {
        match self {
            Action::First | Action::Previous => !state.at_start(),
            Action::Next | Action::Last => !state.at_end(),
            Action::Stop => true,
        }
    }
}

/// A message whose pages are flipped through with buttons.
pub struct ReactivePaginator {
    pages: Vec<String>,
    allowed_users: Option<Vec<serenity::UserId>>,
    ephemeral: bool,
}

impl ReactivePaginator {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            allowed_users: None,
            ephemeral: false,
        }
    }

    /// Restricts the buttons to these users. Everybody may use them otherwise.
    pub fn allowed_users(mut self, users: Vec<serenity::UserId>) -> Self {
        self.allowed_users = Some(users);
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    fn page(&self, state: &PageState) -> String {
        self.pages
            .get(state.index())
            .cloned()
            .unwrap_or_else(|| ZERO_WIDTH_SPACE.to_string())
    }

    pub async fn send(self, ctx: Context<'_>) -> Result<(), Error> {
        let mut state = PageState::new(self.pages.len());

        // nothing to flip through
        if self.pages.len() <= 1 {
            let reply = poise::CreateReply::default()
                .content(self.page(&state))
                .ephemeral(self.ephemeral);
            ctx.send(reply).await?;
            return Ok(());
        }

        let prefix = format!("{}:", ctx.id());
        let reply = poise::CreateReply::default()
            .content(self.page(&state))
            .components(buttons(&prefix, &state, false))
            .ephemeral(self.ephemeral);
        let handle = ctx.send(reply).await?;

        while let Some(press) = collect_press(ctx, &prefix).await {
            if let Some(allowed) = &self.allowed_users {
                if !allowed.contains(&press.user.id) {
                    press
                        .create_response(
                            ctx,
                            serenity::CreateInteractionResponse::Message(
                                serenity::CreateInteractionResponseMessage::new()
                                    .content("This paginator isn't yours.")
                                    .ephemeral(true),
                            ),
                        )
                        .await?;
                    continue;
                }
            }

            let Some(action) = parse_action(&prefix, &press.data.custom_id) else {
                continue;
            };

            let stopped = action == Action::Stop;
            match action {
                Action::First => state.first(),
                Action::Previous => state.rotate(-1),
                Action::Next => state.rotate(1),
                Action::Last => state.last(),
                Action::Stop => {}
            }

            press
                .create_response(
                    ctx,
                    serenity::CreateInteractionResponse::UpdateMessage(
                        serenity::CreateInteractionResponseMessage::new()
                            .content(self.page(&state))
                            .components(buttons(&prefix, &state, stopped)),
                    ),
                )
                .await?;

            if stopped {
                return Ok(());
            }
        }

        let reply = poise::CreateReply::default()
            .content(self.page(&state))
            .components(Vec::new());
        handle.edit(ctx, reply).await?;

        Ok(())
    }
}

/// Next button press on this paginator, or `None` once it has been idle for [`TIMEOUT`].
async fn collect_press(
    ctx: Context<'_>,
    prefix: &str,
) -> Option<serenity::ComponentInteraction> {
    let prefix = prefix.to_string();
    serenity::ComponentInteractionCollector::new(ctx.serenity_context())
        .filter(move |press| press.data.custom_id.starts_with(&prefix))
        .timeout(TIMEOUT)
        .await
}

fn parse_action(prefix: &str, custom_id: &str) -> Option<Action> {
    let id = custom_id.strip_prefix(prefix)?;
    Action::ALL.into_iter().find(|action| action.id() == id)
}

fn buttons(prefix: &str, state: &PageState, stopped: bool) -> Vec<serenity::CreateActionRow> {
    let buttons = Action::ALL
        .iter()
        .map(|action| {
            let style = if *action == Action::Stop {
                serenity::ButtonStyle::Danger
            } else {
                serenity::ButtonStyle::Secondary
            };
            serenity::CreateButton::new(format!("{}{}", prefix, action.id()))
                .emoji(action.emoji())
                .style(style)
                .disabled(stopped || !action.enabled(state))
        })
        .collect();

    vec![serenity::CreateActionRow::Buttons(buttons)]
}
