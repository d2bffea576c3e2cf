//! Implements InputPort and AuthPrompt. Inquire-based interactive prompts.
//!
//! Flow: pick source and target chats, answer the option prompts (prefilled from the
//! owner's saved preferences), then watch the job. Ctrl-C cancels it.

use crate::adapters::ui::progress::{IndicatifProgress, summary};
use crate::domain::{Chat, ChatType, DomainError, JobOptions, UserPreferences};
use crate::ports::{AuthPrompt, InputPort, PreferencesPort, TgGateway};
use crate::usecases::ForwardService;
use async_trait::async_trait;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Confirm, CustomType, Password, PasswordDisplayMode, Select, Text};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

fn chat_type_indicator(kind: ChatType) -> &'static str {
    match kind {
        ChatType::Private => "[U]",
        ChatType::Group => "[G]",
        ChatType::Supergroup => "[S]",
        ChatType::Channel => "[C]",
    }
}

/// Purple prompt prefix and cyan highlights for all inquire prompts.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightMagenta))
        .with_highlighted_option_prefix(Styled::new("➤").with_fg(Color::LightCyan))
        .with_answered_prompt_prefix(Styled::new("✔").with_fg(Color::LightCyan));
    inquire::set_global_render_config(config);
}

fn ui_err(e: inquire::InquireError) -> DomainError {
    DomainError::Ui(e.to_string())
}

/// Select entry wrapping a chat.
#[derive(Clone)]
struct ChatChoice(Chat);

impl fmt::Display for ChatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            chat_type_indicator(self.0.kind),
            self.0.title,
            self.0.id
        )
    }
}

/// What gets forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    MoviesAndSeries,
    MoviesOnly,
    SeriesOnly,
    CloneAll,
}

impl ForwardMode {
    pub const ALL: [ForwardMode; 4] = [
        ForwardMode::MoviesAndSeries,
        ForwardMode::MoviesOnly,
        ForwardMode::SeriesOnly,
        ForwardMode::CloneAll,
    ];

    pub fn apply(self, options: &mut JobOptions) {
        options.movie_only = self == ForwardMode::MoviesOnly;
        options.series_only = self == ForwardMode::SeriesOnly;
        options.unfiltered_clone = self == ForwardMode::CloneAll;
    }
}

impl fmt::Display for ForwardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ForwardMode::MoviesAndSeries => "Videos and documents",
            ForwardMode::MoviesOnly => "Movies only",
            ForwardMode::SeriesOnly => "Series only",
            ForwardMode::CloneAll => "Clone everything (photos, audio, stickers too)",
        };
        f.write_str(s)
    }
}

/// Defaults from configuration, used when the owner has no saved preference.
#[derive(Debug, Clone, Default)]
pub struct JobDefaults {
    pub delay_secs: u64,
    pub forward_cap: Option<u64>,
    pub caption_template: Option<String>,
}

/// Saved preference first, then the configured default.
pub fn initial_options(prefs: &UserPreferences, defaults: &JobDefaults) -> JobOptions {
    JobOptions {
        skip_offset: prefs.skip_offset.unwrap_or(0),
        delay_secs: prefs.delay_secs.unwrap_or(defaults.delay_secs),
        forward_cap: defaults.forward_cap,
        caption_template: prefs
            .caption_template
            .clone()
            .or_else(|| defaults.caption_template.clone()),
        duplicate_secondary: prefs.duplicate_secondary,
        ..JobOptions::default()
    }
}

/// Empty input clears the value.
fn non_empty(s: String) -> Option<String> {
    Some(s.trim().to_string()).filter(|s| !s.is_empty())
}

pub struct TuiInputPort {
    tg: Arc<dyn TgGateway>,
    forward: Arc<ForwardService>,
    preferences: Arc<dyn PreferencesPort>,
    defaults: JobDefaults,
}

impl TuiInputPort {
    pub fn new(
        tg: Arc<dyn TgGateway>,
        forward: Arc<ForwardService>,
        preferences: Arc<dyn PreferencesPort>,
        defaults: JobDefaults,
    ) -> Self {
        Self {
            tg,
            forward,
            preferences,
            defaults,
        }
    }

    fn pick_chat(
        &self,
        message: &str,
        chats: &[ChatChoice],
        preferred: Option<i64>,
    ) -> Result<Chat, DomainError> {
        let cursor = preferred
            .and_then(|id| chats.iter().position(|c| c.0.id == id))
            .unwrap_or(0);
        Select::new(message, chats.to_vec())
            .with_starting_cursor(cursor)
            .with_page_size(15)
            .prompt()
            .map(|c| c.0)
            .map_err(ui_err)
    }

    fn ask_options(
        &self,
        chats: &[ChatChoice],
        mut options: JobOptions,
    ) -> Result<(i32, JobOptions), DomainError> {
        let total_count = CustomType::<i32>::new("Last message id to forward:")
            .with_help_message("Open the newest post's link; the number at the end is its id")
            .prompt()
            .map_err(ui_err)?;
        options.skip_offset = CustomType::<i32>::new("Skip the first N messages:")
            .with_default(options.skip_offset)
            .prompt()
            .map_err(ui_err)?;
        options.delay_secs = CustomType::<u64>::new("Seconds between sends:")
            .with_default(options.delay_secs)
            .prompt()
            .map_err(ui_err)?;

        let mode = Select::new("What to forward?", ForwardMode::ALL.to_vec())
            .prompt()
            .map_err(ui_err)?;
        mode.apply(&mut options);
        if mode == ForwardMode::CloneAll {
            options.forward_non_media = Confirm::new("Also copy text-only posts?")
                .with_default(false)
                .prompt()
                .map_err(ui_err)?;
        }

        let cap = CustomType::<u64>::new("Stop after N forwards (0 = no limit):")
            .with_default(options.forward_cap.unwrap_or(0))
            .prompt()
            .map_err(ui_err)?;
        options.forward_cap = Some(cap).filter(|c| *c > 0);

        let check_duplicates = Confirm::new("Skip files already present in another chat?")
            .with_default(options.duplicate_secondary.is_some())
            .prompt()
            .map_err(ui_err)?;
        options.duplicate_secondary = if check_duplicates {
            Some(
                self.pick_chat(
                    "Chat to check for duplicates:",
                    chats,
                    options.duplicate_secondary,
                )?
                .id,
            )
        } else {
            None
        };

        let template = Text::new("Caption template (empty = keep caption):")
            .with_default(options.caption_template.as_deref().unwrap_or_default())
            .with_help_message("Placeholders: {file_name} {file_size} {caption}")
            .prompt()
            .map_err(ui_err)?;
        options.caption_template = non_empty(template);
        options.enrich_captions = Confirm::new("Rewrite captions as 'Name (Year) S01 E01 quality'?")
            .with_default(false)
            .prompt()
            .map_err(ui_err)?;
        options.bold_caption = Confirm::new("Bold captions?")
            .with_default(false)
            .prompt()
            .map_err(ui_err)?;

        Ok((total_count, options))
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        let owner = self.tg.get_me_id().await?;
        let prefs = self.preferences.get(owner).await?;
        let chats: Vec<ChatChoice> = self
            .tg
            .get_dialogs()
            .await?
            .into_iter()
            .map(ChatChoice)
            .collect();
        if chats.is_empty() {
            return Err(DomainError::Ui("no chats found for this account".into()));
        }

        let source = self.pick_chat("Forward from:", &chats, None)?;
        let target = self.pick_chat("Forward to:", &chats, prefs.target_chat)?;
        let (total_count, options) =
            self.ask_options(&chats, initial_options(&prefs, &self.defaults))?;

        let saved = UserPreferences {
            target_chat: Some(target.id),
            skip_offset: Some(options.skip_offset),
            delay_secs: Some(options.delay_secs),
            caption_template: options.caption_template.clone(),
            duplicate_secondary: options.duplicate_secondary,
        };
        if let Err(e) = self.preferences.set(owner, saved).await {
            warn!(owner, error = %e, "could not save preferences");
        }

        let progress = Arc::new(IndicatifProgress::new(total_count, options.skip_offset));
        let handle = self.forward.start_job(
            owner,
            source.id,
            target.id,
            total_count,
            options,
            progress,
        )?;
        info!(owner, source = %source.title, target = %target.title, "forwarding started, Ctrl-C to cancel");

        let join = handle.join();
        tokio::pin!(join);
        let report = tokio::select! {
            report = &mut join => report?,
            _ = tokio::signal::ctrl_c() => {
                self.forward.cancel_job(owner);
                info!(owner, "cancelling after the current message");
                join.await?
            }
        };

        println!("{}", summary(&report));
        Ok(())
    }
}

impl AuthPrompt for TuiInputPort {
    fn ask_phone(&self) -> Result<String, DomainError> {
        Text::new("Phone number (international format):")
            .prompt()
            .map_err(ui_err)
    }

    fn ask_code(&self) -> Result<String, DomainError> {
        Text::new("Login code:").prompt().map_err(ui_err)
    }

    fn ask_password(&self, hint: Option<&str>) -> Result<String, DomainError> {
        let message = match hint {
            Some(h) => format!("2FA password (hint: {h}):"),
            None => "2FA password:".to_string(),
        };
        Password::new(&message)
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .map_err(ui_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_set_exactly_one_flag() {
        let mut o = JobOptions::default();
        ForwardMode::SeriesOnly.apply(&mut o);
        assert!(o.series_only && !o.movie_only && !o.unfiltered_clone);

        ForwardMode::CloneAll.apply(&mut o);
        assert!(o.unfiltered_clone && !o.series_only);

        ForwardMode::MoviesAndSeries.apply(&mut o);
        assert!(!o.movie_only && !o.series_only && !o.unfiltered_clone);
    }

    #[test]
    fn saved_preferences_override_config() {
        let defaults = JobDefaults {
            delay_secs: 1,
            forward_cap: Some(100),
            caption_template: Some("{caption}".into()),
        };
        let prefs = UserPreferences {
            delay_secs: Some(4),
            skip_offset: Some(12),
            ..UserPreferences::default()
        };
        let o = initial_options(&prefs, &defaults);
        assert_eq!(o.delay_secs, 4);
        assert_eq!(o.skip_offset, 12);
        assert_eq!(o.forward_cap, Some(100));
        assert_eq!(o.caption_template.as_deref(), Some("{caption}"));

        let o = initial_options(&UserPreferences::default(), &defaults);
        assert_eq!(o.delay_secs, 1);
        assert_eq!(o.skip_offset, 0);
    }

    #[test]
    fn blank_template_means_none() {
        assert_eq!(non_empty("   ".into()), None);
        assert_eq!(non_empty(" {caption} ".into()), Some("{caption}".into()));
    }
}
