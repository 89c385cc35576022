//! Application state controller.
//!
//! Owns the generator's [`AppState`] and is the only place it changes. Every
//! operation that touches a persisted slice writes that slice back to the
//! store itself, once the initial load from storage has happened.
//!
//! Generation is split in two so a host can release its lock while the
//! network call runs:
//!
//! ```text
//! begin_generation() -> GenerationTicket -> AvatarGenerator -> complete_generation(ticket, outcome)
//! ```
//!
//! `reset()` invalidates the outstanding ticket, so a late completion is dropped.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data_url::{decode_data_url, to_data_url, FormatError, ImagePart};
use crate::gemini_client::{AvatarGenerator, GenerationError, GenerationOutcome};
use crate::models::{
    AppState, ErrorNotice, FeedbackEntry, GenerationSettings, HistoryItem, Page, Prompt,
    SettingsPatch, Theme, UserData, HISTORY_CAPACITY,
};
use crate::persistence::{
    load_json, load_string, remove_key, save_json, save_string, KeyValueStore, StorageKey,
};

pub const GENERATION_FAILED_MESSAGE: &str =
    "We couldn't generate your avatar. Please check the suggestions below and try again.";

pub const TROUBLESHOOTING_SUGGESTIONS: [&str; 4] = [
    "Try using a different or more descriptive prompt.",
    "Ensure the uploaded image is clear and well-lit.",
    "Check your internet connection and try again.",
    "If the problem persists, the AI service might be temporarily unavailable.",
];

/// Generated avatars always come back as JPEG
const AVATAR_MIME: &str = "image/jpeg";

const FEEDBACK_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("Please upload an image first.")]
    MissingImage,
    #[error("Please enter a prompt or select one from the library.")]
    EmptyPrompt,
    #[error("An avatar is already being generated")]
    Busy,
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("Generation result arrived after the generator was reset")]
    Stale,
    #[error("All fields and an image are required.")]
    InvalidPrompt,
    #[error("There is no generated avatar to rate")]
    NoAvatar,
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
}

/// Snapshot of one generation request, handed back on completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    token: u64,
    pub prompt: String,
    pub image: ImagePart,
    pub settings: GenerationSettings,
}

/// What `complete_generation` did with an outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Avatar stored and history updated; carries the avatar data URL
    Applied(String),
    /// Error notice shown; history untouched
    Failed,
    /// Ticket was superseded; state untouched
    Discarded,
}

pub struct Controller<S: KeyValueStore> {
    state: AppState,
    store: S,
    loaded: bool,
    request_token: u64,
    clock: fn() -> DateTime<Utc>,
}

impl<S: KeyValueStore> Controller<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Utc::now)
    }

    pub fn with_clock(store: S, clock: fn() -> DateTime<Utc>) -> Self {
        Self {
            state: AppState::default(),
            store,
            loaded: false,
            request_token: 0,
            clock,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Restore persisted slices. Until this has run, mutations are not written back.
    pub fn load_from_storage(&mut self) {
        if let Some(raw) = load_string(&self.store, StorageKey::Theme) {
            match Theme::parse(&raw) {
                Some(theme) => self.state.theme = theme,
                None => warn!("Ignoring unknown stored theme {:?}", raw),
            }
        }

        if let Some(settings) =
            load_json::<GenerationSettings, _>(&self.store, StorageKey::GenerationSettings)
        {
            self.state.settings = settings.clamped();
        }

        if let Some(mut history) =
            load_json::<Vec<HistoryItem>, _>(&self.store, StorageKey::GenerationHistory)
        {
            history.truncate(HISTORY_CAPACITY);
            self.state.history = history;
        }

        if let Some(prompts) = load_json::<Vec<Prompt>, _>(&self.store, StorageKey::CommunityPrompts)
        {
            self.state.community_prompts = prompts;
        }

        if let Some(prompt) = load_string(&self.store, StorageKey::GeneratorPrompt) {
            self.state.prompt = prompt;
        }

        self.state.uploaded_image =
            load_string(&self.store, StorageKey::GeneratorImage).filter(|s| !s.is_empty());

        self.state.onboarding_open = load_string(&self.store, StorageKey::HasOnboarded).is_none();

        self.loaded = true;
        info!(
            "Restored state: {} history items, {} community prompts, image={}",
            self.state.history.len(),
            self.state.community_prompts.len(),
            self.state.uploaded_image.is_some()
        );
    }

    // -- persistence --

    fn persist_theme(&mut self) {
        if self.loaded {
            save_string(&mut self.store, StorageKey::Theme, self.state.theme.as_str());
        }
    }

    fn persist_prompt(&mut self) {
        if self.loaded {
            save_string(&mut self.store, StorageKey::GeneratorPrompt, &self.state.prompt);
        }
    }

    fn persist_image(&mut self) {
        if !self.loaded {
            return;
        }
        match self.state.uploaded_image {
            Some(ref image) => save_string(&mut self.store, StorageKey::GeneratorImage, image),
            None => remove_key(&mut self.store, StorageKey::GeneratorImage),
        }
    }

    fn persist_settings(&mut self) {
        if self.loaded {
            save_json(&mut self.store, StorageKey::GenerationSettings, &self.state.settings);
        }
    }

    fn persist_history(&mut self) {
        if self.loaded {
            save_json(&mut self.store, StorageKey::GenerationHistory, &self.state.history);
        }
    }

    fn persist_community_prompts(&mut self) {
        if self.loaded {
            save_json(
                &mut self.store,
                StorageKey::CommunityPrompts,
                &self.state.community_prompts,
            );
        }
    }

    // -- navigation & preferences --

    pub fn navigate(&mut self, page: Page) {
        self.state.page = page;
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.state.theme = theme;
        self.persist_theme();
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.state.theme.toggled());
        self.state.theme
    }

    pub fn complete_onboarding(&mut self) {
        self.state.onboarding_open = false;
        save_string(&mut self.store, StorageKey::HasOnboarded, "true");
    }

    // -- generator inputs --

    /// Replace the uploaded photo; any previous result and error are cleared
    pub fn upload_image(&mut self, data_url: String) {
        self.state.uploaded_image = Some(data_url);
        self.state.generated_avatar = None;
        self.state.error = None;
        self.persist_image();
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.state.prompt = prompt.into();
        self.persist_prompt();
    }

    /// Pick a prompt from the library and jump back to the generator
    pub fn select_prompt(&mut self, prompt: impl Into<String>) {
        self.set_prompt(prompt);
        self.state.page = Page::Generator;
    }

    pub fn update_settings(&mut self, patch: &SettingsPatch) {
        self.state.settings.merge(patch);
        self.persist_settings();
    }

    /// Clear the generator. History is kept and any in-flight request is orphaned.
    pub fn reset(&mut self) {
        self.request_token = self.request_token.wrapping_add(1);
        self.state.uploaded_image = None;
        self.state.prompt.clear();
        self.state.generated_avatar = None;
        self.state.is_loading = false;
        self.state.error = None;
        self.persist_prompt();
        self.persist_image();
        debug!("Generator reset (token now {})", self.request_token);
    }

    // -- generation --

    fn generation_failed(&mut self) {
        self.state.error = Some(ErrorNotice {
            message: GENERATION_FAILED_MESSAGE.to_string(),
            suggestions: TROUBLESHOOTING_SUGGESTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        });
        self.state.is_loading = false;
    }

    /// Validate inputs, mark the generator busy and snapshot the request
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, ControllerError> {
        if self.state.is_loading {
            return Err(ControllerError::Busy);
        }

        let image_url = match self.state.uploaded_image {
            Some(ref image) => image.clone(),
            None => {
                let err = ControllerError::MissingImage;
                self.state.error = Some(ErrorNotice::plain(err.to_string()));
                return Err(err);
            }
        };
        if self.state.prompt.trim().is_empty() {
            let err = ControllerError::EmptyPrompt;
            self.state.error = Some(ErrorNotice::plain(err.to_string()));
            return Err(err);
        }

        self.state.is_loading = true;
        self.state.error = None;
        self.state.generated_avatar = None;

        let image = match decode_data_url(&image_url) {
            Ok(image) => image,
            Err(e) => {
                warn!("Uploaded image is not a usable data URL: {}", e);
                self.generation_failed();
                return Err(e.into());
            }
        };

        self.request_token = self.request_token.wrapping_add(1);
        Ok(GenerationTicket {
            token: self.request_token,
            prompt: self.state.prompt.clone(),
            image,
            settings: self.state.settings.clone(),
        })
    }

    fn next_history_id(&self, now_ms: i64) -> i64 {
        match self.state.history.iter().map(|h| h.id).max() {
            Some(newest) if newest >= now_ms => newest + 1,
            _ => now_ms,
        }
    }

    /// Apply the result of a request started with `begin_generation`
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        outcome: GenerationOutcome,
    ) -> Completion {
        if ticket.token != self.request_token {
            info!(
                "Discarding stale generation result (ticket {}, current {})",
                ticket.token, self.request_token
            );
            return Completion::Discarded;
        }

        match outcome {
            GenerationOutcome::Success(data) => {
                let avatar = to_data_url(AVATAR_MIME, &data);
                let now = (self.clock)();
                let item = HistoryItem {
                    id: self.next_history_id(now.timestamp_millis()),
                    image_url: avatar.clone(),
                    prompt: ticket.prompt,
                    settings: ticket.settings,
                    created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
                };

                self.state.history.insert(0, item);
                if self.state.history.len() > HISTORY_CAPACITY {
                    let evicted = self.state.history.len() - HISTORY_CAPACITY;
                    self.state.history.truncate(HISTORY_CAPACITY);
                    debug!("History full, evicted {} oldest item(s)", evicted);
                }
                self.state.generated_avatar = Some(avatar.clone());
                self.state.is_loading = false;
                self.persist_history();
                Completion::Applied(avatar)
            }
            GenerationOutcome::NoImageReturned => {
                warn!("Avatar generation returned no image");
                self.generation_failed();
                Completion::Failed
            }
            GenerationOutcome::TransportFailure(detail) => {
                warn!("Avatar generation failed: {}", detail);
                self.generation_failed();
                Completion::Failed
            }
        }
    }

    /// Run a whole generation against `generator`, returning the avatar data URL
    pub async fn generate<G>(&mut self, generator: &G) -> Result<String, ControllerError>
    where
        G: AvatarGenerator + ?Sized,
    {
        let ticket = self.begin_generation()?;
        let outcome = generator
            .generate_avatar(&ticket.prompt, &ticket.image, &ticket.settings)
            .await;
        let failure = outcome.clone().into_result().err();

        match self.complete_generation(ticket, outcome) {
            Completion::Applied(avatar) => Ok(avatar),
            Completion::Discarded => Err(ControllerError::Stale),
            Completion::Failed => Err(failure
                .unwrap_or(GenerationError::NoImageReturned)
                .into()),
        }
    }

    // -- history --

    /// Remove one entry; returns whether anything was removed
    pub fn delete_history_item(&mut self, id: i64) -> bool {
        let before = self.state.history.len();
        self.state.history.retain(|item| item.id != id);
        let removed = self.state.history.len() != before;
        if removed {
            self.persist_history();
        }
        removed
    }

    /// Copy a past prompt and its settings back into the generator
    pub fn reuse_history_item(&mut self, item: &HistoryItem) {
        self.state.prompt = item.prompt.clone();
        self.state.settings = item.settings.clone().clamped();
        self.state.page = Page::Generator;
        self.persist_prompt();
        self.persist_settings();
    }

    pub fn find_history_item(&self, id: i64) -> Option<&HistoryItem> {
        self.state.history.iter().find(|item| item.id == id)
    }

    // -- community prompts --

    pub fn add_community_prompt(&mut self, prompt: Prompt) -> Result<(), ControllerError> {
        let has_image = prompt
            .image_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if prompt.title.trim().is_empty()
            || prompt.description.trim().is_empty()
            || prompt.prompt.trim().is_empty()
            || !has_image
        {
            return Err(ControllerError::InvalidPrompt);
        }

        info!("Adding community prompt '{}'", prompt.title);
        self.state.community_prompts.insert(0, prompt);
        self.persist_community_prompts();
        Ok(())
    }

    // -- feedback --

    /// Append a rating for the current avatar to the feedback log
    pub fn submit_feedback(
        &mut self,
        rating: u8,
        comment: &str,
    ) -> Result<FeedbackEntry, ControllerError> {
        let avatar = self
            .state
            .generated_avatar
            .as_ref()
            .ok_or(ControllerError::NoAvatar)?;
        if !(1..=5).contains(&rating) {
            return Err(ControllerError::InvalidRating(rating));
        }

        let now = (self.clock)();
        let preview: String = avatar.chars().take(FEEDBACK_PREVIEW_CHARS).collect();
        let entry = FeedbackEntry {
            id: now.timestamp_millis(),
            avatar_image: format!("{}...", preview),
            rating,
            comment: comment.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        // An unreadable log is left as it is rather than replaced
        let mut log: Vec<FeedbackEntry> = match load_string(&self.store, StorageKey::AvatarFeedback)
        {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(log) => log,
                Err(e) => {
                    warn!("Feedback log is corrupted, not saving feedback: {}", e);
                    return Ok(entry);
                }
            },
        };
        log.push(entry.clone());
        save_json(&mut self.store, StorageKey::AvatarFeedback, &log);
        Ok(entry)
    }

    // -- cloud sync --

    pub fn user_data(&self) -> UserData {
        UserData {
            history: Some(self.state.history.clone()),
            community_prompts: Some(self.state.community_prompts.clone()),
        }
    }

    /// Adopt lists pulled from the signed-in user's cloud document
    pub fn apply_user_data(&mut self, data: UserData) {
        if let Some(mut history) = data.history {
            history.truncate(HISTORY_CAPACITY);
            self.state.history = history;
            self.persist_history();
        }
        if let Some(prompts) = data.community_prompts {
            self.state.community_prompts = prompts;
            self.persist_community_prompts();
        }
    }
}
