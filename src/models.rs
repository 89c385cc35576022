//! Domain types shared by the controller, the clients and the IPC layer.
//!
//! Field names serialize in camelCase so values written by earlier builds of
//! the web frontend (same storage keys) keep parsing.

use serde::{Deserialize, Serialize};

/// Maximum number of entries kept in the generation history
pub const HISTORY_CAPACITY: usize = 20;

/// Upper bound of the style intensity slider
pub const MAX_STYLE_INTENSITY: u8 = 100;

/// Requested width:height ratio of the generated image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub aspect_ratio: AspectRatio,
    pub style_intensity: u8,
    pub negative_prompt: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Square,
            style_intensity: 50,
            negative_prompt: String::new(),
        }
    }
}

impl GenerationSettings {
    /// Merge a partial edit. Intensity is clamped to the slider range.
    pub fn merge(&mut self, patch: &SettingsPatch) {
        if let Some(ratio) = patch.aspect_ratio {
            self.aspect_ratio = ratio;
        }
        if let Some(intensity) = patch.style_intensity {
            self.style_intensity = intensity.min(MAX_STYLE_INTENSITY);
        }
        if let Some(ref negative) = patch.negative_prompt {
            self.negative_prompt = negative.clone();
        }
    }

    /// Values read back from storage may come from an older or hand-edited file.
    pub fn clamped(mut self) -> Self {
        self.style_intensity = self.style_intensity.min(MAX_STYLE_INTENSITY);
        self
    }
}

/// Partial edit of [`GenerationSettings`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub aspect_ratio: Option<AspectRatio>,
    pub style_intensity: Option<u8>,
    pub negative_prompt: Option<String>,
}

/// A finished generation kept in the local history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    /// Creation timestamp in milliseconds, unique within the history
    pub id: i64,
    pub image_url: String,
    pub prompt: String,
    pub settings: GenerationSettings,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub title: String,
    pub description: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptCategory {
    pub name: String,
    pub prompts: Vec<Prompt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// One rating left on a generated avatar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: i64,
    /// Truncated data URL, enough to tell avatars apart in the log
    pub avatar_image: String,
    pub rating: u8,
    pub comment: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    #[default]
    Generator,
    PromptLibrary,
    History,
    Contact,
}

/// User-facing error shown above the generate button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
    pub suggestions: Vec<String>,
}

impl ErrorNotice {
    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }
}

/// Per-user document mirrored to the cloud store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_prompts: Option<Vec<Prompt>>,
}

/// Everything the generator UI renders
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub page: Page,
    pub theme: Theme,
    pub uploaded_image: Option<String>,
    pub prompt: String,
    pub settings: GenerationSettings,
    pub generated_avatar: Option<String>,
    pub is_loading: bool,
    pub error: Option<ErrorNotice>,
    pub history: Vec<HistoryItem>,
    pub community_prompts: Vec<Prompt>,
    pub onboarding_open: bool,
}
