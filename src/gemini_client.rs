//! Google Gemini API client for avatar generation
//!
//! Sends the uploaded photo plus a composed style instruction to the
//! generateContent endpoint and picks the first inline image out of the reply.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::data_url::ImagePart;
use crate::models::GenerationSettings;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Gemini API key is required")]
    MissingApiKey,
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
    #[error("The AI did not return an image")]
    NoImageReturned,
    #[error("Gemini request failed: {0}")]
    Transport(String),
}

/// What came back from one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Base64 payload of the first inline image
    Success(String),
    NoImageReturned,
    TransportFailure(String),
}

impl GenerationOutcome {
    pub fn into_result(self) -> Result<String, GenerationError> {
        match self {
            GenerationOutcome::Success(data) => Ok(data),
            GenerationOutcome::NoImageReturned => Err(GenerationError::NoImageReturned),
            GenerationOutcome::TransportFailure(detail) => Err(GenerationError::Transport(detail)),
        }
    }
}

/// Anything that can turn a photo plus a style prompt into an avatar
#[async_trait]
pub trait AvatarGenerator: Send + Sync {
    async fn generate_avatar(
        &self,
        prompt: &str,
        image: &ImagePart,
        settings: &GenerationSettings,
    ) -> GenerationOutcome;
}

/// How strongly the style overrides the source photo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleQualifier {
    Subtle,
    Balanced,
    Vivid,
}

impl StyleQualifier {
    pub fn from_intensity(intensity: u8) -> Self {
        if intensity <= 25 {
            StyleQualifier::Subtle
        } else if intensity >= 75 {
            StyleQualifier::Vivid
        } else {
            StyleQualifier::Balanced
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            StyleQualifier::Subtle => {
                "a subtle artistic interpretation, staying very close to the original photo structure"
            }
            StyleQualifier::Balanced => "a balanced artistic interpretation",
            StyleQualifier::Vivid => {
                "a vivid and highly stylized artistic interpretation, taking creative liberties"
            }
        }
    }
}

/// Compose the natural-language instruction sent next to the photo
pub fn build_instruction(prompt: &str, settings: &GenerationSettings) -> String {
    let qualifier = StyleQualifier::from_intensity(settings.style_intensity);

    let mut instruction = format!(
        "Based on the user's photo, create a new artistic image in the following style: \"{}\".\n\
         The image should have an aspect ratio of {}.\n\
         The style should be applied with {}.",
        prompt,
        settings.aspect_ratio,
        qualifier.phrase()
    );

    if !settings.negative_prompt.trim().is_empty() {
        instruction.push_str(&format!(
            "\nCRITICAL: Avoid including the following elements: \"{}\".",
            settings.negative_prompt
        ));
    }

    instruction.push_str(
        "\nThe output must be an image only. Do not include any text, borders, or annotations on the image.",
    );
    instruction
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

// -- Response types --

#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponsePart {
    inline_data: Option<GeminiInlineData>,
    #[allow(dead_code)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[allow(dead_code)]
    mime_type: Option<String>,
    data: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Result<Self, GenerationError> {
        Self::with_options(api_key, DEFAULT_MODEL, DEFAULT_TIMEOUT)
    }

    pub fn with_options(
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;

        let model = if model.trim().is_empty() {
            DEFAULT_MODEL
        } else {
            model.trim()
        };

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_request_body(
        instruction: &str,
        image: &ImagePart,
        settings: &GenerationSettings,
    ) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": image.data
                        }
                    },
                    {"text": instruction}
                ]
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": {
                    "aspectRatio": settings.aspect_ratio.as_str()
                }
            }
        })
    }

    pub fn extract_image_base64(response: &GeminiResponse) -> Option<String> {
        response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.iter().find_map(|p| p.inline_data.as_ref()))
            .map(|d| d.data.clone())
    }

    /// Map a parsed response into an outcome
    pub fn outcome_from_response(response: &GeminiResponse) -> GenerationOutcome {
        match Self::extract_image_base64(response) {
            Some(data) => GenerationOutcome::Success(data),
            None => GenerationOutcome::NoImageReturned,
        }
    }

    async fn request(
        &self,
        prompt: &str,
        image: &ImagePart,
        settings: &GenerationSettings,
    ) -> Result<GeminiResponse, String> {
        let url = format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.model);
        let instruction = build_instruction(prompt, settings);
        let body = Self::build_request_body(&instruction, image, settings);

        info!(
            "Gemini avatar generation: model={} prompt={} chars image={} bytes base64 ratio={} intensity={}",
            self.model,
            prompt.len(),
            image.data.len(),
            settings.aspect_ratio,
            settings.style_intensity
        );

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(
                "x-goog-api-key",
                HeaderValue::from_str(&self.api_key)
                    .map_err(|e| format!("Invalid API key header: {}", e))?,
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Gemini API request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            // Truncate error body to avoid leaking sensitive data
            let truncated: String = error_body.chars().take(MAX_ERROR_BODY).collect();
            return Err(format!("Gemini API error {}: {}", status, truncated));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Gemini response: {}", e))
    }
}

#[async_trait]
impl AvatarGenerator for GeminiClient {
    async fn generate_avatar(
        &self,
        prompt: &str,
        image: &ImagePart,
        settings: &GenerationSettings,
    ) -> GenerationOutcome {
        match self.request(prompt, image, settings).await {
            Ok(response) => {
                let outcome = Self::outcome_from_response(&response);
                match outcome {
                    GenerationOutcome::Success(ref data) => {
                        info!("Avatar generated: {} bytes base64", data.len())
                    }
                    _ => warn!("Gemini response contained no image data"),
                }
                outcome
            }
            Err(detail) => {
                warn!("Avatar generation failed: {}", detail);
                GenerationOutcome::TransportFailure(detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AspectRatio;

    fn settings(intensity: u8, negative: &str) -> GenerationSettings {
        GenerationSettings {
            aspect_ratio: AspectRatio::Square,
            style_intensity: intensity,
            negative_prompt: negative.to_string(),
        }
    }

    #[test]
    fn test_qualifier_thresholds() {
        assert_eq!(StyleQualifier::from_intensity(0), StyleQualifier::Subtle);
        assert_eq!(StyleQualifier::from_intensity(25), StyleQualifier::Subtle);
        assert_eq!(StyleQualifier::from_intensity(26), StyleQualifier::Balanced);
        assert_eq!(StyleQualifier::from_intensity(50), StyleQualifier::Balanced);
        assert_eq!(StyleQualifier::from_intensity(74), StyleQualifier::Balanced);
        assert_eq!(StyleQualifier::from_intensity(75), StyleQualifier::Vivid);
        assert_eq!(StyleQualifier::from_intensity(100), StyleQualifier::Vivid);
    }

    #[test]
    fn test_instruction_without_negative_prompt() {
        let instruction = build_instruction("warrior queen", &settings(10, ""));
        assert!(instruction.contains("in the following style: \"warrior queen\"."));
        assert!(instruction.contains("aspect ratio of 1:1."));
        assert!(instruction.contains("a subtle artistic interpretation"));
        assert!(!instruction.contains("Avoid including"));
        assert!(instruction.ends_with("annotations on the image."));
    }

    #[test]
    fn test_instruction_with_negative_prompt() {
        let instruction = build_instruction("warrior queen", &settings(10, "hats"));
        assert!(instruction
            .contains("\nCRITICAL: Avoid including the following elements: \"hats\"."));
    }

    #[test]
    fn test_whitespace_negative_prompt_ignored() {
        let instruction = build_instruction("warrior queen", &settings(80, "   "));
        assert!(!instruction.contains("CRITICAL"));
        assert!(instruction.contains("a vivid and highly stylized artistic interpretation"));
    }

    #[test]
    fn test_build_request_body() {
        let image = ImagePart {
            mime_type: "image/png".to_string(),
            data: "iVBORw0KGgo=".to_string(),
        };
        let mut s = settings(50, "");
        s.aspect_ratio = AspectRatio::Portrait;
        let body = GeminiClient::build_request_body("Draw me", &image, &s);

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "iVBORw0KGgo=");
        assert_eq!(parts[1]["text"], "Draw me");
        assert_eq!(body["generationConfig"]["responseModalities"][0], "IMAGE");
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "9:16");
    }

    #[test]
    fn test_parse_response_valid() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your avatar"},
                        {
                            "inlineData": {
                                "mimeType": "image/png",
                                "data": "iVBORw0KGgo="
                            }
                        }
                    ]
                }
            }]
        });
        let response: GeminiResponse = serde_json::from_value(response_json).unwrap();
        assert_eq!(
            GeminiClient::outcome_from_response(&response),
            GenerationOutcome::Success("iVBORw0KGgo=".to_string())
        );
    }

    #[test]
    fn test_parse_response_no_image() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "I cannot generate that image"
                    }]
                }
            }]
        });
        let response: GeminiResponse = serde_json::from_value(response_json).unwrap();
        assert_eq!(
            GeminiClient::outcome_from_response(&response),
            GenerationOutcome::NoImageReturned
        );
    }

    #[test]
    fn test_parse_response_blocked_candidate() {
        // Safety-blocked candidates come back without content
        let response_json = serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        });
        let response: GeminiResponse = serde_json::from_value(response_json).unwrap();
        assert!(GeminiClient::extract_image_base64(&response).is_none());

        let response: GeminiResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(GeminiClient::extract_image_base64(&response).is_none());
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(
            GenerationOutcome::Success("abc".to_string()).into_result(),
            Ok("abc".to_string())
        );
        assert_eq!(
            GenerationOutcome::NoImageReturned.into_result(),
            Err(GenerationError::NoImageReturned)
        );
        assert!(matches!(
            GenerationOutcome::TransportFailure("timeout".to_string()).into_result(),
            Err(GenerationError::Transport(_))
        ));
    }

    #[test]
    fn test_new_empty_api_key() {
        assert_eq!(
            GeminiClient::new("  ").err(),
            Some(GenerationError::MissingApiKey)
        );
    }

    #[test]
    fn test_blank_model_falls_back_to_default() {
        let client = GeminiClient::with_options("key", " ", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
    }
}
