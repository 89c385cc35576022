//! Generator commands: inputs, navigation and the avatar request itself

use std::path::PathBuf;
use std::time::Duration;

use tauri::State;
use tracing::info;

use super::SharedController;
use crate::config::Config;
use crate::controller::{Completion, ControllerError};
use crate::data_url::read_image_file;
use crate::gemini_client::{AvatarGenerator, GeminiClient, GenerationOutcome};
use crate::models::{AppState, Page, SettingsPatch};

#[tauri::command]
pub async fn get_app_state(controller: State<'_, SharedController>) -> Result<AppState, String> {
    Ok(controller.lock().await.state().clone())
}

#[tauri::command]
pub async fn upload_image(
    controller: State<'_, SharedController>,
    data_url: String,
) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    controller.upload_image(data_url);
    Ok(controller.state().clone())
}

/// Load a photo from disk, e.g. from a native file picker
#[tauri::command]
pub async fn upload_image_file(
    controller: State<'_, SharedController>,
    path: String,
) -> Result<AppState, String> {
    let data_url = read_image_file(&PathBuf::from(&path)).map_err(|e| e.to_string())?;
    info!("Uploaded image from {}", path);

    let mut controller = controller.lock().await;
    controller.upload_image(data_url);
    Ok(controller.state().clone())
}

#[tauri::command]
pub async fn set_prompt(
    controller: State<'_, SharedController>,
    prompt: String,
) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    controller.set_prompt(prompt);
    Ok(controller.state().clone())
}

#[tauri::command]
pub async fn select_prompt(
    controller: State<'_, SharedController>,
    prompt: String,
) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    controller.select_prompt(prompt);
    Ok(controller.state().clone())
}

#[tauri::command]
pub async fn update_settings(
    controller: State<'_, SharedController>,
    patch: SettingsPatch,
) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    controller.update_settings(&patch);
    Ok(controller.state().clone())
}

#[tauri::command]
pub async fn navigate(
    controller: State<'_, SharedController>,
    page: Page,
) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    controller.navigate(page);
    Ok(controller.state().clone())
}

#[tauri::command]
pub async fn toggle_theme(controller: State<'_, SharedController>) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    controller.toggle_theme();
    Ok(controller.state().clone())
}

#[tauri::command]
pub async fn reset_generator(controller: State<'_, SharedController>) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    controller.reset();
    Ok(controller.state().clone())
}

/// Generate an avatar from the current photo, prompt and settings.
///
/// Input and generation failures are reported through `AppState::error`;
/// only a request made while another is running is rejected outright.
#[tauri::command]
pub async fn generate_avatar(controller: State<'_, SharedController>) -> Result<AppState, String> {
    let ticket = {
        let mut guard = controller.lock().await;
        match guard.begin_generation() {
            Ok(ticket) => ticket,
            Err(ControllerError::Busy) => return Err(ControllerError::Busy.to_string()),
            Err(_) => return Ok(guard.state().clone()),
        }
    };

    let config = Config::load_or_default();
    let outcome = match GeminiClient::with_options(
        &config.gemini_api_key,
        &config.gemini_model,
        Duration::from_secs(config.request_timeout_secs),
    ) {
        Ok(client) => {
            client
                .generate_avatar(&ticket.prompt, &ticket.image, &ticket.settings)
                .await
        }
        Err(e) => GenerationOutcome::TransportFailure(e.to_string()),
    };

    let mut guard = controller.lock().await;
    if guard.complete_generation(ticket, outcome) == Completion::Discarded {
        info!("Generator was reset while the request was running");
    }
    Ok(guard.state().clone())
}
