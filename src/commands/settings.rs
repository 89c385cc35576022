//! Settings commands

use tauri::State;
use tracing::info;

use super::SharedFirebaseClient;
use crate::config::{Config, ConfigUpdate, ConfigView};

/// Get current configuration (secrets reported as present/absent only)
#[tauri::command]
pub fn get_config() -> Result<ConfigView, String> {
    let config = Config::load_or_default();
    Ok(config.to_view())
}

/// Update configuration
#[tauri::command]
pub async fn set_config(
    firebase_state: State<'_, SharedFirebaseClient>,
    update: ConfigUpdate,
) -> Result<ConfigView, String> {
    // Environment overrides stay out of the saved file
    let mut config = Config::load().map_err(|e| e.to_string())?;
    config.apply_update(&update);

    // Validate settings before saving
    let problems = config.validate();
    if !problems.is_empty() {
        return Err(format!("Invalid settings: {}", problems.join("; ")));
    }
    config.save().map_err(|e| e.to_string())?;

    if update.firebase_api_key.is_some() || update.firebase_project_id.is_some() {
        // Rebuilt from the new config on next use. Signing out first makes the
        // auth forwarder emit `null` before the old client goes away.
        let old_client = firebase_state.write().await.take();
        if let Some(client) = old_client {
            client.sign_out().await;
        }
        info!("Firebase configuration changed, client will be recreated");
    }
    Ok(Config::load_or_default().to_view())
}
