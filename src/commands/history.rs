//! History commands

use std::path::PathBuf;

use chrono::Utc;
use tauri::State;
use tracing::info;

use super::SharedController;
use crate::data_url::write_image_file;
use crate::models::AppState;

#[tauri::command]
pub async fn delete_history_item(
    controller: State<'_, SharedController>,
    id: i64,
) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    if !controller.delete_history_item(id) {
        return Err(format!("History item {} not found", id));
    }
    Ok(controller.state().clone())
}

#[tauri::command]
pub async fn reuse_history_item(
    controller: State<'_, SharedController>,
    id: i64,
) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    let item = controller
        .find_history_item(id)
        .cloned()
        .ok_or_else(|| format!("History item {} not found", id))?;
    controller.reuse_history_item(&item);
    Ok(controller.state().clone())
}

/// Write an avatar or history image into `directory`; returns the file path.
///
/// `label` names the source in the file name (`Avatar` or `History`).
#[tauri::command]
pub fn save_image_to_file(
    data_url: String,
    directory: String,
    label: Option<String>,
) -> Result<String, String> {
    let label = label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| "Avatar".to_string());
    let file_name = format!(
        "RupVeda-AI-{}-{}.jpeg",
        label.trim(),
        Utc::now().timestamp_millis()
    );
    let path = PathBuf::from(directory).join(file_name);

    write_image_file(&data_url, &path).map_err(|e| e.to_string())?;
    info!("Saved image to {}", path.display());
    Ok(path.to_string_lossy().to_string())
}
