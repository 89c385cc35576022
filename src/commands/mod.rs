//! Tauri command handlers organized by domain.
//!
//! This module re-exports all command handlers for registration in lib.rs.

mod auth;
mod generator;
mod history;
mod prompts;
mod settings;

// Re-export all commands for lib.rs registration
pub use auth::*;
pub use generator::*;
pub use history::*;
pub use prompts::*;
pub use settings::*;

use crate::config::Config;
use crate::controller::Controller;
use crate::firebase::{AuthUser, FirebaseClient, FirebaseConfig};
use crate::persistence::FileStore;
use std::sync::Arc;
use tauri::{AppHandle, Emitter};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{info, warn};

/// Event carrying the signed-in user (or `null`) after every auth change
pub const AUTH_STATE_EVENT: &str = "auth_state_changed";

/// Shared controller; never held across a network call
pub type SharedController = Arc<Mutex<Controller<FileStore>>>;

/// Shared Firebase client, created on first use from config
pub type SharedFirebaseClient = Arc<RwLock<Option<FirebaseClient>>>;

/// Build the controller on the configured storage directory and restore saved state
pub fn create_controller(config: &Config) -> anyhow::Result<SharedController> {
    let dir = config.resolved_storage_dir()?;
    info!("Local storage at {}", dir.display());

    let mut controller = Controller::new(FileStore::new(dir));
    controller.load_from_storage();
    Ok(Arc::new(Mutex::new(controller)))
}

pub fn create_firebase_client() -> SharedFirebaseClient {
    Arc::new(RwLock::new(None))
}

/// Get or create the Firebase client, initializing if needed
pub(crate) async fn get_or_create_firebase_client(
    app: &AppHandle,
    firebase_state: &SharedFirebaseClient,
) -> Result<(), String> {
    let mut client_guard = firebase_state.write().await;
    if client_guard.is_none() {
        let config = Config::load_or_default();
        if !config.has_firebase() {
            return Err(
                "Firebase is not configured. Please set the API key and project ID in settings."
                    .to_string(),
            );
        }
        let client = FirebaseClient::new(FirebaseConfig {
            api_key: config.firebase_api_key,
            project_id: config.firebase_project_id,
        })
        .map_err(|e| e.to_string())?;

        tauri::async_runtime::spawn(forward_auth_changes(app.clone(), client.subscribe()));
        *client_guard = Some(client);
    }
    Ok(())
}

async fn forward_auth_changes(app: AppHandle, mut rx: watch::Receiver<Option<AuthUser>>) {
    while rx.changed().await.is_ok() {
        let user = rx.borrow_and_update().clone();
        if let Err(e) = app.emit(AUTH_STATE_EVENT, user) {
            warn!("Failed to emit {}: {}", AUTH_STATE_EVENT, e);
        }
    }
}
