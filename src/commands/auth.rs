//! Firebase sign-in and cloud sync commands

use tauri::{AppHandle, State};
use tracing::info;

use super::{get_or_create_firebase_client, SharedController, SharedFirebaseClient};
use crate::firebase::AuthUser;
use crate::models::{AppState, UserData};

const NOT_INITIALIZED: &str = "Firebase client not initialized";

#[tauri::command]
pub async fn auth_sign_in_email(
    app: AppHandle,
    firebase_state: State<'_, SharedFirebaseClient>,
    email: String,
    password: String,
) -> Result<AuthUser, String> {
    get_or_create_firebase_client(&app, firebase_state.inner()).await?;

    let client_guard = firebase_state.read().await;
    let client = client_guard.as_ref().ok_or(NOT_INITIALIZED)?;
    client
        .sign_in_with_email(&email, &password)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn auth_sign_up_email(
    app: AppHandle,
    firebase_state: State<'_, SharedFirebaseClient>,
    email: String,
    password: String,
    username: String,
) -> Result<AuthUser, String> {
    get_or_create_firebase_client(&app, firebase_state.inner()).await?;

    let client_guard = firebase_state.read().await;
    let client = client_guard.as_ref().ok_or(NOT_INITIALIZED)?;
    client
        .sign_up_with_email(&email, &password, &username)
        .await
        .map_err(|e| e.to_string())
}

/// Sign in with the Google ID token obtained by the frontend's OAuth popup
#[tauri::command]
pub async fn auth_sign_in_google(
    app: AppHandle,
    firebase_state: State<'_, SharedFirebaseClient>,
    id_token: String,
) -> Result<AuthUser, String> {
    get_or_create_firebase_client(&app, firebase_state.inner()).await?;

    let client_guard = firebase_state.read().await;
    let client = client_guard.as_ref().ok_or(NOT_INITIALIZED)?;
    client
        .sign_in_with_google(&id_token)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn auth_send_password_reset(
    app: AppHandle,
    firebase_state: State<'_, SharedFirebaseClient>,
    email: String,
) -> Result<(), String> {
    get_or_create_firebase_client(&app, firebase_state.inner()).await?;

    let client_guard = firebase_state.read().await;
    let client = client_guard.as_ref().ok_or(NOT_INITIALIZED)?;
    client
        .send_password_reset(&email)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn auth_sign_out(firebase_state: State<'_, SharedFirebaseClient>) -> Result<(), String> {
    let client_guard = firebase_state.read().await;
    if let Some(ref client) = *client_guard {
        client.sign_out().await;
    }
    Ok(())
}

#[tauri::command]
pub async fn auth_current_user(
    firebase_state: State<'_, SharedFirebaseClient>,
) -> Result<Option<AuthUser>, String> {
    let client_guard = firebase_state.read().await;
    match *client_guard {
        Some(ref client) => Ok(client.current_user().await),
        None => Ok(None),
    }
}

/// Pull the signed-in user's cloud document into local state.
///
/// Empty remote lists do not overwrite local ones, so a first sign-in keeps
/// the history made while signed out.
#[tauri::command]
pub async fn sync_pull(
    controller: State<'_, SharedController>,
    firebase_state: State<'_, SharedFirebaseClient>,
) -> Result<AppState, String> {
    let data = {
        let client_guard = firebase_state.read().await;
        let client = client_guard.as_ref().ok_or(NOT_INITIALIZED)?;
        let user = client.current_user().await.ok_or("Not signed in")?;
        client
            .get_user_data(&user.uid)
            .await
            .map_err(|e| e.to_string())?
    };

    let data = UserData {
        history: data.history.filter(|h| !h.is_empty()),
        community_prompts: data.community_prompts.filter(|p| !p.is_empty()),
    };

    let mut controller = controller.lock().await;
    controller.apply_user_data(data);
    info!("Cloud data applied");
    Ok(controller.state().clone())
}

/// Push local history and community prompts to the signed-in user's document
#[tauri::command]
pub async fn sync_push(
    controller: State<'_, SharedController>,
    firebase_state: State<'_, SharedFirebaseClient>,
) -> Result<(), String> {
    let data = controller.lock().await.user_data();

    let client_guard = firebase_state.read().await;
    let client = client_guard.as_ref().ok_or(NOT_INITIALIZED)?;
    let user = client.current_user().await.ok_or("Not signed in")?;
    client
        .update_user_data(&user.uid, &data)
        .await
        .map_err(|e| e.to_string())
}
