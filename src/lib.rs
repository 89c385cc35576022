pub mod catalog;
pub mod config;
pub mod controller;
pub mod data_url;
pub mod firebase;
pub mod gemini_client;
pub mod models;
pub mod persistence;

#[cfg(feature = "desktop")]
mod commands;

#[cfg(test)]
mod controller_tests;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::Manager;
    use tracing::{error, info, warn};
    use tracing_subscriber::EnvFilter;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("RupVeda AI starting...");

    let result = tauri::Builder::default()
        .setup(|app| {
            let config = config::Config::load_or_default();
            for problem in config.validate() {
                warn!("Config: {}", problem);
            }
            if config.gemini_api_key.trim().is_empty() {
                warn!("No Gemini API key configured; generation will fail until one is set");
            }

            let controller = commands::create_controller(&config)?;
            app.manage(controller);
            app.manage(commands::create_firebase_client());

            info!("App setup complete");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_app_state,
            commands::upload_image,
            commands::upload_image_file,
            commands::set_prompt,
            commands::select_prompt,
            commands::update_settings,
            commands::generate_avatar,
            commands::reset_generator,
            commands::navigate,
            commands::toggle_theme,
            commands::delete_history_item,
            commands::reuse_history_item,
            commands::save_image_to_file,
            commands::get_prompt_catalog,
            commands::get_faq,
            commands::add_community_prompt,
            commands::submit_feedback,
            commands::complete_onboarding,
            commands::get_config,
            commands::set_config,
            commands::auth_sign_in_email,
            commands::auth_sign_up_email,
            commands::auth_sign_in_google,
            commands::auth_send_password_reset,
            commands::auth_sign_out,
            commands::auth_current_user,
            commands::sync_pull,
            commands::sync_push,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        error!("Error while running tauri application: {}", e);
    }
}
