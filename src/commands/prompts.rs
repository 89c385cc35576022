//! Prompt library, community prompts, feedback and onboarding commands

use tauri::State;

use super::SharedController;
use crate::catalog;
use crate::models::{AppState, FaqEntry, FeedbackEntry, Prompt, PromptCategory};

#[tauri::command]
pub fn get_prompt_catalog() -> Vec<PromptCategory> {
    catalog::prompt_categories()
}

#[tauri::command]
pub fn get_faq() -> Vec<FaqEntry> {
    catalog::faq_entries()
}

#[tauri::command]
pub async fn add_community_prompt(
    controller: State<'_, SharedController>,
    prompt: Prompt,
) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    controller
        .add_community_prompt(prompt)
        .map_err(|e| e.to_string())?;
    Ok(controller.state().clone())
}

#[tauri::command]
pub async fn submit_feedback(
    controller: State<'_, SharedController>,
    rating: u8,
    comment: String,
) -> Result<FeedbackEntry, String> {
    let mut controller = controller.lock().await;
    controller
        .submit_feedback(rating, &comment)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn complete_onboarding(
    controller: State<'_, SharedController>,
) -> Result<AppState, String> {
    let mut controller = controller.lock().await;
    controller.complete_onboarding();
    Ok(controller.state().clone())
}
