//! End-to-end tests for the controller
//!
//! These drive whole generator flows against a scripted generator and an
//! in-memory or on-disk store, without the Tauri host.

#[cfg(test)]
mod tests {
    use crate::controller::{Controller, ControllerError, GENERATION_FAILED_MESSAGE};
    use crate::data_url::ImagePart;
    use crate::gemini_client::{
        build_instruction, AvatarGenerator, GenerationError, GenerationOutcome, StyleQualifier,
    };
    use crate::models::{AspectRatio, GenerationSettings, SettingsPatch, HISTORY_CAPACITY};
    use crate::persistence::{FileStore, KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;

    const PHOTO: &str = "data:image/png;base64,iVBORw0KGgo=";

    /// Records every request and answers with a fixed outcome
    struct MockGenerator {
        outcome: GenerationOutcome,
        calls: Mutex<Vec<(String, ImagePart, GenerationSettings)>>,
    }

    impl MockGenerator {
        fn new(outcome: GenerationOutcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AvatarGenerator for MockGenerator {
        async fn generate_avatar(
            &self,
            prompt: &str,
            image: &ImagePart,
            settings: &GenerationSettings,
        ) -> GenerationOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), image.clone(), settings.clone()));
            self.outcome.clone()
        }
    }

    fn ready(prompt: &str) -> Controller<MemoryStore> {
        let mut controller = Controller::new(MemoryStore::new());
        controller.load_from_storage();
        controller.upload_image(PHOTO.to_string());
        controller.set_prompt(prompt);
        controller
    }

    #[tokio::test]
    async fn test_generate_end_to_end() {
        let generator = MockGenerator::new(GenerationOutcome::Success("abc123".to_string()));
        let mut controller = ready("test");

        let avatar = controller.generate(&generator).await.unwrap();

        assert_eq!(avatar, "data:image/jpeg;base64,abc123");
        let state = controller.state();
        assert_eq!(
            state.generated_avatar.as_deref(),
            Some("data:image/jpeg;base64,abc123")
        );
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].prompt, "test");
        assert_eq!(state.history[0].image_url, avatar);
        assert!(!state.is_loading);
        assert!(state.error.is_none());

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "test");
        assert_eq!(calls[0].1.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_generate_passes_current_settings() {
        let generator = MockGenerator::new(GenerationOutcome::Success("x".to_string()));
        let mut controller = ready("holi");
        controller.update_settings(&SettingsPatch {
            aspect_ratio: Some(AspectRatio::Portrait),
            style_intensity: Some(80),
            negative_prompt: Some("glasses".to_string()),
        });

        controller.generate(&generator).await.unwrap();

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls[0].2.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(calls[0].2.style_intensity, 80);
        assert_eq!(controller.state().history[0].settings, calls[0].2);
    }

    #[tokio::test]
    async fn test_missing_inputs_never_reach_generator() {
        let generator = MockGenerator::new(GenerationOutcome::Success("x".to_string()));

        let mut controller = Controller::new(MemoryStore::new());
        controller.load_from_storage();
        controller.set_prompt("test");
        assert_eq!(
            controller.generate(&generator).await,
            Err(ControllerError::MissingImage)
        );

        let mut controller = ready("");
        assert_eq!(
            controller.generate(&generator).await,
            Err(ControllerError::EmptyPrompt)
        );
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_image_outcome_shows_notice() {
        let generator = MockGenerator::new(GenerationOutcome::NoImageReturned);
        let mut controller = ready("test");

        let err = controller.generate(&generator).await.unwrap_err();
        assert_eq!(err, ControllerError::Generation(GenerationError::NoImageReturned));

        let state = controller.state();
        assert!(state.history.is_empty());
        assert!(state.generated_avatar.is_none());
        assert_eq!(
            state.error.as_ref().map(|e| e.message.as_str()),
            Some(GENERATION_FAILED_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_detail_out_of_notice() {
        let generator =
            MockGenerator::new(GenerationOutcome::TransportFailure("HTTP 500: boom".to_string()));
        let mut controller = ready("test");

        let err = controller.generate(&generator).await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Generation(GenerationError::Transport(_))
        ));
        let notice = controller.state().error.clone().unwrap();
        assert!(!notice.message.contains("boom"));
        assert!(notice.suggestions.iter().all(|s| !s.contains("boom")));
    }

    #[tokio::test]
    async fn test_history_capped_newest_first() {
        let generator = MockGenerator::new(GenerationOutcome::Success("img".to_string()));
        let mut controller = ready("p0");

        for i in 0..HISTORY_CAPACITY + 5 {
            controller.set_prompt(format!("p{}", i));
            controller.generate(&generator).await.unwrap();
        }

        let history = &controller.state().history;
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history[0].prompt, format!("p{}", HISTORY_CAPACITY + 4));
        assert_eq!(history[HISTORY_CAPACITY - 1].prompt, "p5");
        assert!(history.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn test_reuse_is_idempotent() {
        let generator = MockGenerator::new(GenerationOutcome::Success("img".to_string()));
        let mut controller = ready("kerala mural");
        controller.update_settings(&SettingsPatch {
            style_intensity: Some(10),
            ..Default::default()
        });
        controller.generate(&generator).await.unwrap();

        controller.reset();
        controller.update_settings(&SettingsPatch {
            style_intensity: Some(90),
            ..Default::default()
        });

        let item = controller.state().history[0].clone();
        controller.reuse_history_item(&item);
        let once = controller.state().clone();
        controller.reuse_history_item(&item);

        assert_eq!(controller.state(), &once);
        assert_eq!(once.prompt, "kerala mural");
        assert_eq!(once.settings.style_intensity, 10);
    }

    #[tokio::test]
    async fn test_reuse_then_generate_sends_original_settings() {
        let generator = MockGenerator::new(GenerationOutcome::Success("img".to_string()));
        let mut controller = ready("peacock spirit");
        controller.update_settings(&SettingsPatch {
            aspect_ratio: Some(AspectRatio::Landscape),
            style_intensity: Some(90),
            negative_prompt: Some("hats".to_string()),
        });
        controller.generate(&generator).await.unwrap();
        let entry = controller.state().history[0].clone();

        controller.set_prompt("something else");
        controller.update_settings(&SettingsPatch {
            aspect_ratio: Some(AspectRatio::Portrait),
            style_intensity: Some(5),
            negative_prompt: Some(String::new()),
        });

        controller.reuse_history_item(&entry);
        controller.generate(&generator).await.unwrap();

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, entry.prompt);
        assert_eq!(calls[1].2, entry.settings);

        let instruction = build_instruction(&calls[1].0, &calls[1].2);
        assert!(instruction.contains("16:9"));
        assert!(instruction.contains(StyleQualifier::Vivid.phrase()));
        assert!(instruction.contains("\"hats\""));
    }

    #[test]
    fn test_reset_during_flight_discards_result() {
        let mut controller = ready("test");
        let ticket = controller.begin_generation().unwrap();
        controller.reset();

        // A new request started after the reset owns the loading flag
        controller.upload_image(PHOTO.to_string());
        controller.set_prompt("second");
        let second = controller.begin_generation().unwrap();

        controller.complete_generation(ticket, GenerationOutcome::Success("old".to_string()));
        assert!(controller.state().is_loading);
        assert!(controller.state().history.is_empty());

        controller.complete_generation(second, GenerationOutcome::Success("new".to_string()));
        assert_eq!(controller.state().history.len(), 1);
        assert_eq!(controller.state().history[0].prompt, "second");
    }

    #[tokio::test]
    async fn test_state_survives_restart_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let generator = MockGenerator::new(GenerationOutcome::Success("abc".to_string()));

        {
            let mut controller = Controller::new(FileStore::new(dir.path()));
            controller.load_from_storage();
            controller.upload_image(PHOTO.to_string());
            controller.set_prompt("rajasthani folk");
            controller.toggle_theme();
            controller.complete_onboarding();
            controller.generate(&generator).await.unwrap();
        }

        let mut controller = Controller::new(FileStore::new(dir.path()));
        controller.load_from_storage();
        let state = controller.state();
        assert_eq!(state.prompt, "rajasthani folk");
        assert_eq!(state.uploaded_image.as_deref(), Some(PHOTO));
        assert_eq!(state.history.len(), 1);
        assert!(!state.onboarding_open);
        // Results are not persisted, only history
        assert!(state.generated_avatar.is_none());
        assert_eq!(
            controller.store().get("theme").unwrap(),
            Some("light".to_string())
        );
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_capacity(generations in 0usize..45) {
            let mut controller = ready("test");
            for _ in 0..generations {
                let ticket = controller.begin_generation().unwrap();
                controller.complete_generation(ticket, GenerationOutcome::Success("a".to_string()));
            }
            let history = &controller.state().history;
            prop_assert_eq!(history.len(), generations.min(HISTORY_CAPACITY));
            prop_assert!(history.windows(2).all(|w| w[0].id > w[1].id));
        }
    }
}
