use std::sync::Arc;

use super::common::*;

use crate::matching::domain::{DeliveryStatus, LanguageCode, NotificationChannel, WorkerId};
use crate::matching::notify::{
    LocalizationError, Localizer, NotificationDispatcher, NotificationFields, TemplateCache,
    TemplateCatalog, JOB_MATCH_TEMPLATE,
};
use crate::matching::scoring::CompatibilityScorer;
use crate::matching::store::{InMemoryNotificationStore, NotificationStore};

fn fields() -> NotificationFields {
    NotificationFields {
        worker_name: "Sita".to_string(),
        job_title: "House painting".to_string(),
        village: "Malihabad".to_string(),
        district: "Lucknow".to_string(),
        wage: 450,
        contact: "9000000001".to_string(),
        score: 95,
    }
}

#[test]
fn every_builtin_language_renders_all_fields() {
    let localizer = localizer(32);
    for language in localizer.catalog().languages(JOB_MATCH_TEMPLATE) {
        let rendered = localizer
            .render(JOB_MATCH_TEMPLATE, &language, &fields())
            .expect("template renders");
        assert_eq!(rendered.language, language);
        for expected in ["Sita", "House painting", "Malihabad", "Lucknow", "450", "9000000001"] {
            assert!(rendered.text.contains(expected), "{language}: {}", rendered.text);
        }
        assert!(rendered.text.contains("95%"), "{language}: {}", rendered.text);
    }
}

#[test]
fn languages_without_templates_fall_back_to_hindi() {
    let localizer = localizer(8);
    for code in ["or", "as", "ur", "fr", ""] {
        let rendered = localizer
            .render(JOB_MATCH_TEMPLATE, &LanguageCode::new(code), &fields())
            .expect("fallback renders");
        assert_eq!(rendered.language.as_str(), "hi");
        assert!(rendered.text.starts_with("Namaskar Sita!"));
    }
}

#[test]
fn compiled_templates_are_cached_per_language() {
    let localizer = localizer(8);
    let hindi = LanguageCode::new("hi");
    let tamil = LanguageCode::new("ta");

    for _ in 0..3 {
        localizer
            .render(JOB_MATCH_TEMPLATE, &hindi, &fields())
            .expect("renders");
    }
    localizer
        .render(JOB_MATCH_TEMPLATE, &tamil, &fields())
        .expect("renders");

    let stats = localizer.cache().stats();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 2);
}

#[test]
fn template_cache_respects_its_capacity() {
    let localizer = localizer(2);
    for code in ["hi", "en", "ta", "te", "bn"] {
        localizer
            .render(JOB_MATCH_TEMPLATE, &LanguageCode::new(code), &fields())
            .expect("renders");
    }
    assert_eq!(localizer.cache().len(), 2);
}

#[test]
fn unknown_template_key_is_reported() {
    let localizer = localizer(4);
    let error = localizer
        .render("job_closed", &LanguageCode::default(), &fields())
        .expect_err("no such template");
    assert_eq!(error, LocalizationError::UnknownTemplate("job_closed".to_string()));
    assert!(localizer.cache().is_empty());
}

#[test]
fn custom_catalog_from_json_is_used() {
    let raw = r#"{
        "fallback_language": "en",
        "templates": {
            "job_match": {
                "en": "{worker_name}: {job_title} at {wage}/day ({score}%)",
                "hi": "{worker_name}: {job_title} {wage}/din ({score}%)"
            }
        }
    }"#;
    let catalog = TemplateCatalog::from_json(raw).expect("valid catalog");
    let localizer = Localizer::new(catalog, Arc::new(TemplateCache::new(4)));

    let rendered = localizer
        .render(JOB_MATCH_TEMPLATE, &LanguageCode::new("ta"), &fields())
        .expect("fallback renders");

    assert_eq!(rendered.language.as_str(), "en");
    assert_eq!(rendered.text, "Sita: House painting at 450/day (95%)");
}

#[test]
fn dispatcher_persists_one_mock_sms_per_call() {
    let store = Arc::new(InMemoryNotificationStore::default());
    let dispatcher = NotificationDispatcher::new(store.clone(), localizer(4));
    let job = agra_mason_job();
    let worker = speaking(worker("w-raj", "Agra", "UP", "Mason", 520), "en");
    let score = CompatibilityScorer::default().score(&job, &worker);

    let first = dispatcher.dispatch(&worker, &job, &score).expect("dispatched");
    dispatcher.dispatch(&worker, &job, &score).expect("dispatched");

    assert_eq!(first.channel, NotificationChannel::Sms);
    assert_eq!(first.status, DeliveryStatus::MockSent);
    assert_eq!(first.phone_number, worker.phone_number);
    assert!(first.message.contains("Match score: 95%"));

    let stored = store
        .for_worker(&WorkerId::from("w-raj"))
        .expect("store readable");
    assert_eq!(stored.len(), 2);
    assert!(stored[0].sent_at >= stored[1].sent_at);
}

#[test]
fn dispatcher_surfaces_store_failures() {
    let dispatcher =
        NotificationDispatcher::new(Arc::new(UnavailableNotificationStore), localizer(4));
    let job = agra_mason_job();
    let worker = worker("w-raj", "Agra", "UP", "Mason", 500);
    let score = CompatibilityScorer::default().score(&job, &worker);

    let error = dispatcher
        .dispatch(&worker, &job, &score)
        .expect_err("store offline");
    assert!(error.to_string().contains("sms log offline"));
}
