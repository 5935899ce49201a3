use shadertext::prelude::*;
use shadertext::settings::{SettingsFormat, SettingsStore};

#[test]
fn exported_settings_import_unchanged() {
    let mut settings = Settings {
        text: "glass\nmelt".to_string(),
        active_shader: PatternId::ChargedCells,
        blur_type: BlurKind::Zoom,
        blur_strength: 12.0,
        noise_type: NoiseKind::Static,
        noise_strength: 0.3,
        is_frozen: true,
        manual_time: 4.25,
        ..Default::default()
    };
    settings.glass.sides = 6.0;
    settings.balatro.color2 = [0.1, 0.2, 0.3];

    let store = SettingsStore::new(settings.clone());
    let exported = store.export().unwrap();

    let mut other = SettingsStore::default();
    other.import(&exported, SettingsFormat::Json).unwrap();

    assert_eq!(other.current(), &settings);
}

#[test]
fn unknown_pattern_leaves_previous_settings() {
    let mut store = SettingsStore::default();
    store.current_mut().active_shader = PatternId::Flow;
    let before = store.current().clone();

    let mut document: serde_json::Value =
        serde_json::from_str(&store.export().unwrap()).unwrap();
    document["activeShader"] = "not-a-real-pattern".into();

    let err = store
        .import(&document.to_string(), SettingsFormat::Json)
        .unwrap_err();

    assert!(matches!(err, SettingsError::MalformedSettingsImport(_)));
    assert_eq!(store.current(), &before);
}

#[test]
fn non_positive_font_size_is_rejected() {
    let mut store = SettingsStore::default();
    let mut document: serde_json::Value =
        serde_json::from_str(&store.export().unwrap()).unwrap();
    document["fontSize"] = 0.into();

    let err = store
        .import(&document.to_string(), SettingsFormat::Json)
        .unwrap_err();

    assert!(matches!(err, SettingsError::MalformedSettingsImport(_)));
    assert_eq!(store.current(), &Settings::default());
}

#[test]
fn oversized_font_size_is_rejected() {
    let mut store = SettingsStore::default();
    let mut document: serde_json::Value =
        serde_json::from_str(&store.export().unwrap()).unwrap();
    document["fontSize"] = 1.0e7.into();

    let err = store
        .import(&document.to_string(), SettingsFormat::Json)
        .unwrap_err();

    assert!(matches!(err, SettingsError::MalformedSettingsImport(_)));
    assert_eq!(store.current(), &Settings::default());
}
