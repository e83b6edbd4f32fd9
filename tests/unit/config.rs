use super::*;

#[test]
fn defaults_are_valid() {
    let cfg = EditorConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.face_expansion, 2.0);
    assert_eq!(cfg.encoder.crf, 18);
    assert_eq!(cfg.audio.sample_rate, 48_000);
}

#[test]
fn partial_json_fills_defaults() {
    let cfg = EditorConfig::from_json_str(r#"{"face_expansion": 1.5, "encoder": {"crf": 23}}"#)
        .unwrap();
    assert_eq!(cfg.face_expansion, 1.5);
    assert_eq!(cfg.encoder.crf, 23);
    assert_eq!(cfg.encoder.preset, "fast");
    assert_eq!(cfg.audio, AudioConfig::default());
}

#[test]
fn out_of_range_values_are_rejected() {
    assert!(EditorConfig::from_json_str(r#"{"face_expansion": 0.5}"#).is_err());
    assert!(EditorConfig::from_json_str(r#"{"blur_inset_fraction": 0.7}"#).is_err());
    assert!(EditorConfig::from_json_str(r#"{"encoder": {"crf": 60}}"#).is_err());
    assert!(EditorConfig::from_json_str(r#"{"encoder": {"preset": "warp"}}"#).is_err());
    assert!(EditorConfig::from_json_str(r#"{"audio": {"channels": 0}}"#).is_err());
}

#[test]
fn malformed_json_is_a_validation_error() {
    let err = EditorConfig::from_json_str("{").unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
}

#[test]
fn loads_from_file() {
    let dir = std::env::temp_dir().join(format!("semantic-image-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("cfg.json");
    std::fs::write(&path, r#"{"output_dir": "/tmp/out"}"#).unwrap();
    let cfg = EditorConfig::from_json_path(&path).unwrap();
    assert_eq!(cfg.output_dir(), std::path::PathBuf::from("/tmp/out"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_file_is_an_error() {
    assert!(EditorConfig::from_json_path(std::path::Path::new("/nonexistent/cfg.json")).is_err());
}
