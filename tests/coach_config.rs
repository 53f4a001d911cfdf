use std::sync::Mutex;

use tempfile::NamedTempFile;

use pose_coach::config::CoachConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "POSE_COACH_CONFIG",
        "POSE_COACH_DB_PATH",
        "POSE_COACH_USER_ID",
        "POSE_COACH_DETECTOR",
        "POSE_COACH_VOICE",
        "POSE_COACH_MUTED",
        "POSE_COACH_ANALYSIS_MS",
        "POSE_COACH_SEED",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "db_path": "studio.db",
        "user_id": "asha",
        "catalog_path": "poses.toml",
        "camera": { "url": "stub://side", "width": 1280, "height": 720 },
        "detector": { "backend": "replay", "min_visibility": 0.5 },
        "timing": { "hold_min_secs": 20, "hold_max_secs": 25, "long_rest_every": 4 },
        "voice": { "rate": 1.1 },
        "seed": 9
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("POSE_COACH_CONFIG", file.path());
    std::env::set_var("POSE_COACH_USER_ID", "bo");
    std::env::set_var("POSE_COACH_VOICE", "off");
    std::env::set_var("POSE_COACH_ANALYSIS_MS", "250");

    let cfg = CoachConfig::load().expect("load config");

    assert_eq!(cfg.db_path, "studio.db");
    assert_eq!(cfg.user_id, "bo");
    assert_eq!(cfg.catalog_path.unwrap().to_str(), Some("poses.toml"));
    assert_eq!(cfg.camera.url, "stub://side");
    assert_eq!(cfg.camera.width, 1280);
    assert_eq!(cfg.detector.backend.as_deref(), Some("replay"));
    assert_eq!(cfg.detector.min_visibility, 0.5);
    assert_eq!(cfg.detector.min_detection_confidence, 0.5);
    assert_eq!(cfg.timing.hold_min_secs, 20);
    assert_eq!(cfg.timing.hold_max_secs, 25);
    assert_eq!(cfg.timing.long_rest_every, 4);
    assert_eq!(cfg.timing.analysis_interval_ms, 250);
    assert_eq!(cfg.timing.long_rest_secs, 30);
    assert!(!cfg.voice.enabled);
    assert_eq!(cfg.voice.rate, 1.1);
    assert_eq!(cfg.seed, Some(9));

    clear_env();
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("POSE_COACH_SEED", "77");
    let cfg = CoachConfig::load().expect("load config");
    assert_eq!(cfg.db_path, "pose_coach.db");
    assert_eq!(cfg.user_id, "default_user");
    assert!(cfg.catalog_path.is_none());
    assert!(cfg.voice.enabled);
    assert_eq!(cfg.timing.analysis_interval_ms, 500);
    assert_eq!(cfg.seed, Some(77));

    clear_env();
}

#[test]
fn rejects_bad_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("POSE_COACH_VOICE", "loud");
    assert!(CoachConfig::load().is_err());
    clear_env();

    std::env::set_var("POSE_COACH_ANALYSIS_MS", "0");
    assert!(CoachConfig::load().is_err());
    clear_env();

    std::env::set_var("POSE_COACH_DETECTOR", "Not A Name");
    assert!(CoachConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"{ not json").expect("write config");
    std::env::set_var("POSE_COACH_CONFIG", file.path());
    assert!(CoachConfig::load().is_err());
    clear_env();
}

#[test]
fn rejects_oversize_camera_frames() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"camera":{"width":40000,"height":40000}}"#)
        .expect("write config");
    std::env::set_var("POSE_COACH_CONFIG", file.path());
    let err = CoachConfig::load().unwrap_err();
    assert!(err.to_string().contains("40000x40000"), "{}", err);

    clear_env();
}
