use super::*;

#[test]
fn defaults_match_backend_conventions() {
    let opts = RendererOpts::default();
    assert_eq!(opts.base_url, "http://localhost:8000/");
    assert_eq!(opts.poll_interval(), Duration::from_secs(10));
    assert_eq!(opts.max_poll_attempts, 6);
    assert_eq!(opts.login_timeout(), Duration::from_secs(60));
    opts.validate().unwrap();
}

#[test]
fn partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("renderer.json");
    std::fs::write(&path, r#"{ "max_poll_attempts": 3, "poll_interval_ms": 500 }"#).unwrap();

    let opts = RendererOpts::from_path(&path).unwrap();
    assert_eq!(opts.max_poll_attempts, 3);
    assert_eq!(opts.poll_interval(), Duration::from_millis(500));
    assert_eq!(opts.base_url, DEFAULT_BASE_URL);
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("renderer.json");
    std::fs::write(&path, r#"{ "max_poll_attempts": 0 }"#).unwrap();
    assert!(matches!(
        RendererOpts::from_path(&path),
        Err(ArkError::Validation(_))
    ));

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(
        RendererOpts::from_path(&path),
        Err(ArkError::Serde(_))
    ));
}

#[test]
fn base_url_gets_trailing_slash() {
    let opts = RendererOpts::default().with_base_url("http://127.0.0.1:9000");
    assert_eq!(opts.base_url, "http://127.0.0.1:9000/");
}
