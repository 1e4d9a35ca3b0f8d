use std::{env, fs, time::Duration};

use quorum_auth::config::RevocationBackend;
use quorum_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("quorum.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
body_limit_bytes = 2048

[logging]
level = "debug"

[auth]
secret = "file-secret-that-is-at-least-32-bytes"
algorithm = "HS512"
access_token_lifetime = "15m"
refresh_token_lifetime = "1d"

[revocation]
backend = "redis"
redis_url = "redis://127.0.0.1:6379"

[bootstrap.admin_user]
username = "admin"
password = "change-me"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.server.body_limit_bytes, 2048);
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.auth.algorithm, "HS512");
    assert_eq!(cfg.auth.access_token_lifetime, Duration::from_secs(15 * 60));
    assert_eq!(cfg.auth.refresh_token_lifetime, Duration::from_secs(24 * 3600));
    assert_eq!(cfg.auth.issuer, "quorum");
    assert_eq!(cfg.revocation.backend, RevocationBackend::Redis);
    assert_eq!(
        cfg.bootstrap.admin_user.as_ref().map(|a| a.username.as_str()),
        Some("admin")
    );

    // 2) Env override should win over file
    unsafe {
        env::set_var("QUORUM__SERVER__PORT", "9090");
        env::set_var("QUORUM__AUTH__ACCESS_TOKEN_LIFETIME", "5m");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.server.port, 9090);
    assert_eq!(cfg_env.auth.access_token_lifetime, Duration::from_secs(300));
    unsafe {
        env::remove_var("QUORUM__SERVER__PORT");
        env::remove_var("QUORUM__AUTH__ACCESS_TOKEN_LIFETIME");
    }

    // 3) Short secret is rejected
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[auth]
secret = "too-short"
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("auth.secret"));

    // 4) Redis backend without a URL is rejected
    let no_url_path = dir.path().join("no_url.toml");
    let no_url_toml = r#"
[auth]
secret = "file-secret-that-is-at-least-32-bytes"

[revocation]
backend = "redis"
"#;
    fs::write(&no_url_path, no_url_toml).expect("write toml");
    let err = load_config(no_url_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("redis_url"));
}
