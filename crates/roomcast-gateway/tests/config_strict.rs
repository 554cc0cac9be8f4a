#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use roomcast_gateway::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
gateway:
  listen: "0.0.0.0:3500"
auth:
  secret: "testsecret"
  token_ttl: 24 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
auth:
  secret: "testsecret"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:3500");
    assert_eq!(cfg.history.replay_limit, 50);
    assert_eq!(cfg.limits.max_frame_bytes, 16384);
}

#[test]
fn empty_secret_fails_validation() {
    let bad = r#"
version: 1
auth:
  secret: "  "
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn idle_timeout_must_exceed_ping_interval() {
    let bad = r#"
version: 1
gateway:
  ping_interval_ms: 20000
  idle_timeout_ms: 15000
auth:
  secret: "testsecret"
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn replay_limit_range_is_enforced() {
    let bad = r#"
version: 1
auth:
  secret: "testsecret"
history:
  replay_limit: 0
"#;
    assert!(config::load_from_str(bad).is_err());
}
