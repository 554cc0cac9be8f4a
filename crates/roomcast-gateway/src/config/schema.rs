use roomcast_core::error::{RelayError, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    pub auth: AuthSection,

    #[serde(default)]
    pub history: HistorySection,

    #[serde(default)]
    pub limits: LimitsSection,
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RelayError::BadRequest("version must be 1".into()));
        }

        self.gateway.validate()?;
        self.auth.validate()?;
        self.history.validate()?;
        self.limits.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(RelayError::BadRequest(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(RelayError::BadRequest(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(RelayError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:3500".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    /// Shared HS256 signing secret.
    pub secret: String,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl AuthSection {
    pub fn validate(&self) -> Result<()> {
        if self.secret.trim().is_empty() {
            return Err(RelayError::BadRequest("auth.secret must not be empty".into()));
        }
        if !(1..=168).contains(&self.token_ttl_hours) {
            return Err(RelayError::BadRequest(
                "auth.token_ttl_hours must be between 1 and 168".into(),
            ));
        }
        Ok(())
    }
}

fn default_token_ttl_hours() -> i64 {
    24
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistorySection {
    /// Entries replayed to a joining connection (and served per history fetch).
    #[serde(default = "default_replay_limit")]
    pub replay_limit: usize,

    /// Per-room retention cap for the in-memory log.
    #[serde(default = "default_max_room_entries")]
    pub max_room_entries: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            replay_limit: default_replay_limit(),
            max_room_entries: default_max_room_entries(),
        }
    }
}

impl HistorySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=500).contains(&self.replay_limit) {
            return Err(RelayError::BadRequest(
                "history.replay_limit must be between 1 and 500".into(),
            ));
        }
        if self.max_room_entries < self.replay_limit {
            return Err(RelayError::BadRequest(
                "history.max_room_entries must be >= replay_limit".into(),
            ));
        }
        Ok(())
    }
}

fn default_replay_limit() -> usize {
    50
}
fn default_max_room_entries() -> usize {
    1000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl LimitsSection {
    pub fn validate(&self) -> Result<()> {
        if !(1024..=1_048_576).contains(&self.max_frame_bytes) {
            return Err(RelayError::BadRequest(
                "limits.max_frame_bytes must be between 1024 and 1048576".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_frame_bytes() -> usize {
    16384
}
