use serde::Serialize;

use crate::profiles::ConnectionProfile;

/// Fallback SSH port when the profile's port field is empty or unparsable.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Sanitized transport config derived from a profile.
///
/// Ephemeral: recomputed on every use from the current profile or draft,
/// never persisted. Serializes camelCase for the backend call. Absent
/// credentials are `None`, not empty strings; the transport distinguishes
/// "no credential supplied" from "empty credential".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
}

impl ConnectionConfig {
    /// Pure, total sanitizer: trims every string field, parses the port
    /// lazily (empty/unparsable/zero falls back to 22), maps empty
    /// credentials to `None`. No error conditions for any profile shape.
    pub fn from_profile(profile: &ConnectionProfile) -> Self {
        Self {
            host: profile.host.trim().to_string(),
            port: parse_port(&profile.port),
            username: profile.username.trim().to_string(),
            password: non_empty(profile.password.as_deref()),
            private_key: non_empty(profile.private_key.as_deref()),
            passphrase: non_empty(profile.passphrase.as_deref()),
        }
    }
}

fn parse_port(raw: &str) -> u16 {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => DEFAULT_SSH_PORT,
        Ok(port) => port,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    let trimmed = value.unwrap_or("").trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
