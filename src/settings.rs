//! Persisted settings and the small string utilities the SMS command
//! handler shares with them (C·settings).
//!
//! Grounded on `util.c`'s `hash` and duration-formatting helpers in the
//! source firmware: a DJB2 string hash (used to turn an IMEI into a short
//! device id for MQTT topic paths) and an `NhNmNs`-style duration codec
//! (used for reporting intervals), reproduced here with the same algorithm
//! and string grammar but without the firmware's fixed-width C buffers.

use std::time::Duration;

/// DJB2 hash (`hash = 5381; hash = hash * 33 + c`), applied byte-by-byte.
/// Deterministic and stable across runs/platforms, which is what lets the
/// device id derived from an IMEI stay constant across restarts without
/// persisting it separately.
pub fn hash_djb2(input: &str) -> u32 {
    let mut hash: u32 = 5381;
    for byte in input.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u32);
    }
    hash
}

/// Formats a duration as `NhNmNs`, omitting any component that is zero, and
/// dropping the whole string down to `"0s"` when all three are zero. Mirrors
/// the firmware's reporting-interval text format used in SMS replies.
pub fn seconds_to_hms(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 || out.is_empty() {
        out.push_str(&format!("{seconds}s"));
    }
    out
}

/// Parses an `NhNmNs` duration string back to seconds. Each component is
/// optional but must be followed by its unit letter (a bare number with no
/// trailing unit is rejected, matching the firmware parser, which only
/// recognizes a value once it sees `h`, `m` or `s`).
pub fn hms_to_seconds(input: &str) -> Option<u32> {
    let mut total: u32 = 0;
    let mut digits = String::new();
    let mut saw_any = false;

    for c in input.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'h' | 'm' | 's' => {
                if digits.is_empty() {
                    return None;
                }
                let value: u32 = digits.parse().ok()?;
                digits.clear();
                total += match c {
                    'h' => value.checked_mul(3600)?,
                    'm' => value.checked_mul(60)?,
                    _ => value,
                };
                saw_any = true;
            }
            _ => return None,
        }
    }

    if !digits.is_empty() || !saw_any {
        return None;
    }
    Some(total)
}

/// Settings persisted across restarts. The field set matches what the SMS
/// command handler (C8) exposes for remote reconfiguration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    #[serde(with = "duration_secs")]
    pub reporting_interval: Duration,
    pub apn_name: String,
    pub apn_username: String,
    pub apn_password: String,
    pub broker_host: String,
    pub broker_port: u16,
    pub admin_phone_number: Option<String>,
}

/// `serde_json` has no native `Duration` support; stored as whole seconds.
mod duration_secs {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            reporting_interval: Duration::from_secs(60),
            apn_name: String::new(),
            apn_username: String::new(),
            apn_password: String::new(),
            broker_host: String::new(),
            broker_port: 1883,
            admin_phone_number: None,
        }
    }
}

/// Collaborator boundary for settings persistence (flash on the source
/// hardware; a file or in-memory store here). Kept as a trait so the
/// orchestrator never depends on a concrete storage backend.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> crate::error::Result<Settings>;
    fn save(&self, settings: &Settings) -> crate::error::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn djb2_matches_known_vector() {
        // hash("a") = 5381*33 + 'a' (97) = 177673
        assert_eq!(hash_djb2("a"), 177_673);
    }

    #[test]
    fn hms_roundtrip() {
        assert_eq!(seconds_to_hms(3_725), "1h2m5s");
        assert_eq!(hms_to_seconds("1h2m5s"), Some(3_725));
    }

    #[test]
    fn hms_omits_zero_components() {
        assert_eq!(seconds_to_hms(3_600), "1h");
        assert_eq!(seconds_to_hms(0), "0s");
        assert_eq!(hms_to_seconds("1h"), Some(3_600));
    }

    #[test]
    fn hms_rejects_bare_number() {
        assert_eq!(hms_to_seconds("42"), None);
        assert_eq!(hms_to_seconds(""), None);
    }
}
