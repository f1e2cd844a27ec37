use crate::error::ConfigError;

pub const DEFAULT_SID: &str = "S1";
pub const DEFAULT_OUTBOUND_QUEUE_CAP: usize = 256;

const SID_VAR: &str = "REMOTE_VIEW_SID";
const QUEUE_CAP_VAR: &str = "REMOTE_VIEW_OUTBOUND_QUEUE_CAP";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub sid: String,
    pub outbound_queue_cap: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            sid: DEFAULT_SID.to_string(),
            outbound_queue_cap: DEFAULT_OUTBOUND_QUEUE_CAP,
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from `lookup`; bad values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let sid = lookup(SID_VAR)
            .filter(|sid| !sid.is_empty())
            .unwrap_or_else(|| DEFAULT_SID.to_string());

        let outbound_queue_cap = match lookup(QUEUE_CAP_VAR) {
            Some(raw) => parse_queue_capacity(&raw).unwrap_or_else(|err| {
                log::warn!("{err}; using {DEFAULT_OUTBOUND_QUEUE_CAP}");
                DEFAULT_OUTBOUND_QUEUE_CAP
            }),
            None => DEFAULT_OUTBOUND_QUEUE_CAP,
        };

        Self {
            sid,
            outbound_queue_cap,
        }
    }
}

pub fn parse_queue_capacity(raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            name: QUEUE_CAP_VAR,
            value: raw.to_string(),
        })
}
