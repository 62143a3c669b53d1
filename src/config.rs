//! Process configuration from environment variables

use std::time::Duration;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_SESSION_TTL_SECS: u64 = 6 * 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Idle time after which a session is evicted; `None` keeps sessions
    /// for the life of the process
    pub session_ttl: Option<Duration>,
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            session_ttl: Some(Duration::from_secs(DEFAULT_SESSION_TTL_SECS)),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values keep their default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = lookup("ETHICS_TUTOR_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|raw| parse_or_warn::<u16>("port", &raw))
            .unwrap_or(defaults.port);

        let session_ttl = match lookup("ETHICS_TUTOR_SESSION_TTL_SECS")
            .and_then(|raw| parse_or_warn::<u64>("session TTL", &raw))
        {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.session_ttl,
        };

        let sweep_interval = lookup("ETHICS_TUTOR_SWEEP_INTERVAL_SECS")
            .and_then(|raw| parse_or_warn::<u64>("sweep interval", &raw))
            .filter(|secs| *secs > 0)
            .map_or(defaults.sweep_interval, Duration::from_secs);

        Self {
            port,
            session_ttl,
            sweep_interval,
        }
    }
}

fn parse_or_warn<T: std::str::FromStr>(what: &str, raw: &str) -> Option<T> {
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(value = %raw, "Ignoring invalid {what} setting");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), Config::default());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("ETHICS_TUTOR_PORT", "8080"),
            ("ETHICS_TUTOR_SESSION_TTL_SECS", "60"),
            ("ETHICS_TUTOR_SWEEP_INTERVAL_SECS", "10"),
        ]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.session_ttl, Some(Duration::from_secs(60)));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_port_fallback_and_zero_ttl() {
        let cfg = config(&[("PORT", "5000"), ("ETHICS_TUTOR_SESSION_TTL_SECS", "0")]);
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.session_ttl, None);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let cfg = config(&[
            ("ETHICS_TUTOR_PORT", "eighty"),
            ("ETHICS_TUTOR_SESSION_TTL_SECS", "-5"),
            ("ETHICS_TUTOR_SWEEP_INTERVAL_SECS", "0"),
        ]);
        assert_eq!(cfg, Config::default());
    }
}
