/// Runtime settings, read from `DAYPLANNER_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub max_connections: usize,
    /// Frames buffered per client before it counts as too slow.
    pub outbound_queue: usize,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 7878,
            max_connections: 1024,
            outbound_queue: 64,
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind: lookup("DAYPLANNER_BIND").unwrap_or(defaults.bind),
            port: lookup("DAYPLANNER_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            max_connections: lookup("DAYPLANNER_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_connections),
            outbound_queue: lookup("DAYPLANNER_OUTBOUND_QUEUE")
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.outbound_queue),
            metrics_port: lookup("DAYPLANNER_METRICS_PORT").and_then(|s| s.parse().ok()),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.addr(), "0.0.0.0:7878");
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DAYPLANNER_BIND", "127.0.0.1"),
            ("DAYPLANNER_PORT", "9000"),
            ("DAYPLANNER_MAX_CONNECTIONS", "10"),
            ("DAYPLANNER_OUTBOUND_QUEUE", "8"),
            ("DAYPLANNER_METRICS_PORT", "9100"),
        ]));
        assert_eq!(config.addr(), "127.0.0.1:9000");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.outbound_queue, 8);
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn garbage_falls_back() {
        let config = Config::from_lookup(lookup(&[
            ("DAYPLANNER_PORT", "not-a-port"),
            ("DAYPLANNER_MAX_CONNECTIONS", "0"),
            ("DAYPLANNER_METRICS_PORT", "99999"),
        ]));
        assert_eq!(config.port, 7878);
        assert_eq!(config.max_connections, 1024);
        assert_eq!(config.metrics_port, None);
    }
}
