use anyhow::Context;
use sim::SimConfig;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_FRAME_MILLIS: u64 = 16;

/// Host settings read from the environment.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub addr: SocketAddr,
    pub frame_period: Duration,
    pub sim: SimConfig,
}

impl ViewerConfig {
    /// Read `VIEWER_ADDR`, `SIM_SEED` and `SIM_FRAME_MILLIS`, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let addr: SocketAddr = lookup("VIEWER_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse()
            .context("VIEWER_ADDR is not a socket address")?;

        let frame_millis = match lookup("SIM_FRAME_MILLIS") {
            Some(value) => value
                .parse::<u64>()
                .context("SIM_FRAME_MILLIS is not an integer")?,
            None => DEFAULT_FRAME_MILLIS,
        };

        let rng_seed = lookup("SIM_SEED")
            .map(|value| value.parse::<u64>())
            .transpose()
            .context("SIM_SEED is not an integer")?;

        Ok(Self {
            addr,
            frame_period: Duration::from_millis(frame_millis.max(1)),
            sim: SimConfig {
                rng_seed,
                ..Default::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.frame_period, Duration::from_millis(16));
        assert_eq!(config.sim.rng_seed, None);
    }

    #[test]
    fn test_overrides() {
        let config = ViewerConfig::from_lookup(lookup(&[
            ("VIEWER_ADDR", "127.0.0.1:9000"),
            ("SIM_SEED", "77"),
            ("SIM_FRAME_MILLIS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.sim.rng_seed, Some(77));
        assert_eq!(config.frame_period, Duration::from_millis(1));
    }

    #[test]
    fn test_bad_seed_is_an_error() {
        let err = ViewerConfig::from_lookup(lookup(&[("SIM_SEED", "abc")])).unwrap_err();
        assert!(err.to_string().contains("SIM_SEED"));
    }
}
