use crate::core::error::Result;
use serde::{Deserialize, Serialize};

/// Tunables for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on steps taken by `run_until_idle`; `None` runs until the
    /// graph is quiescent, however long that takes.
    pub max_steps: Option<u64>,
    /// Idle instances kept per prototype; further released instances are dropped.
    pub pool_capacity: Option<usize>,
    /// Log every firing at `trace` level.
    pub trace_firing: bool,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = Some(capacity);
        self
    }

    pub fn trace_firing(mut self, enabled: bool) -> Self {
        self.trace_firing = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config = EngineConfig::from_json(r#"{ "max_steps": 50 }"#).unwrap();
        assert_eq!(config, EngineConfig::new().max_steps(50));
        assert!(EngineConfig::from_json(r#"{ "max_steps": "x" }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "pool_capacity": -1 }"#).is_err());
        assert!(EngineConfig::from_json("3").is_err());
    }
}
