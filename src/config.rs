use crate::Error;
use crate::Result;
use serde::Deserialize;
use serde::Serialize;

/// Immutable hyperparameters of a [`crate::Sinkhorn`] normalizer.
///
/// Missing fields in serialized form fall back to the crate constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkhornConfig {
    /// alternating normalization passes
    pub max_iter: usize,
    /// temperature; scores are divided by it
    pub tau: f64,
    /// kept for interface parity, unused by the log-domain path
    pub epsilon: f64,
    /// must stay true; false asks for the retired direct-space mode
    pub log_forward: bool,
    /// reduce over the whole tensor at once instead of per element
    pub batched: bool,
}

impl Default for SinkhornConfig {
    fn default() -> Self {
        Self {
            max_iter: crate::SINKHORN_ITERATIONS,
            tau: crate::SINKHORN_TEMPERATURE,
            epsilon: crate::SINKHORN_EPSILON,
            log_forward: true,
            batched: false,
        }
    }
}

impl SinkhornConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(Error::Precondition("max_iter must be positive".into()));
        }
        if !(self.tau.is_finite() && self.tau > 0.) {
            return Err(Error::Precondition(format!(
                "tau must be positive and finite, got {}",
                self.tau
            )));
        }
        if !(self.epsilon > 0.) {
            return Err(Error::Precondition(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
    /// Parses and validates a JSON config.
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let config = serde_json::from_str::<Self>(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = SinkhornConfig::default();
        assert_eq!(config.max_iter, 10);
        assert_eq!(config.tau, 1.);
        assert_eq!(config.epsilon, 1e-4);
        assert!(config.log_forward);
        assert!(!config.batched);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SinkhornConfig::from_json(r#"{ "max_iter": 200, "tau": 0.05 }"#).unwrap();
        assert_eq!(config.max_iter, 200);
        assert_eq!(config.tau, 0.05);
        assert_eq!(config.epsilon, crate::SINKHORN_EPSILON);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SinkhornConfig::from_json(r#"{ "max_iter": 0 }"#).is_err());
        assert!(SinkhornConfig::from_json(r#"{ "tau": -1.0 }"#).is_err());
        assert!(SinkhornConfig::from_json(r#"{ "epsilon": 0.0 }"#).is_err());
    }
}
