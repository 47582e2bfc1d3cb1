//! Module configuration

use crate::error::{Result, SpecialValidatorError};
use crate::staking::CommissionRates;
use crate::types::Amount;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Special validator module configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialValidatorConfig {
    /// Blocks between automatic commission sweeps (0 = only on demand)
    pub commission_sweep_interval: u64,

    /// Reject user delegate / redelegate / undelegate messages targeting special validators
    pub reject_user_delegations: bool,

    /// Minimum self delegation set on validators created by governance
    pub min_self_delegation: Amount,

    /// Commission set on validators created by governance
    pub commission: CommissionRates,

    /// Maximum proposal title length
    pub max_title_length: usize,

    /// Maximum proposal description length
    pub max_description_length: usize,
}

impl Default for SpecialValidatorConfig {
    fn default() -> Self {
        Self {
            commission_sweep_interval: 0,
            reject_user_delegations: true,
            min_self_delegation: 1,
            commission: CommissionRates::default(),
            max_title_length: 140,
            max_description_length: 10_000,
        }
    }
}

impl SpecialValidatorConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(s)
            .map_err(|e| SpecialValidatorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            SpecialValidatorError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&s)
    }

    pub fn validate(&self) -> Result<()> {
        self.commission
            .validate()
            .map_err(|e| SpecialValidatorError::InvalidConfig(e.to_string()))?;

        if self.min_self_delegation == 0 {
            return Err(SpecialValidatorError::InvalidConfig(
                "min_self_delegation must be positive".into(),
            ));
        }
        if self.max_title_length == 0 || self.max_description_length == 0 {
            return Err(SpecialValidatorError::InvalidConfig(
                "proposal length limits must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Whether the commission sweep is due at `height`
    pub fn sweep_due(&self, height: u64) -> bool {
        self.commission_sweep_interval > 0 && height % self.commission_sweep_interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SpecialValidatorConfig::default();
        assert_eq!(config.commission_sweep_interval, 0);
        assert!(config.reject_user_delegations);
        assert_eq!(config.commission.rate_bps, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = SpecialValidatorConfig::from_yaml_str(
            "commission_sweep_interval: 100\nreject_user_delegations: false\n",
        )
        .unwrap();

        assert_eq!(config.commission_sweep_interval, 100);
        assert!(!config.reject_user_delegations);
        assert_eq!(config.max_title_length, 140);
    }

    #[test]
    fn test_yaml_rejects_bad_commission() {
        let result = SpecialValidatorConfig::from_yaml_str(
            "commission:\n  rate_bps: 600\n  max_rate_bps: 500\n  max_change_rate_bps: 0\n",
        );
        assert!(matches!(result, Err(SpecialValidatorError::InvalidConfig(_))));
    }

    #[test]
    fn test_sweep_due() {
        let mut config = SpecialValidatorConfig::default();
        assert!(!config.sweep_due(10));

        config.commission_sweep_interval = 5;
        assert!(config.sweep_due(10));
        assert!(!config.sweep_due(11));
    }
}
