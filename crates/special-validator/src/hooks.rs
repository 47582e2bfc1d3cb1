//! Staking hook adapter
//!
//! Keeps special validator records in step with staking's own lifecycle and
//! overrides the ordinary eviction of special validators. Every callback is a
//! no-op for validators this module does not manage.

use crate::error::{Result, SpecialValidatorError};
use crate::staking::{StakingHooks, StakingKeeper};
use crate::store::SpecialValidatorStore;
use crate::types::{AccAddress, ConsAddress, ValAddress};

#[derive(Debug, Clone)]
pub struct Hooks {
    store: SpecialValidatorStore,
}

impl Hooks {
    pub fn new(store: SpecialValidatorStore) -> Self {
        Self { store }
    }
}

impl StakingHooks for Hooks {
    /// Staking's election (re-)admitted the validator: adopt staking's power
    fn after_validator_bonded(
        &self,
        staking: &mut dyn StakingKeeper,
        _cons: &ConsAddress,
        val: &ValAddress,
    ) -> Result<()> {
        let Some(mut record) = self.store.get(val)? else {
            return Ok(());
        };

        record.power = staking.last_validator_power(val);
        self.store.set(&record)?;

        tracing::debug!(validator = %val, power = record.power, "special validator bonded");
        Ok(())
    }

    /// Staking is evicting the validator: special validators stay bonded
    /// unless jailed
    fn after_validator_removed(
        &self,
        staking: &mut dyn StakingKeeper,
        _cons: &ConsAddress,
        val: &ValAddress,
    ) -> Result<()> {
        if !self.store.contains(val)? {
            return Ok(());
        }

        let validator = staking
            .validator(val)
            .ok_or(SpecialValidatorError::ValidatorMissing(*val))?;

        if validator.is_jailed() {
            tracing::info!(validator = %val, "jailed special validator leaves bonded set");
            return Ok(());
        }

        staking.readmit_validator(&validator)?;
        tracing::info!(validator = %val, "special validator eviction overridden");
        Ok(())
    }

    /// Stake changed: refresh power for validators that are currently contributing
    fn after_delegation_modified(
        &self,
        staking: &mut dyn StakingKeeper,
        _del: &AccAddress,
        val: &ValAddress,
    ) -> Result<()> {
        let Some(mut record) = self.store.get(val)? else {
            return Ok(());
        };
        if record.power == 0 {
            return Ok(());
        }

        let power = staking.last_validator_power(val);
        if power > 0 && power != record.power {
            record.power = power;
            self.store.set(&record)?;
            tracing::debug!(validator = %val, power, "special validator power refreshed");
        }
        Ok(())
    }
}
