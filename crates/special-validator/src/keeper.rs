//! Module keeper: owns the record store handle and the staking / distribution facades
//!
//! Behaviour is split across modules by concern, each adding an `impl` block:
//!
//! - [`crate::admission`]: governance register / unregister
//! - [`crate::reconcile`]: per-block validator-set updates
//! - [`crate::commission`]: commission sweep into the community pool
//! - [`crate::genesis`], [`crate::query`], [`crate::ante`]

use crate::config::SpecialValidatorConfig;
use crate::distribution::DistributionKeeper;
use crate::error::Result;
use crate::hooks::Hooks;
use crate::staking::StakingKeeper;
use crate::store::SpecialValidatorStore;
use crate::types::{SpecialValidator, ValAddress, ValidatorUpdate};

pub struct Keeper<S, D> {
    pub(crate) store: SpecialValidatorStore,
    pub(crate) staking: S,
    pub(crate) distribution: D,
    pub(crate) config: SpecialValidatorConfig,
}

impl<S, D> Keeper<S, D> {
    pub fn new(
        store: SpecialValidatorStore,
        staking: S,
        distribution: D,
        config: SpecialValidatorConfig,
    ) -> Self {
        Self {
            store,
            staking,
            distribution,
            config,
        }
    }

    pub fn store(&self) -> &SpecialValidatorStore {
        &self.store
    }

    pub fn staking(&self) -> &S {
        &self.staking
    }

    pub fn staking_mut(&mut self) -> &mut S {
        &mut self.staking
    }

    pub fn distribution(&self) -> &D {
        &self.distribution
    }

    pub fn distribution_mut(&mut self) -> &mut D {
        &mut self.distribution
    }

    pub fn config(&self) -> &SpecialValidatorConfig {
        &self.config
    }

    /// Staking hook adapter sharing this keeper's store, to be registered with staking
    pub fn hooks(&self) -> Hooks {
        Hooks::new(self.store.clone())
    }

    pub fn get_special_validator(&self, addr: &ValAddress) -> Result<Option<SpecialValidator>> {
        Ok(self.store.get(addr)?)
    }

    pub fn set_special_validator(&self, validator: &SpecialValidator) -> Result<()> {
        Ok(self.store.set(validator)?)
    }

    pub fn delete_special_validator(&self, addr: &ValAddress) -> Result<()> {
        Ok(self.store.delete(addr)?)
    }
}

impl<S: StakingKeeper, D: DistributionKeeper> Keeper<S, D> {
    /// Block finalization entry point
    ///
    /// Runs the reconciliation pass and, when configured for this height,
    /// the commission sweep. Errors abort the block.
    pub fn end_block(&mut self, height: u64) -> Result<Vec<ValidatorUpdate>> {
        let updates = self.special_validator_updates()?;

        if self.config.sweep_due(height) {
            let report = self.sweep_commission()?;
            tracing::debug!(
                height,
                swept = report.swept.len(),
                skipped = report.skipped.len(),
                "commission sweep finished"
            );
        }

        Ok(updates)
    }
}
