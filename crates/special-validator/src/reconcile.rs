//! Per-block reconciliation of special validator power
//!
//! Staking's own election reports power for every validator in its bonded
//! set. Special validators outside that set are invisible to it, so each
//! block this pass compares their stake-derived power with the power last
//! reported for them and emits the difference.
//!
//! ## Branches (per record, store order)
//!
//! ```text
//! live power > 0          -> staking reports it, skip
//! is_deleting             -> unbond, emit 0, delete record
//! jailed, stored != 0     -> unbond, emit 0, stored := 0
//! jailed, stored == 0     -> nothing
//! tokens / reduction != stored
//!                         -> bond if stored == 0, emit new, stored := new
//! ```
//!
//! Staking calls fire hooks that write the same record, so the record is
//! re-read after every staking call and written once at the end.

use crate::distribution::DistributionKeeper;
use crate::error::{Result, SpecialValidatorError};
use crate::keeper::Keeper;
use crate::staking::{StakingKeeper, Validator};
use crate::types::{Amount, Power, SpecialValidator, ValAddress, ValidatorUpdate};

impl<S: StakingKeeper, D: DistributionKeeper> Keeper<S, D> {
    /// Run one reconciliation pass and return the updates in store order
    pub fn special_validator_updates(&mut self) -> Result<Vec<ValidatorUpdate>> {
        let power_reduction = self.staking.power_reduction();
        let mut updates = Vec::new();

        for address in self.store.addresses()? {
            if let Some(update) = self.reconcile_validator(&address, power_reduction)? {
                updates.push(update);
            }
        }

        if !updates.is_empty() {
            tracing::debug!(count = updates.len(), "special validator updates");
        }
        Ok(updates)
    }

    fn reconcile_validator(
        &mut self,
        address: &ValAddress,
        power_reduction: Amount,
    ) -> Result<Option<ValidatorUpdate>> {
        let Some(record) = self.store.get(address)? else {
            return Ok(None);
        };

        if self.staking.last_validator_power(address) > 0 {
            return Ok(None);
        }

        let validator = self
            .staking
            .validator(address)
            .ok_or(SpecialValidatorError::ValidatorMissing(*address))?;
        let pub_key = validator
            .consensus_key()
            .map_err(|source| SpecialValidatorError::InvalidConsensusKey {
                address: *address,
                source,
            })?;

        if record.is_deleting {
            self.unbond_if_bonded(&validator)?;
            self.store.delete(address)?;
            tracing::info!(validator = %address, "special validator deleted");
            return Ok(Some(ValidatorUpdate { pub_key, power: 0 }));
        }

        if validator.is_jailed() {
            if record.power == 0 {
                return Ok(None);
            }
            self.unbond_if_bonded(&validator)?;
            self.write_power(record, 0)?;
            tracing::info!(validator = %address, "jailed special validator removed from set");
            return Ok(Some(ValidatorUpdate { pub_key, power: 0 }));
        }

        let power = validator.potential_consensus_power(power_reduction);
        if power == record.power {
            return Ok(None);
        }

        if record.power == 0 {
            self.staking.bond_validator(&validator)?;
        }
        let old = record.power;
        self.write_power(record, power)?;

        tracing::info!(validator = %address, old, power, "special validator power updated");
        Ok(Some(ValidatorUpdate { pub_key, power }))
    }

    fn unbond_if_bonded(&mut self, validator: &Validator) -> Result<()> {
        if validator.is_bonded() {
            self.staking.begin_unbonding_validator(validator)?;
        }
        Ok(())
    }

    /// Persist `power` on the freshest copy of the record
    fn write_power(&self, stale: SpecialValidator, power: Power) -> Result<()> {
        let mut record = self.store.get(&stale.address)?.unwrap_or(stale);
        record.power = power;
        Ok(self.store.set(&record)?)
    }
}
