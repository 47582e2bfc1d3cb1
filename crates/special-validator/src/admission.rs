//! Admission controller: governance-triggered registration and unregistration

use crate::distribution::DistributionKeeper;
use crate::error::{Result, SpecialValidatorError};
use crate::keeper::Keeper;
use crate::proposal::{
    RegisterSpecialValidatorProposal, SpecialValidatorProposal, UnregisterSpecialValidatorProposal,
};
use crate::staking::StakingKeeper;
use crate::types::{SpecialValidator, ValAddress};

impl<S: StakingKeeper, D: DistributionKeeper> Keeper<S, D> {
    /// Execute a passed governance proposal
    ///
    /// On error nothing has been written: every check that can fail runs
    /// before the first mutation.
    pub fn handle_proposal(&mut self, proposal: &SpecialValidatorProposal) -> Result<()> {
        match proposal {
            SpecialValidatorProposal::Register(p) => self.register(p).map(|_| ()),
            SpecialValidatorProposal::Unregister(p) => self.unregister(p),
        }
    }

    /// Create the validator in staking and admit it with zero power
    pub fn register(&mut self, proposal: &RegisterSpecialValidatorProposal) -> Result<ValAddress> {
        proposal.validate_basic(&self.config)?;
        let msg = proposal.to_create_validator(&self.config)?;
        let address = msg.validator_address;

        // duplicate operators and keys are rejected by staking
        self.staking.create_validator(&msg)?;
        self.store.set(&SpecialValidator::new(address))?;

        tracing::info!(
            validator = %address,
            self_delegation = %msg.value,
            moniker = %msg.description.moniker,
            "registered special validator"
        );
        Ok(address)
    }

    /// Remove a special validator, deferring while it still contributes power
    pub fn unregister(&mut self, proposal: &UnregisterSpecialValidatorProposal) -> Result<()> {
        proposal.validate_basic(&self.config)?;
        self.unregister_address(&proposal.validator()?)
    }

    pub fn unregister_address(&mut self, address: &ValAddress) -> Result<()> {
        let mut record = self
            .store
            .get(address)?
            .ok_or(SpecialValidatorError::NotFound(*address))?;

        let jailed = self
            .staking
            .validator(address)
            .map_or(false, |v| v.is_jailed());

        if !jailed && record.power != 0 {
            record.is_deleting = true;
            self.store.set(&record)?;
            tracing::info!(
                validator = %address,
                power = record.power,
                "special validator removal deferred until power reaches zero"
            );
        } else {
            self.store.delete(address)?;
            tracing::info!(validator = %address, jailed, "special validator removed");
        }
        Ok(())
    }
}
