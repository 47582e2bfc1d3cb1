//! Read-only queries

use crate::error::{Result, SpecialValidatorError};
use crate::keeper::Keeper;
use crate::types::{SpecialValidator, ValAddress};

impl<S, D> Keeper<S, D> {
    /// Addresses of every special validator, in store order
    pub fn special_validators(&self) -> Result<Vec<ValAddress>> {
        Ok(self.store.addresses()?)
    }

    pub fn special_validator(&self, address: &ValAddress) -> Result<SpecialValidator> {
        self.store
            .get(address)?
            .ok_or(SpecialValidatorError::NotFound(*address))
    }

    pub fn special_validator_records(&self) -> Result<Vec<SpecialValidator>> {
        Ok(self.store.all()?)
    }

    pub fn is_special_validator(&self, address: &ValAddress) -> Result<bool> {
        Ok(self.store.contains(address)?)
    }
}
