//! Distribution facade: validator commission and the community pool

use crate::types::{AccAddress, Coins, ValAddress};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DistributionError {
    #[error("no validator commission to withdraw for {0}")]
    NoValidatorCommission(ValAddress),

    #[error("validator {0} does not exist")]
    NoValidatorExists(ValAddress),

    #[error("insufficient funds in {0} to fund community pool")]
    InsufficientFunds(AccAddress),
}

pub trait DistributionKeeper {
    /// Withdraw all accumulated commission; proceeds land in the validator's account
    fn withdraw_validator_commission(
        &mut self,
        val: &ValAddress,
    ) -> Result<Coins, DistributionError>;

    /// Move `amount` from `depositor` into the community pool
    fn fund_community_pool(
        &mut self,
        amount: Coins,
        depositor: &AccAddress,
    ) -> Result<(), DistributionError>;
}
