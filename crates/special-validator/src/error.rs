//! Error types for the special validator module

use crate::distribution::DistributionError;
use crate::staking::StakingError;
use crate::store::StoreError;
use crate::types::{AddressError, KeyError, ValAddress};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecialValidatorError {
    /// No special validator record for the address
    #[error("special validator {0} not found")]
    NotFound(ValAddress),

    /// Malformed registration parameters
    #[error("invalid validator descriptor: {0}")]
    InvalidDescriptor(String),

    /// Proposal content (title / description) rejected
    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    /// Underlying staking operation failed
    #[error("staking rejected operation: {0}")]
    StakingRejected(#[from] StakingError),

    #[error("invalid address: {0}")]
    AddressDecode(#[from] AddressError),

    /// A stored record references a validator staking no longer knows
    #[error("validator {0} not found in staking")]
    ValidatorMissing(ValAddress),

    #[error("invalid consensus key for validator {address}: {source}")]
    InvalidConsensusKey {
        address: ValAddress,
        #[source]
        source: KeyError,
    },

    #[error("distribution error: {0}")]
    Distribution(#[from] DistributionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// User staking message targets a special validator
    #[error("cannot delegate to special validator {0}")]
    DelegationRejected(ValAddress),
}

pub type Result<T> = std::result::Result<T, SpecialValidatorError>;
