//! Staking facade
//!
//! The staking engine owns validator objects, bonding, jailing and the
//! ordinary top-N election. This module only sees it through
//! [`StakingKeeper`], and plugs into its lifecycle through [`StakingHooks`].
//!
//! Hooks are invoked synchronously from inside staking calls and receive the
//! engine back as `&mut dyn StakingKeeper`, so a hook may itself call into
//! staking (e.g. forcing a validator back to bonded).

use crate::error::SpecialValidatorError;
use crate::types::{
    AccAddress, Amount, Coin, ConsAddress, ConsensusKey, KeyError, Power, PublicKey, ValAddress,
};
use serde::{Deserialize, Serialize};

/// Basis points in 100%
pub const BPS_DENOMINATOR: u32 = 10_000;

pub const MAX_MONIKER_LENGTH: usize = 70;
pub const MAX_IDENTITY_LENGTH: usize = 3000;
pub const MAX_WEBSITE_LENGTH: usize = 140;
pub const MAX_SECURITY_CONTACT_LENGTH: usize = 140;
pub const MAX_DETAILS_LENGTH: usize = 280;

/// Largest power a consensus update may carry (signed 64-bit on the engine side)
pub const MAX_CONSENSUS_POWER: Power = i64::MAX as Power;

/// Validator bonding status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondStatus {
    Unbonded,
    Unbonding,
    Bonded,
}

/// Validator on-chain description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Description {
    pub moniker: String,
    pub identity: String,
    pub website: String,
    pub security_contact: String,
    pub details: String,
}

impl Description {
    pub fn new(moniker: impl Into<String>) -> Self {
        Self {
            moniker: moniker.into(),
            ..Default::default()
        }
    }

    /// All fields empty
    pub fn is_empty(&self) -> bool {
        *self == Description::default()
    }

    pub fn ensure_length(&self) -> Result<(), StakingError> {
        let fields = [
            ("moniker", &self.moniker, MAX_MONIKER_LENGTH),
            ("identity", &self.identity, MAX_IDENTITY_LENGTH),
            ("website", &self.website, MAX_WEBSITE_LENGTH),
            ("security_contact", &self.security_contact, MAX_SECURITY_CONTACT_LENGTH),
            ("details", &self.details, MAX_DETAILS_LENGTH),
        ];

        for (field, value, max) in fields {
            if value.len() > max {
                return Err(StakingError::DescriptionTooLong {
                    field,
                    len: value.len(),
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Commission parameters (basis points)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    pub rate_bps: u32,
    pub max_rate_bps: u32,
    pub max_change_rate_bps: u32,
}

impl CommissionRates {
    pub fn new(rate_bps: u32, max_rate_bps: u32, max_change_rate_bps: u32) -> Self {
        Self {
            rate_bps,
            max_rate_bps,
            max_change_rate_bps,
        }
    }

    pub fn validate(&self) -> Result<(), StakingError> {
        if self.max_rate_bps > BPS_DENOMINATOR {
            return Err(StakingError::InvalidCommission("max rate above 100%"));
        }
        if self.rate_bps > self.max_rate_bps {
            return Err(StakingError::InvalidCommission("rate above max rate"));
        }
        if self.max_change_rate_bps > self.max_rate_bps {
            return Err(StakingError::InvalidCommission("max change rate above max rate"));
        }
        Ok(())
    }
}

impl Default for CommissionRates {
    /// Special validators forward their whole commission to the community pool
    fn default() -> Self {
        Self::new(BPS_DENOMINATOR, BPS_DENOMINATOR, 0)
    }
}

/// Validator as seen through the staking facade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator: ValAddress,
    pub consensus_pubkey: PublicKey,
    pub jailed: bool,
    pub status: BondStatus,
    /// Bonded tokens (self + delegations)
    pub tokens: Amount,
    pub description: Description,
    pub commission: CommissionRates,
    pub min_self_delegation: Amount,
}

impl Validator {
    pub fn is_jailed(&self) -> bool {
        self.jailed
    }

    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    pub fn cons_address(&self) -> ConsAddress {
        self.consensus_pubkey.address()
    }

    pub fn consensus_key(&self) -> Result<ConsensusKey, KeyError> {
        self.consensus_pubkey.to_consensus_key()
    }

    /// Power the validator would carry if bonded: tokens / power reduction,
    /// capped at [`MAX_CONSENSUS_POWER`]
    pub fn potential_consensus_power(&self, power_reduction: Amount) -> Power {
        let power = self.tokens.checked_div(power_reduction).unwrap_or(0);
        Power::try_from(power)
            .unwrap_or(MAX_CONSENSUS_POWER)
            .min(MAX_CONSENSUS_POWER)
    }

    /// Power actually carried: zero unless bonded
    pub fn consensus_power(&self, power_reduction: Amount) -> Power {
        if self.is_bonded() {
            self.potential_consensus_power(power_reduction)
        } else {
            0
        }
    }
}

/// Create-validator message, the same shape a user transaction would carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateValidator {
    pub description: Description,
    pub commission: CommissionRates,
    pub min_self_delegation: Amount,
    pub delegator_address: AccAddress,
    pub validator_address: ValAddress,
    pub pubkey: PublicKey,
    pub value: Coin,
}

#[derive(Debug, thiserror::Error)]
pub enum StakingError {
    #[error("validator {0} already exists for this operator")]
    ValidatorOwnerExists(ValAddress),

    #[error("validator with consensus address {0} already exists")]
    ValidatorPubKeyExists(ConsAddress),

    #[error("invalid coin denomination: got {got}, expected {expected}")]
    InvalidDenom { got: String, expected: String },

    #[error("description {field} too long: {len} > {max}")]
    DescriptionTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("invalid commission: {0}")]
    InvalidCommission(&'static str),

    #[error("unsupported consensus key: {0}")]
    UnsupportedPubKey(#[from] KeyError),

    #[error("validator {0} not found")]
    ValidatorNotFound(ValAddress),

    #[error("validator {address} has status {status:?}, expected {expected:?}")]
    InvalidStatus {
        address: ValAddress,
        status: BondStatus,
        expected: BondStatus,
    },

    #[error("insufficient funds: {available} < {required}")]
    InsufficientFunds { available: Amount, required: Amount },

    #[error("insufficient delegation: {available} < {required}")]
    InsufficientDelegation { available: Amount, required: Amount },

    #[error("staking hook failed: {0}")]
    Hook(#[source] Box<SpecialValidatorError>),
}

impl From<SpecialValidatorError> for StakingError {
    fn from(e: SpecialValidatorError) -> Self {
        StakingError::Hook(Box::new(e))
    }
}

/// Operations this module consumes from the staking engine
pub trait StakingKeeper {
    fn validator(&self, addr: &ValAddress) -> Option<Validator>;

    /// Power staking recorded for the validator at the end of its last election
    /// (0 when staking's own set does not include it)
    fn last_validator_power(&self, addr: &ValAddress) -> Power;

    /// Tokens per unit of consensus power
    fn power_reduction(&self) -> Amount;

    fn bond_denom(&self) -> String;

    /// Create a validator and its self delegation, as a create-validator transaction would
    fn create_validator(&mut self, msg: &MsgCreateValidator) -> Result<(), StakingError>;

    /// Move the validator to bonded: power index, unbonding queue removal,
    /// `after_validator_bonded` hook
    fn bond_validator(&mut self, validator: &Validator) -> Result<Validator, StakingError>;

    /// Move a bonded validator to unbonding
    fn begin_unbonding_validator(
        &mut self,
        validator: &Validator,
    ) -> Result<Validator, StakingError>;

    /// Undo an eviction: force bonded status, drop it from the unbonding queue
    /// and re-fire the creation and bonded hooks
    fn readmit_validator(&mut self, validator: &Validator) -> Result<(), StakingError>;
}

/// Lifecycle callbacks staking fires into registered modules
///
/// Every method defaults to a no-op so implementors only pick the events
/// they care about.
pub trait StakingHooks: Send + Sync {
    fn after_validator_created(
        &self,
        _staking: &mut dyn StakingKeeper,
        _val: &ValAddress,
    ) -> crate::Result<()> {
        Ok(())
    }

    fn after_validator_bonded(
        &self,
        _staking: &mut dyn StakingKeeper,
        _cons: &ConsAddress,
        _val: &ValAddress,
    ) -> crate::Result<()> {
        Ok(())
    }

    fn after_validator_removed(
        &self,
        _staking: &mut dyn StakingKeeper,
        _cons: &ConsAddress,
        _val: &ValAddress,
    ) -> crate::Result<()> {
        Ok(())
    }

    fn after_validator_begin_unbonding(
        &self,
        _staking: &mut dyn StakingKeeper,
        _cons: &ConsAddress,
        _val: &ValAddress,
    ) -> crate::Result<()> {
        Ok(())
    }

    fn after_delegation_modified(
        &self,
        _staking: &mut dyn StakingKeeper,
        _del: &AccAddress,
        _val: &ValAddress,
    ) -> crate::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ADDRESS_LEN;

    fn validator(tokens: Amount, status: BondStatus) -> Validator {
        Validator {
            operator: ValAddress::new([1u8; ADDRESS_LEN]),
            consensus_pubkey: PublicKey::ed25519([1u8; 32]),
            jailed: false,
            status,
            tokens,
            description: Description::new("v"),
            commission: CommissionRates::default(),
            min_self_delegation: 1,
        }
    }

    #[test]
    fn test_potential_power_uses_reduction() {
        let v = validator(50_999_999, BondStatus::Unbonded);
        assert_eq!(v.potential_consensus_power(1_000_000), 50);
        assert_eq!(v.consensus_power(1_000_000), 0);
        assert_eq!(v.potential_consensus_power(0), 0);
    }

    #[test]
    fn test_consensus_power_when_bonded() {
        let v = validator(7_000_000, BondStatus::Bonded);
        assert_eq!(v.consensus_power(1_000_000), 7);
    }

    #[test]
    fn test_potential_power_saturates() {
        let v = validator(Amount::MAX, BondStatus::Bonded);
        assert_eq!(v.potential_consensus_power(1), MAX_CONSENSUS_POWER);
        assert!(i64::try_from(v.consensus_power(1)).is_ok());
    }

    #[test]
    fn test_potential_power_clamped_below_u64_max() {
        let v = validator(u64::MAX as Amount, BondStatus::Bonded);
        assert_eq!(v.potential_consensus_power(1), MAX_CONSENSUS_POWER);

        let v = validator(i64::MAX as Amount, BondStatus::Bonded);
        assert_eq!(v.potential_consensus_power(1), MAX_CONSENSUS_POWER);

        let v = validator(i64::MAX as Amount - 1, BondStatus::Bonded);
        assert_eq!(v.potential_consensus_power(1), MAX_CONSENSUS_POWER - 1);
    }

    #[test]
    fn test_description_checks() {
        assert!(Description::default().is_empty());
        assert!(!Description::new("moniker").is_empty());

        let long = Description::new("m".repeat(MAX_MONIKER_LENGTH + 1));
        assert!(matches!(
            long.ensure_length(),
            Err(StakingError::DescriptionTooLong { field: "moniker", .. })
        ));
    }

    #[test]
    fn test_commission_validation() {
        assert!(CommissionRates::default().validate().is_ok());
        assert!(CommissionRates::new(500, 400, 0).validate().is_err());
        assert!(CommissionRates::new(100, 20_000, 0).validate().is_err());
        assert!(CommissionRates::new(100, 200, 300).validate().is_err());
    }
}
