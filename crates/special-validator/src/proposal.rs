//! Governance proposal payloads for admitting and removing special validators

use crate::config::SpecialValidatorConfig;
use crate::error::{Result, SpecialValidatorError};
use crate::staking::{Description, MsgCreateValidator};
use crate::types::{AccAddress, Coin, PublicKey, ValAddress};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Register a special validator: creates it in staking and admits it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSpecialValidatorProposal {
    pub title: String,
    pub description: String,
    pub delegator_address: String,
    pub validator_address: String,
    pub pubkey: Option<PublicKey>,
    /// Self delegation
    pub amount: Coin,
    pub validator_description: Description,
}

/// Unregister a special validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregisterSpecialValidatorProposal {
    pub title: String,
    pub description: String,
    pub validator_address: String,
}

/// Proposal content routed to this module by governance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialValidatorProposal {
    Register(RegisterSpecialValidatorProposal),
    Unregister(UnregisterSpecialValidatorProposal),
}

impl SpecialValidatorProposal {
    pub fn title(&self) -> &str {
        match self {
            Self::Register(p) => &p.title,
            Self::Unregister(p) => &p.title,
        }
    }

    pub fn validate_basic(&self, config: &SpecialValidatorConfig) -> Result<()> {
        match self {
            Self::Register(p) => p.validate_basic(config),
            Self::Unregister(p) => p.validate_basic(config),
        }
    }
}

fn validate_content(title: &str, description: &str, config: &SpecialValidatorConfig) -> Result<()> {
    if title.trim().is_empty() {
        return Err(SpecialValidatorError::InvalidProposal("title cannot be blank".into()));
    }
    if title.len() > config.max_title_length {
        return Err(SpecialValidatorError::InvalidProposal(format!(
            "title too long: {} > {}",
            title.len(),
            config.max_title_length
        )));
    }
    if description.trim().is_empty() {
        return Err(SpecialValidatorError::InvalidProposal(
            "description cannot be blank".into(),
        ));
    }
    if description.len() > config.max_description_length {
        return Err(SpecialValidatorError::InvalidProposal(format!(
            "description too long: {} > {}",
            description.len(),
            config.max_description_length
        )));
    }
    Ok(())
}

impl RegisterSpecialValidatorProposal {
    pub fn delegator(&self) -> Result<AccAddress> {
        Ok(self.delegator_address.parse()?)
    }

    pub fn validator(&self) -> Result<ValAddress> {
        Ok(self.validator_address.parse()?)
    }

    pub fn validate_basic(&self, config: &SpecialValidatorConfig) -> Result<()> {
        validate_content(&self.title, &self.description, config)?;

        let delegator = self.delegator()?;
        let validator = self.validator()?;
        if AccAddress::from(validator) != delegator {
            return Err(SpecialValidatorError::InvalidDescriptor(
                "validator address does not match delegator address".into(),
            ));
        }

        if self.pubkey.is_none() {
            return Err(SpecialValidatorError::InvalidDescriptor(
                "empty validator public key".into(),
            ));
        }

        if !self.amount.is_valid() || !self.amount.is_positive() {
            return Err(SpecialValidatorError::InvalidDescriptor(format!(
                "invalid delegation amount {}",
                self.amount
            )));
        }

        if self.validator_description.is_empty() {
            return Err(SpecialValidatorError::InvalidDescriptor("empty description".into()));
        }

        Ok(())
    }

    /// Create-validator message equivalent to this proposal
    pub fn to_create_validator(
        &self,
        config: &SpecialValidatorConfig,
    ) -> Result<MsgCreateValidator> {
        let pubkey = self.pubkey.clone().ok_or_else(|| {
            SpecialValidatorError::InvalidDescriptor("empty validator public key".into())
        })?;

        Ok(MsgCreateValidator {
            description: self.validator_description.clone(),
            commission: config.commission,
            min_self_delegation: config.min_self_delegation,
            delegator_address: self.delegator()?,
            validator_address: self.validator()?,
            pubkey,
            value: self.amount.clone(),
        })
    }
}

impl UnregisterSpecialValidatorProposal {
    pub fn validator(&self) -> Result<ValAddress> {
        Ok(self.validator_address.parse()?)
    }

    pub fn validate_basic(&self, config: &SpecialValidatorConfig) -> Result<()> {
        validate_content(&self.title, &self.description, config)?;
        self.validator()?;
        Ok(())
    }
}

impl fmt::Display for RegisterSpecialValidatorProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Register Special Validator Proposal:")?;
        writeln!(f, "  Title:       {}", self.title)?;
        writeln!(f, "  Description: {}", self.description)?;
        writeln!(f, "  Delegator:   {}", self.delegator_address)?;
        writeln!(f, "  Validator:   {}", self.validator_address)?;
        writeln!(f, "  Moniker:     {}", self.validator_description.moniker)?;
        write!(f, "  Amount:      {}", self.amount)
    }
}

impl fmt::Display for UnregisterSpecialValidatorProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unregister Special Validator Proposal:")?;
        writeln!(f, "  Title:       {}", self.title)?;
        writeln!(f, "  Description: {}", self.description)?;
        write!(f, "  Validator:   {}", self.validator_address)
    }
}
