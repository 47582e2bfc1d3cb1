//! Delegation guard
//!
//! Special validators are admitted by governance with a fixed self
//! delegation. User staking messages that would move stake onto or off them
//! are rejected before execution.

use crate::error::{Result, SpecialValidatorError};
use crate::keeper::Keeper;
use crate::types::{Coin, ValAddress};
use serde::{Deserialize, Serialize};

/// User staking messages inspected by the guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingMsg {
    Delegate {
        delegator_address: String,
        validator_address: String,
        amount: Coin,
    },
    BeginRedelegate {
        delegator_address: String,
        validator_src_address: String,
        validator_dst_address: String,
        amount: Coin,
    },
    Undelegate {
        delegator_address: String,
        validator_address: String,
        amount: Coin,
    },
}

impl StakingMsg {
    /// Validator addresses the message touches
    pub fn validators(&self) -> Vec<&str> {
        match self {
            StakingMsg::Delegate {
                validator_address, ..
            }
            | StakingMsg::Undelegate {
                validator_address, ..
            } => vec![validator_address.as_str()],
            StakingMsg::BeginRedelegate {
                validator_src_address,
                validator_dst_address,
                ..
            } => vec![validator_src_address.as_str(), validator_dst_address.as_str()],
        }
    }
}

impl<S, D> Keeper<S, D> {
    /// Reject the transaction if any message targets a special validator
    pub fn check_staking_msgs(&self, msgs: &[StakingMsg]) -> Result<()> {
        if !self.config.reject_user_delegations {
            return Ok(());
        }

        for msg in msgs {
            for addr in msg.validators() {
                let address: ValAddress = addr.parse()?;
                if self.store.contains(&address)? {
                    tracing::debug!(
                        validator = %address,
                        "staking message to special validator rejected"
                    );
                    return Err(SpecialValidatorError::DelegationRejected(address));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpecialValidatorConfig;
    use crate::store::SpecialValidatorStore;
    use crate::types::{AccAddress, AddressError, SpecialValidator, ADDRESS_LEN};

    fn addr(id: u8) -> ValAddress {
        ValAddress::new([id; ADDRESS_LEN])
    }

    fn keeper(reject: bool) -> Keeper<(), ()> {
        let keeper = Keeper::new(
            SpecialValidatorStore::in_memory(),
            (),
            (),
            SpecialValidatorConfig {
                reject_user_delegations: reject,
                ..Default::default()
            },
        );
        keeper.set_special_validator(&SpecialValidator::new(addr(1))).unwrap();
        keeper
    }

    fn delegate(to: ValAddress) -> StakingMsg {
        StakingMsg::Delegate {
            delegator_address: AccAddress::from(addr(9)).to_string(),
            validator_address: to.to_string(),
            amount: Coin::new("uzt", 10),
        }
    }

    fn redelegate(src: ValAddress, dst: ValAddress) -> StakingMsg {
        StakingMsg::BeginRedelegate {
            delegator_address: AccAddress::from(addr(9)).to_string(),
            validator_src_address: src.to_string(),
            validator_dst_address: dst.to_string(),
            amount: Coin::new("uzt", 10),
        }
    }

    #[test]
    fn test_ordinary_validator_allowed() {
        let keeper = keeper(true);
        assert!(keeper.check_staking_msgs(&[delegate(addr(2))]).is_ok());
        assert!(keeper
            .check_staking_msgs(&[redelegate(addr(2), addr(3))])
            .is_ok());
    }

    #[test]
    fn test_special_validator_rejected() {
        let keeper = keeper(true);
        let undelegate = StakingMsg::Undelegate {
            delegator_address: AccAddress::from(addr(9)).to_string(),
            validator_address: addr(1).to_string(),
            amount: Coin::new("uzt", 10),
        };

        for msgs in [
            vec![delegate(addr(1))],
            vec![delegate(addr(2)), undelegate],
            vec![redelegate(addr(1), addr(2))],
            vec![redelegate(addr(2), addr(1))],
        ] {
            assert!(matches!(
                keeper.check_staking_msgs(&msgs),
                Err(SpecialValidatorError::DelegationRejected(a)) if a == addr(1)
            ));
        }
    }

    #[test]
    fn test_malformed_address() {
        let keeper = keeper(true);
        let msg = StakingMsg::Delegate {
            delegator_address: AccAddress::from(addr(9)).to_string(),
            validator_address: String::new(),
            amount: Coin::new("uzt", 10),
        };
        assert!(matches!(
            keeper.check_staking_msgs(&[msg]),
            Err(SpecialValidatorError::AddressDecode(AddressError::Empty))
        ));
    }

    #[test]
    fn test_guard_disabled() {
        let keeper = keeper(false);
        assert!(keeper.check_staking_msgs(&[delegate(addr(1))]).is_ok());
    }
}
