//! YAML scenarios replayed against the in-memory chain
//!
//! ```yaml
//! staking:
//!   max_validators: 1
//! accounts:
//!   - address: xpla1qyqszqgpqyqszqgpqyqszqgpqyqszqgpv5ezx0
//!     balance: 100000000
//! blocks:
//!   - actions:
//!       - action: register
//!         address: xplavaloper1qyqszqgpqyqszqgpqyqszqgpqyqszqgpaf6cfj
//!         pubkey: { algorithm: ed25519, bytes: "01...01" }
//!         amount: 100
//!         moniker: foundation
//!   - actions: []
//! ```
//!
//! Addresses are bech32 (`xpla1...` accounts, `xplavaloper1...` validators)
//! or `0x`-prefixed hex.
//!
//! Transaction-level failures (a rejected proposal, a guarded delegation)
//! are recorded in the block report and the scenario continues. End-block
//! failures abort the run.

use crate::ante::StakingMsg;
use crate::config::SpecialValidatorConfig;
use crate::error::Result;
use crate::genesis::GenesisState;
use crate::proposal::{
    RegisterSpecialValidatorProposal, SpecialValidatorProposal, UnregisterSpecialValidatorProposal,
};
use crate::sim::{
    Chain, SimDistribution, SimStaking, DEFAULT_BOND_DENOM, DEFAULT_MAX_VALIDATORS,
    DEFAULT_POWER_REDUCTION,
};
use crate::staking::{CommissionRates, Description, MsgCreateValidator, StakingKeeper};
use crate::types::{AccAddress, Amount, Coin, Coins, PublicKey, ValAddress, ValidatorUpdate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingParams {
    pub bond_denom: String,
    pub power_reduction: u64,
    pub max_validators: usize,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            bond_denom: DEFAULT_BOND_DENOM.to_string(),
            power_reduction: DEFAULT_POWER_REDUCTION as u64,
            max_validators: DEFAULT_MAX_VALIDATORS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: AccAddress,
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Ordinary validator, created through staking directly
    CreateValidator {
        address: ValAddress,
        pubkey: PublicKey,
        amount: u64,
        moniker: String,
    },
    /// Governance register proposal passes
    Register {
        address: ValAddress,
        pubkey: PublicKey,
        amount: u64,
        moniker: String,
    },
    /// Governance unregister proposal passes
    Unregister { address: ValAddress },
    Delegate {
        delegator: AccAddress,
        validator: ValAddress,
        amount: u64,
    },
    Undelegate {
        delegator: AccAddress,
        validator: ValAddress,
        amount: u64,
    },
    Jail { validator: ValAddress },
    Unjail { validator: ValAddress },
    AccrueCommission { validator: ValAddress, amount: u64 },
    SweepCommission,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub staking: StakingParams,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Scenario {
    pub fn from_yaml_str(s: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        Self::from_yaml_str(&s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockReport {
    pub height: u64,
    pub staking: Vec<ValidatorUpdate>,
    pub special: Vec<ValidatorUpdate>,
    /// (action index, error) for actions that failed
    pub rejected: Vec<(usize, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub blocks: Vec<BlockReport>,
    pub genesis: GenesisState,
    pub community_pool: Coins,
}

/// Replay `scenario` on a fresh chain
pub fn run(scenario: &Scenario, config: SpecialValidatorConfig) -> Result<ScenarioReport> {
    let params = &scenario.staking;
    let mut staking = SimStaking::new(
        params.bond_denom.clone(),
        Amount::from(params.power_reduction),
        params.max_validators,
    );
    for account in &scenario.accounts {
        staking.fund_account(&account.address, Amount::from(account.balance));
    }

    let mut chain = Chain::new(config, staking, SimDistribution::new());
    let mut report = ScenarioReport::default();

    for block in &scenario.blocks {
        let mut rejected = Vec::new();
        for (i, action) in block.actions.iter().enumerate() {
            if let Err(e) = apply(&mut chain, action) {
                tracing::warn!(
                    height = chain.height() + 1,
                    action = i,
                    error = %e,
                    "action rejected"
                );
                rejected.push((i, e.to_string()));
            }
        }

        let updates = chain.end_block()?;
        report.blocks.push(BlockReport {
            height: updates.height,
            staking: updates.staking,
            special: updates.special,
            rejected,
        });
    }

    report.genesis = chain.keeper().export_genesis()?;
    report.community_pool = chain.keeper().distribution().community_pool().clone();
    Ok(report)
}

fn apply(chain: &mut Chain, action: &Action) -> Result<()> {
    let denom = chain.staking().bond_denom();

    match action {
        Action::CreateValidator {
            address,
            pubkey,
            amount,
            moniker,
        } => {
            let msg = MsgCreateValidator {
                description: Description::new(moniker.clone()),
                commission: CommissionRates::new(1_000, 2_000, 100),
                min_self_delegation: 1,
                delegator_address: AccAddress::from(*address),
                validator_address: *address,
                pubkey: pubkey.clone(),
                value: Coin::new(denom, Amount::from(*amount)),
            };
            chain.staking_mut().create_validator(&msg)?;
        }
        Action::Register {
            address,
            pubkey,
            amount,
            moniker,
        } => {
            let proposal = RegisterSpecialValidatorProposal {
                title: format!("Register {}", moniker),
                description: format!("Admit {} as a special validator", address),
                delegator_address: AccAddress::from(*address).to_string(),
                validator_address: address.to_string(),
                pubkey: Some(pubkey.clone()),
                amount: Coin::new(denom, Amount::from(*amount)),
                validator_description: Description::new(moniker.clone()),
            };
            chain.submit_proposal(&SpecialValidatorProposal::Register(proposal))?;
        }
        Action::Unregister { address } => {
            let proposal = UnregisterSpecialValidatorProposal {
                title: format!("Unregister {}", address),
                description: format!("Remove {} from the special validator set", address),
                validator_address: address.to_string(),
            };
            chain.submit_proposal(&SpecialValidatorProposal::Unregister(proposal))?;
        }
        Action::Delegate {
            delegator,
            validator,
            amount,
        } => chain.deliver(&StakingMsg::Delegate {
            delegator_address: delegator.to_string(),
            validator_address: validator.to_string(),
            amount: Coin::new(denom, Amount::from(*amount)),
        })?,
        Action::Undelegate {
            delegator,
            validator,
            amount,
        } => chain.deliver(&StakingMsg::Undelegate {
            delegator_address: delegator.to_string(),
            validator_address: validator.to_string(),
            amount: Coin::new(denom, Amount::from(*amount)),
        })?,
        Action::Jail { validator } => chain.staking_mut().jail(validator)?,
        Action::Unjail { validator } => chain.staking_mut().unjail(validator)?,
        Action::AccrueCommission { validator, amount } => chain
            .distribution_mut()
            .accrue_commission(validator, Coin::new(denom, Amount::from(*amount))),
        Action::SweepCommission => {
            chain.keeper_mut().sweep_commission()?;
        }
    }
    Ok(())
}
