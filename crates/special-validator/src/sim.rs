//! In-memory staking and distribution engines
//!
//! Enough of a proof-of-stake host to drive the module end to end: validator
//! creation with the usual create-validator checks, delegations, jailing, a
//! top-N election by power with lifecycle hooks, commission accrual and a
//! community pool. Used by the scenario runner and the test suites.

use crate::ante::StakingMsg;
use crate::config::SpecialValidatorConfig;
use crate::distribution::{DistributionError, DistributionKeeper};
use crate::error::{Result, SpecialValidatorError};
use crate::genesis::GenesisState;
use crate::keeper::Keeper;
use crate::proposal::SpecialValidatorProposal;
use crate::staking::{
    BondStatus, MsgCreateValidator, StakingError, StakingHooks, StakingKeeper, Validator,
};
use crate::store::SpecialValidatorStore;
use crate::types::{
    AccAddress, Amount, Coin, Coins, ConsAddress, ConsensusKey, Power, ValAddress,
    ValidatorUpdate,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const DEFAULT_BOND_DENOM: &str = "uzt";

/// Tokens per unit of consensus power
pub const DEFAULT_POWER_REDUCTION: Amount = 1_000_000;

pub const DEFAULT_MAX_VALIDATORS: usize = 100;

/// Blocks an unbonding validator waits before becoming unbonded
pub const DEFAULT_UNBONDING_BLOCKS: u64 = 3;

type StakingResult<T> = std::result::Result<T, StakingError>;

/// In-memory staking engine
pub struct SimStaking {
    validators: BTreeMap<ValAddress, Validator>,
    by_cons_addr: HashMap<ConsAddress, ValAddress>,
    delegations: BTreeMap<(AccAddress, ValAddress), Amount>,
    balances: HashMap<AccAddress, Amount>,
    last_powers: BTreeMap<ValAddress, Power>,
    /// validator -> height at which unbonding completes
    unbonding_queue: BTreeMap<ValAddress, u64>,
    hooks: Vec<Arc<dyn StakingHooks>>,
    height: u64,
    bond_denom: String,
    power_reduction: Amount,
    max_validators: usize,
    unbonding_blocks: u64,
}

impl Default for SimStaking {
    fn default() -> Self {
        Self::new(DEFAULT_BOND_DENOM, DEFAULT_POWER_REDUCTION, DEFAULT_MAX_VALIDATORS)
    }
}

impl SimStaking {
    pub fn new(
        bond_denom: impl Into<String>,
        power_reduction: Amount,
        max_validators: usize,
    ) -> Self {
        Self {
            validators: BTreeMap::new(),
            by_cons_addr: HashMap::new(),
            delegations: BTreeMap::new(),
            balances: HashMap::new(),
            last_powers: BTreeMap::new(),
            unbonding_queue: BTreeMap::new(),
            hooks: Vec::new(),
            height: 0,
            bond_denom: bond_denom.into(),
            power_reduction,
            max_validators,
            unbonding_blocks: DEFAULT_UNBONDING_BLOCKS,
        }
    }

    pub fn register_hooks(&mut self, hooks: Arc<dyn StakingHooks>) {
        self.hooks.push(hooks);
    }

    pub fn set_max_validators(&mut self, max_validators: usize) {
        self.max_validators = max_validators;
    }

    pub fn max_validators(&self) -> usize {
        self.max_validators
    }

    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    /// Validators in staking's own elected set, with their power
    pub fn last_powers(&self) -> &BTreeMap<ValAddress, Power> {
        &self.last_powers
    }

    pub fn is_unbonding_queued(&self, addr: &ValAddress) -> bool {
        self.unbonding_queue.contains_key(addr)
    }

    pub fn fund_account(&mut self, account: &AccAddress, amount: Amount) {
        let balance = self.balances.entry(*account).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, account: &AccAddress) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn delegation(&self, delegator: &AccAddress, validator: &ValAddress) -> Amount {
        self.delegations
            .get(&(*delegator, *validator))
            .copied()
            .unwrap_or(0)
    }

    fn get_validator_mut(&mut self, addr: &ValAddress) -> StakingResult<&mut Validator> {
        self.validators
            .get_mut(addr)
            .ok_or(StakingError::ValidatorNotFound(*addr))
    }

    /// Run every registered hook, handing this engine back to each
    fn fire<F>(&mut self, f: F) -> StakingResult<()>
    where
        F: Fn(&dyn StakingHooks, &mut dyn StakingKeeper) -> Result<()>,
    {
        let hooks = self.hooks.clone();
        let staking: &mut dyn StakingKeeper = self;
        for hook in &hooks {
            f(hook.as_ref(), &mut *staking)?;
        }
        Ok(())
    }

    pub fn delegate(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> StakingResult<()> {
        let available = self.balance(delegator);
        if available < amount {
            return Err(StakingError::InsufficientFunds {
                available,
                required: amount,
            });
        }

        let v = self.get_validator_mut(validator)?;
        v.tokens = v.tokens.saturating_add(amount);
        self.balances.insert(*delegator, available - amount);
        *self.delegations.entry((*delegator, *validator)).or_default() += amount;

        let (del, val) = (*delegator, *validator);
        self.fire(|h, s| h.after_delegation_modified(s, &del, &val))
    }

    /// Undelegate; tokens return to the delegator immediately
    pub fn undelegate(
        &mut self,
        delegator: &AccAddress,
        validator: &ValAddress,
        amount: Amount,
    ) -> StakingResult<()> {
        let available = self.delegation(delegator, validator);
        if available < amount {
            return Err(StakingError::InsufficientDelegation {
                available,
                required: amount,
            });
        }

        let v = self.get_validator_mut(validator)?;
        v.tokens = v.tokens.saturating_sub(amount);
        self.delegations.insert((*delegator, *validator), available - amount);
        self.fund_account(delegator, amount);

        let (del, val) = (*delegator, *validator);
        self.fire(|h, s| h.after_delegation_modified(s, &del, &val))
    }

    pub fn jail(&mut self, validator: &ValAddress) -> StakingResult<()> {
        self.get_validator_mut(validator)?.jailed = true;
        tracing::debug!(validator = %validator, "jailed");
        Ok(())
    }

    pub fn unjail(&mut self, validator: &ValAddress) -> StakingResult<()> {
        self.get_validator_mut(validator)?.jailed = false;
        tracing::debug!(validator = %validator, "unjailed");
        Ok(())
    }

    fn set_status(&mut self, addr: &ValAddress, status: BondStatus) -> StakingResult<Validator> {
        let unbonding_blocks = self.unbonding_blocks;
        let height = self.height;
        let v = self.get_validator_mut(addr)?;
        v.status = status;
        let v = v.clone();

        if status == BondStatus::Unbonding {
            self.unbonding_queue.insert(*addr, height + unbonding_blocks);
        } else {
            self.unbonding_queue.remove(addr);
        }
        Ok(v)
    }

    /// Staking's own election: top `max_validators` unjailed validators by power
    ///
    /// Fires `after_validator_bonded` for entrants and `after_validator_removed`
    /// for evictions, then matures the unbonding queue. Returns staking's own
    /// validator-set updates.
    pub fn end_block(&mut self) -> StakingResult<Vec<ValidatorUpdate>> {
        self.height += 1;

        let mut ranked: Vec<(ValAddress, Power)> = self
            .validators
            .values()
            .filter(|v| !v.is_jailed())
            .map(|v| (v.operator, v.potential_consensus_power(self.power_reduction)))
            .filter(|(_, power)| *power > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(self.max_validators);

        let elected: BTreeMap<ValAddress, Power> = ranked.into_iter().collect();
        let previous = std::mem::replace(&mut self.last_powers, elected.clone());
        let mut updates = Vec::new();

        for (addr, power) in &elected {
            if previous.get(addr) == Some(power) {
                continue;
            }
            updates.push(ValidatorUpdate {
                pub_key: self.consensus_key(addr)?,
                power: *power,
            });
            if !previous.contains_key(addr) {
                let v = self.set_status(addr, BondStatus::Bonded)?;
                let (cons, val) = (v.cons_address(), v.operator);
                self.fire(|h, s| h.after_validator_bonded(s, &cons, &val))?;
            }
        }

        for addr in previous.keys().filter(|a| !elected.contains_key(*a)) {
            updates.push(ValidatorUpdate {
                pub_key: self.consensus_key(addr)?,
                power: 0,
            });
            let v = self.set_status(addr, BondStatus::Unbonding)?;
            let (cons, val) = (v.cons_address(), v.operator);
            self.fire(|h, s| h.after_validator_removed(s, &cons, &val))?;
        }

        let height = self.height;
        let matured: Vec<ValAddress> = self
            .unbonding_queue
            .iter()
            .filter(|(_, done)| **done <= height)
            .map(|(addr, _)| *addr)
            .collect();
        for addr in matured {
            self.set_status(&addr, BondStatus::Unbonded)?;
        }

        Ok(updates)
    }

    fn consensus_key(&self, addr: &ValAddress) -> StakingResult<ConsensusKey> {
        let v = self
            .validators
            .get(addr)
            .ok_or(StakingError::ValidatorNotFound(*addr))?;
        Ok(v.consensus_key()?)
    }
}

impl StakingKeeper for SimStaking {
    fn validator(&self, addr: &ValAddress) -> Option<Validator> {
        self.validators.get(addr).cloned()
    }

    fn last_validator_power(&self, addr: &ValAddress) -> Power {
        self.last_powers.get(addr).copied().unwrap_or(0)
    }

    fn power_reduction(&self) -> Amount {
        self.power_reduction
    }

    fn bond_denom(&self) -> String {
        self.bond_denom.clone()
    }

    fn create_validator(&mut self, msg: &MsgCreateValidator) -> StakingResult<()> {
        let addr = msg.validator_address;
        if self.validators.contains_key(&addr) {
            return Err(StakingError::ValidatorOwnerExists(addr));
        }

        let cons_addr = msg.pubkey.address();
        if self.by_cons_addr.contains_key(&cons_addr) {
            return Err(StakingError::ValidatorPubKeyExists(cons_addr));
        }
        msg.pubkey.to_consensus_key()?;

        if msg.value.denom != self.bond_denom {
            return Err(StakingError::InvalidDenom {
                got: msg.value.denom.clone(),
                expected: self.bond_denom.clone(),
            });
        }

        msg.description.ensure_length()?;
        msg.commission.validate()?;

        if msg.value.amount < msg.min_self_delegation {
            return Err(StakingError::InsufficientDelegation {
                available: msg.value.amount,
                required: msg.min_self_delegation,
            });
        }

        let available = self.balance(&msg.delegator_address);
        if available < msg.value.amount {
            return Err(StakingError::InsufficientFunds {
                available,
                required: msg.value.amount,
            });
        }

        self.validators.insert(
            addr,
            Validator {
                operator: addr,
                consensus_pubkey: msg.pubkey.clone(),
                jailed: false,
                status: BondStatus::Unbonded,
                tokens: 0,
                description: msg.description.clone(),
                commission: msg.commission,
                min_self_delegation: msg.min_self_delegation,
            },
        );
        self.by_cons_addr.insert(cons_addr, addr);

        self.fire(|h, s| h.after_validator_created(s, &addr))?;
        self.delegate(&msg.delegator_address, &addr, msg.value.amount)
    }

    fn bond_validator(&mut self, validator: &Validator) -> StakingResult<Validator> {
        let v = self.set_status(&validator.operator, BondStatus::Bonded)?;
        let (cons, val) = (v.cons_address(), v.operator);
        self.fire(|h, s| h.after_validator_bonded(s, &cons, &val))?;
        Ok(v)
    }

    fn begin_unbonding_validator(&mut self, validator: &Validator) -> StakingResult<Validator> {
        let current = self
            .validators
            .get(&validator.operator)
            .ok_or(StakingError::ValidatorNotFound(validator.operator))?;
        if current.status != BondStatus::Bonded {
            return Err(StakingError::InvalidStatus {
                address: validator.operator,
                status: current.status,
                expected: BondStatus::Bonded,
            });
        }

        let v = self.set_status(&validator.operator, BondStatus::Unbonding)?;
        let (cons, val) = (v.cons_address(), v.operator);
        self.fire(|h, s| h.after_validator_begin_unbonding(s, &cons, &val))?;
        Ok(v)
    }

    fn readmit_validator(&mut self, validator: &Validator) -> StakingResult<()> {
        let v = self.set_status(&validator.operator, BondStatus::Bonded)?;
        let (cons, val) = (v.cons_address(), v.operator);
        self.fire(|h, s| h.after_validator_created(s, &val))?;
        self.fire(|h, s| h.after_validator_bonded(s, &cons, &val))
    }
}

/// In-memory distribution engine
#[derive(Debug, Default)]
pub struct SimDistribution {
    commission: BTreeMap<ValAddress, Coins>,
    balances: HashMap<AccAddress, Coins>,
    community_pool: Coins,
}

impl SimDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accrue_commission(&mut self, val: &ValAddress, coin: Coin) {
        self.commission.entry(*val).or_default().add(coin);
    }

    pub fn outstanding_commission(&self, val: &ValAddress) -> Coins {
        self.commission.get(val).cloned().unwrap_or_default()
    }

    pub fn community_pool(&self) -> &Coins {
        &self.community_pool
    }

    pub fn balance(&self, account: &AccAddress) -> Coins {
        self.balances.get(account).cloned().unwrap_or_default()
    }

    /// Move funds out of an account, e.g. a transfer the validator signed
    pub fn spend(
        &mut self,
        account: &AccAddress,
        amount: &Coins,
    ) -> std::result::Result<(), DistributionError> {
        let balance = self.balance(account);
        let rest = balance
            .checked_sub(amount)
            .ok_or(DistributionError::InsufficientFunds(*account))?;
        self.balances.insert(*account, rest);
        Ok(())
    }
}

impl DistributionKeeper for SimDistribution {
    fn withdraw_validator_commission(
        &mut self,
        val: &ValAddress,
    ) -> std::result::Result<Coins, DistributionError> {
        let coins = self
            .commission
            .remove(val)
            .filter(|c| !c.is_empty())
            .ok_or(DistributionError::NoValidatorCommission(*val))?;

        self.balances
            .entry(AccAddress::from(*val))
            .or_default()
            .merge(coins.clone());
        Ok(coins)
    }

    fn fund_community_pool(
        &mut self,
        amount: Coins,
        depositor: &AccAddress,
    ) -> std::result::Result<(), DistributionError> {
        self.spend(depositor, &amount)?;
        self.community_pool.merge(amount);
        Ok(())
    }
}

/// Updates emitted at the end of one block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockUpdates {
    pub height: u64,
    /// From staking's own election
    pub staking: Vec<ValidatorUpdate>,
    /// From special validator reconciliation, applied after `staking`
    pub special: Vec<ValidatorUpdate>,
}

/// A keeper wired to the in-memory engines, with hooks registered
pub struct Chain {
    keeper: Keeper<SimStaking, SimDistribution>,
    /// Consensus engine's view: key -> power
    consensus: HashMap<ConsensusKey, Power>,
    height: u64,
}

impl Chain {
    pub fn new(
        config: SpecialValidatorConfig,
        staking: SimStaking,
        distribution: SimDistribution,
    ) -> Self {
        let mut keeper = Keeper::new(
            SpecialValidatorStore::in_memory(),
            staking,
            distribution,
            config,
        );
        let hooks = keeper.hooks();
        keeper.staking_mut().register_hooks(Arc::new(hooks));

        Self {
            keeper,
            consensus: HashMap::new(),
            height: 0,
        }
    }

    pub fn with_genesis(
        config: SpecialValidatorConfig,
        staking: SimStaking,
        distribution: SimDistribution,
        genesis: &GenesisState,
    ) -> Result<Self> {
        let chain = Self::new(config, staking, distribution);
        chain.keeper.init_genesis(genesis)?;
        Ok(chain)
    }

    pub fn keeper(&self) -> &Keeper<SimStaking, SimDistribution> {
        &self.keeper
    }

    pub fn keeper_mut(&mut self) -> &mut Keeper<SimStaking, SimDistribution> {
        &mut self.keeper
    }

    pub fn staking(&self) -> &SimStaking {
        self.keeper.staking()
    }

    pub fn staking_mut(&mut self) -> &mut SimStaking {
        self.keeper.staking_mut()
    }

    pub fn distribution_mut(&mut self) -> &mut SimDistribution {
        self.keeper.distribution_mut()
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn submit_proposal(&mut self, proposal: &SpecialValidatorProposal) -> Result<()> {
        self.keeper.handle_proposal(proposal)
    }

    /// Deliver a user staking message: delegation guard first, then execution
    pub fn deliver(&mut self, msg: &StakingMsg) -> Result<()> {
        self.keeper.check_staking_msgs(std::slice::from_ref(msg))?;

        let bond_denom = self.keeper.staking().bond_denom();
        let (delegator, amount) = match msg {
            StakingMsg::Delegate {
                delegator_address,
                amount,
                ..
            }
            | StakingMsg::BeginRedelegate {
                delegator_address,
                amount,
                ..
            }
            | StakingMsg::Undelegate {
                delegator_address,
                amount,
                ..
            } => (delegator_address.parse::<AccAddress>()?, amount),
        };
        if amount.denom != bond_denom {
            return Err(StakingError::InvalidDenom {
                got: amount.denom.clone(),
                expected: bond_denom,
            }
            .into());
        }

        let staking = self.keeper.staking_mut();
        match msg {
            StakingMsg::Delegate {
                validator_address, ..
            } => {
                let validator: ValAddress = validator_address.parse()?;
                staking.delegate(&delegator, &validator, amount.amount)?;
            }
            StakingMsg::Undelegate {
                validator_address, ..
            } => {
                let validator: ValAddress = validator_address.parse()?;
                staking.undelegate(&delegator, &validator, amount.amount)?;
            }
            StakingMsg::BeginRedelegate {
                validator_src_address,
                validator_dst_address,
                ..
            } => {
                let src: ValAddress = validator_src_address.parse()?;
                let dst: ValAddress = validator_dst_address.parse()?;
                staking.undelegate(&delegator, &src, amount.amount)?;
                staking.delegate(&delegator, &dst, amount.amount)?;
            }
        }
        Ok(())
    }

    /// Finalize a block: staking's election, then special validator reconciliation
    pub fn end_block(&mut self) -> Result<BlockUpdates> {
        self.height += 1;

        let staking = self.keeper.staking_mut().end_block()?;
        let special = self.keeper.end_block(self.height)?;

        for update in staking.iter().chain(special.iter()) {
            if update.power == 0 {
                self.consensus.remove(&update.pub_key);
            } else {
                self.consensus.insert(update.pub_key, update.power);
            }
        }

        Ok(BlockUpdates {
            height: self.height,
            staking,
            special,
        })
    }

    /// Power the consensus engine currently holds for the validator
    pub fn consensus_power(&self, addr: &ValAddress) -> Result<Power> {
        let validator = self
            .keeper
            .staking()
            .validator(addr)
            .ok_or(SpecialValidatorError::ValidatorMissing(*addr))?;
        let key = validator
            .consensus_key()
            .map_err(|source| SpecialValidatorError::InvalidConsensusKey {
                address: *addr,
                source,
            })?;
        Ok(self.consensus.get(&key).copied().unwrap_or(0))
    }

    pub fn consensus_set_len(&self) -> usize {
        self.consensus.len()
    }
}
