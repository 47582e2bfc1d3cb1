//! Special Validators - governance-admitted validator set lifecycle
//!
//! Runs next to staking's ordinary top-N election. Governance admits a named
//! set of validators that stay in the consensus set regardless of their
//! stake ranking; this crate keeps the consensus engine's view of their power
//! in step with their stake.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  Register / Unregister  ┌──────────────────┐
//! │ governance │ ──────────────────────▶ │    admission     │──┐
//! └────────────┘                         └──────────────────┘  │
//!                                                              ▼
//! ┌────────────┐  bonded / removed /     ┌──────────────────┐  ┌─────────┐
//! │  staking   │ ──delegation modified──▶│      hooks       │─▶│  store  │
//! │  (facade)  │ ◀──readmit / bond ───── └──────────────────┘  └────┬────┘
//! └─────┬──────┘                                                    │
//!       │ tokens, jailed, last power     ┌──────────────────┐       │
//!       └───────────────────────────────▶│    reconcile     │◀──────┘
//!                                        │   (end block)    │
//!                                        └────────┬─────────┘
//!                                                 ▼
//!                                  ordered Vec<ValidatorUpdate> to consensus
//! ```
//!
//! # Per block
//!
//! 1. Transactions run; governance proposals call into admission, staking
//!    calls fire hooks that write records.
//! 2. [`Keeper::end_block`] reconciles every record and returns the updates.
//! 3. When due, the commission sweep moves special validator commission to
//!    the community pool.
//!
//! The [`sim`] module provides in-memory staking and distribution engines for
//! tests and the scenario runner.

pub mod admission;
pub mod ante;
pub mod commission;
pub mod config;
pub mod distribution;
pub mod error;
pub mod genesis;
pub mod hooks;
pub mod keeper;
pub mod proposal;
pub mod query;
pub mod reconcile;
pub mod scenario;
pub mod sim;
pub mod staking;
pub mod store;
pub mod types;


pub use ante::StakingMsg;
pub use commission::SweepReport;
pub use config::SpecialValidatorConfig;
pub use distribution::{DistributionError, DistributionKeeper};
pub use error::{Result, SpecialValidatorError};
pub use genesis::GenesisState;
pub use hooks::Hooks;
pub use keeper::Keeper;
pub use proposal::{
    RegisterSpecialValidatorProposal, SpecialValidatorProposal, UnregisterSpecialValidatorProposal,
};
pub use staking::{StakingError, StakingHooks, StakingKeeper, Validator};
pub use store::{KvStore, MemoryStore, SpecialValidatorStore, StoreError};
pub use types::*;

/// Module name, used as the store namespace by hosts
pub const MODULE_NAME: &str = "specialvalidator";
