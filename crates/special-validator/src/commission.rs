//! Commission sweeper
//!
//! Special validators run at full commission; the sweep moves everything they
//! earned into the community pool, funded from the validator's own account.

use crate::distribution::DistributionKeeper;
use crate::error::Result;
use crate::keeper::Keeper;
use crate::staking::StakingKeeper;
use crate::types::{AccAddress, Coins, ValAddress};

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Validators whose commission reached the pool, with the amount moved
    pub swept: Vec<(ValAddress, Coins)>,
    /// Validators whose withdraw or funding failed
    pub skipped: Vec<ValAddress>,
}

impl SweepReport {
    pub fn total(&self) -> Coins {
        let mut total = Coins::new();
        for (_, coins) in &self.swept {
            total.merge(coins.clone());
        }
        total
    }
}

impl<S: StakingKeeper, D: DistributionKeeper> Keeper<S, D> {
    /// Sweep the commission of every special validator into the community pool
    ///
    /// Per-validator failures are logged and skipped; only store errors fail
    /// the sweep.
    pub fn sweep_commission(&mut self) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for address in self.store.addresses()? {
            let coins = match self.distribution.withdraw_validator_commission(&address) {
                Ok(coins) => coins,
                Err(e) => {
                    tracing::warn!(validator = %address, error = %e, "commission withdraw failed");
                    report.skipped.push(address);
                    continue;
                }
            };

            if coins.is_empty() {
                continue;
            }

            let depositor = AccAddress::from(address);
            match self.distribution.fund_community_pool(coins.clone(), &depositor) {
                Ok(()) => {
                    tracing::info!(
                        validator = %address,
                        amount = %coins,
                        "commission sent to community pool"
                    );
                    report.swept.push((address, coins));
                }
                Err(e) => {
                    tracing::warn!(
                        validator = %address,
                        error = %e,
                        "community pool funding failed"
                    );
                    report.skipped.push(address);
                }
            }
        }

        Ok(report)
    }
}
