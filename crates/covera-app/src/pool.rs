//! Liquidity pool projections

use covera_core::types::PoolSnapshot;
use serde::{Deserialize, Serialize};

/// Annual yield applied to stake projections
pub const DEFAULT_APY: f64 = 0.124;

/// Total value locked shown before the backend answers
pub const FALLBACK_TVL: f64 = 14_250_000.0;

/// Floor for the denominator of pool shares
const MIN_TVL: f64 = 0.0001;

/// Projected return of a prospective stake
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StakeProjection {
    /// Stake amount
    pub amount: f64,
    /// Expected monthly reward
    pub monthly_reward: f64,
    /// Expected yearly reward
    pub yearly_reward: f64,
    /// Share of the pool after staking, in percent
    pub pool_share_percent: f64,
}

impl StakeProjection {
    pub fn compute(amount: f64, total_locked: f64, apy: f64) -> Self {
        let amount = amount.max(0.0);
        let yearly_reward = amount * apy;
        let pool = (total_locked + amount).max(MIN_TVL);
        Self {
            amount,
            monthly_reward: yearly_reward / 12.0,
            yearly_reward,
            pool_share_percent: amount / pool * 100.0,
        }
    }
}

/// The user's current position, derived from a pool snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolPosition {
    /// Amount staked
    pub stake: f64,
    /// Rewards accrued
    pub rewards: f64,
    /// Share of the pool, in percent
    pub pool_share_percent: f64,
    /// Projected monthly reward at the given APY
    pub monthly_reward: f64,
    /// Whether the holder qualifies for staker coverage
    pub staker_benefit: bool,
}

impl PoolPosition {
    pub fn from_snapshot(snapshot: &PoolSnapshot, apy: f64) -> Self {
        let stake = snapshot.user_stake.unwrap_or(0.0);
        Self {
            stake,
            rewards: snapshot.user_rewards.unwrap_or(0.0),
            pool_share_percent: stake / snapshot.total_locked.max(MIN_TVL) * 100.0,
            monthly_reward: stake * apy / 12.0,
            staker_benefit: stake > 0.0,
        }
    }
}

/// APY reported by a snapshot (percent) as a fraction, or the default
pub fn snapshot_apy(snapshot: &PoolSnapshot) -> f64 {
    if snapshot.yield_rate > 0.0 {
        snapshot.yield_rate / 100.0
    } else {
        DEFAULT_APY
    }
}
