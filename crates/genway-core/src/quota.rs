//! Quota enforcement.
//!
//! Usage is derived by counting ledger rows inside the current UTC day and
//! calendar month; there is no separate counter to drift out of sync. The
//! enforcer is read-only. When the store cannot be read the call is allowed
//! (fail open).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::{self, Clock};
use crate::error::{GatewayError, GatewayResult, QuotaScope, StoreError};
use crate::ledger::{UsageAction, UsageStore};
use crate::tier::{Limit, PlanTier};

/// Usage and limits for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowUsage {
    pub used: u64,
    pub limit: Limit,
    /// `None` when unlimited.
    pub remaining: Option<u64>,
    pub resets_at: DateTime<Utc>,
}

impl WindowUsage {
    fn new(used: u64, limit: Limit, resets_at: DateTime<Utc>) -> Self {
        Self {
            used,
            limit,
            remaining: limit.remaining(used),
            resets_at,
        }
    }

    pub fn exhausted(&self) -> bool {
        !self.limit.permits(self.used)
    }
}

/// A user's quota position, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    pub tier: PlanTier,
    pub daily: WindowUsage,
    pub monthly: WindowUsage,
}

/// Accepts or rejects new calls based on the user's tier.
#[derive(Clone)]
pub struct QuotaEnforcer {
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for QuotaEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaEnforcer").finish_non_exhaustive()
    }
}

impl QuotaEnforcer {
    pub fn new(store: Arc<dyn UsageStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Allow or deny one more call.
    ///
    /// The daily window is checked first. Unlimited windows skip the store
    /// entirely.
    pub async fn check(&self, user_id: &str, tier: PlanTier) -> GatewayResult<()> {
        let limits = tier.limits();
        let now = self.clock.now();

        let windows = [
            (QuotaScope::Daily, limits.daily, clock::start_of_day(now)),
            (QuotaScope::Monthly, limits.monthly, clock::start_of_month(now)),
        ];

        for (scope, limit, since) in windows {
            let Limit::Capped(max) = limit else {
                continue;
            };
            let used = match self.used_since(user_id, since, now).await {
                Ok(used) => used,
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        %tier,
                        error = %e,
                        "Usage store unavailable; allowing call"
                    );
                    return Ok(());
                }
            };
            if !limit.permits(used) {
                tracing::info!(user_id, %tier, %scope, used, limit = max, "Quota exceeded");
                return Err(GatewayError::QuotaExceeded {
                    scope,
                    used,
                    limit: max,
                });
            }
        }
        Ok(())
    }

    /// Current usage against both windows.
    pub async fn snapshot(&self, user_id: &str, tier: PlanTier) -> Result<QuotaSnapshot, StoreError> {
        let limits = tier.limits();
        let now = self.clock.now();
        let daily = self.used_since(user_id, clock::start_of_day(now), now).await?;
        let monthly = self
            .used_since(user_id, clock::start_of_month(now), now)
            .await?;
        Ok(QuotaSnapshot {
            tier,
            daily: WindowUsage::new(daily, limits.daily, clock::next_day(now)),
            monthly: WindowUsage::new(monthly, limits.monthly, clock::next_month(now)),
        })
    }

    async fn used_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.store
            .count(user_id, UsageAction::Generation, since, now)
            .await
    }
}
