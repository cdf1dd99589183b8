//! Monthly pre-aggregation: rollup documents and signed deltas.
//!
//! A write to an entry is turned into at most two signed deltas by
//! classifying the before-image (multiplier −1) and the after-image
//! (multiplier +1). Deltas are applied with an atomic increment, so
//! concurrent writers to the same month commute.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solaris_shared::types::TenantId;
use std::collections::BTreeMap;
use thiserror::Error;

use super::calendar::{LedgerCalendar, MonthId};
use super::classify::{Effect, classify};
use super::types::Entry;

/// Running totals of one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RollupTotals {
    /// Confirmed inflows accrued in the month.
    pub entradas: Decimal,
    /// Confirmed outflows accrued in the month.
    pub saidas: Decimal,
    /// `entradas - saidas`.
    pub saldo: Decimal,
}

/// A delta would push a month's totals past the `Decimal` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rollup overflow in {month}")]
pub struct RollupOverflow {
    /// Month whose totals would overflow.
    pub month: MonthId,
}

/// Per-tenant, per-month rollup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRollup {
    /// Tenant the rollup belongs to.
    #[serde(rename = "empresaId")]
    pub tenant_id: TenantId,
    /// `YYYY-MM` key.
    pub month_key: MonthId,
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1-based.
    pub month: u32,
    /// Running totals.
    pub totals: RollupTotals,
    /// Last increment time.
    pub updated_at: DateTime<Utc>,
}

impl MonthlyRollup {
    /// Empty rollup for a month, as created lazily on the first increment.
    #[must_use]
    pub fn empty(tenant_id: TenantId, month: MonthId, at: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            month_key: month,
            year: month.year(),
            month: month.month(),
            totals: RollupTotals::default(),
            updated_at: at,
        }
    }

    /// Applies a signed delta in place. On overflow the rollup is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RollupOverflow`] when any total would leave the `Decimal` range.
    pub fn apply(&mut self, delta: &RollupDelta, at: DateTime<Utc>) -> Result<(), RollupOverflow> {
        let overflow = RollupOverflow { month: self.month_key };
        let totals = &self.totals;
        let entradas = totals.entradas.checked_add(delta.entradas).ok_or(overflow)?;
        let saidas = totals.saidas.checked_add(delta.saidas).ok_or(overflow)?;
        let saldo = totals
            .saldo
            .checked_add(delta.entradas)
            .and_then(|s| s.checked_sub(delta.saidas))
            .ok_or(overflow)?;
        self.totals = RollupTotals { entradas, saidas, saldo };
        self.updated_at = at;
        Ok(())
    }
}

/// Signed increment for one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupDelta {
    /// Month receiving the increment.
    pub month: MonthId,
    /// Signed inflow increment.
    pub entradas: Decimal,
    /// Signed outflow increment.
    pub saidas: Decimal,
}

impl RollupDelta {
    /// Delta for an effect scaled by `multiplier` (±1).
    #[must_use]
    pub fn from_effect(effect: &Effect, multiplier: Decimal) -> Self {
        Self {
            month: effect.month,
            entradas: effect.entradas * multiplier,
            saidas: effect.saidas * multiplier,
        }
    }

    /// Signed balance increment.
    #[must_use]
    pub fn saldo(&self) -> Decimal {
        self.entradas.saturating_sub(self.saidas)
    }

    /// True when applying the delta would not change any total.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.entradas.is_zero() && self.saidas.is_zero()
    }
}

/// Classified effects of both images of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectPair {
    /// Effect of the before-image.
    pub before: Option<Effect>,
    /// Effect of the after-image.
    pub after: Option<Effect>,
}

impl EffectPair {
    /// Classifies both images.
    #[must_use]
    pub fn of(before: Option<&Entry>, after: Option<&Entry>, calendar: &LedgerCalendar) -> Self {
        Self {
            before: before.and_then(|e| classify(e, calendar)),
            after: after.and_then(|e| classify(e, calendar)),
        }
    }

    /// True when neither image contributes to any month.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.before.is_none() && self.after.is_none()
    }

    /// Month of the before-image effect.
    #[must_use]
    pub fn before_month(&self) -> Option<MonthId> {
        self.before.map(|e| e.month)
    }

    /// Month of the after-image effect.
    #[must_use]
    pub fn after_month(&self) -> Option<MonthId> {
        self.after.map(|e| e.month)
    }

    /// Net signed deltas grouped by month, sorted by month, zero deltas dropped.
    #[must_use]
    pub fn deltas(&self) -> Vec<RollupDelta> {
        let mut by_month: BTreeMap<MonthId, RollupDelta> = BTreeMap::new();
        let signed = [
            self.before.map(|e| RollupDelta::from_effect(&e, Decimal::NEGATIVE_ONE)),
            self.after.map(|e| RollupDelta::from_effect(&e, Decimal::ONE)),
        ];
        for delta in signed.into_iter().flatten() {
            by_month
                .entry(delta.month)
                .and_modify(|acc| {
                    acc.entradas = acc.entradas.saturating_add(delta.entradas);
                    acc.saidas = acc.saidas.saturating_add(delta.saidas);
                })
                .or_insert(delta);
        }
        by_month.into_values().filter(|d| !d.is_zero()).collect()
    }
}

/// Computes the signed deltas for an entry write.
///
/// `before` is `None` for creates and `after` is `None` for deletes.
#[must_use]
pub fn compute_deltas(
    before: Option<&Entry>,
    after: Option<&Entry>,
    calendar: &LedgerCalendar,
) -> Vec<RollupDelta> {
    EffectPair::of(before, after, calendar).deltas()
}

/// Recomputes rollups from scratch. Used to verify the incremental path.
#[must_use]
pub fn rebuild_rollups<'a, I>(entries: I, calendar: &LedgerCalendar) -> BTreeMap<MonthId, RollupTotals>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut totals: BTreeMap<MonthId, RollupTotals> = BTreeMap::new();
    for effect in entries.into_iter().filter_map(|e| classify(e, calendar)) {
        let month = totals.entry(effect.month).or_default();
        month.entradas = month.entradas.saturating_add(effect.entradas);
        month.saidas = month.saidas.saturating_add(effect.saidas);
        month.saldo = month.saldo.saturating_add(effect.saldo());
    }
    totals
}
