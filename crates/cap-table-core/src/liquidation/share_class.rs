use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal_context::DecimalContext;
use crate::types::{Money, Multiple, Rate, Shares};

// ---------------------------------------------------------------------------
// Terms
// ---------------------------------------------------------------------------

/// Participation right attached to a preferred class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipationType {
    /// Preference only; shares in the residual only by converting.
    NonParticipating,
    /// Preference plus a pro-rata share of the residual.
    Participating,
    /// Like Participating, but total proceeds are capped at `cap` times the
    /// original investment.
    ParticipatingCapped { cap: Multiple },
}

/// Dividend terms attached to a preferred class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DividendPolicy {
    #[default]
    None,
    NonCumulative,
    /// Simple annual accrual on the original investment.
    Cumulative { rate: Rate },
}

/// Type of exit event triggering the waterfall.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    #[default]
    Acquisition,
    Ipo,
    Liquidation,
    Dissolution,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A series of preferred stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferredShareClass {
    pub id: String,
    /// Display name, e.g. "Series B"
    pub series_name: String,
    pub shares: Shares,
    /// Capital invested for the series, in minor units
    pub original_investment: Money,
    /// Preference multiple applied to the original investment (1x, 2x, ...)
    pub liquidation_multiple: Multiple,
    pub participation: ParticipationType,
    /// Payment priority; 0 is paid first. Unique across preferred classes.
    pub seniority_rank: u32,
    #[serde(default)]
    pub dividend: DividendPolicy,
    /// Declared or accrued dividends already owed before this event
    #[serde(default)]
    pub unpaid_dividends: Money,
    /// Common shares received per preferred share on conversion
    pub conversion_ratio: Decimal,
    pub issue_date: NaiveDate,
}

impl PreferredShareClass {
    /// `original_investment x liquidation_multiple`, rounded to the money scale.
    /// Validation bounds both factors so the product cannot overflow.
    pub fn preference_claim(&self, ctx: &DecimalContext) -> Money {
        ctx.money(self.original_investment * self.liquidation_multiple)
    }

    /// Share count after conversion to common.
    pub fn as_converted_shares(&self) -> Decimal {
        Decimal::from(self.shares) * self.conversion_ratio
    }

    pub fn is_participating(&self) -> bool {
        !matches!(self.participation, ParticipationType::NonParticipating)
    }

    /// Ceiling on total proceeds for capped participation, if any.
    pub fn participation_cap_amount(&self, ctx: &DecimalContext) -> Option<Money> {
        match self.participation {
            ParticipationType::ParticipatingCapped { cap } => {
                Some(ctx.money(self.original_investment * cap))
            }
            ParticipationType::NonParticipating | ParticipationType::Participating => None,
        }
    }
}

/// A class of common stock (founders, employees, option pool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonShareClass {
    pub id: String,
    pub name: String,
    pub shares: Shares,
}

/// The exit event whose proceeds are distributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationEvent {
    /// Total consideration to distribute, in minor units
    pub exit_value: Money,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub event_kind: EventKind,
}

// ---------------------------------------------------------------------------
// Tagged view over both class kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    Preferred,
    Common,
}

/// Either kind of share class, borrowed from the snapshot.
#[derive(Debug, Clone, Copy)]
pub enum ShareClass<'a> {
    Preferred(&'a PreferredShareClass),
    Common(&'a CommonShareClass),
}

impl<'a> ShareClass<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            ShareClass::Preferred(p) => &p.id,
            ShareClass::Common(c) => &c.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            ShareClass::Preferred(p) => &p.series_name,
            ShareClass::Common(c) => &c.name,
        }
    }

    pub fn kind(&self) -> ClassKind {
        match self {
            ShareClass::Preferred(_) => ClassKind::Preferred,
            ShareClass::Common(_) => ClassKind::Common,
        }
    }

    pub fn shares(&self) -> Shares {
        match self {
            ShareClass::Preferred(p) => p.shares,
            ShareClass::Common(c) => c.shares,
        }
    }

    /// Shares this class contributes to a common pool.
    pub fn pool_shares(&self) -> Decimal {
        match self {
            ShareClass::Preferred(p) => p.as_converted_shares(),
            ShareClass::Common(c) => Decimal::from(c.shares),
        }
    }

    pub fn seniority_rank(&self) -> Option<u32> {
        match self {
            ShareClass::Preferred(p) => Some(p.seniority_rank),
            ShareClass::Common(_) => None,
        }
    }
}

/// Lay out the snapshot as one arena: preferred classes first, in input
/// order, then common classes.
pub fn class_arena<'a>(
    preferred: &'a [PreferredShareClass],
    common: &'a [CommonShareClass],
) -> Vec<ShareClass<'a>> {
    preferred
        .iter()
        .map(ShareClass::Preferred)
        .chain(common.iter().map(ShareClass::Common))
        .collect()
}

/// Indices into `preferred`, ordered by seniority rank (stable).
pub fn seniority_order(preferred: &[PreferredShareClass]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..preferred.len()).collect();
    order.sort_by_key(|&i| preferred[i].seniority_rank);
    order
}
