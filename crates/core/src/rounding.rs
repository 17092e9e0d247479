//! Decimal rounding discipline.
//!
//! All arithmetic in the engine uses [`rust_decimal::Decimal`]; binary
//! floating point never touches monetary values. Intermediate products are
//! carried at full precision; rounding happens exactly once, at the final
//! snapshot or allocation share, via the helpers here.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept on `wac_at_event` snapshots.
pub const SNAPSHOT_SCALE: u32 = 4;

/// Fractional digits kept on landed-cost allocation shares.
pub const ALLOCATION_SCALE: u32 = 4;

/// Round a WAC snapshot. Commercial half-up (away from zero on midpoints).
pub fn round_snapshot(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SNAPSHOT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a landed-cost allocation share.
///
/// The last line of an allocation never goes through this; it is assigned
/// the exact remainder so the shares sum to the landed cost amount.
pub fn round_allocation(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(ALLOCATION_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
