//! Weighted average cost recomputation.
//!
//! Pure and deterministic: the store calls [`advance`] under its per-key
//! lock; no IO happens here. All arithmetic is decimal; the only rounding
//! is the final snapshot rounding of the new WAC.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stocktally_core::{round_snapshot, CostingError, CostingResult};

/// What the WAC does when a reversal drives on-hand quantity negative.
///
/// Negative on-hand is allowed (the external stock system is the arbiter of
/// negative-stock validation), but there is no meaningful average cost for
/// a negative quantity. The source behavior keeps the last WAC; callers can
/// opt into resetting instead.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepletionPolicy {
    /// Keep the last WAC as a best-effort marker.
    #[default]
    FreezeWac,
    /// Reset the WAC to zero until stock is positive again.
    ResetToZero,
}

/// Ledger configuration.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LedgerConfig {
    pub depletion_policy: DepletionPolicy,
}

/// Aggregate state for one (tenant, item, location) key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeyState {
    /// Sum of all quantity deltas applied so far.
    pub qty_on_hand: Decimal,
    /// Weighted average cost after the latest event.
    pub wac: Decimal,
}

impl KeyState {
    /// State of a key with no prior events.
    pub const EMPTY: KeyState = KeyState {
        qty_on_hand: Decimal::ZERO,
        wac: Decimal::ZERO,
    };
}

/// Apply one quantity/cost change to a key's aggregate state.
///
/// - `new_qty == 0` → WAC resets to zero (fully depleted; the next receipt
///   starts a fresh cost basis).
/// - `new_qty > 0` with non-negative prior stock → classic weighted average:
///   `(prior_qty × prior_wac + qty_delta × effective_unit_cost) / new_qty`.
/// - `new_qty > 0` recovering from negative prior stock → the incoming
///   effective unit cost becomes the fresh basis.
/// - `new_qty < 0` → governed by `policy`.
///
/// Intermediate products are never rounded; only the returned WAC is
/// rounded, to the snapshot scale.
pub fn advance(
    prior: KeyState,
    qty_delta: Decimal,
    effective_unit_cost: Decimal,
    policy: DepletionPolicy,
) -> CostingResult<KeyState> {
    if qty_delta.is_zero() {
        return Err(CostingError::invalid_quantity(
            "quantity delta must be non-zero",
        ));
    }

    let new_qty = prior.qty_on_hand + qty_delta;

    let new_wac = if new_qty.is_zero() {
        Decimal::ZERO
    } else if new_qty > Decimal::ZERO {
        if prior.qty_on_hand >= Decimal::ZERO {
            let pooled = prior.qty_on_hand * prior.wac + qty_delta * effective_unit_cost;
            round_snapshot(pooled / new_qty)
        } else {
            // Recovering from negative stock: fresh basis.
            round_snapshot(effective_unit_cost)
        }
    } else {
        match policy {
            DepletionPolicy::FreezeWac => prior.wac,
            DepletionPolicy::ResetToZero => Decimal::ZERO,
        }
    };

    Ok(KeyState {
        qty_on_hand: new_qty,
        wac: new_wac,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn state(qty: Decimal, wac: Decimal) -> KeyState {
        KeyState {
            qty_on_hand: qty,
            wac,
        }
    }

    #[test]
    fn first_receipt_sets_wac_to_unit_cost() {
        let next = advance(KeyState::EMPTY, dec!(10), dec!(1.00), DepletionPolicy::default())
            .unwrap();
        assert_eq!(next.qty_on_hand, dec!(10));
        assert_eq!(next.wac, dec!(1.0000));
    }

    #[test]
    fn second_receipt_blends_costs() {
        // 10 @ 1.00 then 5 @ 2.00 → (10*1 + 5*2) / 15 = 1.3333
        let s1 = advance(KeyState::EMPTY, dec!(10), dec!(1.00), DepletionPolicy::default())
            .unwrap();
        let s2 = advance(s1, dec!(5), dec!(2.00), DepletionPolicy::default()).unwrap();
        assert_eq!(s2.qty_on_hand, dec!(15));
        assert_eq!(s2.wac, dec!(1.3333));
    }

    #[test]
    fn full_depletion_resets_wac() {
        let s1 = advance(KeyState::EMPTY, dec!(10), dec!(1.50), DepletionPolicy::default())
            .unwrap();
        let s2 = advance(s1, dec!(-10), dec!(1.50), DepletionPolicy::default()).unwrap();
        assert_eq!(s2.qty_on_hand, Decimal::ZERO);
        assert_eq!(s2.wac, Decimal::ZERO);

        // Next receipt starts a fresh cost basis.
        let s3 = advance(s2, dec!(4), dec!(9.99), DepletionPolicy::default()).unwrap();
        assert_eq!(s3.wac, dec!(9.9900));
    }

    #[test]
    fn negative_quantity_freezes_wac_by_default() {
        let prior = state(dec!(3), dec!(2.5000));
        let next = advance(prior, dec!(-5), dec!(2.50), DepletionPolicy::FreezeWac).unwrap();
        assert_eq!(next.qty_on_hand, dec!(-2));
        assert_eq!(next.wac, dec!(2.5000));
    }

    #[test]
    fn negative_quantity_can_reset_wac() {
        let prior = state(dec!(3), dec!(2.5000));
        let next = advance(prior, dec!(-5), dec!(2.50), DepletionPolicy::ResetToZero).unwrap();
        assert_eq!(next.qty_on_hand, dec!(-2));
        assert_eq!(next.wac, Decimal::ZERO);
    }

    #[test]
    fn recovery_from_negative_uses_incoming_cost() {
        let prior = state(dec!(-2), dec!(2.5000));
        let next = advance(prior, dec!(6), dec!(4.00), DepletionPolicy::FreezeWac).unwrap();
        assert_eq!(next.qty_on_hand, dec!(4));
        assert_eq!(next.wac, dec!(4.0000));
    }

    #[test]
    fn zero_delta_is_rejected() {
        let err =
            advance(KeyState::EMPTY, Decimal::ZERO, dec!(1.00), DepletionPolicy::default())
                .unwrap_err();
        assert!(matches!(err, CostingError::InvalidQuantity(_)));
    }

    #[test]
    fn intermediate_products_are_not_rounded() {
        // 3 @ 0.3333 then 3 @ 0.3334: pooled value is carried exactly,
        // only the final division is rounded.
        let s1 = advance(KeyState::EMPTY, dec!(3), dec!(0.3333), DepletionPolicy::default())
            .unwrap();
        let s2 = advance(s1, dec!(3), dec!(0.3334), DepletionPolicy::default()).unwrap();
        // (3*0.3333 + 3*0.3334) / 6 = 2.0001 / 6 = 0.33335 → 0.3334
        assert_eq!(s2.wac, dec!(0.3334));
    }
}
