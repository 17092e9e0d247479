//! Landed cost allocation.
//!
//! Distributes one landed cost across receipt lines. Deterministic: lines
//! are processed in stable `line_no` order, every line but the last gets its
//! proportional share rounded to the allocation scale, and the last line is
//! assigned the exact remainder, so the shares always sum exactly to the
//! landed cost amount whatever the rounding did.

use rust_decimal::Decimal;

use stocktally_core::{round_allocation, CostingError, CostingResult};

use crate::landed_cost::{AllocationMethod, LandedCost, LandedCostAllocation};
use crate::receipt::GoodsReceiptLine;

/// Allocate a landed cost across lines (write-once).
pub fn allocate(
    landed: &LandedCost,
    lines: &[GoodsReceiptLine],
) -> CostingResult<Vec<LandedCostAllocation>> {
    if landed.is_allocated {
        return Err(CostingError::AlreadyAllocated);
    }
    compute_shares(landed, lines)
}

/// Same computation as [`allocate`], for previewing; no write-once check,
/// nothing persisted.
pub fn preview(
    landed: &LandedCost,
    lines: &[GoodsReceiptLine],
) -> CostingResult<Vec<LandedCostAllocation>> {
    compute_shares(landed, lines)
}

fn compute_shares(
    landed: &LandedCost,
    lines: &[GoodsReceiptLine],
) -> CostingResult<Vec<LandedCostAllocation>> {
    if lines.is_empty() {
        return Err(CostingError::NoLinesToAllocate);
    }

    // Stable input order: by line number.
    let mut ordered: Vec<&GoodsReceiptLine> = lines.iter().collect();
    ordered.sort_by_key(|l| l.line_no);

    let weights: Vec<Decimal> = ordered
        .iter()
        .map(|l| match landed.method {
            AllocationMethod::ByValue => l.value(),
            AllocationMethod::ByQuantity => l.qty_received,
        })
        .collect();
    let total_weight: Decimal = weights.iter().copied().sum();

    let mut allocations = Vec::with_capacity(ordered.len());
    let mut allocated_so_far = Decimal::ZERO;
    let last = ordered.len() - 1;

    for (i, line) in ordered.iter().enumerate() {
        let amount = if i == last {
            // Exact remainder: the shares sum to the amount regardless of
            // how the earlier rounding fell.
            landed.amount - allocated_so_far
        } else if total_weight.is_zero() {
            // Degenerate case (e.g. all quantities zero): split evenly.
            round_allocation(landed.amount / Decimal::from(ordered.len() as u64))
        } else {
            round_allocation(landed.amount * weights[i] / total_weight)
        };

        allocated_so_far += amount;
        allocations.push(LandedCostAllocation {
            landed_cost_id: landed.id,
            receipt_id: landed.receipt_id,
            line_id: line.line_id,
            amount,
        });
    }

    Ok(allocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use stocktally_core::{CurrencyCode, ItemId, ReceiptId, ReceiptLineId};

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD").unwrap()
    }

    fn line(line_no: u32, qty: Decimal, unit_cost: Decimal) -> GoodsReceiptLine {
        GoodsReceiptLine {
            line_id: ReceiptLineId::new(),
            line_no,
            item_id: ItemId::new(),
            qty_received: qty,
            unit_cost,
            currency: usd(),
            order_line_id: None,
        }
    }

    fn landed(amount: Decimal, method: AllocationMethod) -> LandedCost {
        LandedCost::new(ReceiptId::new(), "freight", amount, method)
    }

    #[test]
    fn by_value_splits_proportionally() {
        // $30 across line values $100 and $300 → $7.50 and $22.50.
        let lines = vec![line(1, dec!(10), dec!(10)), line(2, dec!(10), dec!(30))];
        let lc = landed(dec!(30), AllocationMethod::ByValue);

        let allocations = allocate(&lc, &lines).unwrap();
        assert_eq!(allocations[0].amount, dec!(7.50));
        assert_eq!(allocations[1].amount, dec!(22.50));
    }

    #[test]
    fn by_quantity_ignores_unit_costs() {
        let lines = vec![line(1, dec!(1), dec!(999)), line(2, dec!(3), dec!(1))];
        let lc = landed(dec!(20), AllocationMethod::ByQuantity);

        let allocations = allocate(&lc, &lines).unwrap();
        assert_eq!(allocations[0].amount, dec!(5));
        assert_eq!(allocations[1].amount, dec!(15));
    }

    #[test]
    fn last_line_absorbs_rounding_remainder() {
        // 10 / 3 does not divide evenly at 4 places.
        let lines = vec![
            line(1, dec!(1), dec!(1)),
            line(2, dec!(1), dec!(1)),
            line(3, dec!(1), dec!(1)),
        ];
        let lc = landed(dec!(10), AllocationMethod::ByQuantity);

        let allocations = allocate(&lc, &lines).unwrap();
        assert_eq!(allocations[0].amount, dec!(3.3333));
        assert_eq!(allocations[1].amount, dec!(3.3333));
        assert_eq!(allocations[2].amount, dec!(3.3334));
        let sum: Decimal = allocations.iter().map(|a| a.amount).sum();
        assert_eq!(sum, dec!(10));
    }

    #[test]
    fn zero_weights_split_evenly() {
        let lines = vec![
            line(1, Decimal::ZERO, dec!(5)),
            line(2, Decimal::ZERO, dec!(7)),
        ];
        let lc = landed(dec!(9), AllocationMethod::ByQuantity);

        let allocations = allocate(&lc, &lines).unwrap();
        assert_eq!(allocations[0].amount, dec!(4.5));
        assert_eq!(allocations[1].amount, dec!(4.5));
    }

    #[test]
    fn no_lines_is_an_error() {
        let lc = landed(dec!(30), AllocationMethod::ByValue);
        assert!(matches!(
            allocate(&lc, &[]).unwrap_err(),
            CostingError::NoLinesToAllocate
        ));
    }

    #[test]
    fn allocate_twice_is_rejected_but_preview_is_not() {
        let lines = vec![line(1, dec!(10), dec!(10))];
        let mut lc = landed(dec!(30), AllocationMethod::ByValue);
        allocate(&lc, &lines).unwrap();
        lc.mark_allocated().unwrap();

        assert!(matches!(
            allocate(&lc, &lines).unwrap_err(),
            CostingError::AlreadyAllocated
        ));
        assert!(preview(&lc, &lines).is_ok());
    }

    #[test]
    fn result_is_deterministic_for_unordered_input() {
        let l1 = line(1, dec!(2), dec!(1));
        let l2 = line(2, dec!(4), dec!(1));
        let lc = landed(dec!(10), AllocationMethod::ByQuantity);

        let forward = allocate(&lc, &[l1.clone(), l2.clone()]).unwrap();
        let backward = allocate(&lc, &[l2, l1]).unwrap();
        assert_eq!(forward, backward);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: allocation amounts sum exactly to the landed cost
        /// amount, for both methods and for the degenerate zero-weight case.
        #[test]
        fn shares_sum_exactly_to_amount(
            amount_cents in 1i64..10_000_000i64,
            qtys in prop::collection::vec(0i64..10_000i64, 1..12),
            costs in prop::collection::vec(0i64..100_000i64, 12),
            by_value in proptest::bool::ANY,
        ) {
            let lines: Vec<GoodsReceiptLine> = qtys
                .iter()
                .enumerate()
                .map(|(i, q)| line(
                    (i as u32) + 1,
                    Decimal::from(*q),
                    Decimal::from(costs[i % costs.len()]) / dec!(100),
                ))
                .collect();

            let method = if by_value {
                AllocationMethod::ByValue
            } else {
                AllocationMethod::ByQuantity
            };
            let lc = landed(Decimal::from(amount_cents) / dec!(100), method);

            let allocations = allocate(&lc, &lines).unwrap();
            prop_assert_eq!(allocations.len(), lines.len());
            let sum: Decimal = allocations.iter().map(|a| a.amount).sum();
            prop_assert_eq!(sum, lc.amount);
        }
    }
}
