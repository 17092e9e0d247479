use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stocktally_core::{
    CostingError, CostingResult, LandedCostId, ReceiptId, ReceiptLineId,
};

/// How a landed cost is distributed across receipt lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationMethod {
    /// Weight by line value (qty × unit cost).
    ByValue,
    /// Weight by received quantity.
    ByQuantity,
}

/// A shared cost (freight, duty, ...) attached to a receipt.
///
/// `is_allocated` transitions false → true exactly once, never back; after
/// that the derived allocations are immutable inputs to WAC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandedCost {
    pub id: LandedCostId,
    pub receipt_id: ReceiptId,
    pub description: String,
    pub amount: Decimal,
    pub method: AllocationMethod,
    pub is_allocated: bool,
}

impl LandedCost {
    pub fn new(
        receipt_id: ReceiptId,
        description: impl Into<String>,
        amount: Decimal,
        method: AllocationMethod,
    ) -> Self {
        Self {
            id: LandedCostId::new(),
            receipt_id,
            description: description.into(),
            amount,
            method,
            is_allocated: false,
        }
    }

    /// Flip the write-once allocation flag.
    pub fn mark_allocated(&mut self) -> CostingResult<()> {
        if self.is_allocated {
            return Err(CostingError::AlreadyAllocated);
        }
        self.is_allocated = true;
        Ok(())
    }
}

/// Derived share of one landed cost for one receipt line.
///
/// Created exactly once when the landed cost is allocated; immutable
/// afterward. The shares for one landed cost sum exactly to its amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandedCostAllocation {
    pub landed_cost_id: LandedCostId,
    pub receipt_id: ReceiptId,
    pub line_id: ReceiptLineId,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn allocation_flag_is_write_once() {
        let mut lc = LandedCost::new(
            ReceiptId::new(),
            "ocean freight",
            dec!(30),
            AllocationMethod::ByValue,
        );
        assert!(!lc.is_allocated);
        lc.mark_allocated().unwrap();
        assert!(lc.is_allocated);
        assert!(matches!(
            lc.mark_allocated().unwrap_err(),
            CostingError::AlreadyAllocated
        ));
    }
}
