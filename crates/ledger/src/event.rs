use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stocktally_core::{
    CurrencyCode, ItemId, LocationId, ReceiptId, ReceiptLineId, TenantId, UserId,
};

/// Kind of cost-affecting change recorded in the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostEventType {
    GoodsReceipt,
    GoodsReceiptReversal,
    LandedCostAdjustment,
}

impl CostEventType {
    /// Stable event name identifier (e.g. for log fields).
    pub fn as_str(&self) -> &'static str {
        match self {
            CostEventType::GoodsReceipt => "GOODS_RECEIPT",
            CostEventType::GoodsReceiptReversal => "GOODS_RECEIPT_REVERSAL",
            CostEventType::LandedCostAdjustment => "LANDED_COST_ADJUSTMENT",
        }
    }
}

/// Back-reference from a ledger event to the receipt line that produced it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub receipt_id: ReceiptId,
    pub line_id: ReceiptLineId,
}

/// Aggregate key for WAC state: one cost basis per (tenant, item, location).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CostKey {
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub location_id: LocationId,
}

/// One immutable entry in the cost ledger.
///
/// Notes:
/// - **Append-only**: never updated or deleted after creation; corrections
///   are new events.
/// - `sequence_number` is monotonically increasing per [`CostKey`] stream,
///   assigned by the store during append.
/// - `wac_at_event` / `qty_on_hand_at_event` are point-in-time snapshots
///   computed at append time, so reads never re-sum history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLayerEvent {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub event_type: CostEventType,
    pub item_id: ItemId,
    pub location_id: LocationId,

    /// Monotonically increasing position in the key's stream.
    pub sequence_number: u64,

    /// Signed quantity change (negative on reversals).
    pub qty_delta: Decimal,
    /// Supplier unit cost for the change.
    pub unit_cost: Decimal,
    /// Allocated landed cost per unit for the change.
    pub landed_cost_per_unit: Decimal,
    pub currency: CurrencyCode,

    pub source: SourceRef,

    /// WAC after this event was applied (snapshot, rounded).
    pub wac_at_event: Decimal,
    /// On-hand quantity after this event was applied (costing snapshot;
    /// the external stock system remains the authoritative count).
    pub qty_on_hand_at_event: Decimal,

    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl CostLayerEvent {
    pub fn key(&self) -> CostKey {
        CostKey {
            tenant_id: self.tenant_id,
            item_id: self.item_id,
            location_id: self.location_id,
        }
    }

    /// Unit cost including the landed share.
    pub fn effective_unit_cost(&self) -> Decimal {
        self.unit_cost + self.landed_cost_per_unit
    }

    /// Monetary value this event moved: `qty_delta × effective unit cost`.
    pub fn value_delta(&self) -> Decimal {
        self.qty_delta * self.effective_unit_cost()
    }
}
