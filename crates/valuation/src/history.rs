//! Filtered, paginated ledger history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stocktally_core::{ItemId, LocationId};
use stocktally_ledger::{CostEventType, CostLayerEvent};

/// Pagination parameters for history queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of events to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000), // Cap at 1000 for safety
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for history queries. All fields optional; empty filter
/// matches every event of the tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub item_id: Option<ItemId>,
    pub location_id: Option<LocationId>,
    pub event_type: Option<CostEventType>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn matches(&self, event: &CostLayerEvent) -> bool {
        if let Some(item_id) = self.item_id {
            if event.item_id != item_id {
                return false;
            }
        }
        if let Some(location_id) = self.location_id {
            if event.location_id != location_id {
                return false;
            }
        }
        if let Some(event_type) = self.event_type {
            if event.event_type != event_type {
                return false;
            }
        }
        if let Some(after) = self.occurred_after {
            if event.occurred_at <= after {
                return false;
            }
        }
        if let Some(before) = self.occurred_before {
            if event.occurred_at >= before {
                return false;
            }
        }
        true
    }
}

/// Net movement across the events of one page (the returned page only,
/// not the whole filtered set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub net_qty_delta: Decimal,
    pub net_value_delta: Decimal,
}

impl HistorySummary {
    pub fn over(events: &[CostLayerEvent]) -> Self {
        let mut net_qty_delta = Decimal::ZERO;
        let mut net_value_delta = Decimal::ZERO;
        for event in events {
            net_qty_delta += event.qty_delta;
            net_value_delta += event.value_delta();
        }
        Self {
            net_qty_delta,
            net_value_delta,
        }
    }
}

/// One page of filtered history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub events: Vec<CostLayerEvent>,
    /// Total number of events matching the filter (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
    pub summary: HistorySummary,
}
