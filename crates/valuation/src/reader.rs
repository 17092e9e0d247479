//! Current valuation + history, read-only over a [`CostLedger`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stocktally_core::{round_snapshot, CostingResult, CurrencyCode, ItemId, LocationId, TenantId};
use stocktally_ledger::CostLedger;

use crate::history::{HistoryFilter, HistoryPage, HistorySummary, Pagination};

/// Valuation of one (item, location) key at its latest snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationLine {
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub qty_on_hand: Decimal,
    pub wac: Decimal,
    /// `qty_on_hand × wac`, rounded at the snapshot scale.
    pub total_value: Decimal,
    pub currency: CurrencyCode,
}

/// Tenant-wide totals over the valuation lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationTotals {
    pub total_qty: Decimal,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub lines: Vec<ValuationLine>,
    pub totals: ValuationTotals,
}

/// Read-only aggregation over the cost ledger.
#[derive(Debug)]
pub struct ValuationReader<L> {
    ledger: L,
}

impl<L> ValuationReader<L>
where
    L: CostLedger,
{
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Current valuation per key, taken from the latest snapshot per
    /// (item, location), never re-summed from the event history.
    pub fn current_valuation(
        &self,
        tenant_id: TenantId,
        location_filter: Option<LocationId>,
    ) -> CostingResult<ValuationReport> {
        let snapshots = self.ledger.latest_snapshots(tenant_id)?;

        let mut lines = Vec::with_capacity(snapshots.len());
        let mut total_qty = Decimal::ZERO;
        let mut total_value = Decimal::ZERO;

        for event in snapshots {
            if let Some(location_id) = location_filter {
                if event.location_id != location_id {
                    continue;
                }
            }
            let value = round_snapshot(event.qty_on_hand_at_event * event.wac_at_event);
            total_qty += event.qty_on_hand_at_event;
            total_value += value;
            lines.push(ValuationLine {
                item_id: event.item_id,
                location_id: event.location_id,
                qty_on_hand: event.qty_on_hand_at_event,
                wac: event.wac_at_event,
                total_value: value,
                currency: event.currency,
            });
        }

        Ok(ValuationReport {
            lines,
            totals: ValuationTotals {
                total_qty,
                total_value,
            },
        })
    }

    /// Filtered, paginated event history with a page-scoped net summary.
    pub fn history(
        &self,
        tenant_id: TenantId,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> CostingResult<HistoryPage> {
        let matching: Vec<_> = self
            .ledger
            .events_for_tenant(tenant_id)?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();

        let total = matching.len() as u64;
        let start = (pagination.offset as usize).min(matching.len());
        let end = start.saturating_add(pagination.limit as usize).min(matching.len());
        let events: Vec<_> = matching[start..end].to_vec();
        let has_more = (end as u64) < total;
        let summary = HistorySummary::over(&events);

        Ok(HistoryPage {
            events,
            total,
            pagination,
            has_more,
            summary,
        })
    }
}
