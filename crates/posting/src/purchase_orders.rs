//! Purchase-order collaborator.
//!
//! The PO lifecycle itself lives outside this engine; the coordinator only
//! reads outstanding line quantities (to pre-populate drafts) and adjusts
//! received quantities after a successful post/reverse.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stocktally_core::{
    CostingError, CostingResult, CurrencyCode, ItemId, OrderLineId, TenantId,
};
use stocktally_receiving::OutstandingLine;

/// One purchase-order line as this engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: OrderLineId,
    pub item_id: ItemId,
    pub qty_ordered: Decimal,
    pub qty_received: Decimal,
    pub unit_cost: Decimal,
    pub currency: CurrencyCode,
}

impl PurchaseOrderLine {
    pub fn qty_remaining(&self) -> Decimal {
        self.qty_ordered - self.qty_received
    }

    /// View of this line for pre-populating a draft receipt.
    pub fn outstanding(&self) -> OutstandingLine {
        OutstandingLine {
            order_line_id: self.id,
            item_id: self.item_id,
            qty_outstanding: self.qty_remaining(),
            unit_cost: self.unit_cost,
            currency: self.currency,
        }
    }
}

/// Store for the purchase-order collaborator's line records.
pub trait OrderLineStore: Send + Sync {
    fn get(&self, tenant_id: TenantId, id: OrderLineId) -> Option<PurchaseOrderLine>;
    fn upsert(&self, tenant_id: TenantId, line: PurchaseOrderLine);
    /// Adjust `qty_received` by `delta` (negative after a reversal).
    fn adjust_received(
        &self,
        tenant_id: TenantId,
        id: OrderLineId,
        delta: Decimal,
    ) -> CostingResult<()>;
}

impl<S> OrderLineStore for Arc<S>
where
    S: OrderLineStore + ?Sized,
{
    fn get(&self, tenant_id: TenantId, id: OrderLineId) -> Option<PurchaseOrderLine> {
        (**self).get(tenant_id, id)
    }

    fn upsert(&self, tenant_id: TenantId, line: PurchaseOrderLine) {
        (**self).upsert(tenant_id, line)
    }

    fn adjust_received(
        &self,
        tenant_id: TenantId,
        id: OrderLineId,
        delta: Decimal,
    ) -> CostingResult<()> {
        (**self).adjust_received(tenant_id, id, delta)
    }
}

/// In-memory purchase-order line store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderLineStore {
    inner: RwLock<HashMap<(TenantId, OrderLineId), PurchaseOrderLine>>,
}

impl InMemoryOrderLineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderLineStore for InMemoryOrderLineStore {
    fn get(&self, tenant_id: TenantId, id: OrderLineId) -> Option<PurchaseOrderLine> {
        let map = self.inner.read().ok()?;
        map.get(&(tenant_id, id)).cloned()
    }

    fn upsert(&self, tenant_id: TenantId, line: PurchaseOrderLine) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, line.id), line);
        }
    }

    fn adjust_received(
        &self,
        tenant_id: TenantId,
        id: OrderLineId,
        delta: Decimal,
    ) -> CostingResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| CostingError::concurrent("order line lock poisoned"))?;
        let line = map.get_mut(&(tenant_id, id)).ok_or(CostingError::NotFound)?;
        line.qty_received += delta;
        Ok(())
    }
}
