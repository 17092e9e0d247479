//! Tenant-scoped persistence traits for receipts, landed costs and
//! allocations, with in-memory implementations for tests/dev.
//!
//! The coordinator only talks to these traits; a SQL backend slots in
//! behind them without touching the posting protocol.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stocktally_core::{LandedCostId, ReceiptId, ReceiptLineId, TenantId};
use stocktally_receiving::{GoodsReceipt, LandedCost, LandedCostAllocation};

/// Goods receipt persistence.
pub trait ReceiptStore: Send + Sync {
    fn get(&self, tenant_id: TenantId, id: ReceiptId) -> Option<GoodsReceipt>;
    fn upsert(&self, tenant_id: TenantId, receipt: GoodsReceipt);
}

/// Landed cost persistence.
pub trait LandedCostStore: Send + Sync {
    fn get(&self, tenant_id: TenantId, id: LandedCostId) -> Option<LandedCost>;
    fn list_for_receipt(&self, tenant_id: TenantId, receipt_id: ReceiptId) -> Vec<LandedCost>;
    fn upsert(&self, tenant_id: TenantId, landed_cost: LandedCost);
}

/// Landed cost allocation persistence (insert-only; allocations are
/// immutable once written).
pub trait AllocationStore: Send + Sync {
    fn insert_all(&self, tenant_id: TenantId, allocations: &[LandedCostAllocation]);
    fn list_for_receipt(
        &self,
        tenant_id: TenantId,
        receipt_id: ReceiptId,
    ) -> Vec<LandedCostAllocation>;
    fn list_for_line(
        &self,
        tenant_id: TenantId,
        line_id: ReceiptLineId,
    ) -> Vec<LandedCostAllocation>;
}

impl<S> ReceiptStore for Arc<S>
where
    S: ReceiptStore + ?Sized,
{
    fn get(&self, tenant_id: TenantId, id: ReceiptId) -> Option<GoodsReceipt> {
        (**self).get(tenant_id, id)
    }

    fn upsert(&self, tenant_id: TenantId, receipt: GoodsReceipt) {
        (**self).upsert(tenant_id, receipt)
    }
}

impl<S> LandedCostStore for Arc<S>
where
    S: LandedCostStore + ?Sized,
{
    fn get(&self, tenant_id: TenantId, id: LandedCostId) -> Option<LandedCost> {
        (**self).get(tenant_id, id)
    }

    fn list_for_receipt(&self, tenant_id: TenantId, receipt_id: ReceiptId) -> Vec<LandedCost> {
        (**self).list_for_receipt(tenant_id, receipt_id)
    }

    fn upsert(&self, tenant_id: TenantId, landed_cost: LandedCost) {
        (**self).upsert(tenant_id, landed_cost)
    }
}

impl<S> AllocationStore for Arc<S>
where
    S: AllocationStore + ?Sized,
{
    fn insert_all(&self, tenant_id: TenantId, allocations: &[LandedCostAllocation]) {
        (**self).insert_all(tenant_id, allocations)
    }

    fn list_for_receipt(
        &self,
        tenant_id: TenantId,
        receipt_id: ReceiptId,
    ) -> Vec<LandedCostAllocation> {
        (**self).list_for_receipt(tenant_id, receipt_id)
    }

    fn list_for_line(
        &self,
        tenant_id: TenantId,
        line_id: ReceiptLineId,
    ) -> Vec<LandedCostAllocation> {
        (**self).list_for_line(tenant_id, line_id)
    }
}

/// In-memory receipt store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryReceiptStore {
    inner: RwLock<HashMap<(TenantId, ReceiptId), GoodsReceipt>>,
}

impl InMemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReceiptStore for InMemoryReceiptStore {
    fn get(&self, tenant_id: TenantId, id: ReceiptId) -> Option<GoodsReceipt> {
        let map = self.inner.read().ok()?;
        map.get(&(tenant_id, id)).cloned()
    }

    fn upsert(&self, tenant_id: TenantId, receipt: GoodsReceipt) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, receipt.id()), receipt);
        }
    }
}

/// In-memory landed cost store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryLandedCostStore {
    inner: RwLock<HashMap<(TenantId, LandedCostId), LandedCost>>,
}

impl InMemoryLandedCostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LandedCostStore for InMemoryLandedCostStore {
    fn get(&self, tenant_id: TenantId, id: LandedCostId) -> Option<LandedCost> {
        let map = self.inner.read().ok()?;
        map.get(&(tenant_id, id)).cloned()
    }

    fn list_for_receipt(&self, tenant_id: TenantId, receipt_id: ReceiptId) -> Vec<LandedCost> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut costs: Vec<_> = map
            .iter()
            .filter(|((t, _), lc)| *t == tenant_id && lc.receipt_id == receipt_id)
            .map(|(_, lc)| lc.clone())
            .collect();
        costs.sort_by_key(|lc| *lc.id.as_uuid());
        costs
    }

    fn upsert(&self, tenant_id: TenantId, landed_cost: LandedCost) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, landed_cost.id), landed_cost);
        }
    }
}

/// In-memory allocation store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAllocationStore {
    inner: RwLock<Vec<(TenantId, LandedCostAllocation)>>,
}

impl InMemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AllocationStore for InMemoryAllocationStore {
    fn insert_all(&self, tenant_id: TenantId, allocations: &[LandedCostAllocation]) {
        if let Ok(mut rows) = self.inner.write() {
            rows.extend(allocations.iter().map(|a| (tenant_id, a.clone())));
        }
    }

    fn list_for_receipt(
        &self,
        tenant_id: TenantId,
        receipt_id: ReceiptId,
    ) -> Vec<LandedCostAllocation> {
        let rows = match self.inner.read() {
            Ok(r) => r,
            Err(_) => return vec![],
        };
        rows.iter()
            .filter(|(t, a)| *t == tenant_id && a.receipt_id == receipt_id)
            .map(|(_, a)| a.clone())
            .collect()
    }

    fn list_for_line(
        &self,
        tenant_id: TenantId,
        line_id: ReceiptLineId,
    ) -> Vec<LandedCostAllocation> {
        let rows = match self.inner.read() {
            Ok(r) => r,
            Err(_) => return vec![],
        };
        rows.iter()
            .filter(|(t, a)| *t == tenant_id && a.line_id == line_id)
            .map(|(_, a)| a.clone())
            .collect()
    }
}
