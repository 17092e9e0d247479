//! External stock system gateway.
//!
//! The stock system is the single source of truth for on-hand quantity;
//! the ledger's `qty_on_hand_at_event` is a costing snapshot. Calls here
//! are the blocking boundary of a post/reverse and always carry a
//! caller-supplied timeout. Nothing retries internally.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use stocktally_core::{ItemId, LocationId, TenantId};

/// Stock gateway failure. Surfaced to callers as
/// `CostingError::ExternalSystemFailure` with the line identifier attached.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockGatewayError {
    #[error("stock call timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Failed(String),
}

/// Successful stock update acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockUpdate {
    pub new_qty: Decimal,
}

/// Collaborator trait for the external stock system.
pub trait StockGateway: Send + Sync {
    fn get_stock(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
        timeout: Duration,
    ) -> Result<Decimal, StockGatewayError>;

    /// Set the absolute on-hand quantity. Negative targets are accepted
    /// here; the external system decides its own negative-stock policy.
    fn update_stock(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
        new_qty: Decimal,
        timeout: Duration,
    ) -> Result<StockUpdate, StockGatewayError>;
}

impl<G> StockGateway for Arc<G>
where
    G: StockGateway + ?Sized,
{
    fn get_stock(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
        timeout: Duration,
    ) -> Result<Decimal, StockGatewayError> {
        (**self).get_stock(tenant_id, item_id, location_id, timeout)
    }

    fn update_stock(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
        new_qty: Decimal,
        timeout: Duration,
    ) -> Result<StockUpdate, StockGatewayError> {
        (**self).update_stock(tenant_id, item_id, location_id, new_qty, timeout)
    }
}

/// In-memory stock system for tests/dev.
///
/// Supports scripted failures (`fail_next_updates`) and counts update calls
/// so tests can assert that idempotent re-posts skip completed lines.
#[derive(Debug, Default)]
pub struct InMemoryStockGateway {
    levels: RwLock<HashMap<(TenantId, ItemId, LocationId), Decimal>>,
    fail_next: AtomicU64,
    fail_on_calls: RwLock<HashSet<u64>>,
    update_calls: AtomicU64,
}

impl InMemoryStockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` update calls fail with a scripted error.
    pub fn fail_next_updates(&self, n: u64) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Make the `n`-th update call (1-based, counted across the gateway's
    /// lifetime) fail with a scripted error.
    pub fn fail_on_call(&self, n: u64) {
        if let Ok(mut set) = self.fail_on_calls.write() {
            set.insert(n);
        }
    }

    pub fn update_call_count(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn stock_level(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
    ) -> Decimal {
        self.levels
            .read()
            .ok()
            .and_then(|m| m.get(&(tenant_id, item_id, location_id)).copied())
            .unwrap_or(Decimal::ZERO)
    }
}

impl StockGateway for InMemoryStockGateway {
    fn get_stock(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
        _timeout: Duration,
    ) -> Result<Decimal, StockGatewayError> {
        Ok(self.stock_level(tenant_id, item_id, location_id))
    }

    fn update_stock(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        location_id: LocationId,
        new_qty: Decimal,
        _timeout: Duration,
    ) -> Result<StockUpdate, StockGatewayError> {
        let call_no = self.update_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let scripted = self
            .fail_on_calls
            .read()
            .map(|set| set.contains(&call_no))
            .unwrap_or(false);
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if scripted || remaining > 0 {
            if remaining > 0 {
                self.fail_next.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(StockGatewayError::Failed(
                "scripted stock system failure".to_string(),
            ));
        }

        let mut levels = self
            .levels
            .write()
            .map_err(|_| StockGatewayError::Failed("stock store lock poisoned".to_string()))?;
        levels.insert((tenant_id, item_id, location_id), new_qty);
        Ok(StockUpdate { new_qty })
    }
}
