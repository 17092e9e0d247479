//! `stocktally-posting` — idempotent posting/reversal of goods receipts.
//!
//! The [`PostingCoordinator`] orchestrates one receiving transaction: it
//! allocates pending landed costs, walks the receipt lines strictly in
//! order, updates the external stock system per line, and appends cost
//! ledger events. Per-line idempotency records make the whole call
//! resumable after partial failure.

pub mod coordinator;
pub mod idempotency;
pub mod purchase_orders;
pub mod stock;
pub mod store;

pub use coordinator::{PostingConfig, PostingCoordinator};
pub use idempotency::{
    IdempotencyKey, IdempotencyStatus, IdempotencyStore, InMemoryIdempotencyStore,
    PostingDirection, PostingIdempotencyRecord,
};
pub use purchase_orders::{InMemoryOrderLineStore, OrderLineStore, PurchaseOrderLine};
pub use stock::{InMemoryStockGateway, StockGateway, StockGatewayError, StockUpdate};
pub use store::{
    AllocationStore, InMemoryAllocationStore, InMemoryLandedCostStore, InMemoryReceiptStore,
    LandedCostStore, ReceiptStore,
};
