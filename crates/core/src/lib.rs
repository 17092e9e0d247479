//! `stocktally-core` — costing domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the ledger,
//! receiving, posting and valuation crates (no infrastructure concerns).

pub mod currency;
pub mod error;
pub mod id;
pub mod rounding;
pub mod version;

pub use currency::CurrencyCode;
pub use error::{CostingError, CostingResult};
pub use id::{
    ItemId, LandedCostId, LocationId, OrderLineId, ReceiptId, ReceiptLineId, TenantId, UserId,
};
pub use rounding::{round_allocation, round_snapshot, ALLOCATION_SCALE, SNAPSHOT_SCALE};
pub use version::ExpectedVersion;
