//! `stocktally-receiving` — goods receipt domain and landed cost allocation.
//!
//! A [`GoodsReceipt`] is the header for one receiving transaction; shared
//! costs (freight, duty) attach to it as [`LandedCost`]s and are distributed
//! across its lines by the allocator before posting.

pub mod allocator;
pub mod landed_cost;
pub mod receipt;

pub use allocator::{allocate, preview};
pub use landed_cost::{AllocationMethod, LandedCost, LandedCostAllocation};
pub use receipt::{GoodsReceipt, GoodsReceiptLine, OutstandingLine, ReceiptStatus};
