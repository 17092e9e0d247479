//! `stocktally-ledger` — append-only cost event ledger.
//!
//! Every cost-affecting stock change is recorded as an immutable
//! [`CostLayerEvent`]; the weighted average cost for a
//! (tenant, item, location) key is recomputed at append time and carried on
//! the event as a point-in-time snapshot. Corrections are new events, never
//! mutations.

pub mod event;
pub mod store;
pub mod wac;

pub use event::{CostEventType, CostKey, CostLayerEvent, SourceRef};
pub use store::{AppendRequest, CostLedger, InMemoryCostLedger};
pub use wac::{DepletionPolicy, KeyState, LedgerConfig};
