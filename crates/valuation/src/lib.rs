//! `stocktally-valuation` — read-only reporting over the cost ledger.
//!
//! Consumes the ledger, never mutates it. Valuation is taken from the
//! latest per-key snapshots (each event carries its own point-in-time WAC
//! and quantity), never recomputed from scratch.

pub mod history;
pub mod reader;

pub use history::{HistoryFilter, HistoryPage, HistorySummary, Pagination};
pub use reader::{ValuationLine, ValuationReader, ValuationReport, ValuationTotals};
