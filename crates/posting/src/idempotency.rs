//! Per-line posting idempotency.
//!
//! Every external stock call is guarded by a deterministic key derived from
//! (receipt, line, direction). A record in Success state means the line's
//! stock update and ledger append are both committed, so a retry skips it
//! entirely. Records keep the request/response payloads for audit.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stocktally_core::{ReceiptId, ReceiptLineId, TenantId};

/// Which way a line moved stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingDirection {
    Posting,
    Reversal,
}

/// Deterministic, collision-free idempotency key.
///
/// Format is part of the external contract:
/// `"{receiptId}-LINE-{lineId}"` for posting,
/// `"REVERSAL-{reversalReceiptId}-LINE-{lineId}"` for reversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn posting(receipt_id: ReceiptId, line_id: ReceiptLineId) -> Self {
        Self(format!("{receipt_id}-LINE-{line_id}"))
    }

    pub fn reversal(reversal_receipt_id: ReceiptId, line_id: ReceiptLineId) -> Self {
        Self(format!("REVERSAL-{reversal_receipt_id}-LINE-{line_id}"))
    }

    pub fn for_direction(
        direction: PostingDirection,
        receipt_id: ReceiptId,
        line_id: ReceiptLineId,
    ) -> Self {
        match direction {
            PostingDirection::Posting => Self::posting(receipt_id, line_id),
            PostingDirection::Reversal => Self::reversal(receipt_id, line_id),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of one guarded external call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdempotencyStatus {
    Pending,
    Success,
    Failed,
}

/// Audit record for one (receipt, line, direction) stock interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingIdempotencyRecord {
    pub key: IdempotencyKey,
    pub receipt_id: ReceiptId,
    pub line_id: ReceiptLineId,
    pub direction: PostingDirection,
    pub status: IdempotencyStatus,
    /// The request sent to the external stock system.
    pub request: JsonValue,
    /// The response received on success.
    pub response: Option<JsonValue>,
    /// Failure message for audit visibility.
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PostingIdempotencyRecord {
    pub fn pending(
        key: IdempotencyKey,
        receipt_id: ReceiptId,
        line_id: ReceiptLineId,
        direction: PostingDirection,
        request: JsonValue,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            receipt_id,
            line_id,
            direction,
            status: IdempotencyStatus::Pending,
            request,
            response: None,
            error: None,
            updated_at: at,
        }
    }

    pub fn mark_success(&mut self, response: JsonValue, at: DateTime<Utc>) {
        self.status = IdempotencyStatus::Success;
        self.response = Some(response);
        self.error = None;
        self.updated_at = at;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, at: DateTime<Utc>) {
        self.status = IdempotencyStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = at;
    }
}

/// Tenant-scoped idempotency record store.
pub trait IdempotencyStore: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &IdempotencyKey) -> Option<PostingIdempotencyRecord>;
    fn upsert(&self, tenant_id: TenantId, record: PostingIdempotencyRecord);
    /// All records for one receipt, for audit (stable key order).
    fn list_for_receipt(
        &self,
        tenant_id: TenantId,
        receipt_id: ReceiptId,
    ) -> Vec<PostingIdempotencyRecord>;
}

impl<S> IdempotencyStore for Arc<S>
where
    S: IdempotencyStore + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &IdempotencyKey) -> Option<PostingIdempotencyRecord> {
        (**self).get(tenant_id, key)
    }

    fn upsert(&self, tenant_id: TenantId, record: PostingIdempotencyRecord) {
        (**self).upsert(tenant_id, record)
    }

    fn list_for_receipt(
        &self,
        tenant_id: TenantId,
        receipt_id: ReceiptId,
    ) -> Vec<PostingIdempotencyRecord> {
        (**self).list_for_receipt(tenant_id, receipt_id)
    }
}

/// In-memory idempotency store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    inner: RwLock<HashMap<(TenantId, IdempotencyKey), PostingIdempotencyRecord>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    fn get(&self, tenant_id: TenantId, key: &IdempotencyKey) -> Option<PostingIdempotencyRecord> {
        let map = self.inner.read().ok()?;
        map.get(&(tenant_id, key.clone())).cloned()
    }

    fn upsert(&self, tenant_id: TenantId, record: PostingIdempotencyRecord) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, record.key.clone()), record);
        }
    }

    fn list_for_receipt(
        &self,
        tenant_id: TenantId,
        receipt_id: ReceiptId,
    ) -> Vec<PostingIdempotencyRecord> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut records: Vec<_> = map
            .iter()
            .filter(|((t, _), r)| *t == tenant_id && r.receipt_id == receipt_id)
            .map(|(_, r)| r.clone())
            .collect();
        records.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats_match_the_external_contract() {
        let receipt_id = ReceiptId::new();
        let line_id = ReceiptLineId::new();

        let posting = IdempotencyKey::posting(receipt_id, line_id);
        assert_eq!(posting.as_str(), format!("{receipt_id}-LINE-{line_id}"));

        let reversal = IdempotencyKey::reversal(receipt_id, line_id);
        assert_eq!(
            reversal.as_str(),
            format!("REVERSAL-{receipt_id}-LINE-{line_id}")
        );

        // The two directions never collide for the same pair.
        assert_ne!(posting, reversal);
    }

    #[test]
    fn record_lifecycle_keeps_audit_fields() {
        let key = IdempotencyKey::posting(ReceiptId::new(), ReceiptLineId::new());
        let mut record = PostingIdempotencyRecord::pending(
            key,
            ReceiptId::new(),
            ReceiptLineId::new(),
            PostingDirection::Posting,
            serde_json::json!({"qty_delta": "10"}),
            Utc::now(),
        );
        assert_eq!(record.status, IdempotencyStatus::Pending);

        record.mark_failed("connection refused", Utc::now());
        assert_eq!(record.status, IdempotencyStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("connection refused"));

        record.mark_success(serde_json::json!({"new_qty": "10"}), Utc::now());
        assert_eq!(record.status, IdempotencyStatus::Success);
        assert!(record.error.is_none());
        assert!(record.response.is_some());
    }
}
