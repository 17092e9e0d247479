use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use stocktally_core::{
    CostingError, CostingResult, CurrencyCode, ExpectedVersion, ItemId, LocationId, TenantId,
    UserId,
};

use crate::event::{CostEventType, CostKey, CostLayerEvent, SourceRef};
use crate::wac::{self, KeyState, LedgerConfig};

/// A cost change ready to be appended (not yet assigned a sequence number).
#[derive(Debug, Clone)]
pub struct AppendRequest {
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub event_type: CostEventType,
    pub qty_delta: Decimal,
    pub unit_cost: Decimal,
    pub landed_cost_per_unit: Decimal,
    pub currency: CurrencyCode,
    pub source: SourceRef,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
    /// Optimistic concurrency expectation against the key's stream.
    pub expected_version: ExpectedVersion,
}

impl AppendRequest {
    pub fn key(&self) -> CostKey {
        CostKey {
            tenant_id: self.tenant_id,
            item_id: self.item_id,
            location_id: self.location_id,
        }
    }
}

/// Append-only, tenant-scoped cost ledger.
///
/// Implementations must:
/// - execute the read-then-write of the per-key aggregate atomically, so
///   two concurrent appends for one key cannot both observe the same prior
///   state
/// - assign monotonically increasing `sequence_number`s per key, no gaps
/// - never mutate or delete a persisted event
pub trait CostLedger: Send + Sync {
    /// Append one cost event; recomputes the key's WAC and stamps the
    /// snapshots on the stored event.
    fn append(&self, request: AppendRequest) -> CostingResult<CostLayerEvent>;

    /// Full stream for one key, in sequence order.
    fn events_for_key(&self, key: CostKey) -> CostingResult<Vec<CostLayerEvent>>;

    /// Latest event for one key, if any.
    fn latest_for_key(&self, key: CostKey) -> CostingResult<Option<CostLayerEvent>>;

    /// Latest event per key for a tenant (the valuation read path).
    fn latest_snapshots(&self, tenant_id: TenantId) -> CostingResult<Vec<CostLayerEvent>>;

    /// All events for a tenant ordered by (occurred_at, sequence), the
    /// history read path.
    fn events_for_tenant(&self, tenant_id: TenantId) -> CostingResult<Vec<CostLayerEvent>>;
}

impl<L> CostLedger for &L
where
    L: CostLedger + ?Sized,
{
    fn append(&self, request: AppendRequest) -> CostingResult<CostLayerEvent> {
        (**self).append(request)
    }

    fn events_for_key(&self, key: CostKey) -> CostingResult<Vec<CostLayerEvent>> {
        (**self).events_for_key(key)
    }

    fn latest_for_key(&self, key: CostKey) -> CostingResult<Option<CostLayerEvent>> {
        (**self).latest_for_key(key)
    }

    fn latest_snapshots(&self, tenant_id: TenantId) -> CostingResult<Vec<CostLayerEvent>> {
        (**self).latest_snapshots(tenant_id)
    }

    fn events_for_tenant(&self, tenant_id: TenantId) -> CostingResult<Vec<CostLayerEvent>> {
        (**self).events_for_tenant(tenant_id)
    }
}

impl<L> CostLedger for Arc<L>
where
    L: CostLedger + ?Sized,
{
    fn append(&self, request: AppendRequest) -> CostingResult<CostLayerEvent> {
        (**self).append(request)
    }

    fn events_for_key(&self, key: CostKey) -> CostingResult<Vec<CostLayerEvent>> {
        (**self).events_for_key(key)
    }

    fn latest_for_key(&self, key: CostKey) -> CostingResult<Option<CostLayerEvent>> {
        (**self).latest_for_key(key)
    }

    fn latest_snapshots(&self, tenant_id: TenantId) -> CostingResult<Vec<CostLayerEvent>> {
        (**self).latest_snapshots(tenant_id)
    }

    fn events_for_tenant(&self, tenant_id: TenantId) -> CostingResult<Vec<CostLayerEvent>> {
        (**self).events_for_tenant(tenant_id)
    }
}

/// In-memory append-only cost ledger.
///
/// Intended for tests/dev. The map-wide write lock serializes the per-key
/// read-then-write; a SQL backend would use serializable isolation or
/// row-level locking scoped to the key instead.
#[derive(Debug, Default)]
pub struct InMemoryCostLedger {
    config: LedgerConfig,
    streams: RwLock<HashMap<CostKey, Vec<CostLayerEvent>>>,
}

impl InMemoryCostLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            streams: RwLock::new(HashMap::new()),
        }
    }

    fn current_version(stream: &[CostLayerEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    fn prior_state(stream: &[CostLayerEvent]) -> KeyState {
        stream
            .last()
            .map(|e| KeyState {
                qty_on_hand: e.qty_on_hand_at_event,
                wac: e.wac_at_event,
            })
            .unwrap_or(KeyState::EMPTY)
    }
}

impl CostLedger for InMemoryCostLedger {
    fn append(&self, request: AppendRequest) -> CostingResult<CostLayerEvent> {
        let key = request.key();

        let mut streams = self
            .streams
            .write()
            .map_err(|_| CostingError::concurrent("ledger lock poisoned"))?;

        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);
        request.expected_version.check(current)?;

        // A key's stream is single-currency; the WAC has no meaning across
        // currencies and conversion is out of scope.
        if let Some(existing) = stream.first() {
            if existing.currency != request.currency {
                return Err(CostingError::validation(format!(
                    "currency mismatch for key: stream is {}, append is {}",
                    existing.currency, request.currency
                )));
            }
        }

        let prior = Self::prior_state(stream);
        let next = wac::advance(
            prior,
            request.qty_delta,
            request.unit_cost + request.landed_cost_per_unit,
            self.config.depletion_policy,
        )?;

        let event = CostLayerEvent {
            event_id: Uuid::now_v7(),
            tenant_id: request.tenant_id,
            event_type: request.event_type,
            item_id: request.item_id,
            location_id: request.location_id,
            sequence_number: current + 1,
            qty_delta: request.qty_delta,
            unit_cost: request.unit_cost,
            landed_cost_per_unit: request.landed_cost_per_unit,
            currency: request.currency,
            source: request.source,
            wac_at_event: next.wac,
            qty_on_hand_at_event: next.qty_on_hand,
            created_by: request.created_by,
            occurred_at: request.occurred_at,
        };

        tracing::debug!(
            event_type = event.event_type.as_str(),
            item = %event.item_id,
            location = %event.location_id,
            sequence = event.sequence_number,
            qty_on_hand = %event.qty_on_hand_at_event,
            wac = %event.wac_at_event,
            "cost event appended"
        );

        stream.push(event.clone());
        Ok(event)
    }

    fn events_for_key(&self, key: CostKey) -> CostingResult<Vec<CostLayerEvent>> {
        let streams = self
            .streams
            .read()
            .map_err(|_| CostingError::concurrent("ledger lock poisoned"))?;
        Ok(streams.get(&key).cloned().unwrap_or_default())
    }

    fn latest_for_key(&self, key: CostKey) -> CostingResult<Option<CostLayerEvent>> {
        let streams = self
            .streams
            .read()
            .map_err(|_| CostingError::concurrent("ledger lock poisoned"))?;
        Ok(streams.get(&key).and_then(|s| s.last().cloned()))
    }

    fn latest_snapshots(&self, tenant_id: TenantId) -> CostingResult<Vec<CostLayerEvent>> {
        let streams = self
            .streams
            .read()
            .map_err(|_| CostingError::concurrent("ledger lock poisoned"))?;

        let mut latest: Vec<CostLayerEvent> = streams
            .iter()
            .filter(|(key, _)| key.tenant_id == tenant_id)
            .filter_map(|(_, stream)| stream.last().cloned())
            .collect();

        // Deterministic output order for reporting.
        latest.sort_by(|a, b| {
            (a.item_id, a.location_id).cmp(&(b.item_id, b.location_id))
        });
        Ok(latest)
    }

    fn events_for_tenant(&self, tenant_id: TenantId) -> CostingResult<Vec<CostLayerEvent>> {
        let streams = self
            .streams
            .read()
            .map_err(|_| CostingError::concurrent("ledger lock poisoned"))?;

        let mut events: Vec<CostLayerEvent> = streams
            .iter()
            .filter(|(key, _)| key.tenant_id == tenant_id)
            .flat_map(|(_, stream)| stream.iter().cloned())
            .collect();

        events.sort_by(|a, b| {
            (a.occurred_at, a.key(), a.sequence_number)
                .cmp(&(b.occurred_at, b.key(), b.sequence_number))
        });
        Ok(events)
    }
}
