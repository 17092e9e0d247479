use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stocktally_core::{
    CurrencyCode, ExpectedVersion, ItemId, LocationId, ReceiptId, ReceiptLineId, TenantId, UserId,
};
use stocktally_ledger::{
    AppendRequest, CostEventType, CostLedger, InMemoryCostLedger, SourceRef,
};

/// Naive mutable running total: one row per key, updated in place
/// (no events, no history, no snapshots).
#[derive(Debug, Default)]
struct NaiveRunningTotal {
    inner: Arc<RwLock<HashMap<(TenantId, ItemId, LocationId), (Decimal, Decimal)>>>,
}

impl NaiveRunningTotal {
    fn apply(
        &self,
        tenant: TenantId,
        item: ItemId,
        location: LocationId,
        qty_delta: Decimal,
        unit_cost: Decimal,
    ) {
        let mut map = self.inner.write().unwrap();
        let entry = map
            .entry((tenant, item, location))
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        let (qty, wac) = *entry;
        let new_qty = qty + qty_delta;
        let new_wac = if new_qty > Decimal::ZERO && qty >= Decimal::ZERO {
            (qty * wac + qty_delta * unit_cost) / new_qty
        } else {
            Decimal::ZERO
        };
        *entry = (new_qty, new_wac);
    }
}

fn append_request(
    tenant: TenantId,
    item: ItemId,
    location: LocationId,
    qty_delta: Decimal,
    unit_cost: Decimal,
) -> AppendRequest {
    AppendRequest {
        tenant_id: tenant,
        item_id: item,
        location_id: location,
        event_type: CostEventType::GoodsReceipt,
        qty_delta,
        unit_cost,
        landed_cost_per_unit: Decimal::ZERO,
        currency: CurrencyCode::new("USD").unwrap(),
        source: SourceRef {
            receipt_id: ReceiptId::new(),
            line_id: ReceiptLineId::new(),
        },
        created_by: UserId::new(),
        occurred_at: Utc::now(),
        expected_version: ExpectedVersion::Any,
    }
}

fn bench_append_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_append");
    group.throughput(Throughput::Elements(1));

    group.bench_function("event_ledger_append_with_wac", |b| {
        let ledger = InMemoryCostLedger::default();
        let tenant = TenantId::new();
        let item = ItemId::new();
        let location = LocationId::new();
        b.iter(|| {
            let ev = ledger
                .append(append_request(
                    tenant,
                    item,
                    location,
                    Decimal::ONE,
                    Decimal::new(125, 2),
                ))
                .unwrap();
            black_box(ev.wac_at_event);
        });
    });

    group.bench_function("naive_running_total", |b| {
        let store = NaiveRunningTotal::default();
        let tenant = TenantId::new();
        let item = ItemId::new();
        let location = LocationId::new();
        b.iter(|| {
            store.apply(tenant, item, location, Decimal::ONE, Decimal::new(125, 2));
        });
    });

    group.finish();
}

fn bench_valuation_read(c: &mut Criterion) {
    let ledger = InMemoryCostLedger::default();
    let tenant = TenantId::new();
    let location = LocationId::new();
    for _ in 0..100 {
        let item = ItemId::new();
        for _ in 0..10 {
            ledger
                .append(append_request(
                    tenant,
                    item,
                    location,
                    Decimal::from(10),
                    Decimal::new(199, 2),
                ))
                .unwrap();
        }
    }

    c.bench_function("latest_snapshots_100_keys", |b| {
        b.iter(|| {
            let snaps = ledger.latest_snapshots(black_box(tenant)).unwrap();
            black_box(snaps.len());
        });
    });
}

criterion_group!(benches, bench_append_throughput, bench_valuation_read);
criterion_main!(benches);
