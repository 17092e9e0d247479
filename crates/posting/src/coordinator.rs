//! Posting/reversal orchestration.
//!
//! One `post` or `reverse` call walks the receipt's lines **strictly
//! sequentially**: the WAC recompute for a (tenant, item, location) key
//! must observe a monotonically ordered view of prior events, so lines are
//! never interleaved within a call. Distinct keys may be posted
//! concurrently by separate coordinator invocations.
//!
//! The external stock call and the local ledger write cannot be committed
//! atomically across the network boundary; instead each line is guarded by
//! an idempotency record, making the whole call safely re-entrant. A
//! failure mid-loop keeps earlier lines' effects and the receipt's
//! pre-call status; retrying resumes at the first unresolved line.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use stocktally_core::{
    CostingError, CostingResult, ExpectedVersion, ReceiptId, ReceiptLineId, TenantId, UserId,
};
use stocktally_ledger::{AppendRequest, CostEventType, CostLedger, SourceRef};
use stocktally_receiving::{
    allocator, AllocationMethod, GoodsReceipt, GoodsReceiptLine, LandedCost, ReceiptStatus,
};

use crate::idempotency::{
    IdempotencyKey, IdempotencyStatus, IdempotencyStore, PostingDirection,
    PostingIdempotencyRecord,
};
use crate::purchase_orders::OrderLineStore;
use crate::stock::StockGateway;
use crate::store::{AllocationStore, LandedCostStore, ReceiptStore};

/// Coordinator configuration.
#[derive(Debug, Copy, Clone)]
pub struct PostingConfig {
    /// Timeout handed to every external stock call.
    pub stock_call_timeout: Duration,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            stock_call_timeout: Duration::from_secs(30),
        }
    }
}

/// Orchestrates receiving and reversing goods receipts.
pub struct PostingCoordinator {
    receipts: Arc<dyn ReceiptStore>,
    landed_costs: Arc<dyn LandedCostStore>,
    allocations: Arc<dyn AllocationStore>,
    idempotency: Arc<dyn IdempotencyStore>,
    order_lines: Arc<dyn OrderLineStore>,
    stock: Arc<dyn StockGateway>,
    ledger: Arc<dyn CostLedger>,
    config: PostingConfig,
}

impl PostingCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        receipts: Arc<dyn ReceiptStore>,
        landed_costs: Arc<dyn LandedCostStore>,
        allocations: Arc<dyn AllocationStore>,
        idempotency: Arc<dyn IdempotencyStore>,
        order_lines: Arc<dyn OrderLineStore>,
        stock: Arc<dyn StockGateway>,
        ledger: Arc<dyn CostLedger>,
        config: PostingConfig,
    ) -> Self {
        Self {
            receipts,
            landed_costs,
            allocations,
            idempotency,
            order_lines,
            stock,
            ledger,
            config,
        }
    }

    /// Post a draft receipt: allocate pending landed costs, update stock
    /// and append a cost event per line, then mark the receipt posted and
    /// roll the received quantities onto the purchase order.
    pub fn post(
        &self,
        tenant_id: TenantId,
        receipt_id: ReceiptId,
        actor: UserId,
    ) -> CostingResult<GoodsReceipt> {
        let span = tracing::info_span!("post_receipt", receipt = %receipt_id);
        let _guard = span.enter();

        let mut receipt = self
            .receipts
            .get(tenant_id, receipt_id)
            .ok_or(CostingError::NotFound)?;
        receipt.ensure_postable()?;

        self.allocate_pending_landed_costs(tenant_id, &receipt)?;
        let landed_per_unit = self.landed_per_unit_by_line(tenant_id, &receipt);

        let mut lines = receipt.lines().to_vec();
        lines.sort_by_key(|l| l.line_no);
        for line in &lines {
            self.process_line(
                tenant_id,
                &receipt,
                line,
                PostingDirection::Posting,
                landed_per_unit
                    .get(&line.line_id)
                    .copied()
                    .unwrap_or(Decimal::ZERO),
                actor,
            )?;
        }

        receipt.mark_posted(Utc::now());
        self.receipts.upsert(tenant_id, receipt.clone());
        self.apply_order_deltas(tenant_id, &lines)?;

        tracing::info!(lines = lines.len(), "receipt posted");
        Ok(receipt)
    }

    /// Reverse a posted receipt through a posted mirror with negated
    /// quantities. The original becomes Reversed; on-hand quantities may go
    /// negative (the stock system is the arbiter of negative-stock policy).
    ///
    /// Retrying an interrupted reversal resumes the existing mirror rather
    /// than creating a second one: a fresh mirror would mint fresh
    /// idempotency keys and double-post the completed lines.
    pub fn reverse(
        &self,
        tenant_id: TenantId,
        receipt_id: ReceiptId,
        reason: &str,
        actor: UserId,
    ) -> CostingResult<GoodsReceipt> {
        let span = tracing::info_span!("reverse_receipt", receipt = %receipt_id);
        let _guard = span.enter();

        let mut original = self
            .receipts
            .get(tenant_id, receipt_id)
            .ok_or(CostingError::NotFound)?;
        original.ensure_reversible()?;

        let mut mirror = match original.reversed_by() {
            Some(mirror_id) => self
                .receipts
                .get(tenant_id, mirror_id)
                .ok_or(CostingError::NotFound)?,
            None => {
                let mirror = original.mirror(ReceiptId::new(), reason, Utc::now());
                original.link_reversal(mirror.id())?;
                self.receipts.upsert(tenant_id, original.clone());
                self.receipts.upsert(tenant_id, mirror.clone());
                mirror
            }
        };

        // Per-unit landed shares come from the original's allocations; the
        // mirror lines keep the original line ids, so the lookup carries
        // over and the negated quantity negates the landed effect.
        let landed_per_unit = self.landed_per_unit_by_line(tenant_id, &original);

        let mut lines = mirror.lines().to_vec();
        lines.sort_by_key(|l| l.line_no);
        for line in &lines {
            self.process_line(
                tenant_id,
                &mirror,
                line,
                PostingDirection::Reversal,
                landed_per_unit
                    .get(&line.line_id)
                    .copied()
                    .unwrap_or(Decimal::ZERO),
                actor,
            )?;
        }

        mirror.mark_posted(Utc::now());
        original.mark_reversed();
        self.receipts.upsert(tenant_id, mirror.clone());
        self.receipts.upsert(tenant_id, original);
        self.apply_order_deltas(tenant_id, &lines)?;

        tracing::info!(mirror = %mirror.id(), reason, "receipt reversed");
        Ok(mirror)
    }

    /// Attach a shared cost (freight, duty, ...) to a draft receipt.
    ///
    /// Only drafts accept landed costs: once posted, a receipt's cost
    /// events are already written and a late cost could no longer flow
    /// into them.
    pub fn attach_landed_cost(
        &self,
        tenant_id: TenantId,
        receipt_id: ReceiptId,
        description: &str,
        amount: Decimal,
        method: AllocationMethod,
    ) -> CostingResult<LandedCost> {
        let receipt = self
            .receipts
            .get(tenant_id, receipt_id)
            .ok_or(CostingError::NotFound)?;
        if receipt.status() != ReceiptStatus::Draft {
            return Err(CostingError::precondition(
                "landed costs can only be attached to a draft receipt",
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(CostingError::validation(
                "landed cost amount must be positive",
            ));
        }

        let landed = LandedCost::new(receipt_id, description, amount, method);
        self.landed_costs.upsert(tenant_id, landed.clone());
        Ok(landed)
    }

    /// List a receipt's idempotency records, for audit.
    pub fn posting_audit(
        &self,
        tenant_id: TenantId,
        receipt_id: ReceiptId,
    ) -> Vec<PostingIdempotencyRecord> {
        self.idempotency.list_for_receipt(tenant_id, receipt_id)
    }

    fn allocate_pending_landed_costs(
        &self,
        tenant_id: TenantId,
        receipt: &GoodsReceipt,
    ) -> CostingResult<()> {
        for mut landed in self.landed_costs.list_for_receipt(tenant_id, receipt.id()) {
            if landed.is_allocated {
                continue;
            }
            let allocations = allocator::allocate(&landed, receipt.lines())?;
            self.allocations.insert_all(tenant_id, &allocations);
            landed.mark_allocated()?;
            tracing::debug!(
                landed_cost = %landed.id,
                shares = allocations.len(),
                "landed cost allocated"
            );
            self.landed_costs.upsert(tenant_id, landed);
        }
        Ok(())
    }

    /// Total allocated landed cost per line, divided by the line's received
    /// quantity. The division is left unrounded; rounding happens once, at
    /// the WAC snapshot.
    fn landed_per_unit_by_line(
        &self,
        tenant_id: TenantId,
        receipt: &GoodsReceipt,
    ) -> HashMap<ReceiptLineId, Decimal> {
        let mut totals: HashMap<ReceiptLineId, Decimal> = HashMap::new();
        for allocation in self.allocations.list_for_receipt(tenant_id, receipt.id()) {
            *totals.entry(allocation.line_id).or_insert(Decimal::ZERO) += allocation.amount;
        }

        receipt
            .lines()
            .iter()
            .filter_map(|line| {
                if line.qty_received.is_zero() {
                    return None;
                }
                let total = totals.get(&line.line_id)?;
                Some((line.line_id, *total / line.qty_received))
            })
            .collect()
    }

    /// One line of the posting protocol: idempotency guard, stock update,
    /// ledger append, record bookkeeping.
    fn process_line(
        &self,
        tenant_id: TenantId,
        receipt: &GoodsReceipt,
        line: &GoodsReceiptLine,
        direction: PostingDirection,
        landed_cost_per_unit: Decimal,
        actor: UserId,
    ) -> CostingResult<()> {
        let key = IdempotencyKey::for_direction(direction, receipt.id(), line.line_id);

        if let Some(existing) = self.idempotency.get(tenant_id, &key) {
            if existing.status == IdempotencyStatus::Success {
                tracing::debug!(key = %key, line = line.line_no, "line already completed, skipping");
                return Ok(());
            }
        }

        let request = serde_json::json!({
            "item_id": line.item_id,
            "location_id": receipt.location_id(),
            "qty_delta": line.qty_received,
        });
        let mut record = PostingIdempotencyRecord::pending(
            key,
            receipt.id(),
            line.line_id,
            direction,
            request,
            Utc::now(),
        );
        self.idempotency.upsert(tenant_id, record.clone());

        let current = match self.stock.get_stock(
            tenant_id,
            line.item_id,
            receipt.location_id(),
            self.config.stock_call_timeout,
        ) {
            Ok(qty) => qty,
            Err(e) => return Err(self.fail_line(tenant_id, record, line, e.to_string())),
        };

        let update = match self.stock.update_stock(
            tenant_id,
            line.item_id,
            receipt.location_id(),
            current + line.qty_received,
            self.config.stock_call_timeout,
        ) {
            Ok(update) => update,
            Err(e) => return Err(self.fail_line(tenant_id, record, line, e.to_string())),
        };

        let event_type = match direction {
            PostingDirection::Posting => CostEventType::GoodsReceipt,
            PostingDirection::Reversal => CostEventType::GoodsReceiptReversal,
        };
        let appended = self.ledger.append(AppendRequest {
            tenant_id,
            item_id: line.item_id,
            location_id: receipt.location_id(),
            event_type,
            qty_delta: line.qty_received,
            unit_cost: line.unit_cost,
            landed_cost_per_unit,
            currency: line.currency,
            source: SourceRef {
                receipt_id: receipt.id(),
                line_id: line.line_id,
            },
            created_by: actor,
            occurred_at: Utc::now(),
            expected_version: ExpectedVersion::Any,
        });
        let event = match appended {
            Ok(event) => event,
            Err(e) => {
                record.mark_failed(e.to_string(), Utc::now());
                self.idempotency.upsert(tenant_id, record);
                return Err(e);
            }
        };

        record.mark_success(
            serde_json::json!({
                "new_qty": update.new_qty,
                "event_id": event.event_id,
                "wac_at_event": event.wac_at_event,
            }),
            Utc::now(),
        );
        self.idempotency.upsert(tenant_id, record);
        Ok(())
    }

    fn fail_line(
        &self,
        tenant_id: TenantId,
        mut record: PostingIdempotencyRecord,
        line: &GoodsReceiptLine,
        message: String,
    ) -> CostingError {
        record.mark_failed(&message, Utc::now());
        self.idempotency.upsert(tenant_id, record);
        tracing::warn!(line = line.line_no, error = %message, "stock call failed, aborting");
        CostingError::external(line.line_id, message)
    }

    fn apply_order_deltas(
        &self,
        tenant_id: TenantId,
        lines: &[GoodsReceiptLine],
    ) -> CostingResult<()> {
        for line in lines {
            if let Some(order_line_id) = line.order_line_id {
                self.order_lines
                    .adjust_received(tenant_id, order_line_id, line.qty_received)?;
            }
        }
        Ok(())
    }
}
