use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stocktally_core::{
    CostingError, CostingResult, CurrencyCode, ItemId, LocationId, OrderLineId, ReceiptId,
    ReceiptLineId, TenantId,
};

/// Goods receipt status lifecycle.
///
/// Draft → Posted → Reversed. A Posted receipt has zero or one reversal; a
/// Reversed receipt can never be reversed again. Once Posted, a receipt is
/// never physically deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Draft,
    Posted,
    Reversed,
}

/// One line of a goods receipt.
///
/// `qty_received` is negative on reversal mirror lines. Mirror lines keep
/// the original `line_id`: the reversal idempotency key prefix keeps the
/// two directions collision-free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceiptLine {
    pub line_id: ReceiptLineId,
    pub line_no: u32,
    pub item_id: ItemId,
    pub qty_received: Decimal,
    pub unit_cost: Decimal,
    pub currency: CurrencyCode,
    /// Back-reference to the purchase-order line this receives against.
    pub order_line_id: Option<OrderLineId>,
}

impl GoodsReceiptLine {
    /// Line value at supplier cost (the BY_VALUE allocation weight).
    pub fn value(&self) -> Decimal {
        self.qty_received * self.unit_cost
    }
}

/// An outstanding purchase-order line a draft can be pre-populated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingLine {
    pub order_line_id: OrderLineId,
    pub item_id: ItemId,
    pub qty_outstanding: Decimal,
    pub unit_cost: Decimal,
    pub currency: CurrencyCode,
}

/// Header for one receiving transaction against a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceipt {
    id: ReceiptId,
    tenant_id: TenantId,
    location_id: LocationId,
    status: ReceiptStatus,
    lines: Vec<GoodsReceiptLine>,

    /// Set on a mirror receipt: the receipt it reverses.
    reversal_of: Option<ReceiptId>,
    /// Set on the original once a mirror exists.
    reversed_by: Option<ReceiptId>,
    /// Caller-supplied reason, carried on the mirror.
    reversal_reason: Option<String>,

    created_at: DateTime<Utc>,
    posted_at: Option<DateTime<Utc>>,
}

impl GoodsReceipt {
    /// Create an empty draft.
    pub fn draft(
        id: ReceiptId,
        tenant_id: TenantId,
        location_id: LocationId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            location_id,
            status: ReceiptStatus::Draft,
            lines: Vec::new(),
            reversal_of: None,
            reversed_by: None,
            reversal_reason: None,
            created_at,
            posted_at: None,
        }
    }

    /// Create a draft pre-populated from outstanding purchase-order lines.
    ///
    /// Lines with nothing outstanding are skipped.
    pub fn draft_from_order(
        id: ReceiptId,
        tenant_id: TenantId,
        location_id: LocationId,
        outstanding: &[OutstandingLine],
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut receipt = Self::draft(id, tenant_id, location_id, created_at);
        for line in outstanding {
            if line.qty_outstanding <= Decimal::ZERO {
                continue;
            }
            receipt.push_line(
                line.item_id,
                line.qty_outstanding,
                line.unit_cost,
                line.currency,
                Some(line.order_line_id),
            );
        }
        receipt
    }

    pub fn id(&self) -> ReceiptId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn location_id(&self) -> LocationId {
        self.location_id
    }

    pub fn status(&self) -> ReceiptStatus {
        self.status
    }

    pub fn lines(&self) -> &[GoodsReceiptLine] {
        &self.lines
    }

    pub fn reversal_of(&self) -> Option<ReceiptId> {
        self.reversal_of
    }

    pub fn reversed_by(&self) -> Option<ReceiptId> {
        self.reversed_by
    }

    pub fn reversal_reason(&self) -> Option<&str> {
        self.reversal_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.posted_at
    }

    /// Add a line to a draft.
    pub fn add_line(
        &mut self,
        item_id: ItemId,
        qty_received: Decimal,
        unit_cost: Decimal,
        currency: CurrencyCode,
        order_line_id: Option<OrderLineId>,
    ) -> CostingResult<ReceiptLineId> {
        if self.status != ReceiptStatus::Draft {
            return Err(CostingError::precondition(
                "lines can only be added to a draft receipt",
            ));
        }
        if qty_received <= Decimal::ZERO {
            return Err(CostingError::invalid_quantity(
                "received quantity must be positive",
            ));
        }
        Ok(self.push_line(item_id, qty_received, unit_cost, currency, order_line_id))
    }

    fn push_line(
        &mut self,
        item_id: ItemId,
        qty_received: Decimal,
        unit_cost: Decimal,
        currency: CurrencyCode,
        order_line_id: Option<OrderLineId>,
    ) -> ReceiptLineId {
        let line_id = ReceiptLineId::new();
        let line_no = (self.lines.len() as u32) + 1;
        self.lines.push(GoodsReceiptLine {
            line_id,
            line_no,
            item_id,
            qty_received,
            unit_cost,
            currency,
            order_line_id,
        });
        line_id
    }

    /// Check the preconditions for posting.
    ///
    /// A postable receipt is Draft, has at least one line, every line has a
    /// non-zero unit cost, and all lines share one currency (the WAC is
    /// currency-scoped; conversion is out of scope).
    pub fn ensure_postable(&self) -> CostingResult<()> {
        if self.status != ReceiptStatus::Draft {
            return Err(CostingError::precondition(format!(
                "only draft receipts can be posted (status: {:?})",
                self.status
            )));
        }
        if self.lines.is_empty() {
            return Err(CostingError::precondition(
                "cannot post a receipt without lines",
            ));
        }
        for line in &self.lines {
            if line.unit_cost.is_zero() {
                return Err(CostingError::precondition(format!(
                    "line {} has a zero unit cost",
                    line.line_no
                )));
            }
        }
        let first = self.lines[0].currency;
        if self.lines.iter().any(|l| l.currency != first) {
            return Err(CostingError::precondition(
                "receipt lines carry mixed currencies",
            ));
        }
        Ok(())
    }

    pub fn mark_posted(&mut self, at: DateTime<Utc>) {
        self.status = ReceiptStatus::Posted;
        self.posted_at = Some(at);
    }

    /// Check the preconditions for reversing.
    ///
    /// `AlreadyReversed` is reported once a reversal has *completed* (the
    /// receipt is Reversed); an incomplete reversal (mirror still Draft) is
    /// resumable and passes this check.
    pub fn ensure_reversible(&self) -> CostingResult<()> {
        match self.status {
            ReceiptStatus::Posted => Ok(()),
            ReceiptStatus::Reversed => Err(CostingError::AlreadyReversed),
            ReceiptStatus::Draft => Err(CostingError::precondition(
                "only posted receipts can be reversed",
            )),
        }
    }

    /// Build the mirror receipt for a reversal: negated quantities, same
    /// unit costs, same line ids, linked via `reversal_of`.
    pub fn mirror(
        &self,
        mirror_id: ReceiptId,
        reason: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> GoodsReceipt {
        let lines = self
            .lines
            .iter()
            .map(|l| GoodsReceiptLine {
                line_id: l.line_id,
                line_no: l.line_no,
                item_id: l.item_id,
                qty_received: -l.qty_received,
                unit_cost: l.unit_cost,
                currency: l.currency,
                order_line_id: l.order_line_id,
            })
            .collect();

        GoodsReceipt {
            id: mirror_id,
            tenant_id: self.tenant_id,
            location_id: self.location_id,
            status: ReceiptStatus::Draft,
            lines,
            reversal_of: Some(self.id),
            reversed_by: None,
            reversal_reason: Some(reason.into()),
            created_at,
            posted_at: None,
        }
    }

    /// Record the 1:1 mirror link on the original.
    pub fn link_reversal(&mut self, mirror_id: ReceiptId) -> CostingResult<()> {
        match self.reversed_by {
            None => {
                self.reversed_by = Some(mirror_id);
                Ok(())
            }
            Some(existing) if existing == mirror_id => Ok(()),
            Some(_) => Err(CostingError::AlreadyReversed),
        }
    }

    pub fn mark_reversed(&mut self) {
        self.status = ReceiptStatus::Reversed;
    }
}
