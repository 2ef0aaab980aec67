use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Sku;

pub type WarehouseId = String;
pub type BinId = String;

/// A single SKU's holding inside a bin: quantity plus the optional lot
/// metadata FIFO ordering reads from. Used both for the bin's primary
/// record (pure bins) and for each entry of a mixed bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuRecord {
    pub sku: Sku,
    pub quantity: u32,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub lot_date: Option<NaiveDate>,
}

impl SkuRecord {
    pub fn new(sku: Sku, quantity: u32) -> Self {
        Self {
            sku,
            quantity,
            lot_number: None,
            expiry_date: None,
            lot_date: None,
        }
    }

    pub fn with_lot(mut self, lot_number: Option<String>, expiry_date: Option<NaiveDate>) -> Self {
        self.lot_number = lot_number;
        self.expiry_date = expiry_date;
        self
    }

    /// Whether two records should be merged on put-away: identical
    /// `(sku, lot, expiry)` per §4.5.1.
    fn merge_key_matches(&self, sku: &Sku, lot_number: &Option<String>, expiry_date: &Option<NaiveDate>) -> bool {
        &self.sku == sku && &self.lot_number == lot_number && &self.expiry_date == expiry_date
    }
}

/// Tagged content of a bin: empty, a single SKU (pure), or two-or-more SKUs
/// sharing the bin (mixed). Modeled as a sum type per the design notes
/// rather than nullable fields on one record, so an invalid state (e.g. a
/// "mixed" bin with one entry) is unrepresentable outside this module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BinContent {
    Empty,
    Pure(SkuRecord),
    Mixed(Vec<SkuRecord>),
}

impl BinContent {
    pub fn current_qty(&self) -> u32 {
        match self {
            BinContent::Empty => 0,
            BinContent::Pure(record) => record.quantity,
            BinContent::Mixed(records) => records.iter().map(|r| r.quantity).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BinContent::Empty)
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, BinContent::Mixed(_))
    }

    /// Display SKU: the sole SKU of a pure bin, or the original primary of
    /// a mixed bin (the first entry, by construction — see `put_away`).
    pub fn primary_sku(&self) -> Option<&Sku> {
        match self {
            BinContent::Empty => None,
            BinContent::Pure(record) => Some(&record.sku),
            BinContent::Mixed(records) => records.first().map(|r| &r.sku),
        }
    }

    pub fn contains_sku(&self, sku: &Sku) -> bool {
        match self {
            BinContent::Empty => false,
            BinContent::Pure(record) => &record.sku == sku,
            BinContent::Mixed(records) => records.iter().any(|r| &r.sku == sku),
        }
    }

    /// Quantity of a specific SKU in this bin. Never `currentQty` for a
    /// mixed bin — the fix the source made: mixed bins must always be
    /// inspected per-SKU.
    pub fn quantity_of(&self, sku: &Sku) -> u32 {
        match self {
            BinContent::Empty => 0,
            BinContent::Pure(record) if &record.sku == sku => record.quantity,
            BinContent::Pure(_) => 0,
            BinContent::Mixed(records) => records
                .iter()
                .filter(|r| &r.sku == sku)
                .map(|r| r.quantity)
                .sum(),
        }
    }

    /// The record FIFO ordering reads lot/expiry metadata from for `sku`.
    /// For a mixed bin with multiple lots of the same SKU this returns the
    /// first matching record; splitting FIFO across same-SKU multi-lot
    /// mixed entries is not modeled (not exercised by the source).
    pub fn record_for(&self, sku: &Sku) -> Option<&SkuRecord> {
        match self {
            BinContent::Empty => None,
            BinContent::Pure(record) if &record.sku == sku => Some(record),
            BinContent::Pure(_) => None,
            BinContent::Mixed(records) => records.iter().find(|r| &r.sku == sku),
        }
    }

    /// Apply a put-away of `add_qty` of `sku` to this content, returning
    /// the new content and the classification per §4.5.1. Does not check
    /// capacity — the caller validates `available_space >= add_qty` first.
    pub fn put_away(
        &self,
        sku: &Sku,
        add_qty: u32,
        lot_number: Option<String>,
        expiry_date: Option<NaiveDate>,
        lot_date: Option<NaiveDate>,
    ) -> (BinContent, PutawayClassification) {
        match self {
            BinContent::Empty => {
                let mut record = SkuRecord::new(sku.clone(), add_qty);
                record.lot_number = lot_number;
                record.expiry_date = expiry_date;
                record.lot_date = lot_date;
                (BinContent::Pure(record), PutawayClassification::NewPlacement)
            }
            BinContent::Pure(existing) if &existing.sku == sku => {
                let mut record = existing.clone();
                record.quantity += add_qty;
                if lot_number.is_some() || expiry_date.is_some() || lot_date.is_some() {
                    record.lot_number = lot_number;
                    record.expiry_date = expiry_date;
                    record.lot_date = lot_date;
                }
                (
                    BinContent::Pure(record),
                    PutawayClassification::SameSkuConsolidation,
                )
            }
            BinContent::Pure(existing) => {
                let mut records = vec![existing.clone()];
                merge_or_append(&mut records, sku, add_qty, lot_number, expiry_date, lot_date);
                (
                    BinContent::Mixed(records),
                    PutawayClassification::MixedSkuStorage,
                )
            }
            BinContent::Mixed(existing) => {
                let mut records = existing.clone();
                merge_or_append(&mut records, sku, add_qty, lot_number, expiry_date, lot_date);
                (
                    BinContent::Mixed(records),
                    PutawayClassification::MixedSkuStorage,
                )
            }
        }
    }

    /// Apply a pick of `pick_qty` of `sku`, returning the new content and
    /// whether the source bin was mixed at the time of the pick. Fails if
    /// `sku` isn't present or doesn't hold enough quantity.
    pub fn pick(&self, sku: &Sku, pick_qty: u32) -> Option<(BinContent, bool)> {
        match self {
            BinContent::Empty => None,
            BinContent::Pure(record) => {
                if &record.sku != sku || record.quantity < pick_qty {
                    return None;
                }
                let remaining = record.quantity - pick_qty;
                if remaining == 0 {
                    Some((BinContent::Empty, false))
                } else {
                    let mut record = record.clone();
                    record.quantity = remaining;
                    Some((BinContent::Pure(record), false))
                }
            }
            BinContent::Mixed(records) => {
                let available = records
                    .iter()
                    .find(|r| &r.sku == sku)
                    .map(|r| r.quantity)?;
                if available < pick_qty {
                    return None;
                }
                let mut remaining_records: Vec<SkuRecord> = Vec::with_capacity(records.len());
                for record in records {
                    if &record.sku == sku {
                        let left = record.quantity - pick_qty;
                        if left > 0 {
                            let mut updated = record.clone();
                            updated.quantity = left;
                            remaining_records.push(updated);
                        }
                    } else {
                        remaining_records.push(record.clone());
                    }
                }
                let collapsed = match remaining_records.len() {
                    0 => BinContent::Empty,
                    1 => BinContent::Pure(remaining_records.into_iter().next().unwrap()),
                    _ => BinContent::Mixed(remaining_records),
                };
                Some((collapsed, true))
            }
        }
    }
}

fn merge_or_append(
    records: &mut Vec<SkuRecord>,
    sku: &Sku,
    add_qty: u32,
    lot_number: Option<String>,
    expiry_date: Option<NaiveDate>,
    lot_date: Option<NaiveDate>,
) {
    if let Some(existing) = records
        .iter_mut()
        .find(|r| r.merge_key_matches(sku, &lot_number, &expiry_date))
    {
        existing.quantity += add_qty;
    } else {
        let mut record = SkuRecord::new(sku.clone(), add_qty);
        record.lot_number = lot_number;
        record.expiry_date = expiry_date;
        record.lot_date = lot_date;
        records.push(record);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutawayClassification {
    NewPlacement,
    SameSkuConsolidation,
    MixedSkuStorage,
}

impl PutawayClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            PutawayClassification::NewPlacement => "NEW_PLACEMENT",
            PutawayClassification::SameSkuConsolidation => "SAME_SKU_CONSOLIDATION",
            PutawayClassification::MixedSkuStorage => "MIXED_SKU_STORAGE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinStatus {
    Available,
    Occupied,
    Disabled,
}

/// An addressable storage cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bin {
    pub bin_id: BinId,
    pub code: String,
    pub warehouse_id: WarehouseId,
    pub rack_code: String,
    pub grid_level: u32,
    pub position: u32,
    pub capacity: u32,
    pub status: BinStatus,
    pub content: BinContent,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Bin {
    pub fn new_empty(
        bin_id: impl Into<BinId>,
        code: impl Into<String>,
        warehouse_id: impl Into<WarehouseId>,
        rack_code: impl Into<String>,
        grid_level: u32,
        position: u32,
        capacity: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            bin_id: bin_id.into(),
            code: code.into(),
            warehouse_id: warehouse_id.into(),
            rack_code: rack_code.into(),
            grid_level,
            position,
            capacity,
            status: BinStatus::Available,
            content: BinContent::Empty,
            created_at,
            version: 0,
        }
    }

    pub fn current_qty(&self) -> u32 {
        self.content.current_qty()
    }

    pub fn free_space(&self) -> u32 {
        self.capacity.saturating_sub(self.current_qty())
    }

    pub fn is_eligible(&self) -> bool {
        !matches!(self.status, BinStatus::Disabled)
    }

    pub fn contains_sku(&self, sku: &Sku) -> bool {
        self.content.contains_sku(sku)
    }

    pub fn quantity_of(&self, sku: &Sku) -> u32 {
        self.content.quantity_of(sku)
    }

    pub fn is_mixed(&self) -> bool {
        self.content.is_mixed()
    }

    /// Recompute `status` from `content`. Disabled status is sticky and is
    /// never overwritten by a content-derived status — a disabled bin stays
    /// disabled until an external setup path re-enables it.
    pub fn refresh_status(&mut self) {
        if matches!(self.status, BinStatus::Disabled) {
            return;
        }
        self.status = if self.content.is_empty() {
            BinStatus::Available
        } else {
            BinStatus::Occupied
        };
    }

    /// Invariant check for tests and for the in-memory store's
    /// post-commit assertion (§8 invariants 1-3).
    pub fn check_invariants(&self) -> Result<(), String> {
        let qty = self.current_qty();
        if qty > self.capacity {
            return Err(format!(
                "bin {} over capacity: {} > {}",
                self.code, qty, self.capacity
            ));
        }
        if matches!(self.status, BinStatus::Available) && qty != 0 {
            return Err(format!(
                "bin {} is available but has quantity {}",
                self.code, qty
            ));
        }
        if qty == 0 && matches!(self.status, BinStatus::Occupied) {
            return Err(format!(
                "bin {} is occupied but has zero quantity",
                self.code
            ));
        }
        if let BinContent::Mixed(records) = &self.content {
            if records.len() < 2 {
                return Err(format!(
                    "bin {} is mixed with fewer than two records",
                    self.code
                ));
            }
            if records.iter().any(|r| r.quantity == 0) {
                return Err(format!(
                    "bin {} has a zero-quantity mixed record",
                    self.code
                ));
            }
        }
        Ok(())
    }
}
