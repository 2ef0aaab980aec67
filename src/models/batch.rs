use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Sku;

/// One requested line in a batch: a barcode (SKU) and a positive quantity.
/// The core assumes cleaned input — non-positive quantities are rejected
/// by the upstream parser, not here (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLineItem {
    pub barcode: String,
    pub quantity: u32,
}

impl BatchLineItem {
    pub fn sku(&self) -> Sku {
        Sku::new(self.barcode.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStatus {
    Completed,
    Partial,
    Failed,
}

/// One bin touched while executing a line, returned for caller display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickedBin {
    pub bin_code: String,
    pub quantity: u32,
    pub fifo_reason: String,
    pub is_mixed: bool,
    pub pick_order: usize,
}

/// Outcome of one batch line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineResult {
    pub barcode: String,
    pub quantity: u32,
    pub status: LineStatus,
    pub locations: Vec<String>,
    pub picked_qty: Option<u32>,
    pub available_qty: Option<u32>,
    pub shortfall: Option<u32>,
    pub error: Option<String>,
    pub picked_bins: Option<Vec<PickedBin>>,
}

impl LineResult {
    pub fn completed(barcode: String, quantity: u32, locations: Vec<String>) -> Self {
        Self {
            barcode,
            quantity,
            status: LineStatus::Completed,
            locations,
            picked_qty: None,
            available_qty: None,
            shortfall: None,
            error: None,
            picked_bins: None,
        }
    }

    pub fn failed(barcode: String, quantity: u32, error: impl Into<String>) -> Self {
        Self {
            barcode,
            quantity,
            status: LineStatus::Failed,
            locations: Vec::new(),
            picked_qty: None,
            available_qty: None,
            shortfall: None,
            error: Some(error.into()),
            picked_bins: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Putaway,
    Pick,
}

/// Summary of an entire batch execution, matching §6's external output
/// contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub partial: usize,
    pub failed: usize,
    pub executed_at: DateTime<Utc>,
    pub warehouse_id: String,
    pub mixed_bins: usize,
    pub operation_type: OperationType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub items: Vec<LineResult>,
    pub summary: BatchSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The external interface (§6) is consumed as JSON by callers the way
    /// the source's axum handlers serialize responses; confirm the round
    /// trip holds for a representative result.
    #[test]
    fn batch_result_round_trips_through_json() {
        let result = BatchResult {
            items: vec![LineResult::completed(
                "SKU001".to_string(),
                5,
                vec!["B1".to_string()],
            )],
            summary: BatchSummary {
                total: 1,
                successful: 1,
                partial: 0,
                failed: 0,
                executed_at: Utc::now(),
                warehouse_id: "WH1".to_string(),
                mixed_bins: 0,
                operation_type: OperationType::Pick,
            },
        };

        let json = serde_json::to_value(&result).expect("serializable");
        assert_eq!(json["items"][0]["barcode"], "SKU001");
        assert_eq!(json["summary"]["warehouse_id"], "WH1");

        let decoded: BatchResult = serde_json::from_value(json).expect("deserializable");
        assert_eq!(decoded.items[0].barcode, "SKU001");
    }
}
