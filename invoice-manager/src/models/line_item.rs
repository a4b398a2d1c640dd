//! Line item model for invoice-manager.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit assigned to new line items.
pub const DEFAULT_UNIT: &str = "item";

/// Line item on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub document_id: Uuid,
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// Input for inserting a line item; the store assigns id and document.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub sort_order: i32,
}

/// Editable line as held by a draft.
///
/// `amount` is accepted on input only for symmetry with the output shape;
/// it is recomputed from quantity and rate before anything reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemInput {
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    #[serde(default)]
    pub rate: Decimal,
    #[serde(default)]
    pub amount: Decimal,
}

/// Partial update of one draft line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItemPatch {
    pub description: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<Decimal>,
    pub rate: Option<Decimal>,
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

impl Default for LineItemInput {
    fn default() -> Self {
        Self {
            description: String::new(),
            unit: default_unit(),
            quantity: Decimal::ONE,
            rate: Decimal::ZERO,
            amount: Decimal::ZERO,
        }
    }
}

impl From<&LineItem> for LineItemInput {
    fn from(item: &LineItem) -> Self {
        Self {
            description: item.description.clone(),
            unit: if item.unit.is_empty() {
                default_unit()
            } else {
                item.unit.clone()
            },
            quantity: item.quantity,
            rate: item.rate,
            amount: item.amount,
        }
    }
}
