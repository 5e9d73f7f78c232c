//! Receipt records and their expansion into one row per purchased item.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{ConvertError, Result};

pub const BASE_COLUMNS: [&str; 7] = [
    "receipt_uuid",
    "points_earned",
    "purchase_date",
    "purchased_item_count",
    "rewards_receipt_status",
    "total_spent",
    "user_id",
];

pub const ITEM_COLUMNS: [&str; 12] = [
    "barcode",
    "description",
    "final_price",
    "item_price",
    "needs_fetch_review",
    "partner_item_id",
    "prevent_target_gap_points",
    "quantity_purchased",
    "user_flagged_barcode",
    "user_flagged_new_item",
    "user_flagged_price",
    "user_flagged_quantity",
];

const ITEM_LIST_KEY: &str = "rewardsReceiptItemList";
const MONGO_DATE_KEY: &str = "$date";
const MONGO_NUMBER_LONG_KEY: &str = "$numberLong";

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseDate {
    /// Converted from a `{"$date": <millis>}` wrapper
    Timestamp(DateTime<Utc>),
    /// Anything else, kept exactly as it appeared (including null)
    Raw(Value),
}

impl PurchaseDate {
    fn to_cell(&self) -> Option<Value> {
        match self {
            PurchaseDate::Timestamp(ts) => Some(Value::String(format_timestamp(ts))),
            PurchaseDate::Raw(Value::Null) => None,
            PurchaseDate::Raw(v) => Some(v.clone()),
        }
    }
}

/// Receipt-level fields shared by every row expanded from one receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptRow {
    pub receipt_uuid: Option<String>,
    pub points_earned: f64,
    pub purchase_date: PurchaseDate,
    pub purchased_item_count: Value,
    pub rewards_receipt_status: Option<String>,
    pub total_spent: f64,
    pub user_id: Option<String>,
}

impl ReceiptRow {
    /// Read the base fields, filling defaults for anything missing.
    pub fn from_object(receipt: &Map<String, Value>) -> Result<Self> {
        // Exports carry no separate receipt id here, so userId doubles as one
        let user_id = text_field(receipt, "userId");
        Ok(Self {
            receipt_uuid: user_id.clone(),
            points_earned: float_field(receipt, "pointsEarned")?,
            purchase_date: convert_mongo_date(receipt.get("purchaseDate"))?,
            purchased_item_count: value_field(receipt, "purchasedItemCount", Value::from(0)),
            rewards_receipt_status: text_field(receipt, "rewardsReceiptStatus"),
            total_spent: float_field(receipt, "totalSpent")?,
            user_id,
        })
    }

    pub fn cells(&self) -> Vec<Option<Value>> {
        vec![
            self.receipt_uuid.clone().map(Value::String),
            float_cell(self.points_earned),
            self.purchase_date.to_cell(),
            non_null(&self.purchased_item_count),
            self.rewards_receipt_status.clone().map(Value::String),
            float_cell(self.total_spent),
            self.user_id.clone().map(Value::String),
        ]
    }
}

/// Fields of one purchased item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFields {
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub final_price: f64,
    pub item_price: f64,
    pub needs_fetch_review: Value,
    pub partner_item_id: Option<String>,
    pub prevent_target_gap_points: Value,
    pub quantity_purchased: Value,
    pub user_flagged_barcode: Option<String>,
    pub user_flagged_new_item: Value,
    pub user_flagged_price: f64,
    pub user_flagged_quantity: Value,
}

impl ItemFields {
    pub fn from_object(item: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            barcode: text_field(item, "barcode"),
            description: text_field(item, "description"),
            final_price: float_field(item, "finalPrice")?,
            item_price: float_field(item, "itemPrice")?,
            needs_fetch_review: value_field(item, "needsFetchReview", Value::Bool(false)),
            partner_item_id: text_field(item, "partnerItemId"),
            prevent_target_gap_points: value_field(item, "preventTargetGapPoints", Value::Bool(false)),
            quantity_purchased: value_field(item, "quantityPurchased", Value::from(1)),
            user_flagged_barcode: text_field(item, "userFlaggedBarcode"),
            user_flagged_new_item: value_field(item, "userFlaggedNewItem", Value::Bool(false)),
            user_flagged_price: float_field(item, "userFlaggedPrice")?,
            user_flagged_quantity: value_field(item, "userFlaggedQuantity", Value::from(1)),
        })
    }

    pub fn cells(&self) -> Vec<Option<Value>> {
        vec![
            self.barcode.clone().map(Value::String),
            self.description.clone().map(Value::String),
            float_cell(self.final_price),
            float_cell(self.item_price),
            non_null(&self.needs_fetch_review),
            self.partner_item_id.clone().map(Value::String),
            non_null(&self.prevent_target_gap_points),
            non_null(&self.quantity_purchased),
            self.user_flagged_barcode.clone().map(Value::String),
            non_null(&self.user_flagged_new_item),
            float_cell(self.user_flagged_price),
            non_null(&self.user_flagged_quantity),
        ]
    }
}

/// One output row: the receipt's base fields plus at most one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedRow {
    pub base: ReceiptRow,
    pub item: Option<ItemFields>,
}

impl ExpandedRow {
    /// Cells for either the base columns only or base plus item columns.
    pub fn cells(&self, with_item_columns: bool) -> Vec<Option<Value>> {
        let mut cells = self.base.cells();
        if with_item_columns {
            match &self.item {
                Some(item) => cells.extend(item.cells()),
                None => cells.extend(std::iter::repeat(None).take(ITEM_COLUMNS.len())),
            }
        }
        cells
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub base: ReceiptRow,
    /// `None` when the item list is missing or is not an array
    pub items: Option<Vec<ItemFields>>,
}

impl Receipt {
    pub fn from_value(value: &Value) -> Result<Self> {
        let receipt = value
            .as_object()
            .ok_or_else(|| ConvertError::InvalidRecord("receipt is not a JSON object".to_string()))?;

        let base = ReceiptRow::from_object(receipt)?;
        let items = match receipt.get(ITEM_LIST_KEY) {
            Some(Value::Array(list)) => Some(
                list.iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::Object(obj) => ItemFields::from_object(obj),
                        _ => Err(ConvertError::InvalidRecord(format!(
                            "item {i} of {ITEM_LIST_KEY} is not a JSON object"
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            _ => None,
        };

        Ok(Self { base, items })
    }

    /// One row per item, or a single base-only row when there is no item
    /// list. An empty list also yields the single base row.
    pub fn expand(&self) -> Vec<ExpandedRow> {
        match &self.items {
            Some(items) if !items.is_empty() => items
                .iter()
                .map(|item| ExpandedRow {
                    base: self.base.clone(),
                    item: Some(item.clone()),
                })
                .collect(),
            _ => vec![ExpandedRow {
                base: self.base.clone(),
                item: None,
            }],
        }
    }
}

/// Unwrap a MongoDB `{"$date": ...}` wrapper into a UTC timestamp.
///
/// The wrapped value may be epoch milliseconds (number, numeric string or
/// `{"$numberLong": "..."}`) or an RFC 3339 string. Values without a
/// `$date` key pass through untouched.
pub fn convert_mongo_date(value: Option<&Value>) -> Result<PurchaseDate> {
    match value {
        Some(Value::Object(map)) => match map.get(MONGO_DATE_KEY) {
            Some(inner) => parse_mongo_timestamp(inner).map(PurchaseDate::Timestamp),
            None => Ok(PurchaseDate::Raw(Value::Object(map.clone()))),
        },
        Some(other) => Ok(PurchaseDate::Raw(other.clone())),
        None => Ok(PurchaseDate::Raw(Value::Null)),
    }
}

fn parse_mongo_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    let invalid = || ConvertError::InvalidTimestamp(value.to_string());
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(ms) => DateTime::from_timestamp_millis(ms).ok_or_else(invalid),
            None => n.as_f64().and_then(millis_f64_to_datetime).ok_or_else(invalid),
        },
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ms) = s.parse::<i64>() {
                DateTime::from_timestamp_millis(ms).ok_or_else(invalid)
            } else if let Ok(ms) = s.parse::<f64>() {
                millis_f64_to_datetime(ms).ok_or_else(invalid)
            } else {
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| invalid())
            }
        }
        Value::Object(map) => match map.get(MONGO_NUMBER_LONG_KEY) {
            Some(inner @ Value::String(_)) => parse_mongo_timestamp(inner),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

fn millis_f64_to_datetime(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    let micros = (ms * 1000.0).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

/// `2023-11-14 22:13:20`, with microseconds appended only when present.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    if ts.timestamp_subsec_nanos() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Numeric field coerced to `f64`; absent or null reads as `0.0`.
/// Numeric strings such as `"500.0"` are accepted since exports store
/// many amounts as text.
fn float_field(obj: &Map<String, Value>, key: &str) -> Result<f64> {
    let invalid = |value: &Value| ConvertError::InvalidNumber {
        field: key.to_string(),
        value: value.to_string(),
    };
    match obj.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(v @ Value::Number(n)) => n.as_f64().ok_or_else(|| invalid(v)),
        Some(v @ Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid(v)),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(v) => Err(invalid(v)),
    }
}

fn value_field(obj: &Map<String, Value>, key: &str, default: Value) -> Value {
    obj.get(key).cloned().unwrap_or(default)
}

fn float_cell(v: f64) -> Option<Value> {
    non_null(&Value::from(v))
}

fn non_null(v: &Value) -> Option<Value> {
    match v {
        Value::Null => None,
        other => Some(other.clone()),
    }
}
