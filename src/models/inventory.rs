use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ValidationError;

/// Physical state of the units held under one inventory record.
/// Declaration order matches the Postgres enum, so `Ord` agrees with `ORDER BY condition`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "inventory_condition", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    New,
    OpenBox,
    Used,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "NEW",
            Condition::OpenBox => "OPEN_BOX",
            Condition::Used => "USED",
        }
    }
}

/// Whether quantity and restock level may currently be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "update_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateStatus {
    #[default]
    Enabled,
    Disabled,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Enabled => "ENABLED",
            UpdateStatus::Disabled => "DISABLED",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized token {0:?}")]
pub struct UnknownToken(pub String);

impl FromStr for Condition {
    type Err = UnknownToken;

    /// Names are matched case-sensitively: `NEW` parses, `new` does not.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Condition::New),
            "OPEN_BOX" => Ok(Condition::OpenBox),
            "USED" => Ok(Condition::Used),
            other => Err(UnknownToken(other.to_string())),
        }
    }
}

impl FromStr for UpdateStatus {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENABLED" => Ok(UpdateStatus::Enabled),
            "DISABLED" => Ok(UpdateStatus::Disabled),
            other => Err(UnknownToken(other.to_string())),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Key & record ──────────────────────────────────────────────────────────────

/// Composite primary key of the `inventory` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InventoryKey {
    pub product_id: i32,
    pub condition: Condition,
}

impl InventoryKey {
    pub fn new(product_id: i32, condition: Condition) -> Self {
        Self {
            product_id,
            condition,
        }
    }
}

impl fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.product_id, self.condition)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryRecord {
    pub product_id: i32,
    pub condition: Condition,
    pub quantity: i32,
    pub restock_level: i32,
    pub last_updated_on: DateTime<Utc>,
    pub can_update: UpdateStatus,
}

impl InventoryRecord {
    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(self.product_id, self.condition)
    }

    /// Stock has fallen below the configured restock level.
    pub fn needs_restock(&self) -> bool {
        self.quantity < self.restock_level
    }

    pub fn is_update_enabled(&self) -> bool {
        self.can_update == UpdateStatus::Enabled
    }
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// A validated create payload. `last_updated_on` is never taken from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInventory {
    pub product_id: i32,
    pub condition: Condition,
    pub quantity: i32,
    pub restock_level: i32,
    pub can_update: UpdateStatus,
}

impl NewInventory {
    pub fn from_json(data: &Value) -> Result<Self, ValidationError> {
        let obj = data.as_object().ok_or(ValidationError::NotAnObject)?;

        let can_update = match present(obj, "can_update") {
            Some(v) => parse_enum(v, "can_update")?,
            None => UpdateStatus::default(),
        };

        Ok(Self {
            product_id: int_field(required(obj, "product_id")?, "product_id", 1)?,
            condition: parse_enum(required(obj, "condition")?, "condition")?,
            quantity: int_field(required(obj, "quantity")?, "quantity", 1)?,
            restock_level: int_field(required(obj, "restock_level")?, "restock_level", 1)?,
            can_update,
        })
    }

    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(self.product_id, self.condition)
    }
}

/// A validated update payload. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryUpdate {
    pub quantity: Option<i32>,
    pub restock_level: Option<i32>,
}

impl InventoryUpdate {
    pub fn from_json(data: &Value) -> Result<Self, ValidationError> {
        let obj = data.as_object().ok_or(ValidationError::NotAnObject)?;
        Ok(Self {
            quantity: present(obj, "quantity")
                .map(|v| int_field(v, "quantity", 0))
                .transpose()?,
            restock_level: present(obj, "restock_level")
                .map(|v| int_field(v, "restock_level", 0))
                .transpose()?,
        })
    }

    pub fn apply_to(&self, record: &mut InventoryRecord) {
        if let Some(quantity) = self.quantity {
            record.quantity = quantity;
        }
        if let Some(restock_level) = self.restock_level {
            record.restock_level = restock_level;
        }
    }
}

// ── Query filters ─────────────────────────────────────────────────────────────

/// Narrowing applied to a listing: one condition, or everything needing restock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryFilter {
    Condition(Condition),
    Restock,
}

impl FromStr for InventoryFilter {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "RESTOCK" {
            return Ok(InventoryFilter::Restock);
        }
        s.parse().map(InventoryFilter::Condition)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct InventoryQuery {
    pub filter: Option<String>,
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn present<'a>(obj: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    obj.get(field).filter(|v| !v.is_null())
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, ValidationError> {
    present(obj, field).ok_or(ValidationError::MissingField(field))
}

fn int_field(value: &Value, field: &'static str, min: i32) -> Result<i32, ValidationError> {
    let out_of_range = ValidationError::OutOfRange {
        field,
        min: min.into(),
        max: i32::MAX.into(),
    };
    let n = match value {
        Value::Number(n) => match n.as_i64() {
            Some(n) => n,
            None if n.is_u64() => return Err(out_of_range),
            None => {
                return Err(ValidationError::InvalidType {
                    field,
                    expected: "integer",
                })
            }
        },
        _ => {
            return Err(ValidationError::InvalidType {
                field,
                expected: "integer",
            })
        }
    };
    match i32::try_from(n) {
        Ok(n) if n >= min => Ok(n),
        _ => Err(out_of_range),
    }
}

fn parse_enum<T>(value: &Value, field: &'static str) -> Result<T, ValidationError>
where
    T: FromStr<Err = UnknownToken>,
{
    let s = value.as_str().ok_or(ValidationError::InvalidType {
        field,
        expected: "string",
    })?;
    s.parse().map_err(|UnknownToken(value)| ValidationError::UnknownVariant { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "product_id": 5,
            "condition": "NEW",
            "quantity": 30,
            "restock_level": 12,
            "can_update": "ENABLED",
        })
    }

    fn record(quantity: i32, restock_level: i32) -> InventoryRecord {
        InventoryRecord {
            product_id: 1,
            condition: Condition::Used,
            quantity,
            restock_level,
            last_updated_on: Utc::now(),
            can_update: UpdateStatus::Enabled,
        }
    }

    // ── Enums ──────────────────────────────────────────────────────────────────

    #[test]
    fn condition_names_round_trip_through_display() {
        for c in [Condition::New, Condition::OpenBox, Condition::Used] {
            assert_eq!(c.to_string().parse::<Condition>(), Ok(c));
        }
    }

    #[test]
    fn condition_parsing_is_case_sensitive() {
        assert_eq!("OPEN_BOX".parse::<Condition>(), Ok(Condition::OpenBox));
        assert!("open_box".parse::<Condition>().is_err());
        assert!("New".parse::<Condition>().is_err());
    }

    #[test]
    fn enums_serialize_as_screaming_names() {
        assert_eq!(serde_json::to_value(Condition::OpenBox).unwrap(), json!("OPEN_BOX"));
        assert_eq!(serde_json::to_value(UpdateStatus::Disabled).unwrap(), json!("DISABLED"));
    }

    #[test]
    fn filter_accepts_conditions_and_restock() {
        assert_eq!("RESTOCK".parse::<InventoryFilter>(), Ok(InventoryFilter::Restock));
        assert_eq!(
            "USED".parse::<InventoryFilter>(),
            Ok(InventoryFilter::Condition(Condition::Used))
        );
        assert_eq!(
            "FOO".parse::<InventoryFilter>(),
            Err(UnknownToken("FOO".to_string()))
        );
    }

    // ── Create validation ──────────────────────────────────────────────────────

    #[test]
    fn valid_payload_deserializes() {
        let new = NewInventory::from_json(&valid()).unwrap();
        assert_eq!(new.key(), InventoryKey::new(5, Condition::New));
        assert_eq!(new.quantity, 30);
        assert_eq!(new.restock_level, 12);
        assert_eq!(new.can_update, UpdateStatus::Enabled);
    }

    #[test]
    fn can_update_defaults_to_enabled() {
        let mut data = valid();
        data.as_object_mut().unwrap().remove("can_update");
        let new = NewInventory::from_json(&data).unwrap();
        assert_eq!(new.can_update, UpdateStatus::Enabled);
    }

    #[test]
    fn client_timestamp_is_ignored() {
        let mut data = valid();
        data["last_updated_on"] = json!("not even a date");
        assert!(NewInventory::from_json(&data).is_ok());
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert_eq!(
            NewInventory::from_json(&json!([1, 2, 3])),
            Err(ValidationError::NotAnObject)
        );
    }

    #[test]
    fn each_required_field_is_reported_when_missing() {
        for field in ["product_id", "condition", "quantity", "restock_level"] {
            let mut data = valid();
            data.as_object_mut().unwrap().remove(field);
            assert_eq!(
                NewInventory::from_json(&data),
                Err(ValidationError::MissingField(field)),
                "missing {field}"
            );
        }
    }

    #[test]
    fn null_counts_as_missing() {
        let mut data = valid();
        data["quantity"] = Value::Null;
        assert_eq!(
            NewInventory::from_json(&data),
            Err(ValidationError::MissingField("quantity"))
        );
    }

    #[test]
    fn wrong_types_are_rejected() {
        let mut data = valid();
        data["quantity"] = json!("30");
        assert_eq!(
            NewInventory::from_json(&data),
            Err(ValidationError::InvalidType {
                field: "quantity",
                expected: "integer"
            })
        );

        let mut data = valid();
        data["restock_level"] = json!(true);
        assert!(matches!(
            NewInventory::from_json(&data),
            Err(ValidationError::InvalidType { field: "restock_level", .. })
        ));

        let mut data = valid();
        data["product_id"] = json!(5.5);
        assert!(matches!(
            NewInventory::from_json(&data),
            Err(ValidationError::InvalidType { field: "product_id", .. })
        ));

        let mut data = valid();
        data["condition"] = json!(1);
        assert!(matches!(
            NewInventory::from_json(&data),
            Err(ValidationError::InvalidType { field: "condition", .. })
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for (field, value) in [
            ("product_id", json!(0)),
            ("quantity", json!(0)),
            ("restock_level", json!(-4)),
            ("quantity", json!(i64::from(i32::MAX) + 1)),
            ("product_id", json!(u64::MAX)),
        ] {
            let mut data = valid();
            data[field] = value;
            assert!(
                matches!(
                    NewInventory::from_json(&data),
                    Err(ValidationError::OutOfRange { field: f, .. }) if f == field
                ),
                "{field} should be out of range"
            );
        }
    }

    #[test]
    fn unknown_enum_names_are_rejected() {
        let mut data = valid();
        data["condition"] = json!("new");
        assert_eq!(
            NewInventory::from_json(&data),
            Err(ValidationError::UnknownVariant {
                field: "condition",
                value: "new".to_string()
            })
        );

        let mut data = valid();
        data["can_update"] = json!("MAYBE");
        assert!(matches!(
            NewInventory::from_json(&data),
            Err(ValidationError::UnknownVariant { field: "can_update", .. })
        ));
    }

    // ── Update validation ──────────────────────────────────────────────────────

    #[test]
    fn update_accepts_zero_and_partial_payloads() {
        let update = InventoryUpdate::from_json(&json!({ "quantity": 0 })).unwrap();
        assert_eq!(update.quantity, Some(0));
        assert_eq!(update.restock_level, None);
    }

    #[test]
    fn update_rejects_negatives() {
        assert!(matches!(
            InventoryUpdate::from_json(&json!({ "quantity": -1, "restock_level": 3 })),
            Err(ValidationError::OutOfRange { field: "quantity", .. })
        ));
        assert!(matches!(
            InventoryUpdate::from_json(&json!({ "quantity": 1, "restock_level": -2 })),
            Err(ValidationError::OutOfRange { field: "restock_level", .. })
        ));
    }

    #[test]
    fn update_applies_only_given_fields() {
        let mut rec = record(10, 5);
        InventoryUpdate {
            quantity: None,
            restock_level: Some(20),
        }
        .apply_to(&mut rec);
        assert_eq!((rec.quantity, rec.restock_level), (10, 20));
    }

    // ── Record ─────────────────────────────────────────────────────────────────

    #[test]
    fn restock_is_strictly_below_level() {
        assert!(record(10, 11).needs_restock());
        assert!(!record(20, 20).needs_restock());
        assert!(!record(500, 120).needs_restock());
    }

    #[test]
    fn record_serializes_every_field() {
        let value = serde_json::to_value(record(3, 4)).unwrap();
        for field in [
            "product_id",
            "condition",
            "quantity",
            "restock_level",
            "last_updated_on",
            "can_update",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["condition"], "USED");
        assert_eq!(value["can_update"], "ENABLED");
    }

    #[test]
    fn key_displays_as_pair() {
        assert_eq!(InventoryKey::new(7, Condition::OpenBox).to_string(), "<7, OPEN_BOX>");
    }
}
