//! Order submission parsing and validation.
//!
//! The raw submission keeps each leaf as loosely typed JSON so that a wrong
//! type is reported against its field together with every other problem,
//! instead of failing body deserialization on the first mismatch.
//!
//! Validation is pure: the caller resolves the active catalog items for
//! [`OrderSubmission::requested_item_ids`] first and passes them in.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::entities::{CatalogItem, MenuItemId};
use crate::value_objects::{Address, Count, Phone};

/// Most positions one submission may carry
pub const MAX_POSITIONS: usize = 100;

// =============================================================================
// Raw Submission
// =============================================================================

/// Order submission as received from the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmission {
    /// Raw `address` field
    #[serde(default)]
    pub address: Option<Value>,
    /// Raw `phone` field
    #[serde(default)]
    pub phone: Option<Value>,
    /// Raw `positions` field
    #[serde(default)]
    pub positions: Option<Value>,
}

impl OrderSubmission {
    /// Build a well-typed submission (tests, seeding, CLI)
    pub fn new(address: &str, phone: &str, positions: &[(MenuItemId, i64)]) -> Self {
        let positions = positions
            .iter()
            .map(|(id, count)| serde_json::json!({ "id": id, "count": count }))
            .collect();

        Self {
            address: Some(Value::String(address.to_string())),
            phone: Some(Value::String(phone.to_string())),
            positions: Some(Value::Array(positions)),
        }
    }

    /// Distinct item ids referenced by well-formed positions.
    ///
    /// Malformed entries are skipped here; validation reports them. Empty when
    /// the positions list is over the limit, since validation rejects it
    /// without consulting the catalog.
    pub fn requested_item_ids(&self) -> Vec<MenuItemId> {
        let Some(Value::Array(entries)) = &self.positions else {
            return Vec::new();
        };
        if entries.len() > MAX_POSITIONS {
            return Vec::new();
        }

        entries
            .iter()
            .filter_map(|entry| entry.get("id").and_then(as_integer))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// =============================================================================
// Validated Submission
// =============================================================================

/// A single requested line after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLine {
    /// Active catalog item
    pub item_id: MenuItemId,
    /// Requested quantity
    pub count: Count,
}

/// Submission that passed every rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    /// Validated delivery address
    pub address: Address,
    /// Validated contact phone
    pub phone: Phone,
    /// In submission order, duplicates preserved
    pub lines: Vec<RequestedLine>,
}

impl ValidatedOrder {
    /// Distinct item ids across all lines
    pub fn item_ids(&self) -> Vec<MenuItemId> {
        self.lines
            .iter()
            .map(|l| l.item_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Every rule violation found in a submission, keyed by field path
/// (`address`, `positions.0.count`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("The given data was invalid.")]
pub struct ValidationError {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    /// Create an empty error set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reason against a field
    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(reason.into());
    }

    /// True if no violation was recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Per-field reasons
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// True if the field has at least one reason
    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Validate a submission against the business rules.
///
/// `catalog` holds the items resolved for the submission's requested ids;
/// an id is acceptable only if it is present and active. All violations are
/// collected before returning.
pub fn validate_submission(
    submission: &OrderSubmission,
    catalog: &HashMap<MenuItemId, CatalogItem>,
) -> Result<ValidatedOrder, ValidationError> {
    let mut errors = ValidationError::new();

    let address = required_string(&submission.address, "address", &mut errors).and_then(|raw| {
        Address::new(raw)
            .map_err(|_| {
                errors.add(
                    "address",
                    format!(
                        "The address must be between {} and {} characters.",
                        Address::MIN_LEN,
                        Address::MAX_LEN
                    ),
                )
            })
            .ok()
    });

    let phone = required_string(&submission.phone, "phone", &mut errors).and_then(|raw| {
        Phone::new(raw)
            .map_err(|_| errors.add("phone", "The phone format is invalid."))
            .ok()
    });

    let lines = validate_positions(&submission.positions, catalog, &mut errors);

    match (address, phone, lines) {
        (Some(address), Some(phone), Some(lines)) if errors.is_empty() => Ok(ValidatedOrder {
            address,
            phone,
            lines,
        }),
        _ => Err(errors),
    }
}

fn required_string<'a>(
    value: &'a Option<Value>,
    field: &str,
    errors: &mut ValidationError,
) -> Option<&'a str> {
    match value {
        None | Some(Value::Null) => {
            errors.add(field, format!("The {} field is required.", field));
            None
        },
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(field, format!("The {} field is required.", field));
            None
        },
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => {
            errors.add(field, format!("The {} must be a string.", field));
            None
        },
    }
}

fn validate_positions(
    value: &Option<Value>,
    catalog: &HashMap<MenuItemId, CatalogItem>,
    errors: &mut ValidationError,
) -> Option<Vec<RequestedLine>> {
    let entries = match value {
        None | Some(Value::Null) => {
            errors.add("positions", "The positions field is required.");
            return None;
        },
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            errors.add("positions", "The positions must be an array.");
            return None;
        },
    };

    if entries.is_empty() || entries.len() > MAX_POSITIONS {
        errors.add(
            "positions",
            format!("The positions must have between 1 and {} items.", MAX_POSITIONS),
        );
        return None;
    }

    let mut ok = true;

    let mut lines = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match validate_position(index, entry, catalog, errors) {
            Some(line) => lines.push(line),
            None => ok = false,
        }
    }

    ok.then_some(lines)
}

fn validate_position(
    index: usize,
    entry: &Value,
    catalog: &HashMap<MenuItemId, CatalogItem>,
    errors: &mut ValidationError,
) -> Option<RequestedLine> {
    let Value::Object(fields) = entry else {
        let field = format!("positions.{}", index);
        errors.add(&field, format!("The {} must be an object.", field));
        return None;
    };

    let id_field = format!("positions.{}.id", index);
    let item_id = match fields.get("id") {
        None | Some(Value::Null) => {
            errors.add(&id_field, format!("The {} field is required.", id_field));
            None
        },
        Some(raw) => match as_integer(raw) {
            Some(id) if catalog.get(&id).is_some_and(|item| item.active) => Some(id),
            Some(_) => {
                errors.add(&id_field, format!("The selected {} is invalid.", id_field));
                None
            },
            None => {
                errors.add(&id_field, format!("The {} must be an integer.", id_field));
                None
            },
        },
    };

    let count_field = format!("positions.{}.count", index);
    let count = match fields.get("count") {
        None | Some(Value::Null) => {
            errors.add(&count_field, format!("The {} field is required.", count_field));
            None
        },
        Some(raw) => match as_integer(raw) {
            Some(n) => Count::new(n)
                .map_err(|_| {
                    errors.add(
                        &count_field,
                        format!(
                            "The {} must be between {} and {}.",
                            count_field,
                            Count::MIN,
                            Count::MAX
                        ),
                    )
                })
                .ok(),
            None => {
                errors.add(&count_field, format!("The {} must be an integer.", count_field));
                None
            },
        },
    };

    Some(RequestedLine {
        item_id: item_id?,
        count: count?,
    })
}

/// Integer JSON numbers and integer-looking strings are accepted.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
