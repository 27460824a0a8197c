//! Pickup points and input validation.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A collection point: a quantity of one resource type waiting at a node.
///
/// # Examples
///
/// ```
/// use cartage::models::Pickup;
///
/// let p = Pickup::new("p1", 50, "paper");
/// assert_eq!(p.qty_kg, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pickup {
    /// Point id, unique within one optimization run.
    pub id: String,
    /// Quantity to collect in kilograms.
    pub qty_kg: i32,
    /// Resource type name.
    pub kind: String,
}

impl Pickup {
    /// Creates a pickup. Use [`validate_pickups`] before solving.
    pub fn new(id: impl Into<String>, qty_kg: i32, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            qty_kg,
            kind: kind.into(),
        }
    }
}

/// Malformed optimization input. These are data-integrity errors, not
/// domain outcomes, so they propagate as `Err` rather than `NoSolution`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// A pickup entry had an empty id.
    MissingPickupId,
    /// A pickup had a quantity of zero or less.
    NonPositiveQuantity { id: String, qty_kg: i32 },
    /// A pickup had an empty resource kind.
    MissingResourceKind { id: String },
}

impl Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::MissingPickupId => write!(f, "pickup requires a non-empty id"),
            InputError::NonPositiveQuantity { id, qty_kg } => {
                write!(f, "pickup '{id}' has non-positive quantity {qty_kg} kg")
            }
            InputError::MissingResourceKind { id } => {
                write!(f, "pickup '{id}' has no resource kind")
            }
        }
    }
}

impl std::error::Error for InputError {}

/// Rejects malformed pickups before any solving starts.
///
/// A pickup is invalid when its id is empty, its quantity is not strictly
/// positive, or its resource kind is empty.
pub fn validate_pickups(pickups: &[Pickup]) -> Result<(), InputError> {
    for p in pickups {
        if p.id.is_empty() {
            return Err(InputError::MissingPickupId);
        }
        if p.qty_kg <= 0 {
            return Err(InputError::NonPositiveQuantity {
                id: p.id.clone(),
                qty_kg: p.qty_kg,
            });
        }
        if p.kind.is_empty() {
            return Err(InputError::MissingResourceKind { id: p.id.clone() });
        }
    }
    Ok(())
}

/// Total demand of a pickup set in kilograms.
pub fn total_demand_kg(pickups: &[Pickup]) -> i32 {
    pickups.iter().map(|p| p.qty_kg.max(0)).sum()
}

/// Distinct resource kinds present in a pickup set, sorted by name.
pub fn required_resources(pickups: &[Pickup]) -> Vec<String> {
    let mut kinds: Vec<String> = pickups
        .iter()
        .filter(|p| !p.kind.is_empty())
        .map(|p| p.kind.clone())
        .collect();
    kinds.sort();
    kinds.dedup();
    kinds
}
