//! Bakery catalogs and event payloads.
//!
//! The ingredient and coffee-shop catalogs are process-wide read-only tables.
//! Each production cycle walks them in order: one ingredient event per
//! [`Ingredient`], then one lot event per entry of [`COFFEE_SHOPS`].
//!
//! Payload field names are capitalised on the wire (`Amount`, `Name`, `Batch`,
//! `Inventory`, `Lot`) for compatibility with existing consumers.

use crate::event::{INGREDIENT_EVENT_TYPE, LOT_EVENT_TYPE};
use serde::{Deserialize, Serialize};

/// A catalog entry describing how much of something goes into one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingredient {
    /// Human readable amount, e.g. `"2 cups"`.
    pub amount: &'static str,
    /// Ingredient name, e.g. `"all-purpose flour"`.
    pub name: &'static str,
}

/// Ingredients drawn from inventory for every batch, in reporting order.
pub const INGREDIENTS: [Ingredient; 7] = [
    Ingredient {
        amount: "2 cups",
        name: "all-purpose flour",
    },
    Ingredient {
        amount: "3 teaspoons",
        name: "baking powder",
    },
    Ingredient {
        amount: "½ teaspoon",
        name: "salt",
    },
    Ingredient {
        amount: "¾ cup",
        name: "white sugar",
    },
    Ingredient {
        amount: "1",
        name: "egg",
    },
    Ingredient {
        amount: "1 cup",
        name: "milk",
    },
    Ingredient {
        amount: "¼ cup",
        name: "vegetable oil",
    },
];

/// Coffee shops that receive a lot of every batch, in dispatch order.
pub const COFFEE_SHOPS: [&str; 3] = ["Tougo Coffee", "Squirrel Chops", "Victrola Cafe and Roastery"];

/// Number of events emitted per production cycle.
pub const EVENTS_PER_BATCH: usize = INGREDIENTS.len() + COFFEE_SHOPS.len();

/// Payload of an ingredient event: one inventory draw for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchIngredient {
    /// Amount drawn.
    pub amount: String,
    /// Ingredient name.
    pub name: String,
    /// Batch the ingredient went into.
    pub batch: String,
    /// Inventory draw identifier.
    pub inventory: String,
}

impl BatchIngredient {
    /// Record drawing `ingredient` from inventory for `batch`.
    #[must_use]
    pub fn draw(ingredient: &Ingredient, batch: &str, inventory: String) -> Self {
        Self {
            amount: ingredient.amount.to_string(),
            name: ingredient.name.to_string(),
            batch: batch.to_string(),
            inventory,
        }
    }
}

/// Payload of a lot event. A lot is the part of a batch sent to one shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Lot {
    /// `"Sent to <destination>"`.
    pub name: String,
    /// Batch the lot was cut from.
    pub batch: String,
    /// Lot identifier.
    pub lot: String,
}

impl Lot {
    /// Record sending a lot of `batch` to `destination`.
    ///
    /// # Examples
    ///
    /// ```
    /// use octomuffin_core::bakery::Lot;
    ///
    /// let lot = Lot::sent_to("Tougo Coffee", "batch-01", "lot-0001".to_string());
    /// assert_eq!(lot.name, "Sent to Tougo Coffee");
    /// ```
    #[must_use]
    pub fn sent_to(destination: &str, batch: &str, lot: String) -> Self {
        Self {
            name: format!("Sent to {destination}"),
            batch: batch.to_string(),
            lot,
        }
    }
}

/// Either payload kind, for code that handles both families uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BakeryPayload {
    /// An ingredient draw.
    Ingredient(BatchIngredient),
    /// A dispatched lot.
    Lot(Lot),
}

impl BakeryPayload {
    /// The CloudEvents `type` this payload is published under.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Ingredient(_) => INGREDIENT_EVENT_TYPE,
            Self::Lot(_) => LOT_EVENT_TYPE,
        }
    }

    /// The batch this payload belongs to.
    #[must_use]
    pub fn batch(&self) -> &str {
        match self {
            Self::Ingredient(ingredient) => &ingredient.batch,
            Self::Lot(lot) => &lot.batch,
        }
    }
}

impl From<BatchIngredient> for BakeryPayload {
    fn from(value: BatchIngredient) -> Self {
        Self::Ingredient(value)
    }
}

impl From<Lot> for BakeryPayload {
    fn from(value: Lot) -> Self {
        Self::Lot(value)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_sizes() {
        assert_eq!(INGREDIENTS.len(), 7);
        assert_eq!(COFFEE_SHOPS.len(), 3);
        assert_eq!(EVENTS_PER_BATCH, 10);
    }

    #[test]
    fn catalog_keeps_unicode_fractions() {
        assert_eq!(INGREDIENTS[2].amount, "\u{bd} teaspoon");
        assert_eq!(INGREDIENTS[3].amount, "\u{be} cup");
        assert_eq!(INGREDIENTS[6].amount, "\u{bc} cup");
    }

    #[test]
    fn ingredient_serializes_with_capitalised_fields() {
        let payload = BatchIngredient::draw(&INGREDIENTS[3], "AAAAAAAA", "BBBBBBBB".to_string());
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "Amount": "¾ cup",
                "Name": "white sugar",
                "Batch": "AAAAAAAA",
                "Inventory": "BBBBBBBB",
            })
        );
    }

    #[test]
    fn lot_serializes_with_capitalised_fields() {
        let payload = Lot::sent_to(COFFEE_SHOPS[1], "AAAAAAAA", "CCCCCCCC".to_string());
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "Name": "Sent to Squirrel Chops",
                "Batch": "AAAAAAAA",
                "Lot": "CCCCCCCC",
            })
        );
    }

    #[test]
    fn payload_variant_reports_type_and_batch() {
        let ingredient: BakeryPayload =
            BatchIngredient::draw(&INGREDIENTS[0], "b1", "i1".to_string()).into();
        let lot: BakeryPayload = Lot::sent_to(COFFEE_SHOPS[0], "b1", "l1".to_string()).into();

        assert_eq!(ingredient.event_type(), INGREDIENT_EVENT_TYPE);
        assert_eq!(lot.event_type(), LOT_EVENT_TYPE);
        assert_eq!(ingredient.batch(), "b1");
        assert_eq!(lot.batch(), "b1");
    }

    #[test]
    fn payload_variant_serializes_as_its_inner_payload() {
        let lot = Lot::sent_to(COFFEE_SHOPS[2], "AAAAAAAA", "CCCCCCCC".to_string());
        let wrapped = BakeryPayload::from(lot.clone());
        assert_eq!(
            serde_json::to_value(&wrapped).unwrap(),
            serde_json::to_value(&lot).unwrap()
        );
    }

    #[test]
    fn payload_variant_deserializes_either_shape() {
        let lot: BakeryPayload =
            serde_json::from_str(r#"{"Name":"Sent to Tougo Coffee","Batch":"b","Lot":"l"}"#).unwrap();
        assert!(matches!(lot, BakeryPayload::Lot(_)));

        let ingredient: BakeryPayload = serde_json::from_str(
            r#"{"Amount":"1","Name":"egg","Batch":"b","Inventory":"i"}"#,
        )
        .unwrap();
        assert!(matches!(ingredient, BakeryPayload::Ingredient(_)));
    }
}
