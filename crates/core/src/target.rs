//! Records written to the target backend.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Access to the legacy identifier a target record was produced from.
pub trait LegacyKeyed {
    fn legacy_id(&self) -> &str;
}

/// User identity to be upserted into the target identity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetUser {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub email_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub legacy_id: String,
}

/// Row for the target `foods` collection.
///
/// Required macros are always present (zero when unknown upstream); optional
/// micronutrients stay `None` so "not measured" is never confused with zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetFood {
    pub id: Uuid,
    pub legacy_id: String,
    pub name: String,
    pub brand: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub cholesterol: Option<f64>,
    pub saturated_fat: Option<f64>,
    pub serving_size: Option<f64>,
    pub serving_unit: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row for the target `food_logs` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetFoodLog {
    pub id: Uuid,
    pub legacy_id: String,
    pub user_id: Uuid,
    pub food_id: Uuid,
    pub quantity: f64,
    pub unit: String,
    pub meal_type: MealType,
    pub consumed_at: DateTime<Utc>,
    pub photo_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LegacyKeyed for TargetUser {
    fn legacy_id(&self) -> &str {
        &self.legacy_id
    }
}

impl LegacyKeyed for TargetFood {
    fn legacy_id(&self) -> &str {
        &self.legacy_id
    }
}

impl LegacyKeyed for TargetFoodLog {
    fn legacy_id(&self) -> &str {
        &self.legacy_id
    }
}

/// Meal bucket stored on each food log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity as it exists in the target identity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetIdentity {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl TargetIdentity {
    /// Email normalised for natural-key comparison.
    #[must_use]
    pub fn email_key(&self) -> Option<String> {
        self.email.as_deref().map(normalize_email)
    }
}

/// Natural-key projection of a stored food, used for map reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodKey {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
}

/// Case-insensitive natural key for emails.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
