//! Pure mappings from legacy records to target records.

mod brand;
mod meal;

use std::sync::Arc;

use nutrilog_core::constants::{DEFAULT_LOG_QUANTITY, DEFAULT_LOG_UNIT};
use nutrilog_core::{BrandParsing, EntityKind, LegacyRecord, TargetFood, TargetFoodLog, TargetUser};
use uuid::Uuid;

pub use brand::{BrandParser, ParsedName, TrailingGroupParser, WholeNameParser, parser_for};
pub use meal::{meal_type_at, meal_type_for_hour};

use crate::error::MigrationError;
use crate::identity::IdentityMap;

/// Stateless record transformer. Holds only the configured brand heuristic.
#[derive(Debug, Clone)]
pub struct Transformer {
    brand_parser: Arc<dyn BrandParser>,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(Arc::new(TrailingGroupParser))
    }
}

impl Transformer {
    #[must_use]
    pub fn new(brand_parser: Arc<dyn BrandParser>) -> Self {
        Self { brand_parser }
    }

    #[must_use]
    pub fn from_mode(mode: BrandParsing) -> Self {
        Self::new(Arc::from(parser_for(mode)))
    }

    /// Legacy user to target identity. Email is the only required field.
    pub fn user(&self, record: &LegacyRecord) -> Result<TargetUser, MigrationError> {
        let email = record.non_empty_str("email").ok_or_else(|| missing(record, "email"))?;
        Ok(TargetUser {
            id: Uuid::new_v4(),
            email: email.trim().to_owned(),
            username: record.non_empty_str("username").map(str::to_owned),
            email_verified: record.bool_field("emailVerified").unwrap_or(false),
            created_at: record.created_at(),
            updated_at: record.updated_at(),
            legacy_id: record.id().to_owned(),
        })
    }

    /// Name and brand of a legacy food after parsing, the natural key used to
    /// rebuild the food identity map.
    #[must_use]
    pub fn food_key(&self, record: &LegacyRecord) -> ParsedName {
        self.brand_parser.parse(record.str_field("name"))
    }

    /// Legacy food to target row. Never fails: a missing name becomes the
    /// unknown-food placeholder and missing macros become zero.
    #[must_use]
    pub fn food(&self, record: &LegacyRecord) -> TargetFood {
        let ParsedName { name, brand } = self.food_key(record);
        TargetFood {
            id: Uuid::new_v4(),
            legacy_id: record.id().to_owned(),
            name,
            brand,
            calories: record.f64_field("calories").unwrap_or(0.0),
            protein: record.f64_field("protein").unwrap_or(0.0),
            carbohydrates: record.f64_field("carbohydrates").unwrap_or(0.0),
            fat: record.f64_field("fat").unwrap_or(0.0),
            fiber: record.f64_field("fiber"),
            sugar: record.f64_field("sugar"),
            sodium: record.f64_field("sodium"),
            cholesterol: record.f64_field("cholesterol"),
            saturated_fat: record.f64_field("saturatedFat"),
            serving_size: record.f64_field("servingSize"),
            serving_unit: record.non_empty_str("servingUnit").map(str::to_owned),
            created_at: record.created_at(),
            updated_at: record.updated_at(),
        }
    }

    /// Legacy food log to target row with remapped foreign keys.
    ///
    /// `photo_url` carries the legacy asset URL; the caller swaps it for the
    /// migrated one when the transfer succeeds.
    pub fn food_log(
        &self,
        record: &LegacyRecord,
        users: &IdentityMap,
        foods: &IdentityMap,
    ) -> Result<TargetFoodLog, MigrationError> {
        let user_id = resolve_reference(record, "user", users)?;
        let food_id = resolve_reference(record, "food", foods)?;
        let consumed_at = record
            .datetime_field("consumedAt")
            .or_else(|| record.created_at())
            .ok_or_else(|| missing(record, "consumedAt"))?;
        Ok(TargetFoodLog {
            id: Uuid::new_v4(),
            legacy_id: record.id().to_owned(),
            user_id,
            food_id,
            quantity: record.f64_field("servings").unwrap_or(DEFAULT_LOG_QUANTITY),
            unit: record.non_empty_str("unit").unwrap_or(DEFAULT_LOG_UNIT).to_owned(),
            meal_type: meal_type_at(consumed_at),
            consumed_at,
            photo_url: record.file_url("photo").map(str::to_owned),
            created_at: record.created_at(),
            updated_at: record.updated_at(),
        })
    }
}

fn missing(record: &LegacyRecord, field: &'static str) -> MigrationError {
    MigrationError::MissingRequiredField {
        kind: record.kind(),
        legacy_id: record.id().to_owned(),
        field,
    }
}

fn resolve_reference(
    record: &LegacyRecord,
    field: &str,
    map: &IdentityMap,
) -> Result<Uuid, MigrationError> {
    let reference_id = record.pointer_id(field);
    reference_id.and_then(|id| map.resolve(id)).ok_or_else(|| MigrationError::UnresolvedReference {
        kind: EntityKind::FoodLog,
        legacy_id: record.id().to_owned(),
        reference: map.kind(),
        reference_id: reference_id.map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use nutrilog_core::MealType;
    use nutrilog_core::constants::UNKNOWN_FOOD_NAME;
    use serde_json::json;

    use super::*;

    fn maps() -> (IdentityMap, IdentityMap, Uuid, Uuid) {
        let user_id = Uuid::new_v4();
        let food_id = Uuid::new_v4();
        let mut users = IdentityMap::new(EntityKind::User);
        users.insert("u1", user_id);
        let mut foods = IdentityMap::new(EntityKind::Food);
        foods.insert("f1", food_id);
        (users, foods, user_id, food_id)
    }

    fn log(id: &str) -> LegacyRecord {
        LegacyRecord::new(EntityKind::FoodLog, id)
            .with_field("user", json!({"__type": "Pointer", "className": "_User", "objectId": "u1"}))
            .with_field("food", json!({"objectId": "f1", "name": "Oats"}))
            .with_field("consumedAt", json!({"__type": "Date", "iso": "2024-05-01T08:15:00.000Z"}))
    }

    #[test]
    fn user_requires_email() {
        let record = LegacyRecord::new(EntityKind::User, "u1").with_field("username", "ann");
        let err = Transformer::default().user(&record).unwrap_err();
        assert!(matches!(err, MigrationError::MissingRequiredField { field: "email", .. }));

        let blank = record.clone().with_field("email", "  ");
        assert!(Transformer::default().user(&blank).is_err());
    }

    #[test]
    fn user_copies_fields() {
        let record = LegacyRecord::new(EntityKind::User, "u1")
            .with_field("email", " Ann@Example.com ")
            .with_field("username", "ann")
            .with_field("emailVerified", true)
            .with_field("createdAt", "2023-01-02T03:04:05.000Z");
        let user = Transformer::default().user(&record).unwrap();
        assert_eq!(user.email, "Ann@Example.com");
        assert_eq!(user.username.as_deref(), Some("ann"));
        assert!(user.email_verified);
        assert_eq!(user.legacy_id, "u1");
        assert!(user.created_at.is_some());
        assert!(user.updated_at.is_none());
    }

    #[test]
    fn food_defaults_macros_but_not_micros() {
        let record = LegacyRecord::new(EntityKind::Food, "f1")
            .with_field("name", "Chicken Breast (Perdue)")
            .with_field("protein", 31)
            .with_field("sodium", "74.5");
        let food = Transformer::default().food(&record);
        assert_eq!(food.name, "Chicken Breast");
        assert_eq!(food.brand.as_deref(), Some("Perdue"));
        assert!((food.protein - 31.0).abs() < f64::EPSILON);
        assert!(food.calories.abs() < f64::EPSILON);
        assert!(food.fat.abs() < f64::EPSILON);
        assert_eq!(food.sodium, Some(74.5));
        assert_eq!(food.fiber, None);
        assert_eq!(food.saturated_fat, None);
    }

    #[test]
    fn food_without_name_is_unknown() {
        let food = Transformer::default().food(&LegacyRecord::new(EntityKind::Food, "f2"));
        assert_eq!(food.name, UNKNOWN_FOOD_NAME);
        assert_eq!(food.brand, None);
    }

    #[test]
    fn brand_heuristic_is_swappable() {
        let record = LegacyRecord::new(EntityKind::Food, "f1").with_field("name", "Oats (Quaker)");
        let food = Transformer::from_mode(BrandParsing::None).food(&record);
        assert_eq!(food.name, "Oats (Quaker)");
        assert_eq!(food.brand, None);
    }

    #[test]
    fn food_log_remaps_references() {
        let (users, foods, user_id, food_id) = maps();
        let entry = Transformer::default().food_log(&log("l1"), &users, &foods).unwrap();
        assert_eq!(entry.user_id, user_id);
        assert_eq!(entry.food_id, food_id);
        assert_eq!(entry.meal_type, MealType::Breakfast);
        assert!((entry.quantity - DEFAULT_LOG_QUANTITY).abs() < f64::EPSILON);
        assert_eq!(entry.unit, DEFAULT_LOG_UNIT);
        assert_eq!(entry.photo_url, None);
    }

    #[test]
    fn food_log_keeps_servings_unit_and_photo() {
        let (users, foods, ..) = maps();
        let record = log("l1")
            .with_field("servings", 2.5)
            .with_field("unit", "cup")
            .with_field("photo", json!({"__type": "File", "url": "https://files.example/a.png"}));
        let entry = Transformer::default().food_log(&record, &users, &foods).unwrap();
        assert!((entry.quantity - 2.5).abs() < f64::EPSILON);
        assert_eq!(entry.unit, "cup");
        assert_eq!(entry.photo_url.as_deref(), Some("https://files.example/a.png"));
    }

    #[test]
    fn food_log_with_unknown_user_is_unresolved() {
        let (_, foods, ..) = maps();
        let users = IdentityMap::new(EntityKind::User);
        let err = Transformer::default().food_log(&log("l1"), &users, &foods).unwrap_err();
        match err {
            MigrationError::UnresolvedReference { reference, reference_id, legacy_id, .. } => {
                assert_eq!(reference, EntityKind::User);
                assert_eq!(reference_id.as_deref(), Some("u1"));
                assert_eq!(legacy_id, "l1");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn food_log_without_food_pointer_is_unresolved() {
        let (users, foods, ..) = maps();
        let mut record = LegacyRecord::new(EntityKind::FoodLog, "l2")
            .with_field("user", "u1")
            .with_field("consumedAt", "2024-05-01T12:00:00Z");
        let err = Transformer::default().food_log(&record, &users, &foods).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::UnresolvedReference { reference: EntityKind::Food, reference_id: None, .. }
        ));

        record = record.with_field("food", "f1");
        assert!(Transformer::default().food_log(&record, &users, &foods).is_ok());
    }

    #[test]
    fn consumed_at_falls_back_to_created_at() {
        let (users, foods, ..) = maps();
        let record = LegacyRecord::new(EntityKind::FoodLog, "l3")
            .with_field("user", "u1")
            .with_field("food", "f1")
            .with_field("createdAt", "2024-05-01T20:00:00Z");
        let entry = Transformer::default().food_log(&record, &users, &foods).unwrap();
        assert_eq!(entry.meal_type, MealType::Dinner);

        let undated = LegacyRecord::new(EntityKind::FoodLog, "l4").with_field("user", "u1").with_field("food", "f1");
        let err = Transformer::default().food_log(&undated, &users, &foods).unwrap_err();
        assert!(matches!(err, MigrationError::MissingRequiredField { field: "consumedAt", .. }));
    }
}
