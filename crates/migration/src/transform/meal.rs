use chrono::{DateTime, Timelike, Utc};
use nutrilog_core::MealType;

/// Meal bucket for an hour of the day (0-23).
///
/// 19:00-22:59 maps to dinner as well, so supper never appears.
#[must_use]
pub const fn meal_type_for_hour(hour: u32) -> MealType {
    match hour {
        6..=10 => MealType::Breakfast,
        11..=14 => MealType::Lunch,
        15..=18 | 19..=22 => MealType::Dinner,
        _ => MealType::Snack,
    }
}

/// Meal bucket for a consumption time, using its UTC hour.
#[must_use]
pub fn meal_type_at(consumed_at: DateTime<Utc>) -> MealType {
    meal_type_for_hour(consumed_at.hour())
}
