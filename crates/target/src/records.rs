//! PostgreSQL record store for the `foods` and `food_logs` collections.
//!
//! The schema is owned by the target application; this module only inserts
//! and reads natural keys.

use std::time::Duration;

use async_trait::async_trait;
use nutrilog_core::{
    FoodKey, PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_MAX_CONNECTIONS, TargetFood, TargetFoodLog,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::TargetError;
use crate::traits::RecordStore;

const FOOD_COLUMNS: &str = "id, name, brand, calories, protein, carbohydrates, fat, fiber, sugar, \
     sodium, cholesterol, saturated_fat, serving_size, serving_unit, created_at, updated_at";

const FOOD_LOG_COLUMNS: &str =
    "id, user_id, food_id, quantity, unit, meal_type, consumed_at, photo_url, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Opens a pool. Statements inherit `statement_timeout` from `timeout`.
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self, TargetError> {
        let statement_timeout_ms = timeout.as_millis().to_string();
        let pool = PgPoolOptions::new()
            .max_connections(PG_POOL_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(PG_POOL_ACQUIRE_TIMEOUT_SECS))
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                let set_timeout = format!("SET statement_timeout = {statement_timeout_ms}");
                Box::pin(async move {
                    sqlx::query(&set_timeout).execute(conn).await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        tracing::info!("PgRecordStore initialized");
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_foods(&self, foods: &[TargetFood]) -> Result<(), TargetError> {
        if foods.is_empty() {
            return Ok(());
        }
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("INSERT INTO foods ({FOOD_COLUMNS}) "));
        qb.push_values(foods, |mut b, food| {
            b.push_bind(food.id)
                .push_bind(&food.name)
                .push_bind(&food.brand)
                .push_bind(food.calories)
                .push_bind(food.protein)
                .push_bind(food.carbohydrates)
                .push_bind(food.fat)
                .push_bind(food.fiber)
                .push_bind(food.sugar)
                .push_bind(food.sodium)
                .push_bind(food.cholesterol)
                .push_bind(food.saturated_fat)
                .push_bind(food.serving_size)
                .push_bind(&food.serving_unit)
                .push_bind(food.created_at)
                .push_bind(food.updated_at);
        });
        qb.build().persistent(false).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_food_logs(&self, logs: &[TargetFoodLog]) -> Result<(), TargetError> {
        if logs.is_empty() {
            return Ok(());
        }
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("INSERT INTO food_logs ({FOOD_LOG_COLUMNS}) "));
        qb.push_values(logs, |mut b, log| {
            b.push_bind(log.id)
                .push_bind(log.user_id)
                .push_bind(log.food_id)
                .push_bind(log.quantity)
                .push_bind(&log.unit)
                .push_bind(log.meal_type.as_str())
                .push_bind(log.consumed_at)
                .push_bind(&log.photo_url)
                .push_bind(log.created_at)
                .push_bind(log.updated_at);
        });
        qb.build().persistent(false).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_food_keys(&self) -> Result<Vec<FoodKey>, TargetError> {
        let rows: Vec<(Uuid, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, brand FROM foods ORDER BY created_at NULLS LAST, id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id, name, brand)| FoodKey { id, name, brand }).collect())
    }

    async fn ping(&self) -> Result<(), TargetError> {
        let _one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
