//! Fixtures shared by the unit tests: a migrated in-memory database and row builders.

use crate::config::DatabaseConfig;
use crate::database::{create_pool, run_migrations};
use crate::entities::{
    DiscountType, DisplayPolicy, code_entity as codes, redemption_entity as redemptions,
    user_entity as users,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

pub async fn in_memory_pool() -> DatabaseConnection {
    let pool = create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .expect("open in-memory sqlite");
    run_migrations(&pool).await.expect("migrate");
    pool
}

pub async fn insert_member(
    pool: &DatabaseConnection,
    email: &str,
    active_until: Option<NaiveDate>,
) -> users::Model {
    users::ActiveModel {
        email: Set(email.to_string()),
        active_until: Set(active_until),
        created_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(pool)
    .await
    .expect("insert member")
}

pub async fn insert_code(
    pool: &DatabaseConnection,
    user_id: i64,
    code: &str,
    month_key: &str,
    display_policy: DisplayPolicy,
    redeemed_at: Option<DateTime<Utc>>,
) -> codes::Model {
    let label = match display_policy {
        DisplayPolicy::AlwaysShow => "20% Off Drinks",
        DisplayPolicy::HideOnRedeem => "Free Beer/Coffee",
    };
    codes::ActiveModel {
        user_id: Set(user_id),
        code: Set(code.to_string()),
        month_key: Set(month_key.to_string()),
        benefit_label: Set(label.to_string()),
        display_policy: Set(display_policy),
        redeemed_at: Set(redeemed_at),
        redemption_count: Set(0),
        created_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(pool)
    .await
    .expect("insert code")
}

pub async fn insert_redemption(
    pool: &DatabaseConnection,
    code: &codes::Model,
    discount_type: DiscountType,
    amount_saved_cents: i64,
    created_at: DateTime<Utc>,
) -> redemptions::Model {
    redemptions::ActiveModel {
        code_id: Set(code.id),
        user_id: Set(code.user_id),
        staff_id: Set(None),
        store_id: Set(None),
        gross_amount_cents: Set(amount_saved_cents),
        discount_type: Set(discount_type),
        discount_value: Set(0.0),
        amount_saved_cents: Set(amount_saved_cents),
        till_txn_id: Set(None),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(pool)
    .await
    .expect("insert redemption")
}
