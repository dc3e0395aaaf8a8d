use crate::entities::redemption_entity as redemptions;
use crate::error::AppResult;
use crate::models::SavingsSummary;
use crate::utils::{from_cents, month_start};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavingsPeriod {
    /// Since the first instant of the current UTC month.
    ThisMonth,
    AllTime,
}

/// Reporting-only view over a member's redemptions.
#[async_trait]
pub trait SavingsAggregator: Send + Sync {
    async fn summarize(
        &self,
        user_id: i64,
        period: SavingsPeriod,
        now: DateTime<Utc>,
    ) -> AppResult<SavingsSummary>;
}

#[derive(Clone)]
pub struct DbSavingsAggregator {
    pool: DatabaseConnection,
}

impl DbSavingsAggregator {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SavingsAggregator for DbSavingsAggregator {
    async fn summarize(
        &self,
        user_id: i64,
        period: SavingsPeriod,
        now: DateTime<Utc>,
    ) -> AppResult<SavingsSummary> {
        let mut query = redemptions::Entity::find()
            .select_only()
            .column_as(Expr::cust("COUNT(*)"), "uses")
            // SUM(bigint) is numeric on Postgres; cast back so both backends decode i64
            .column_as(
                Expr::cust("CAST(COALESCE(SUM(amount_saved_cents), 0) AS BIGINT)"),
                "saved_cents",
            )
            .filter(redemptions::Column::UserId.eq(user_id));

        if period == SavingsPeriod::ThisMonth {
            query = query.filter(redemptions::Column::CreatedAt.gte(month_start(now)));
        }

        let (uses, saved_cents) = query
            .into_tuple::<(i64, i64)>()
            .one(&self.pool)
            .await?
            .unwrap_or((0, 0));

        Ok(SavingsSummary {
            uses,
            saved: from_cents(saved_cents),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DiscountType, DisplayPolicy};
    use crate::testing::{in_memory_pool, insert_code, insert_member, insert_redemption};
    use chrono::{Duration, NaiveDate, TimeZone};

    #[tokio::test]
    async fn test_summaries_split_by_month() {
        let pool = in_memory_pool().await;
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
        let member = insert_member(&pool, "a@x.com", NaiveDate::from_ymd_opt(2099, 1, 1)).await;
        let other = insert_member(&pool, "b@x.com", NaiveDate::from_ymd_opt(2099, 1, 1)).await;
        let april = insert_code(&pool, member.id, "apr", "2024-04", DisplayPolicy::AlwaysShow, None).await;
        let may = insert_code(&pool, member.id, "may", "2024-05", DisplayPolicy::AlwaysShow, None).await;
        let others = insert_code(&pool, other.id, "oth", "2024-05", DisplayPolicy::AlwaysShow, None).await;

        insert_redemption(&pool, &april, DiscountType::Percent, 150, now - Duration::days(30)).await;
        insert_redemption(&pool, &may, DiscountType::Percent, 200, now).await;
        insert_redemption(&pool, &may, DiscountType::Item, 580, now).await;
        insert_redemption(&pool, &others, DiscountType::Item, 999, now).await;

        let aggregator = DbSavingsAggregator::new(pool);
        let month = aggregator
            .summarize(member.id, SavingsPeriod::ThisMonth, now)
            .await
            .unwrap();
        assert_eq!(month, SavingsSummary { uses: 2, saved: 7.8 });

        let all = aggregator
            .summarize(member.id, SavingsPeriod::AllTime, now)
            .await
            .unwrap();
        assert_eq!(all, SavingsSummary { uses: 3, saved: 9.3 });
    }

    #[tokio::test]
    async fn test_member_without_redemptions_is_zero() {
        let pool = in_memory_pool().await;
        let aggregator = DbSavingsAggregator::new(pool);
        let summary = aggregator
            .summarize(42, SavingsPeriod::AllTime, Utc::now())
            .await
            .unwrap();
        assert_eq!(summary, SavingsSummary::default());
    }
}
