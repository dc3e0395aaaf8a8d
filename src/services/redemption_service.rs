use crate::config::PerksConfig;
use crate::entities::{DiscountType, DisplayPolicy, code_entity as codes, redemption_entity as redemptions};
use crate::error::{AppError, AppResult};
use crate::models::{RedeemRequest, RedeemResponse, RedemptionCommand, SavingsSummary};
use crate::services::code_service::is_unique_violation;
use crate::services::{CodeService, SavingsAggregator, SavingsPeriod};
use crate::utils::{from_cents, to_cents};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Amount saved in cents for one redemption.
///
/// - `percent`: `gross * value / 100`, computed on the gross as entered and rounded once
/// - `fixed`: `min(gross, value)`
/// - `item`: `min(gross, cap)` when a cap is configured, otherwise the whole gross
///
/// Negative discount values save nothing. Rounding is half away from zero.
pub fn compute_savings_cents(
    discount_type: DiscountType,
    discount_value: f64,
    gross_amount: f64,
    free_item_cap: f64,
) -> i64 {
    let gross_amount = gross_amount.max(0.0);
    let gross_cents = to_cents(gross_amount);
    match discount_type {
        DiscountType::Percent => to_cents(gross_amount * discount_value / 100.0).max(0),
        DiscountType::Fixed => gross_cents.min(to_cents(discount_value).max(0)),
        DiscountType::Item => {
            let cap_cents = to_cents(free_item_cap);
            if cap_cents > 0 {
                gross_cents.min(cap_cents)
            } else {
                gross_cents
            }
        }
    }
}

#[derive(Clone)]
pub struct RedemptionService {
    pool: DatabaseConnection,
    code_service: CodeService,
    savings: Arc<dyn SavingsAggregator>,
    perks: PerksConfig,
}

impl RedemptionService {
    pub fn new(
        pool: DatabaseConnection,
        code_service: CodeService,
        savings: Arc<dyn SavingsAggregator>,
        perks: PerksConfig,
    ) -> Self {
        Self {
            pool,
            code_service,
            savings,
            perks,
        }
    }

    /// Staff credentials are compared in constant time; an unset secret refuses everyone.
    pub fn authorize(&self, credential: Option<&str>) -> AppResult<()> {
        let expected = self.perks.staff_redeem_token.as_bytes();
        let presented = credential.unwrap_or_default().as_bytes();
        if expected.is_empty() || !bool::from(expected.ct_eq(presented)) {
            return Err(AppError::Unauthorized);
        }
        Ok(())
    }

    pub async fn redeem(
        &self,
        request: RedeemRequest,
        credential: Option<&str>,
    ) -> AppResult<RedeemResponse> {
        self.redeem_at(request, credential, Utc::now()).await
    }

    /// Entry point for the raw HTTP body: the credential is checked before the
    /// body is even parsed, and an empty body counts as `{}`.
    pub async fn redeem_body(
        &self,
        body: &[u8],
        credential: Option<&str>,
    ) -> AppResult<RedeemResponse> {
        self.authorize(credential)?;
        let request = RedeemRequest::from_body(body)?;
        self.redeem(request, credential).await
    }

    /// 核销流程：
    /// 1. 校验员工凭证
    /// 2. 校验必填字段
    /// 3. 与 validate 相同的四项检查（存在 / 会员有效 / 当月 / 未使用）
    /// 4. 校验折扣类型并计算节省金额
    /// 5. 事务内写入核销记录并推进码状态
    /// 6. 汇总节省（失败时降级为 0，不影响核销结果）
    pub async fn redeem_at(
        &self,
        request: RedeemRequest,
        credential: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<RedeemResponse> {
        self.authorize(credential)?;
        let command = request.into_command()?;

        let (code, _member) = self
            .code_service
            .lookup_redeemable(&command.code, now)
            .await?;

        let discount_type: DiscountType = command
            .discount_type
            .parse()
            .map_err(|_| AppError::BadDiscountType)?;

        let gross_cents = to_cents(command.gross_amount);
        let saved_cents = compute_savings_cents(
            discount_type,
            command.discount_value,
            command.gross_amount,
            self.perks.free_item_cap,
        );

        self.record(&code, discount_type, &command, gross_cents, saved_cents, now)
            .await?;

        log::info!(
            "Redeemed code {} ({}) for user {}: saved {} cents",
            code.id,
            code.display_policy,
            code.user_id,
            saved_cents
        );

        let this_month = self.summary_or_zero(code.user_id, SavingsPeriod::ThisMonth, now).await;
        let all_time = self.summary_or_zero(code.user_id, SavingsPeriod::AllTime, now).await;

        Ok(RedeemResponse {
            ok: true,
            amount_saved: from_cents(saved_cents),
            currency: self.perks.default_currency.clone(),
            this_month,
            all_time,
        })
    }

    /// Inserts the redemption and advances the code in one transaction. The code
    /// is only touched after the insert succeeded.
    async fn record(
        &self,
        code: &codes::Model,
        discount_type: DiscountType,
        command: &RedemptionCommand,
        gross_cents: i64,
        saved_cents: i64,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let txn = self.pool.begin().await?;

        let inserted = redemptions::ActiveModel {
            code_id: Set(code.id),
            user_id: Set(code.user_id),
            staff_id: Set(command.staff_id.clone()),
            store_id: Set(command.store_id.clone()),
            gross_amount_cents: Set(gross_cents),
            discount_type: Set(discount_type),
            discount_value: Set(command.discount_value),
            amount_saved_cents: Set(saved_cents),
            till_txn_id: Set(command.till_txn_id.clone()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        if let Err(err) = inserted {
            txn.rollback().await?;
            if is_unique_violation(&err) {
                log::warn!(
                    "Duplicate redemption of code {} for till transaction {:?}",
                    code.id,
                    command.till_txn_id
                );
                return Err(AppError::DuplicateRedemption);
            }
            return Err(err.into());
        }

        match code.display_policy {
            DisplayPolicy::HideOnRedeem => {
                // 条件更新：并发核销时只有一个请求能成功
                let res = codes::Entity::update_many()
                    .col_expr(codes::Column::RedeemedAt, Expr::value(now))
                    .filter(codes::Column::Id.eq(code.id))
                    .filter(codes::Column::RedeemedAt.is_null())
                    .exec(&txn)
                    .await?;
                if res.rows_affected == 0 {
                    txn.rollback().await?;
                    let redeemed_at = codes::Entity::find_by_id(code.id)
                        .one(&self.pool)
                        .await?
                        .and_then(|c| c.redeemed_at)
                        .unwrap_or(now);
                    return Err(AppError::AlreadyRedeemed { redeemed_at });
                }
            }
            DisplayPolicy::AlwaysShow => {
                codes::Entity::update_many()
                    .col_expr(
                        codes::Column::RedemptionCount,
                        Expr::col(codes::Column::RedemptionCount).add(1),
                    )
                    .filter(codes::Column::Id.eq(code.id))
                    .exec(&txn)
                    .await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    async fn summary_or_zero(
        &self,
        user_id: i64,
        period: SavingsPeriod,
        now: DateTime<Utc>,
    ) -> SavingsSummary {
        match self.savings.summarize(user_id, period, now).await {
            Ok(summary) => summary,
            Err(e) => {
                log::warn!("Savings summary {period:?} unavailable for user {user_id}: {e}");
                SavingsSummary::default()
            }
        }
    }
}
