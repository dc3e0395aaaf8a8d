use crate::entities::{DisplayPolicy, code_entity as codes, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{MemberCodeResponse, MyCodesResponse, ValidateResponse};
use crate::services::IdentityVerifier;
use crate::utils::{generate_benefit_code, month_key, normalize_email, today_utc};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use std::sync::Arc;

/// A perk every active member receives once per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenefitDefinition {
    pub label: &'static str,
    pub display_policy: DisplayPolicy,
}

/// 每月为每位会员发放的福利（每种展示策略各一个）
pub const BENEFIT_CATALOG: [BenefitDefinition; 2] = [
    BenefitDefinition {
        label: "20% Off Drinks",
        display_policy: DisplayPolicy::AlwaysShow,
    },
    BenefitDefinition {
        label: "Free Beer/Coffee",
        display_policy: DisplayPolicy::HideOnRedeem,
    },
];

// token collisions are astronomically rare; bounded retry instead of a loop
const MAX_PROVISION_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct CodeService {
    pool: DatabaseConnection,
    identity: Arc<dyn IdentityVerifier>,
}

impl CodeService {
    pub fn new(pool: DatabaseConnection, identity: Arc<dyn IdentityVerifier>) -> Self {
        Self { pool, identity }
    }

    /// Lists the member's meaningful codes for the current month, provisioning
    /// them first. `bearer` must be a member credential issued for `email`.
    pub async fn list_my_codes(
        &self,
        email: Option<&str>,
        bearer: Option<&str>,
    ) -> AppResult<MyCodesResponse> {
        self.list_my_codes_at(email, bearer, Utc::now()).await
    }

    pub async fn list_my_codes_at(
        &self,
        email: Option<&str>,
        bearer: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<MyCodesResponse> {
        let email = normalize_email(email.unwrap_or_default())?;
        let token = bearer
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::MissingToken)?;

        let verified = self.identity.verify(token).await?;
        if verified.trim().to_lowercase() != email {
            return Err(AppError::InvalidToken);
        }

        let member = self
            .find_member_by_email(&email)
            .await?
            .ok_or(AppError::UnknownMember)?;
        if !member.is_active_on(today_utc(now)) {
            return Ok(MyCodesResponse::inactive());
        }

        let mk = month_key(now);
        self.ensure_monthly_codes(member.id, &mk).await?;

        let rows = codes::Entity::find()
            .filter(codes::Column::UserId.eq(member.id))
            .filter(codes::Column::MonthKey.eq(mk.as_str()))
            .order_by_asc(codes::Column::Id)
            .all(&self.pool)
            .await?;

        Ok(MyCodesResponse::codes(
            rows.into_iter()
                .filter(|c| !c.is_spent())
                .map(MemberCodeResponse::from)
                .collect(),
        ))
    }

    /// Makes sure the member holds exactly one code per catalog entry for
    /// `month_key`. Returns how many codes were created.
    pub async fn ensure_monthly_codes(&self, user_id: i64, month_key: &str) -> AppResult<usize> {
        let mut created = 0;
        for def in BENEFIT_CATALOG.iter() {
            if self.provision_one(user_id, month_key, def).await? {
                created += 1;
            }
        }
        if created > 0 {
            log::info!("Provisioned {created} perk code(s) for user {user_id} in {month_key}");
        }
        Ok(created)
    }

    async fn provision_one(
        &self,
        user_id: i64,
        month_key: &str,
        def: &BenefitDefinition,
    ) -> AppResult<bool> {
        for _ in 0..MAX_PROVISION_ATTEMPTS {
            if self.find_provisioned(user_id, month_key, def).await?.is_some() {
                return Ok(false);
            }

            let insert = codes::ActiveModel {
                user_id: Set(user_id),
                code: Set(generate_benefit_code()),
                month_key: Set(month_key.to_string()),
                benefit_label: Set(def.label.to_string()),
                display_policy: Set(def.display_policy),
                redeemed_at: Set(None),
                redemption_count: Set(0),
                created_at: Set(Some(Utc::now())),
                ..Default::default()
            }
            .insert(&self.pool)
            .await;

            match insert {
                Ok(_) => return Ok(true),
                // 并发发放或码冲突：重新检查是否已存在
                Err(err) if is_unique_violation(&err) => {
                    log::debug!(
                        "Unique violation provisioning {} for user {user_id}: {err}",
                        def.display_policy
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(AppError::InternalError(format!(
            "could not provision {} code for user {user_id}",
            def.display_policy
        )))
    }

    async fn find_provisioned(
        &self,
        user_id: i64,
        month_key: &str,
        def: &BenefitDefinition,
    ) -> Result<Option<codes::Model>, DbErr> {
        codes::Entity::find()
            .filter(codes::Column::UserId.eq(user_id))
            .filter(codes::Column::MonthKey.eq(month_key))
            .filter(codes::Column::DisplayPolicy.eq(def.display_policy))
            .one(&self.pool)
            .await
    }

    /// Case-insensitive lookup; `email` must already be normalised.
    pub async fn find_member_by_email(&self, email: &str) -> AppResult<Option<users::Model>> {
        let member = users::Entity::find()
            .filter(Expr::expr(Func::lower(Expr::col(users::Column::Email))).eq(email))
            .one(&self.pool)
            .await?;
        Ok(member)
    }

    /// Resolves a code token to its row and owner, then applies the gates shared by
    /// validation and redemption (membership, month, spent state).
    pub async fn lookup_redeemable(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<(codes::Model, users::Model)> {
        let found = codes::Entity::find()
            .filter(codes::Column::Code.eq(token))
            .find_also_related(users::Entity)
            .one(&self.pool)
            .await?;

        let (code, member) = match found {
            Some((code, Some(member))) => (code, member),
            _ => return Err(AppError::NotFound),
        };
        check_redeemable(&code, &member, now)?;
        Ok((code, member))
    }

    /// Read-only check used by the staff page before redeeming. Never mutates.
    pub async fn validate(&self, token: Option<&str>) -> AppResult<ValidateResponse> {
        self.validate_at(token, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<ValidateResponse> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::MissingCode)?;
        let (code, member) = self.lookup_redeemable(token, now).await?;
        Ok(ValidateResponse {
            valid: true,
            display_policy: code.display_policy,
            benefit_label: code.benefit_label,
            month_key: code.month_key,
            user_email: member.email,
        })
    }
}

/// The gates every code passes before it may be shown as valid or consumed.
/// Order matters: membership, then month, then spent state.
pub fn check_redeemable(
    code: &codes::Model,
    member: &users::Model,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !member.is_active_on(today_utc(now)) {
        return Err(AppError::Inactive);
    }
    if code.month_key != month_key(now) {
        return Err(AppError::WrongMonth {
            month_key: code.month_key.clone(),
        });
    }
    if let (DisplayPolicy::HideOnRedeem, Some(redeemed_at)) = (code.display_policy, code.redeemed_at)
    {
        return Err(AppError::AlreadyRedeemed { redeemed_at });
    }
    Ok(())
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{IdentityError, IdentityVerifier};
    use crate::testing::{in_memory_pool, insert_member, insert_code};
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, TimeZone};
    use sea_orm::PaginatorTrait;

    /// Accepts tokens of the form `ok:<email>`.
    struct EchoVerifier;

    #[async_trait]
    impl IdentityVerifier for EchoVerifier {
        async fn verify(&self, token: &str) -> Result<String, IdentityError> {
            token
                .strip_prefix("ok:")
                .map(str::to_string)
                .ok_or(IdentityError::Rejected)
        }
    }

    fn may_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn far_future() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2099, 12, 31)
    }

    async fn service() -> CodeService {
        CodeService::new(in_memory_pool().await, Arc::new(EchoVerifier))
    }

    async fn code_count(svc: &CodeService) -> u64 {
        codes::Entity::find().count(&svc.pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_listing_provisions_once_per_month() {
        let svc = service().await;
        insert_member(&svc.pool, "a@x.com", far_future()).await;

        let first = svc
            .list_my_codes_at(Some("a@x.com"), Some("ok:a@x.com"), may_2024())
            .await
            .unwrap();
        assert_eq!(first.codes.len(), 2);
        assert!(first.reason.is_none());
        assert!(first.codes.iter().all(|c| c.month_key == "2024-05"));

        let second = svc
            .list_my_codes_at(Some("a@x.com"), Some("ok:a@x.com"), may_2024())
            .await
            .unwrap();
        assert_eq!(first.codes, second.codes);
        assert_eq!(code_count(&svc).await, 2);
    }

    #[tokio::test]
    async fn test_new_month_gets_new_codes() {
        let svc = service().await;
        insert_member(&svc.pool, "a@x.com", far_future()).await;

        svc.list_my_codes_at(Some("a@x.com"), Some("ok:a@x.com"), may_2024())
            .await
            .unwrap();
        let june = svc
            .list_my_codes_at(
                Some("a@x.com"),
                Some("ok:a@x.com"),
                may_2024() + Duration::days(30),
            )
            .await
            .unwrap();
        assert!(june.codes.iter().all(|c| c.month_key == "2024-06"));
        assert_eq!(code_count(&svc).await, 4);
    }

    #[tokio::test]
    async fn test_concurrent_provisioning_does_not_duplicate() {
        // check-then-insert races; the unique index absorbs the loser
        let svc = service().await;
        let member = insert_member(&svc.pool, "a@x.com", far_future()).await;

        let (a, b) = tokio::join!(
            svc.ensure_monthly_codes(member.id, "2024-05"),
            svc.ensure_monthly_codes(member.id, "2024-05"),
        );
        assert_eq!(a.unwrap() + b.unwrap(), 2);
        assert_eq!(code_count(&svc).await, 2);
    }

    #[tokio::test]
    async fn test_listing_auth_failures() {
        let svc = service().await;
        insert_member(&svc.pool, "a@x.com", far_future()).await;

        let err = svc
            .list_my_codes_at(None, Some("ok:a@x.com"), may_2024())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingEmail));

        let err = svc
            .list_my_codes_at(Some("a@x.com"), None, may_2024())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingToken));

        let err = svc
            .list_my_codes_at(Some("a@x.com"), Some("garbage"), may_2024())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));

        // token for another member
        let err = svc
            .list_my_codes_at(Some("a@x.com"), Some("ok:b@x.com"), may_2024())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));

        let err = svc
            .list_my_codes_at(Some("nobody@x.com"), Some("ok:nobody@x.com"), may_2024())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownMember));
    }

    #[tokio::test]
    async fn test_email_match_is_case_insensitive() {
        let svc = service().await;
        insert_member(&svc.pool, "Mixed@X.com", far_future()).await;

        let listed = svc
            .list_my_codes_at(Some("mixed@x.com"), Some("ok:MIXED@x.com"), may_2024())
            .await
            .unwrap();
        assert_eq!(listed.codes.len(), 2);
    }

    #[tokio::test]
    async fn test_lapsed_member_sees_inactive_and_gets_nothing_provisioned() {
        let svc = service().await;
        let yesterday = (may_2024() - Duration::days(1)).date_naive();
        insert_member(&svc.pool, "a@x.com", Some(yesterday)).await;

        let listed = svc
            .list_my_codes_at(Some("a@x.com"), Some("ok:a@x.com"), may_2024())
            .await
            .unwrap();
        assert!(listed.codes.is_empty());
        assert_eq!(listed.reason.as_deref(), Some("inactive_membership"));
        assert_eq!(code_count(&svc).await, 0);
    }

    #[tokio::test]
    async fn test_validate_gates_in_order() {
        let svc = service().await;
        let now = may_2024();
        let active = insert_member(&svc.pool, "a@x.com", far_future()).await;
        let lapsed = insert_member(&svc.pool, "b@x.com", Some((now - Duration::days(1)).date_naive())).await;

        insert_code(&svc.pool, active.id, "current", "2024-05", DisplayPolicy::AlwaysShow, None).await;
        insert_code(&svc.pool, active.id, "stale", "2024-04", DisplayPolicy::HideOnRedeem, Some(now - Duration::days(20))).await;
        insert_code(&svc.pool, active.id, "spent", "2024-05", DisplayPolicy::HideOnRedeem, Some(now)).await;
        // lapsed membership wins over wrong month
        insert_code(&svc.pool, lapsed.id, "lapsed-stale", "2024-04", DisplayPolicy::AlwaysShow, None).await;

        let ok = svc.validate_at(Some("current"), now).await.unwrap();
        assert!(ok.valid);
        assert_eq!(ok.user_email, "a@x.com");
        assert_eq!(ok.display_policy, DisplayPolicy::AlwaysShow);

        assert!(matches!(
            svc.validate_at(Some("missing"), now).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            svc.validate_at(None, now).await,
            Err(AppError::MissingCode)
        ));
        assert!(matches!(
            svc.validate_at(Some("lapsed-stale"), now).await,
            Err(AppError::Inactive)
        ));
        match svc.validate_at(Some("stale"), now).await {
            Err(AppError::WrongMonth { month_key }) => assert_eq!(month_key, "2024-04"),
            other => panic!("expected wrong_month, got {other:?}"),
        }
        assert!(matches!(
            svc.validate_at(Some("spent"), now).await,
            Err(AppError::AlreadyRedeemed { .. })
        ));
    }

    #[tokio::test]
    async fn test_spent_codes_are_hidden_from_listing() {
        let svc = service().await;
        let now = may_2024();
        let member = insert_member(&svc.pool, "a@x.com", far_future()).await;
        insert_code(&svc.pool, member.id, "spent", "2024-05", DisplayPolicy::HideOnRedeem, Some(now)).await;

        let listed = svc
            .list_my_codes_at(Some("a@x.com"), Some("ok:a@x.com"), now)
            .await
            .unwrap();
        assert_eq!(listed.codes.len(), 1);
        assert_eq!(listed.codes[0].display_policy, DisplayPolicy::AlwaysShow);
        // no replacement for the spent code this month
        assert_eq!(code_count(&svc).await, 2);
    }
}
