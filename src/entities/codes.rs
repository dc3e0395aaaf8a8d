use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Whether a code stays usable all month or disappears after one use.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum DisplayPolicy {
    #[sea_orm(string_value = "always_show")]
    AlwaysShow,
    #[sea_orm(string_value = "hide_on_redeem")]
    HideOnRedeem,
}

impl std::fmt::Display for DisplayPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayPolicy::AlwaysShow => write!(f, "always_show"),
            DisplayPolicy::HideOnRedeem => write!(f, "hide_on_redeem"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub month_key: String,
    pub benefit_label: String,
    pub display_policy: DisplayPolicy,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redemption_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::redemptions::Entity")]
    Redemptions,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::redemptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Redemptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A `hide_on_redeem` code is spent once `redeemed_at` is set; `always_show`
    /// codes are never spent within their month.
    pub fn is_spent(&self) -> bool {
        self.display_policy == DisplayPolicy::HideOnRedeem && self.redeemed_at.is_some()
    }
}
