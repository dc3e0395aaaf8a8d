use crate::entities::{DisplayPolicy, code_entity};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MyCodesQuery {
    #[schema(example = "a@x.com")]
    pub email: Option<String>,
}

/// One listed perk code. Never carries internal ids.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MemberCodeResponse {
    pub code: String,
    #[schema(example = "20% Off Drinks")]
    pub benefit_label: String,
    pub display_policy: DisplayPolicy,
    #[schema(example = "2024-05")]
    pub month_key: String,
}

impl From<code_entity::Model> for MemberCodeResponse {
    fn from(m: code_entity::Model) -> Self {
        Self {
            code: m.code,
            benefit_label: m.benefit_label,
            display_policy: m.display_policy,
            month_key: m.month_key,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MyCodesResponse {
    pub codes: Vec<MemberCodeResponse>,
    /// `inactive_membership` when the member's paid period has lapsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl MyCodesResponse {
    pub fn codes(codes: Vec<MemberCodeResponse>) -> Self {
        Self {
            codes,
            reason: None,
        }
    }

    pub fn inactive() -> Self {
        Self {
            codes: Vec::new(),
            reason: Some("inactive_membership".to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ValidateQuery {
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub display_policy: DisplayPolicy,
    pub benefit_label: String,
    pub month_key: String,
    pub user_email: String,
}
