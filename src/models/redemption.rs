use crate::error::{AppError, AppResult};
use crate::utils::money::{coerce_non_negative, parse_amount};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Body of `POST /api/redeem` as sent by the staff page. Every field is
/// optional at the wire level; [`RedeemRequest::into_command`] enforces the
/// required ones.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RedeemRequest {
    pub code: Option<String>,
    /// `percent`, `fixed` or `item`
    #[schema(example = "percent")]
    pub discount_type: Option<String>,
    #[schema(value_type = Option<f64>, example = 20)]
    pub discount_value: Option<Value>,
    #[schema(value_type = Option<f64>, example = 10.0)]
    pub gross_amount: Option<Value>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub till_txn_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub staff_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub store_id: Option<String>,
}

/// A redemption attempt whose required fields are present.
#[derive(Debug, Clone, PartialEq)]
pub struct RedemptionCommand {
    pub code: String,
    /// Checked against the supported types only after the code itself passes its gates.
    pub discount_type: String,
    pub discount_value: f64,
    pub gross_amount: f64,
    pub till_txn_id: Option<String>,
    pub staff_id: Option<String>,
    pub store_id: Option<String>,
}

impl RedeemRequest {
    /// Parses a raw request body. An empty body is treated as `{}`.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| AppError::InvalidBody(e.to_string()))
    }

    pub fn into_command(self) -> AppResult<RedemptionCommand> {
        let code = non_blank(self.code).ok_or(AppError::MissingFields)?;
        let discount_type = non_blank(self.discount_type).ok_or(AppError::MissingFields)?;
        let discount_value = self
            .discount_value
            .as_ref()
            .and_then(parse_amount)
            .ok_or(AppError::MissingFields)?;

        Ok(RedemptionCommand {
            code,
            discount_type,
            discount_value,
            gross_amount: coerce_non_negative(self.gross_amount.as_ref()),
            till_txn_id: self.till_txn_id,
            staff_id: self.staff_id,
            store_id: self.store_id,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Till/staff/store identifiers arrive as strings or bare numbers; blanks are absent.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => non_blank(Some(s)),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SavingsSummary {
    pub uses: i64,
    pub saved: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedeemResponse {
    pub ok: bool,
    pub amount_saved: f64,
    #[schema(example = "GBP")]
    pub currency: String,
    pub this_month: SavingsSummary,
    pub all_time: SavingsSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> RedeemRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_required_fields() {
        let missing_code = parse(json!({"discount_type": "percent", "discount_value": 20}));
        assert!(matches!(
            missing_code.into_command(),
            Err(AppError::MissingFields)
        ));

        let null_value = parse(json!({"code": "abc", "discount_type": "item", "discount_value": null}));
        assert!(matches!(
            null_value.into_command(),
            Err(AppError::MissingFields)
        ));

        let zero_value = parse(json!({"code": "abc", "discount_type": "item", "discount_value": 0}));
        assert_eq!(zero_value.into_command().unwrap().discount_value, 0.0);
    }

    #[test]
    fn test_from_body() {
        let empty = RedeemRequest::from_body(b"").unwrap();
        assert!(matches!(empty.into_command(), Err(AppError::MissingFields)));

        let req = RedeemRequest::from_body(br#"{"code":"abc","discount_type":"item","discount_value":0}"#)
            .unwrap();
        assert_eq!(req.code.as_deref(), Some("abc"));

        assert!(matches!(
            RedeemRequest::from_body(b"{\"code\":"),
            Err(AppError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_gross_amount_coercion() {
        let cmd = parse(json!({
            "code": "abc", "discount_type": "fixed", "discount_value": "5",
            "gross_amount": "-4"
        }))
        .into_command()
        .unwrap();
        assert_eq!(cmd.gross_amount, 0.0);
        assert_eq!(cmd.discount_value, 5.0);

        let cmd = parse(json!({"code": "abc", "discount_type": "fixed", "discount_value": 5}))
            .into_command()
            .unwrap();
        assert_eq!(cmd.gross_amount, 0.0);
    }

    #[test]
    fn test_identifier_fields_accept_numbers() {
        let cmd = parse(json!({
            "code": "abc", "discount_type": "percent", "discount_value": 20,
            "till_txn_id": 12345, "staff_id": "", "store_id": "Taproom-1"
        }))
        .into_command()
        .unwrap();
        assert_eq!(cmd.till_txn_id.as_deref(), Some("12345"));
        assert_eq!(cmd.staff_id, None);
        assert_eq!(cmd.store_id.as_deref(), Some("Taproom-1"));
    }
}
