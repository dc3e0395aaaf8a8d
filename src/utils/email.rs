use crate::error::{AppError, AppResult};

/// 规范化邮箱（去空格、小写）。格式由身份服务负责，这里只做比较用的规范化
pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::MissingEmail);
    }
    Ok(email.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" A@X.com ").unwrap(), "a@x.com");
        assert!(matches!(normalize_email("   "), Err(AppError::MissingEmail)));
        assert!(matches!(normalize_email(""), Err(AppError::MissingEmail)));
    }

    #[test]
    fn test_dotless_domain_is_accepted() {
        // intranet style addresses are whatever the identity service vouches for
        assert_eq!(normalize_email("Staff@Localhost").unwrap(), "staff@localhost");
    }
}
