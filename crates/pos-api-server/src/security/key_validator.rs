use crate::utils::error::ApiError;
use axum::http::HeaderMap;
use tracing::warn;

pub const MANAGER_KEY_HEADER: &str = "x-pos-api-key";

/// Validates the manager API key on catalog mutations and reports. This is
/// terminal hardening, not user auth; the storefront login flow lives
/// outside this service.
#[derive(Debug, Clone)]
pub struct ManagerKeyValidator {
    expected_key: String,
}

impl ManagerKeyValidator {
    pub fn new(expected_key: String) -> Self {
        Self { expected_key }
    }

    pub fn validate(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let key = headers
            .get(MANAGER_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("Missing {} header", MANAGER_KEY_HEADER))
            })?;

        if key != self.expected_key {
            warn!("Invalid manager API key presented");
            return Err(ApiError::Unauthorized("Invalid manager API key".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(key: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(key) = key {
            headers.insert(MANAGER_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        }
        headers
    }

    #[test]
    fn test_accepts_expected_key() {
        let validator = ManagerKeyValidator::new("secret".to_string());
        assert!(validator.validate(&headers_with(Some("secret"))).is_ok());
    }

    #[test]
    fn test_rejects_missing_or_wrong_key() {
        let validator = ManagerKeyValidator::new("secret".to_string());
        assert!(validator.validate(&headers_with(None)).is_err());
        assert!(validator.validate(&headers_with(Some("nope"))).is_err());
    }
}
