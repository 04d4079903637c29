use crate::security::ManagerKeyValidator;
use crate::utils::error::ApiError;
use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Route-group middleware for the manager surface (catalog mutations and
/// reports). The validator arrives through request extensions, so the
/// Extension layer must wrap this middleware in the router.
pub async fn manager_guard(request: Request, next: Next) -> Result<Response, ApiError> {
    let validator = request
        .extensions()
        .get::<Arc<ManagerKeyValidator>>()
        .ok_or_else(|| ApiError::InternalError("Manager key validator not configured".to_string()))?
        .clone();

    validator.validate(request.headers())?;

    Ok(next.run(request).await)
}
