use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Bearer token the request was authenticated with, kept so handlers can
/// forward it to the upstream API.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Anything that can hand the auth middleware the application config.
pub trait HasConfig {
    fn config(&self) -> &AppConfig;
}

impl HasConfig for AppConfig {
    fn config(&self) -> &AppConfig {
        self
    }
}

pub async fn auth_middleware<S>(
    State(state): State<Arc<S>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError>
where
    S: HasConfig + Send + Sync + 'static,
{
    let auth_value = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?
        .trim()
        .to_string();

    let user = validate_token(&token, &state.config().jwt_secret).map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}
