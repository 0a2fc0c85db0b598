use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::api::handlers::ApiResponse;
use crate::{jwt, AppState};

/// Current authenticated administrator extracted from JWT
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let auth_header = headers
        .get("authorization")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_str()
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)
}

impl AuthUser {
    pub fn from_headers(headers: &HeaderMap, jwt_secret: &str) -> Result<Self, StatusCode> {
        let token = extract_bearer_token(headers)?;
        let claims =
            jwt::verify_token(token, jwt_secret).map_err(|_| StatusCode::UNAUTHORIZED)?;

        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
        })
    }
}

/// Middleware to extract and store AuthUser in request extensions
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_user = request
        .extensions()
        .get::<AppState>()
        .and_then(|state| AuthUser::from_headers(request.headers(), &state.jwt_secret).ok());
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// 拒绝未登录的请求
pub async fn require_auth(request: Request, next: Next) -> Response {
    let authenticated = matches!(
        request.extensions().get::<Option<AuthUser>>(),
        Some(Some(_))
    );
    if !authenticated {
        return (
            StatusCode::UNAUTHORIZED,
            ApiResponse::<()>::error("Not authenticated".to_string()),
        )
            .into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_from_headers() {
        let token = jwt::generate_token(1, "admin", "secret", 1).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        let user = AuthUser::from_headers(&headers, "secret").unwrap();
        assert_eq!(user.username, "admin");

        headers.insert("authorization", HeaderValue::from_str(&token).unwrap());
        assert_eq!(
            AuthUser::from_headers(&headers, "secret").unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }
}
