use axum::{extract::Extension, http::StatusCode, response::Json};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::{
    auth::verify_password,
    entity::{admin, Admin},
    jwt::generate_token,
    middleware::AuthUser,
    AppState,
};

use super::{fail, internal_error, ok, ApiResult};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AdminInfo,
}

#[derive(Debug, Serialize)]
pub struct AdminInfo {
    pub id: i64,
    pub username: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/auth/login - Administrator login
pub async fn login(
    Extension(app_state): Extension<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let admin = match Admin::find()
        .filter(admin::Column::Username.eq(&req.username))
        .one(&app_state.db)
        .await
    {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            return fail(
                StatusCode::UNAUTHORIZED,
                "Invalid username or password",
            )
        }
        Err(e) => return internal_error("Login failed", e.into()),
    };

    match verify_password(&req.password, &admin.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("⚠️ 管理员 {} 登录失败：密码错误", req.username);
            return fail(
                StatusCode::UNAUTHORIZED,
                "Invalid username or password",
            );
        }
        Err(e) => return internal_error("Login failed", e),
    }

    let token = match generate_token(
        admin.id,
        &admin.username,
        &app_state.jwt_secret,
        app_state.config.jwt_expiration_hours,
    ) {
        Ok(token) => token,
        Err(e) => return internal_error("Failed to generate token", e),
    };

    tracing::info!("🔓 管理员 {} 已登录", admin.username);
    ok(LoginResponse {
        token,
        user: AdminInfo {
            id: admin.id,
            username: admin.username,
        },
    })
}

/// GET /api/auth/me - Current administrator
pub async fn me(Extension(auth_user): Extension<Option<AuthUser>>) -> ApiResult<AdminInfo> {
    match auth_user {
        Some(user) => ok(AdminInfo {
            id: user.id,
            username: user.username,
        }),
        None => fail(StatusCode::UNAUTHORIZED, "Not authenticated"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jwt, seed, test_support};

    #[tokio::test]
    async fn test_login() {
        let state = test_support::state().await;
        let password = seed::ensure_admin(&state.db, "admin").await.unwrap().unwrap();

        let (status, Json(body)) = login(
            Extension(state.clone()),
            Json(LoginRequest {
                username: "admin".to_string(),
                password,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body.data.unwrap().token;
        let claims = jwt::verify_token(&token, &state.jwt_secret).unwrap();
        assert_eq!(claims.username, "admin");

        let (status, _) = login(
            Extension(state),
            Json(LoginRequest {
                username: "admin".to_string(),
                password: "wrong-password".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_requires_auth() {
        let (status, _) = me(Extension(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
