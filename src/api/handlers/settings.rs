use axum::{extract::Extension, response::Json};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Serialize;

use crate::{
    auth::{hash_password, verify_password},
    entity::{admin, Admin},
    error::ConfigError,
    middleware::AuthUser,
    schema::{
        fields::AVAILABLE_COUNTRIES,
        settings::{
            validate_blocked_countries, validate_inbounds, CredentialsForm, DomainSettings,
            GeneralSettings, TelegramSettings, XrayInboundSetting,
        },
        RawForm,
    },
    settings_manager::PanelSettings,
    AppState,
};

use super::{fail, internal_error, not_found, ok, validation_failed, AdminInfo, ApiResult};
use axum::http::StatusCode;

#[derive(Debug, Serialize)]
pub struct Country {
    pub code: &'static str,
    pub name: &'static str,
}

/// GET /api/settings
pub async fn get_settings(Extension(app_state): Extension<AppState>) -> ApiResult<PanelSettings> {
    ok(app_state.settings.snapshot().await)
}

/// GET /api/settings/countries
pub async fn list_countries() -> ApiResult<Vec<Country>> {
    ok(AVAILABLE_COUNTRIES
        .iter()
        .map(|&(code, name)| Country { code, name })
        .collect())
}

/// PUT /api/settings/general
pub async fn update_general(
    Extension(app_state): Extension<AppState>,
    Json(form): Json<RawForm>,
) -> ApiResult<GeneralSettings> {
    let general = match GeneralSettings::validate(&form) {
        Ok(general) => general,
        Err(errors) => return validation_failed(&errors),
    };
    match app_state.settings.save_general(&general).await {
        Ok(()) => {
            tracing::info!("⚙️ 常规设置已更新");
            ok(general)
        }
        Err(e) => internal_error("Failed to save general settings", e),
    }
}

/// PUT /api/settings/inbounds
pub async fn update_inbounds(
    Extension(app_state): Extension<AppState>,
    Json(form): Json<RawForm>,
) -> ApiResult<Vec<XrayInboundSetting>> {
    let inbounds = match validate_inbounds(&form) {
        Ok(inbounds) => inbounds,
        Err(errors) => return validation_failed(&errors),
    };
    match app_state.settings.save_inbounds(&inbounds).await {
        Ok(()) => {
            tracing::info!("⚙️ 面板入站已更新，共 {} 个", inbounds.len());
            ok(inbounds)
        }
        Err(e) => internal_error("Failed to save inbounds", e),
    }
}

/// PUT /api/settings/telegram
pub async fn update_telegram(
    Extension(app_state): Extension<AppState>,
    Json(form): Json<RawForm>,
) -> ApiResult<TelegramSettings> {
    let telegram = match TelegramSettings::validate(&form) {
        Ok(telegram) => telegram,
        Err(errors) => return validation_failed(&errors),
    };
    match app_state.settings.save_telegram(&telegram).await {
        Ok(()) => {
            tracing::info!("⚙️ Telegram 设置已更新，启用: {}", telegram.enabled);
            ok(telegram)
        }
        Err(e) => internal_error("Failed to save telegram settings", e),
    }
}

/// PUT /api/settings/blocked-countries
pub async fn update_blocked_countries(
    Extension(app_state): Extension<AppState>,
    Json(form): Json<RawForm>,
) -> ApiResult<Vec<String>> {
    let countries = match validate_blocked_countries(&form) {
        Ok(countries) => countries,
        Err(errors) => return validation_failed(&errors),
    };
    match app_state.settings.save_blocked_countries(&countries).await {
        Ok(()) => {
            tracing::info!("⚙️ 禁止访问国家已更新: {:?}", countries);
            ok(countries)
        }
        Err(e) => internal_error("Failed to save blocked countries", e),
    }
}

/// PUT /api/settings/domain
pub async fn update_domain(
    Extension(app_state): Extension<AppState>,
    Json(form): Json<RawForm>,
) -> ApiResult<DomainSettings> {
    let domain = match DomainSettings::validate(&form) {
        Ok(domain) => domain,
        Err(errors) => return validation_failed(&errors),
    };
    match app_state.settings.save_domain(&domain).await {
        Ok(()) => {
            tracing::info!("⚙️ 域名设置已更新，SSL: {}", domain.ssl_enabled);
            ok(domain)
        }
        Err(e) => internal_error("Failed to save domain settings", e),
    }
}

/// PUT /api/settings/credentials - 修改当前管理员的用户名和密码
pub async fn update_credentials(
    Extension(app_state): Extension<AppState>,
    Extension(auth_user): Extension<Option<AuthUser>>,
    Json(form): Json<RawForm>,
) -> ApiResult<AdminInfo> {
    let Some(auth_user) = auth_user else {
        return fail(StatusCode::UNAUTHORIZED, "Not authenticated");
    };
    let credentials = match CredentialsForm::validate(&form) {
        Ok(credentials) => credentials,
        Err(errors) => return validation_failed(&errors),
    };

    let db = &app_state.db;
    let current = match Admin::find_by_id(auth_user.id).one(db).await {
        Ok(Some(admin)) => admin,
        Ok(None) => return not_found("Admin"),
        Err(e) => return internal_error("Failed to load admin", e.into()),
    };

    match verify_password(&credentials.current_password, &current.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return validation_failed(
                &ConfigError::invalid("currentPassword", "incorrect password").into(),
            )
        }
        Err(e) => return internal_error("Failed to verify password", e),
    }

    if credentials.username != current.username {
        match Admin::find()
            .filter(admin::Column::Username.eq(&credentials.username))
            .one(db)
            .await
        {
            Ok(Some(_)) => {
                return fail(
                    StatusCode::CONFLICT,
                    format!("Username '{}' already exists", credentials.username),
                )
            }
            Ok(None) => {}
            Err(e) => return internal_error("Failed to check username", e.into()),
        }
    }

    let mut active: admin::ActiveModel = current.into();
    active.username = Set(credentials.username.clone());
    if let Some(password) = &credentials.new_password {
        match hash_password(password) {
            Ok(hash) => active.password_hash = Set(hash),
            Err(e) => return internal_error("Failed to hash password", e),
        }
    }
    active.updated_at = Set(Utc::now().naive_utc());

    match active.update(db).await {
        Ok(admin) => {
            tracing::info!("🔐 管理员 #{} 凭据已更新，用户名: {}", admin.id, admin.username);
            ok(AdminInfo {
                id: admin.id,
                username: admin.username,
            })
        }
        Err(e) => internal_error("Failed to update credentials", e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields::form_from;
    use crate::{seed, test_support};
    use serde_json::json;

    #[tokio::test]
    async fn test_inbounds_scoped_errors_not_saved() {
        let state = test_support::state().await;
        let (status, Json(body)) = update_inbounds(
            Extension(state.clone()),
            Json(form_from(json!({
                "xrayInbounds": [
                    { "tag": "a", "port": 443, "protocol": "vless", "settings": "{}", "streamSettings": "{}" },
                    { "tag": "b", "port": 70000, "protocol": "vless", "settings": "{}", "streamSettings": "{}" },
                ]
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.errors.unwrap()[0].field, "xrayInbounds[1].port");
        assert!(state.settings.xray_inbounds().await.is_empty());
    }

    #[tokio::test]
    async fn test_general_and_countries() {
        let state = test_support::state().await;
        let (status, _) = update_general(
            Extension(state.clone()),
            Json(form_from(json!({ "panelName": "Edge", "sessionTimeoutMinutes": "45" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, Json(body)) = update_blocked_countries(
            Extension(state.clone()),
            Json(form_from(json!({ "blockedCountries": "IR, XX" }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.errors.unwrap()[0].code, "unknown_country");

        let (_, Json(body)) = get_settings(Extension(state)).await;
        let settings = body.data.unwrap();
        assert_eq!(settings.general.panel_name, "Edge");
        assert_eq!(settings.general.session_timeout_minutes, 45);
        assert!(settings.blocked_countries.is_empty());
    }

    #[tokio::test]
    async fn test_credentials_change() {
        let state = test_support::state().await;
        let password = seed::ensure_admin(&state.db, "admin").await.unwrap().unwrap();
        let admin = Admin::find().one(&state.db).await.unwrap().unwrap();
        let auth_user = AuthUser {
            id: admin.id,
            username: admin.username,
        };

        let (status, Json(body)) = update_credentials(
            Extension(state.clone()),
            Extension(Some(auth_user.clone())),
            Json(form_from(json!({ "currentPassword": "not-it", "username": "admin" }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.errors.unwrap()[0].field, "currentPassword");

        let (status, Json(body)) = update_credentials(
            Extension(state.clone()),
            Extension(Some(auth_user)),
            Json(form_from(json!({
                "currentPassword": password,
                "username": "root",
                "newPassword": "a-much-longer-password",
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap().username, "root");

        let admin = Admin::find().one(&state.db).await.unwrap().unwrap();
        assert!(verify_password("a-much-longer-password", &admin.password_hash).unwrap());
    }
}
