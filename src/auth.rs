use crate::{AppConfig, AppState};
use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose};
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    authorized: bool,
    expires_at: Option<DateTime<Utc>>,
}

pub fn create_signed_cookie(secret: &str, value: &str) -> Result<String, String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "Invalid secret key")?;
    mac.update(value.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);
    Ok(format!("{}:{}", value, signature_b64))
}

/// Returns the signed payload when the signature checks out.
pub fn verify_signed_cookie<'a>(secret: &str, signed_value: &'a str) -> Option<&'a str> {
    let (value, signature_b64) = signed_value.rsplit_once(':')?;
    let signature = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(value.as_bytes());
    mac.verify_slice(&signature).ok()?;
    Some(value)
}

/// Compares a submitted password against the configured one in constant time.
/// An empty configured password never matches.
pub fn password_matches(secret: &str, expected: &str, candidate: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(expected.as_bytes());
    let expected_tag = mac.finalize().into_bytes();

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(candidate.as_bytes());
    mac.verify_slice(&expected_tag).is_ok()
}

/// Signs a fresh session value of the form `{nonce}.{expires_unix}`.
pub fn create_session(secret: &str, expires_at: DateTime<Utc>) -> Result<String, String> {
    let nonce: [u8; 16] = rand::rng().random();
    let value = format!(
        "{}.{}",
        general_purpose::URL_SAFE_NO_PAD.encode(nonce),
        expires_at.timestamp()
    );
    create_signed_cookie(secret, &value)
}

/// Expiry of a validly signed, unexpired session cookie.
pub fn session_expiry(
    headers: &HeaderMap,
    app_config: &AppConfig,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let signed_value = get_cookie_value(headers, SESSION_COOKIE)?;
    let value = verify_signed_cookie(&app_config.session_secret, &signed_value)?;
    let (_nonce, expires) = value.split_once('.')?;
    let expires_at = Utc.timestamp_opt(expires.parse().ok()?, 0).single()?;
    (expires_at > now).then_some(expires_at)
}

pub fn is_authorized(headers: &HeaderMap, app_config: &AppConfig, now: DateTime<Utc>) -> bool {
    session_expiry(headers, app_config, now).is_some()
}

pub fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "error": "Unauthorized",
        })),
    )
        .into_response()
}

pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get("cookie")?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

fn session_cookie_header(value: &str, max_age_secs: i64) -> Option<HeaderValue> {
    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, value, max_age_secs
    );
    HeaderValue::from_str(&cookie).ok()
}

pub async fn login_handler(
    State(app_state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    tracing::info!("Login attempt received");
    let app = &app_state.config.app;

    // An empty admin password disables login entirely.
    if !password_matches(&app.session_secret, &app.admin_password, &form.password) {
        tracing::warn!("Login failed - invalid password");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "error": "Invalid password",
            })),
        )
            .into_response();
    }

    let lifetime = Duration::minutes(app.session_lifetime_minutes as i64);
    let expires_at = Utc::now() + lifetime;

    let cookie = create_session(&app.session_secret, expires_at)
        .ok()
        .and_then(|signed| session_cookie_header(&signed, lifetime.num_seconds()));

    match cookie {
        Some(cookie) => {
            tracing::info!("Login successful, session expires at {}", expires_at);
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);
            (
                headers,
                Json(json!({
                    "success": true,
                    "expiresAt": expires_at,
                })),
            )
                .into_response()
        }
        None => {
            tracing::error!("Failed to sign session cookie");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Server error",
                })),
            )
                .into_response()
        }
    }
}

pub async fn logout_handler() -> Response {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = session_cookie_header("", 0) {
        headers.insert(SET_COOKIE, cookie);
    }
    (headers, Json(json!({ "success": true }))).into_response()
}

pub async fn session_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Json<SessionResponse> {
    let expires_at = session_expiry(&headers, &app_state.config.app, Utc::now());
    Json(SessionResponse {
        authorized: expires_at.is_some(),
        expires_at,
    })
}
