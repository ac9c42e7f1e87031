//! Email/password authentication routes for the dashboard.
//!
//! Implements a short-lived access token + refresh token pattern:
//! - Access token: HS256 JWT in `hrms_session` HttpOnly cookie (default 15 min)
//! - Refresh token: opaque token (SHA-256 hashed in DB) in `hrms_refresh` HttpOnly cookie (default 7 days)
//!
//! Endpoints:
//! 1. POST /auth/signup — Create account, issue token pair
//! 2. POST /auth/login — Verify credentials, issue token pair
//! 3. POST /auth/refresh — Rotate: validate refresh token, issue new pair, revoke old
//! 4. GET /auth/me — Return current account from access token
//! 5. POST /auth/logout — Revoke refresh token in DB, clear both cookies

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::config::{ACCESS_COOKIE, Config, REFRESH_COOKIE};
use crate::db::{DbPool, accounts, refresh_tokens};
use crate::error::{AppError, AppResult};
use crate::models::account::{Account, AccountResponse, LoginRequest, SessionClaims, SignupRequest};

/// Session JWT issuer.
pub const SESSION_ISSUER: &str = "hrms";

/// Configure auth routes.
pub fn configure_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(signup)
        .service(login)
        .service(refresh)
        .service(get_current_account)
        .service(logout);
}

// ============================================================================
// Endpoints
// ============================================================================

/// Create a new account and start a session.
///
/// POST /api/v1/auth/signup
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Missing email or password"),
        (status = 409, description = "Email already registered")
    )
)]
#[post("/auth/signup")]
pub async fn signup(
    body: web::Json<SignupRequest>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let email = normalize_email(&body.email)?;
    if body.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Missing required field: password".to_string(),
        ));
    }

    if accounts::find_by_email(pool.connection(), &email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)?;
    let account = accounts::insert(pool.connection(), &email, &password_hash).await?;

    info!("Account created: {} ({})", account.email, account.id);

    let (access_cookie, refresh_cookie) =
        issue_token_pair(&account, &config, pool.get_ref()).await?;

    Ok(HttpResponse::Created()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .json(AccountResponse::from(account)))
}

/// Verify credentials and start a session.
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AccountResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
#[post("/auth/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let email = normalize_email(&body.email)?;

    let account = accounts::find_by_email(pool.connection(), &email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = bcrypt::verify(&body.password, &account.password_hash)?;
    if !valid {
        warn!("Failed login attempt for {}", email);
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    accounts::touch_last_login(pool.connection(), account.id).await?;

    info!("Login: {} ({})", account.email, account.id);

    let (access_cookie, refresh_cookie) =
        issue_token_pair(&account, &config, pool.get_ref()).await?;

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .json(AccountResponse::from(account)))
}

/// Refresh the access token using the refresh token.
///
/// Rotates: old refresh token is revoked, new pair is issued.
///
/// POST /api/v1/auth/refresh
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "New token pair issued", body = AccountResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
#[post("/auth/refresh")]
pub async fn refresh(
    req: HttpRequest,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    // Read refresh token from cookie
    let refresh_token = req
        .cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("No refresh token".to_string()))?;

    // Validate refresh token against DB
    let token_hash = refresh_tokens::hash_token(&refresh_token);
    let account_id = refresh_tokens::find_valid_by_hash(pool.connection(), &token_hash)
        .await?
        .ok_or_else(|| {
            warn!("Refresh: invalid or expired refresh token");
            AppError::Unauthorized("Invalid refresh token".to_string())
        })?;

    // Revoke the old refresh token (rotation)
    refresh_tokens::revoke_by_hash(pool.connection(), &token_hash).await?;

    // Fetch account from DB
    let account = accounts::find_by_id(pool.connection(), account_id)
        .await?
        .ok_or_else(|| {
            warn!("Refresh: account {} not found", account_id);
            AppError::Unauthorized("Account not found".to_string())
        })?;

    let (access_cookie, refresh_cookie) =
        issue_token_pair(&account, &config, pool.get_ref()).await?;

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .json(AccountResponse::from(account)))
}

/// Get current authenticated account from access token.
///
/// GET /api/v1/auth/me
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current account, or null when unauthenticated")
    )
)]
#[get("/auth/me")]
pub async fn get_current_account(
    req: HttpRequest,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let token = match req.cookie(ACCESS_COOKIE) {
        Some(c) => c.value().to_string(),
        None => return Ok(HttpResponse::Ok().json(serde_json::json!({ "account": null }))),
    };

    let claims = match verify_session_token(&token, &config.session.secret) {
        Ok(c) => c,
        Err(_) => return Ok(HttpResponse::Ok().json(serde_json::json!({ "account": null }))),
    };

    let account = accounts::find_by_id(pool.connection(), claims.account_id).await?;

    match account {
        Some(a) => {
            let response = AccountResponse::from(a);
            Ok(HttpResponse::Ok().json(serde_json::json!({ "account": response })))
        }
        None => Ok(HttpResponse::Ok().json(serde_json::json!({ "account": null }))),
    }
}

/// Logout: revoke refresh token server-side, clear both cookies.
///
/// POST /api/v1/auth/logout
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Logged out")
    )
)]
#[post("/auth/logout")]
pub async fn logout(
    req: HttpRequest,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let is_prod = config.environment.is_production();

    // Revoke refresh token in DB if present; logout still clears the
    // cookies when revocation fails, but the failure is logged.
    if let Some(refresh_cookie) = req.cookie(REFRESH_COOKIE) {
        let token_hash = refresh_tokens::hash_token(refresh_cookie.value());
        if let Err(e) = refresh_tokens::revoke_by_hash(pool.connection(), &token_hash).await {
            warn!("Failed to revoke refresh token on logout: {}", e);
        }
    }

    // Clear both cookies
    let mut clear_access = Cookie::new(ACCESS_COOKIE, "");
    clear_access.set_path("/");
    clear_access.set_http_only(true);
    clear_access.set_same_site(SameSite::Lax);
    clear_access.set_secure(is_prod);

    let mut clear_refresh = Cookie::new(REFRESH_COOKIE, "");
    clear_refresh.set_path("/");
    clear_refresh.set_http_only(true);
    clear_refresh.set_same_site(SameSite::Strict);
    clear_refresh.set_secure(is_prod);

    Ok(HttpResponse::Ok()
        .cookie(clear_access)
        .cookie(clear_refresh)
        .json(serde_json::json!({ "message": "Logged out" })))
}

// ============================================================================
// Helpers
// ============================================================================

/// Lowercase and minimally validate an email address.
fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::InvalidInput(
            "Missing required field: email".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::InvalidInput(
            "Invalid email address".to_string(),
        ));
    }
    Ok(email)
}

/// Issue an access token + refresh token cookie pair.
///
/// - Access token: HS256 JWT in `hrms_session` cookie
/// - Refresh token: opaque random token in `hrms_refresh` cookie (hash stored in DB)
async fn issue_token_pair(
    account: &Account,
    config: &Config,
    pool: &DbPool,
) -> AppResult<(Cookie<'static>, Cookie<'static>)> {
    let is_production = config.environment.is_production();

    // Create short-lived access token JWT
    let access_token = create_access_token(
        account,
        &config.session.secret,
        config.session.access_token_ttl_secs,
    )?;

    // Create refresh token and store hash in DB
    let raw_refresh_token = refresh_tokens::generate_token();
    let refresh_hash = refresh_tokens::hash_token(&raw_refresh_token);

    refresh_tokens::insert(
        pool.connection(),
        account.id,
        &refresh_hash,
        config.session.refresh_token_ttl_secs,
    )
    .await?;

    // Build access cookie (short TTL)
    let mut access_cookie = Cookie::new(ACCESS_COOKIE, access_token);
    access_cookie.set_path("/");
    access_cookie.set_http_only(true);
    access_cookie.set_same_site(SameSite::Lax);
    access_cookie.set_secure(is_production);

    // Build refresh cookie (long TTL)
    let mut refresh_cookie = Cookie::new(REFRESH_COOKIE, raw_refresh_token);
    refresh_cookie.set_path("/");
    refresh_cookie.set_http_only(true);
    refresh_cookie.set_same_site(SameSite::Strict); // Stricter for refresh
    refresh_cookie.set_secure(is_production);

    Ok((access_cookie, refresh_cookie))
}

fn create_access_token(
    account: &Account,
    secret: &SecretString,
    ttl_secs: u64,
) -> AppResult<String> {
    let now = chrono::Utc::now();
    let exp = now + chrono::Duration::seconds(ttl_secs as i64);

    let claims = SessionClaims {
        sub: account.id.to_string(),
        iss: SESSION_ISSUER.to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
        account_id: account.id,
        email: account.email.clone(),
    };

    let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::InvalidInput(format!("Failed to create access token: {}", e)))
}

/// Verify an access token JWT and return claims.
pub fn verify_session_token(token: &str, secret: &SecretString) -> Result<SessionClaims, String> {
    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[SESSION_ISSUER]);
    validation.validate_aud = false;

    let token_data = decode::<SessionClaims>(token, &key, &validation)
        .map_err(|e| format!("Invalid session token: {}", e))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn test_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "ann@example.com".to_string(),
            password_hash: String::new(),
            last_login_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let secret = SecretString::from("test-secret".to_string());
        let account = test_account();

        let token = create_access_token(&account, &secret, 900).unwrap();
        let claims = verify_session_token(&token, &secret).unwrap();

        assert_eq!(claims.account_id, account.id);
        assert_eq!(claims.email, "ann@example.com");
        assert_eq!(claims.iss, SESSION_ISSUER);
    }

    #[test]
    fn test_access_token_rejects_wrong_secret() {
        let secret = SecretString::from("test-secret".to_string());
        let other = SecretString::from("other-secret".to_string());
        let account = test_account();

        let token = create_access_token(&account, &secret, 900).unwrap();
        assert!(verify_session_token(&token, &other).is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Ann@Example.COM ").unwrap(),
            "ann@example.com"
        );
        assert!(normalize_email("").is_err());
        assert!(normalize_email("not-an-email").is_err());
    }
}
