use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{NewUser, User};
use crate::repo::{RepoError, RepoResult, UserRepo};
use crate::routes::AppState;

pub const SESSION_COOKIE: &str = "session";

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Argon2id PHC string with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// False for a wrong password and for a stored hash that does not parse.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| Argon2::default().verify_password(plain.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// Runs password work on the blocking pool; a failed task is `RepoError::Internal`.
async fn blocking<F, T>(f: F) -> RepoResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e| RepoError::Internal(format!("password task failed: {e}")))
}

/// Outcome of a login attempt. Unknown users and bad passwords stay distinct.
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(User),
    UnknownUser,
    WrongPassword,
}

pub async fn login<R: UserRepo + ?Sized>(repo: &R, username: &str, password: &str) -> RepoResult<LoginOutcome> {
    let Some(user) = repo.get_user(username).await? else {
        return Ok(LoginOutcome::UnknownUser);
    };
    let plain = password.to_owned();
    let stored = user.password_hash.clone();
    let ok = blocking(move || verify_password(&plain, &stored)).await?;
    Ok(if ok { LoginOutcome::Authenticated(user) } else { LoginOutcome::WrongPassword })
}

/// Registers `username` unless it already exists. Returns whether a user was created.
pub async fn signup<R: UserRepo + ?Sized>(repo: &R, username: &str, password: &str) -> Result<bool, ApiError> {
    if repo.get_user(username).await?.is_some() {
        return Ok(false);
    }
    let plain = password.to_owned();
    let password_hash = blocking(move || hash_password(&plain)).await?.map_err(|e| {
        tracing::error!("{e}");
        ApiError::Internal
    })?;
    Ok(repo.create_user(NewUser { username: username.to_owned(), password_hash }).await?)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub fn create_session_token(username: &str, secret: &str, ttl_hours: i64) -> Result<String, AuthError> {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(ttl_hours)).timestamp().max(0) as usize;
    let claims = Claims { sub: username.to_owned(), exp };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?)
}

pub fn decode_session_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    let mut c = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    c.make_removal();
    c
}

/// Logged-in user, taken from the session cookie or a Bearer token and
/// reloaded from the user store.
#[derive(Debug, Clone)]
pub struct Session(pub User);

impl FromRequest for Session {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = req
            .cookie(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .or_else(|| BearerAuth::from_request(req, pl).into_inner().ok().map(|b| b.token().to_owned()));
        Box::pin(async move {
            let state = state.ok_or_else(|| actix_web::error::ErrorInternalServerError("application state missing"))?;
            let token = token.ok_or_else(|| actix_web::error::ErrorUnauthorized("Login required"))?;
            let claims = decode_session_token(&token, &state.config.session_secret)
                .map_err(|_| actix_web::error::ErrorUnauthorized("Invalid session"))?;
            match state.repo.get_user(&claims.sub).await {
                Ok(Some(user)) => Ok(Session(user)),
                Ok(None) => Err(actix_web::error::ErrorUnauthorized("Unknown session user")),
                Err(e) => {
                    tracing::error!("session user lookup failed: {e}");
                    Err(actix_web::error::ErrorInternalServerError("store unavailable"))
                }
            }
        })
    }
}
