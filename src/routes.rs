use std::sync::Arc;

use actix_web::http::header::{self, ContentType};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use utoipa::IntoParams;

use crate::auth::{self, LoginOutcome, Session};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::event::ingest_pin_event;
use crate::models::*;
use crate::repo::Repo;
use crate::views;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/pins")
            .route(web::get().to(list_pins))
            .route(web::post().to(receive_event)),
    )
    .service(
        web::resource("/signup")
            .route(web::get().to(signup_form))
            .route(web::post().to(signup)),
    )
    .service(
        web::resource("/login")
            .route(web::get().to(login_form))
            .route(web::post().to(login)),
    )
    .service(web::resource("/logout").route(web::post().to(logout)))
    .service(web::resource("/pins").route(web::get().to(pins_page)));
}

/// Internal task-queue route; only mounted when the worker is enabled.
pub fn worker_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/worker/create_pin", web::post().to(create_pin_task));
}

#[derive(Clone)]
pub struct AppState { pub repo: Arc<dyn Repo>, pub config: Arc<AppConfig> }

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found().insert_header((header::LOCATION, location)).finish()
}

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status).content_type(ContentType::html()).body(body)
}

fn token_matches(payload: &Value, expected: &str) -> bool {
    payload.get("token").and_then(Value::as_str) == Some(expected)
}

#[utoipa::path(
    post,
    path = "/api/pins",
    responses(
        (status = 201, description = "Pin stored (or already stored)"),
        (status = 200, description = "URL verification handshake echo"),
        (status = 401, description = "Missing or unrecognized token"),
        (status = 500, description = "Malformed event or store unavailable")
    )
)]
pub async fn receive_event(data: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    // A body that is not JSON has no token and is rejected like one without.
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    if !token_matches(&payload, &data.config.slack_verification_token) {
        warn!("rejected delivery with missing or unrecognized token");
        return Err(ApiError::Unauthorized);
    }
    if let Some(challenge) = payload.get("challenge") {
        info!("answering url verification challenge");
        return Ok(HttpResponse::Ok().json(json!({ "challenge": challenge })));
    }
    ingest_pin_event(&*data.repo, &payload).await?;
    Ok(HttpResponse::Created().finish())
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPinsQuery {
    /// Slack user id of the message author.
    pub user_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/pins",
    params(ListPinsQuery),
    responses(
        (status = 200, description = "Newest pins first, `{\"data\": {\"pins\": [...]}}`", body = PinList)
    )
)]
pub async fn list_pins(data: web::Data<AppState>, query: web::Query<ListPinsQuery>) -> Result<HttpResponse, ApiError> {
    let pins = match query.user_id.as_deref().filter(|id| !id.is_empty()) {
        Some(author) => data.repo.query_by_author(author, DEFAULT_PAGE_SIZE).await?,
        None => data.repo.query_all(DEFAULT_PAGE_SIZE).await?,
    };
    Ok(HttpResponse::Ok().json(DataEnvelope { data: PinList { pins } }))
}

/// Task-queue pushes carry no JSON content type, so the raw body is decoded here.
pub async fn create_pin_task(data: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse, ApiError> {
    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        error!("worker task body is not JSON: {e}");
        ApiError::Internal
    })?;
    ingest_pin_event(&*data.repo, &payload).await?;
    Ok(HttpResponse::Created().finish())
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    /// Both fields must contain something other than spaces.
    pub fn is_complete(&self) -> bool {
        let filled = |s: &str| s.chars().any(|c| c != ' ');
        filled(&self.username) && filled(&self.password)
    }
}

pub async fn signup_form(session: Option<Session>) -> HttpResponse {
    if session.is_some() { return redirect("/pins"); }
    html(StatusCode::OK, views::signup_page(None))
}

pub async fn signup(data: web::Data<AppState>, form: web::Form<Credentials>) -> Result<HttpResponse, ApiError> {
    if !form.is_complete() {
        return Ok(html(StatusCode::BAD_REQUEST, views::signup_page(Some(views::E_BAD_FORM))));
    }
    if auth::signup(&*data.repo, &form.username, &form.password).await? {
        info!(username = %form.username, "user created");
    }
    Ok(redirect("/login"))
}

pub async fn login_form(session: Option<Session>) -> HttpResponse {
    if session.is_some() { return redirect("/pins"); }
    html(StatusCode::OK, views::login_page(None))
}

pub async fn login(data: web::Data<AppState>, form: web::Form<Credentials>) -> Result<HttpResponse, ApiError> {
    if !form.is_complete() {
        return Ok(html(StatusCode::BAD_REQUEST, views::login_page(Some(views::E_BAD_FORM))));
    }
    match auth::login(&*data.repo, &form.username, &form.password).await? {
        LoginOutcome::Authenticated(user) => {
            let cfg = &data.config;
            let token = auth::create_session_token(&user.username, &cfg.session_secret, cfg.session_ttl_hours)
                .map_err(|e| {
                    error!("issuing session token failed: {e}");
                    ApiError::Internal
                })?;
            Ok(HttpResponse::Found()
                .insert_header((header::LOCATION, "/pins"))
                .cookie(auth::session_cookie(token))
                .finish())
        }
        LoginOutcome::UnknownUser => {
            Ok(html(StatusCode::NOT_FOUND, views::login_page(Some(views::E_ENTITY_DOES_NOT_EXIST))))
        }
        LoginOutcome::WrongPassword => {
            warn!(username = %form.username, "login with incorrect password");
            Ok(html(StatusCode::BAD_REQUEST, views::login_page(Some(views::E_INCORRECT_PASSWORD))))
        }
    }
}

pub async fn logout() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/login"))
        .cookie(auth::clear_session_cookie())
        .finish()
}

pub async fn pins_page(session: Option<Session>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let Some(Session(user)) = session else { return Ok(redirect("/login")) };
    let pins = data.repo.query_all(DEFAULT_PAGE_SIZE).await?;
    Ok(html(StatusCode::OK, views::pins_page(&user.username, &pins)))
}
