mod admin_api;
mod auth_api;
pub mod db;
mod result_api;
mod schedule_api;
mod vote_api;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task;
use tracing::{debug, error, info};
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};
use warp::{Filter, Rejection};

use crate::auth::{self, AdminSession, VoterSession};
use crate::config::Config;
use crate::error::{self, HttpError};
use crate::store::VotingStore;
use crate::voting::{EmployeeId, Id, VoteFeed};

/// Everything a handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VotingStore>,
    pub feed: VoteFeed,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn VotingStore>, config: Config) -> AppState {
        AppState { store, feed: VoteFeed::default(), config: Arc::new(config) }
    }

    /// Runs a store-bound workflow on the blocking pool.
    async fn blocking<T, E, F>(&self, work: F) -> Result<T, HttpError>
    where
        F: FnOnce(&dyn VotingStore) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<HttpError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        match task::spawn_blocking(move || work(store.as_ref())).await {
            Ok(result) => result.map_err(Into::into),
            Err(err) => Err(error::internal(format!("worker task failed: {err}"))),
        }
    }

    async fn voter(&self, authorization: Option<String>) -> Result<VoterSession, HttpError> {
        let token = auth::parse_bearer(authorization.as_deref())?;
        let ttl = self.config.session_ttl;
        let session = self.blocking(move |store| auth::resolve_session(store, &token, Utc::now(), ttl)).await?;
        Ok(auth::require_voter(session)?)
    }

    async fn admin(&self, authorization: Option<String>) -> Result<AdminSession, HttpError> {
        let token = auth::parse_bearer(authorization.as_deref())?;
        let ttl = self.config.session_ttl;
        let session = self.blocking(move |store| auth::resolve_session(store, &token, Utc::now(), ttl)).await?;
        Ok(auth::require_admin(session)?)
    }
}

fn respond<T: Serialize>(result: Result<T, HttpError>, success: StatusCode) -> Result<Response, Infallible> {
    Ok(match result {
        Ok(body) => reply::with_status(reply::json(&body), success).into_response(),
        Err(err) => failure(err),
    })
}

fn respond_empty(result: Result<(), HttpError>) -> Result<Response, Infallible> {
    Ok(match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => failure(err),
    })
}

fn failure(err: HttpError) -> Response {
    if err.code.is_server_error() {
        error!(status = %err.code, message = err.message(), "request failed");
    } else {
        debug!(status = %err.code, message = err.message(), "request refused");
    }
    err.into_response()
}

fn parse_employee_id(raw: &str) -> Result<EmployeeId, HttpError> {
    Ok(EmployeeId::parse(raw)?)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn authorization() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
}

fn json_body<T: serde::de::DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(8 * 1024 * 1024).and(warp::body::json())
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let admin = admin_api::routes(state.clone());
    let state = with_state(state);

    let schedule = warp::get()
        .and(warp::path!("api" / "schedule"))
        .and(state.clone())
        .and_then(schedule_api::get_schedule);
    let schedule_stream = warp::get()
        .and(warp::path!("api" / "schedule" / "stream"))
        .and(state.clone())
        .map(schedule_api::stream);
    let candidates = warp::get()
        .and(warp::path!("api" / "candidates"))
        .and(state.clone())
        .and_then(vote_api::list_candidates);
    let register = warp::post()
        .and(warp::path!("api" / "register"))
        .and(state.clone())
        .and(json_body())
        .and_then(auth_api::register);
    let verify = warp::get()
        .and(warp::path!("api" / "verify" / Id))
        .and(state.clone())
        .and_then(auth_api::verify);
    let login = warp::post()
        .and(warp::path!("api" / "login"))
        .and(state.clone())
        .and(json_body())
        .and_then(auth_api::login);
    let logout = warp::post()
        .and(warp::path!("api" / "logout"))
        .and(state.clone())
        .and(authorization())
        .and_then(auth_api::logout);
    let eligibility = warp::get()
        .and(warp::path!("api" / "eligibility"))
        .and(state.clone())
        .and(authorization())
        .and_then(vote_api::eligibility);
    let vote = warp::post()
        .and(warp::path!("api" / "vote"))
        .and(state.clone())
        .and(authorization())
        .and(json_body())
        .and_then(vote_api::submit);
    let results = warp::get()
        .and(warp::path!("api" / "results"))
        .and(state.clone())
        .and_then(result_api::get_results);
    let results_stream = warp::get()
        .and(warp::path!("api" / "results" / "stream"))
        .and(state.clone())
        .map(result_api::stream);

    let public = schedule
        .or(schedule_stream)
        .or(candidates)
        .or(register)
        .or(verify)
        .or(login)
        .or(logout)
        .or(eligibility)
        .or(vote)
        .or(results)
        .or(results_stream)
        .boxed();

    public
        .or(admin)
        .recover(handle_rejection)
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let err = if rejection.is_not_found() {
        HttpError::new(StatusCode::NOT_FOUND, "no such endpoint")
    } else if let Some(body) = rejection.find::<BodyDeserializeError>() {
        HttpError::new(StatusCode::BAD_REQUEST, format!("malformed request body: {body}"))
    } else if let Some(query) = rejection.find::<warp::reject::InvalidQuery>() {
        HttpError::new(StatusCode::BAD_REQUEST, query.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        HttpError::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        HttpError::new(StatusCode::PAYLOAD_TOO_LARGE, "request body is too large")
    } else {
        error::internal(format!("unhandled rejection: {rejection:?}"))
    };
    Ok(failure(err))
}

pub async fn serve(state: AppState) {
    let address = SocketAddr::new(state.config.bind_address, state.config.port);
    let routes = routes(state).with(warp::trace::request());
    info!(%address, "server listening");
    warp::serve(routes).run(address).await;
}
