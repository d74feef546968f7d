use std::convert::Infallible;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use warp::http::StatusCode;
use warp::reply::Response;

use crate::auth::{self, Credentials, Session, SessionRole};
use crate::voting::{register_voter, Id, RegistrationRequest};
use super::{respond, respond_empty, AppState};

#[derive(Debug, Deserialize)]
pub struct AdminLogin {
    pub password: String,
}

#[derive(Debug, Serialize)]
struct SignedIn {
    token: Id,
    role: SessionRole,
}

impl From<Session> for SignedIn {
    fn from(session: Session) -> Self {
        SignedIn { token: session.token, role: session.role }
    }
}

#[derive(Debug, Serialize)]
struct Verified {
    email: String,
    confirmed: bool,
}

pub async fn register(state: AppState, request: RegistrationRequest) -> Result<Response, Infallible> {
    let cost = state.config.bcrypt_cost;
    let result = state
        .blocking(move |store| register_voter(store, request, cost, Utc::now()))
        .await
        .inspect(|receipt| {
            // mail delivery happens outside this service
            info!(
                employee_id = %receipt.employee_id,
                link = %state.config.verification_link(receipt.verification_token),
                "verification link issued"
            );
        });
    respond(result, StatusCode::CREATED)
}

pub async fn verify(token: Id, state: AppState) -> Result<Response, Infallible> {
    let result = state
        .blocking(move |store| auth::verify_email(store, &token, Utc::now()))
        .await
        .map(|account| Verified { confirmed: account.is_confirmed(), email: account.email });
    respond(result, StatusCode::OK)
}

pub async fn login(state: AppState, credentials: Credentials) -> Result<Response, Infallible> {
    let result = state
        .blocking(move |store| auth::sign_in(store, &credentials, Utc::now()))
        .await
        .map(SignedIn::from);
    respond(result, StatusCode::OK)
}

pub async fn logout(state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        let token = auth::parse_bearer(authorization.as_deref())?;
        state.blocking(move |store| auth::sign_out(store, &token)).await
    }.await;
    respond_empty(result)
}

pub async fn admin_login(state: AppState, login: AdminLogin) -> Result<Response, Infallible> {
    let hash = state.config.admin_password_hash.clone();
    let result = state
        .blocking(move |store| auth::admin_login(store, &login.password, &hash, Utc::now()))
        .await
        .map(SignedIn::from);
    respond(result, StatusCode::OK)
}
