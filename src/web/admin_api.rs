use std::convert::Infallible;

use chrono::Utc;
use serde::Deserialize;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Filter;

use crate::auth::ADMIN_IDENTITY;
use crate::voting::{self, Id, UnvalidatedCandidate, UnvalidatedVotingSettings};
use super::{auth_api, authorization, json_body, parse_employee_id, respond, respond_empty, with_state, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationFilter {
    #[serde(default)]
    pub pending: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImportEmployees {
    pub employee_ids: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkReset {
    pub employee_ids: Vec<String>,
}

async fn get_settings(state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(|store| store.latest_settings()).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn put_settings(
    state: AppState,
    authorization: Option<String>,
    form: UnvalidatedVotingSettings,
) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(move |store| voting::save_settings(store, form, Utc::now())).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn list_registrations(
    state: AppState,
    authorization: Option<String>,
    filter: RegistrationFilter,
) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(move |store| store.list_registrations(filter.pending)).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn approve_registration(id: Id, state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(move |store| voting::approve_registration(store, &id, ADMIN_IDENTITY, Utc::now())).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn reject_registration(id: Id, state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(move |store| voting::reject_registration(store, &id)).await
    }.await;
    respond_empty(result)
}

async fn list_employees(state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(|store| store.list_employees()).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn import_employees(
    state: AppState,
    authorization: Option<String>,
    form: ImportEmployees,
) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(move |store| voting::import_employees(store, &form.employee_ids, Utc::now())).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn delete_employee(nip: String, state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        let employee_id = parse_employee_id(&nip)?;
        let feed = state.feed.clone();
        state.blocking(move |store| voting::delete_employee(store, &feed, &employee_id)).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn bulk_reset(state: AppState, authorization: Option<String>, form: BulkReset) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(move |store| voting::bulk_reset(store, &form.employee_ids)).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn reset_vote(nip: String, state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        let employee_id = parse_employee_id(&nip)?;
        let feed = state.feed.clone();
        state.blocking(move |store| voting::reset_vote(store, &feed, &employee_id)).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn list_votes(state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(|store| store.list_votes()).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn add_candidate(
    state: AppState,
    authorization: Option<String>,
    form: UnvalidatedCandidate,
) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(move |store| voting::add_candidate(store, form, Utc::now())).await
    }.await;
    respond(result, StatusCode::CREATED)
}

async fn delete_candidate(id: Id, state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(move |store| voting::delete_candidate(store, &id)).await
    }.await;
    respond_empty(result)
}

async fn diagnose_voter(user_id: Id, state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(move |store| voting::diagnose_voter(store, &user_id)).await
    }.await;
    respond(result, StatusCode::OK)
}

async fn reconcile_profiles(state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        state.admin(authorization).await?;
        state.blocking(|store| voting::reconcile_profiles(store, Utc::now())).await
    }.await;
    respond(result, StatusCode::OK)
}

/// The `/api/admin` tree. Everything except login needs an admin session.
pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let state = with_state(state);

    let login = warp::post()
        .and(warp::path!("api" / "admin" / "login"))
        .and(state.clone())
        .and(json_body())
        .and_then(auth_api::admin_login);
    let settings = warp::get()
        .and(warp::path!("api" / "admin" / "settings"))
        .and(state.clone())
        .and(authorization())
        .and_then(get_settings);
    let save_settings = warp::put()
        .and(warp::path!("api" / "admin" / "settings"))
        .and(state.clone())
        .and(authorization())
        .and(json_body())
        .and_then(put_settings);
    let registrations = warp::get()
        .and(warp::path!("api" / "admin" / "registrations"))
        .and(state.clone())
        .and(authorization())
        .and(warp::query::<RegistrationFilter>())
        .and_then(list_registrations);
    let approve = warp::post()
        .and(warp::path!("api" / "admin" / "registrations" / Id / "approve"))
        .and(state.clone())
        .and(authorization())
        .and_then(approve_registration);
    let reject = warp::delete()
        .and(warp::path!("api" / "admin" / "registrations" / Id))
        .and(state.clone())
        .and(authorization())
        .and_then(reject_registration);
    let employees = warp::get()
        .and(warp::path!("api" / "admin" / "employees"))
        .and(state.clone())
        .and(authorization())
        .and_then(list_employees);
    let import = warp::post()
        .and(warp::path!("api" / "admin" / "employees" / "import"))
        .and(state.clone())
        .and(authorization())
        .and(json_body())
        .and_then(import_employees);
    let reset = warp::post()
        .and(warp::path!("api" / "admin" / "employees" / "reset"))
        .and(state.clone())
        .and(authorization())
        .and(json_body())
        .and_then(bulk_reset);
    let remove_employee = warp::delete()
        .and(warp::path!("api" / "admin" / "employees" / String))
        .and(state.clone())
        .and(authorization())
        .and_then(delete_employee);
    let votes = warp::get()
        .and(warp::path!("api" / "admin" / "votes"))
        .and(state.clone())
        .and(authorization())
        .and_then(list_votes);
    let remove_vote = warp::delete()
        .and(warp::path!("api" / "admin" / "votes" / String))
        .and(state.clone())
        .and(authorization())
        .and_then(reset_vote);
    let candidate = warp::post()
        .and(warp::path!("api" / "admin" / "candidates"))
        .and(state.clone())
        .and(authorization())
        .and(json_body())
        .and_then(add_candidate);
    let remove_candidate = warp::delete()
        .and(warp::path!("api" / "admin" / "candidates" / Id))
        .and(state.clone())
        .and(authorization())
        .and_then(delete_candidate);
    let diagnostics = warp::get()
        .and(warp::path!("api" / "admin" / "voters" / Id / "diagnostics"))
        .and(state.clone())
        .and(authorization())
        .and_then(diagnose_voter);
    let reconcile = warp::post()
        .and(warp::path!("api" / "admin" / "profiles" / "reconcile"))
        .and(state)
        .and(authorization())
        .and_then(reconcile_profiles);

    login
        .or(settings).unify()
        .or(save_settings).unify()
        .or(registrations).unify()
        .or(approve).unify()
        .or(reject).unify()
        .or(employees).unify()
        .or(import).unify()
        .or(reset).unify()
        .or(remove_employee).unify()
        .or(votes).unify()
        .or(remove_vote).unify()
        .or(candidate).unify()
        .or(remove_candidate).unify()
        .or(diagnostics).unify()
        .or(reconcile).unify()
        .boxed()
}
