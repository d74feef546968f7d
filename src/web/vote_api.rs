use std::convert::Infallible;

use chrono::Utc;
use tracing::info;
use warp::http::StatusCode;
use warp::reply::Response;

use crate::error::HttpError;
use crate::voting::{check_eligibility, submit_vote, CastBallot, EligibilityReport};
use super::{respond, AppState};

pub async fn list_candidates(state: AppState) -> Result<Response, Infallible> {
    respond(state.blocking(|store| store.list_candidates()).await, StatusCode::OK)
}

pub async fn eligibility(state: AppState, authorization: Option<String>) -> Result<Response, Infallible> {
    let result = async {
        let session = state.voter(authorization).await?;
        let eligibility = state.blocking(move |store| check_eligibility(store, &session.user_id)).await?;
        Ok::<_, HttpError>(EligibilityReport::from(eligibility))
    }.await;
    respond(result, StatusCode::OK)
}

pub async fn submit(
    state: AppState,
    authorization: Option<String>,
    ballot: CastBallot,
) -> Result<Response, Infallible> {
    let result = async {
        let session = state.voter(authorization).await?;
        let feed = state.feed.clone();
        let receipt = state
            .blocking(move |store| submit_vote(store, &feed, &session, ballot, Utc::now()))
            .await?;
        info!(vote_id = %receipt.vote_id, status_synced = receipt.status_synced, "vote accepted");
        Ok::<_, HttpError>(receipt)
    }.await;
    respond(result, StatusCode::CREATED)
}
