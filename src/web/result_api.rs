use std::convert::Infallible;

use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::sse::Event;

use crate::voting::load_results;
use super::{respond, AppState};

pub async fn get_results(state: AppState) -> Result<Response, Infallible> {
    respond(state.blocking(|store| load_results(store)).await, StatusCode::OK)
}

async fn snapshot_event(state: &AppState) -> Result<Event, serde_json::Error> {
    match state.blocking(|store| load_results(store)).await {
        Ok(snapshot) => Event::default().event("results").json_data(snapshot),
        Err(err) => Ok(Event::default().event("error").data(err.message())),
    }
}

fn events(state: AppState) -> impl Stream<Item = Result<Event, serde_json::Error>> + Send + 'static {
    let changes = state.feed.subscribe();
    stream::unfold((state, changes, true), |(state, mut changes, first)| async move {
        if !first {
            match changes.recv().await {
                Ok(change) => debug!(?change, "reloading results"),
                Err(RecvError::Lagged(missed)) => debug!(missed, "results stream lagged, reloading"),
                Err(RecvError::Closed) => return None,
            }
        }
        let event = snapshot_event(&state).await;
        Some((event, (state, changes, false)))
    })
}

/// Pushes a full results snapshot now and again after every vote change.
pub fn stream(state: AppState) -> impl Reply {
    warp::sse::reply(warp::sse::keep_alive().stream(events(state)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use futures::StreamExt;
    use tokio::time::timeout;

    use super::*;
    use crate::voting::testing::Fixture;
    use crate::voting::{EmployeeId, NewVote, Vote, VoteChange};
    use crate::web::tests::app;

    #[tokio::test]
    async fn stream_sends_a_snapshot_now_and_after_each_change() {
        let fixture = Fixture::new();
        let candidate_id = fixture.candidates[0].id;
        let state = app(fixture);
        let store = state.store.clone();
        let feed = state.feed.clone();
        let mut events = Box::pin(events(state));

        let first = timeout(Duration::from_secs(2), events.next()).await.unwrap().unwrap().unwrap();
        let first = first.to_string();
        assert!(first.contains("event:results"));
        assert!(first.contains(r#""total_votes":0"#));

        let employee_id = EmployeeId::parse("E1").unwrap();
        store.insert_vote(Vote::new(NewVote {
            employee_id: employee_id.clone(),
            candidate_id,
            selfie_url: None,
        }, Utc::now())).unwrap();
        feed.publish(VoteChange::Cast { employee_id });

        let second = timeout(Duration::from_secs(2), events.next()).await.unwrap().unwrap().unwrap();
        assert!(second.to_string().contains(r#""total_votes":1"#));
    }

    #[tokio::test]
    async fn stream_waits_for_changes() {
        let state = app(Fixture::new());
        let mut events = Box::pin(events(state));
        timeout(Duration::from_secs(2), events.next()).await.unwrap();

        assert!(timeout(Duration::from_millis(200), events.next()).await.is_err());
    }
}
