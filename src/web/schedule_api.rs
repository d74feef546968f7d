use std::convert::Infallible;

use chrono::Utc;
use futures::stream::{self, Stream};
use tokio::time;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::sse::Event;

use crate::voting::{resolve_schedule, VotingStatus};
use super::{respond, AppState};

async fn current(state: &AppState) -> VotingStatus {
    state.blocking(|store| Ok::<_, Infallible>(resolve_schedule(store, Utc::now())))
        .await
        .unwrap_or_else(|_| VotingStatus::inactive())
}

pub async fn get_schedule(state: AppState) -> Result<Response, Infallible> {
    respond(Ok(current(&state).await), StatusCode::OK)
}

fn events(state: AppState) -> impl Stream<Item = Result<Event, serde_json::Error>> + Send + 'static {
    let ticks = time::interval(state.config.schedule_poll);
    stream::unfold((state, ticks), |(state, mut ticks)| async move {
        ticks.tick().await;
        let event = Event::default().event("schedule").json_data(current(&state).await);
        Some((event, (state, ticks)))
    })
}

/// Pushes the schedule status now and then on every poll interval.
pub fn stream(state: AppState) -> impl Reply {
    warp::sse::reply(warp::sse::keep_alive().stream(events(state)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::time::timeout;

    use super::*;
    use crate::voting::testing::Fixture;
    use crate::web::tests::app;

    #[tokio::test]
    async fn first_status_is_sent_without_waiting_for_the_interval() {
        let state = app(Fixture::open_around(Utc::now()));
        let mut events = Box::pin(events(state));

        let first = timeout(Duration::from_secs(2), events.next()).await.unwrap().unwrap().unwrap();
        let first = first.to_string();
        assert!(first.contains("event:schedule"));
        assert!(first.contains(r#""is_open":true"#));
        assert!(first.contains(r#""status":"active""#));
    }

    #[tokio::test]
    async fn later_statuses_follow_the_poll_interval() {
        let state = app(Fixture::new());
        let mut events = Box::pin(events(state));
        timeout(Duration::from_secs(2), events.next()).await.unwrap();

        // the default interval is thirty seconds
        assert!(timeout(Duration::from_millis(200), events.next()).await.is_err());
    }
}
