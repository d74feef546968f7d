use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::candidate::Candidate;
use super::id::EmployeeId;
use crate::store::{StoreError, VotingStore};

/// Vote count for one candidate as read from the `vote_results` view.
#[derive(Clone, Debug, PartialEq)]
pub struct VoteTally {
    pub candidate: Candidate,
    pub vote_count: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VoteResult {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub vote_count: i64,
    pub percentage: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ResultsSnapshot {
    pub results: Vec<VoteResult>,
    pub total_votes: i64,
    pub total_employees: i64,
    pub turnout: f64,
}

/// `part` as a percentage of `whole`, rounded to two decimals; zero when
/// `whole` is zero.
fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 * 10_000.0 / whole as f64).round() / 100.0
}

impl ResultsSnapshot {
    pub fn tally(tallies: Vec<VoteTally>, total_employees: i64) -> ResultsSnapshot {
        let total_votes: i64 = tallies.iter().map(|t| t.vote_count).sum();
        let results = tallies.into_iter()
            .map(|VoteTally { candidate, vote_count }| VoteResult {
                candidate,
                vote_count,
                percentage: percentage(vote_count, total_votes),
            })
            .collect();

        ResultsSnapshot {
            results,
            total_votes,
            total_employees,
            turnout: percentage(total_votes, total_employees),
        }
    }
}

pub fn load_results(store: &dyn VotingStore) -> Result<ResultsSnapshot, StoreError> {
    let tallies = store.vote_tallies()?;
    let total_employees = store.count_employees()?;
    Ok(ResultsSnapshot::tally(tallies, total_employees))
}

/// A change to the votes table. Subscribers reload everything on any change.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoteChange {
    Cast { employee_id: EmployeeId },
    Removed { employee_id: EmployeeId },
}

/// In-process fan-out of [`VoteChange`]s to the live results streams.
#[derive(Clone)]
pub struct VoteFeed {
    sender: broadcast::Sender<VoteChange>,
}

impl VoteFeed {
    pub fn new(capacity: usize) -> VoteFeed {
        let (sender, _) = broadcast::channel(capacity);
        VoteFeed { sender }
    }

    pub fn publish(&self, change: VoteChange) {
        if let Err(broadcast::error::SendError(change)) = self.sender.send(change) {
            debug!(?change, "no results subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VoteChange> {
        self.sender.subscribe()
    }
}

impl Default for VoteFeed {
    fn default() -> Self {
        VoteFeed::new(64)
    }
}
