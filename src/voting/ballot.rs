use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use super::eligibility::{check_eligibility, Eligibility, Ineligibility};
use super::id::{EmployeeId, Id};
use super::results::{VoteChange, VoteFeed};
use super::schedule::{resolve_schedule, ScheduleStatus};
use crate::auth::{self, VoterSession};
use crate::store::{constraints, StoreError, VotingStore};

/// Stored in `selfie_url` when the ballot carries no photo.
pub const NO_SELFIE: &str = "no_selfie_required";

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Vote {
    pub id: Id,
    pub employee_id: EmployeeId,
    pub candidate_id: Id,
    pub selfie_url: String,
    pub voted_at: DateTime<Utc>,
}

pub struct NewVote {
    pub employee_id: EmployeeId,
    pub candidate_id: Id,
    pub selfie_url: Option<String>,
}

impl Vote {
    pub fn new(NewVote { employee_id, candidate_id, selfie_url }: NewVote, now: DateTime<Utc>) -> Vote {
        Vote {
            id: Id::new(),
            employee_id,
            candidate_id,
            selfie_url: selfie_url
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| String::from(NO_SELFIE)),
            voted_at: now,
        }
    }
}

/// A vote as listed in the admin console.
#[derive(Clone, Debug, Serialize)]
pub struct VoteRecord {
    #[serde(flatten)]
    pub vote: Vote,
    pub candidate_name: String,
}

/// The voter's choice as submitted.
#[derive(Debug, Deserialize)]
pub struct CastBallot {
    pub candidate_id: Id,
    #[serde(default)]
    pub selfie: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoteReceipt {
    pub vote_id: Id,
    pub candidate_id: Id,
    pub voted_at: DateTime<Utc>,
    /// False when the vote was stored but the employee's voted flag could not
    /// be updated.
    pub status_synced: bool,
}

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("voting is not open: {}", .0.describe())]
    ScheduleClosed(ScheduleStatus),
    #[error("{0}")]
    Ineligible(Ineligibility),
    #[error("you have already voted; each voter may vote only once")]
    AlreadyVoted,
    #[error("candidate {0} does not exist")]
    UnknownCandidate(Id),
    #[error("failed to save vote: {0}")]
    Store(#[from] StoreError),
}

/// Casts `ballot` for the voter behind `session`, then ends the session
/// whatever the outcome so the voter has to sign in again.
///
/// The employee's voted flag is updated after the insert; if that update
/// fails the vote stands and the receipt says so. A second vote for the same
/// employee is refused by the store's unique constraint, which is the
/// authoritative check even when two submissions race past eligibility.
pub fn submit_vote(
    store: &dyn VotingStore,
    feed: &VoteFeed,
    session: &VoterSession,
    ballot: CastBallot,
    now: DateTime<Utc>,
) -> Result<VoteReceipt, VoteError> {
    let outcome = cast(store, feed, session, ballot, now);
    if let Err(err) = &outcome {
        warn!(user_id = %session.user_id, error = %err, "vote submission refused");
    }
    auth::end_session(store, &session.token);
    outcome
}

fn cast(
    store: &dyn VotingStore,
    feed: &VoteFeed,
    session: &VoterSession,
    CastBallot { candidate_id, selfie }: CastBallot,
    now: DateTime<Utc>,
) -> Result<VoteReceipt, VoteError> {
    let schedule = resolve_schedule(store, now);
    if !schedule.is_open {
        return Err(VoteError::ScheduleClosed(schedule.status));
    }

    let profile = match check_eligibility(store, &session.user_id)? {
        Eligibility::Eligible { profile } => profile,
        Eligibility::Ineligible { reason, .. } => return Err(VoteError::Ineligible(reason)),
    };

    if store.find_candidate(&candidate_id)?.is_none() {
        return Err(VoteError::UnknownCandidate(candidate_id));
    }

    let vote = Vote::new(NewVote {
        employee_id: profile.employee_id.clone(),
        candidate_id,
        selfie_url: selfie,
    }, now);
    let vote = match store.insert_vote(vote) {
        Ok(vote) => vote,
        Err(StoreError::UniqueViolation(constraint)) if constraint == constraints::VOTES_EMPLOYEE_ID => {
            warn!(employee_id = %profile.employee_id, "concurrent vote rejected by unique constraint");
            return Err(VoteError::AlreadyVoted);
        }
        Err(StoreError::ForeignKeyViolation(_)) => return Err(VoteError::UnknownCandidate(candidate_id)),
        Err(err) => return Err(err.into()),
    };
    info!(employee_id = %vote.employee_id, vote_id = %vote.id, "vote stored");

    let status_synced = match store.set_has_voted(&vote.employee_id, true) {
        Ok(0) => {
            error!(employee_id = %vote.employee_id, "vote stored but no employee row to flag");
            false
        }
        Ok(_) => true,
        Err(err) => {
            error!(employee_id = %vote.employee_id, error = %err, "vote stored but voted flag not updated");
            false
        }
    };

    feed.publish(VoteChange::Cast { employee_id: vote.employee_id.clone() });

    Ok(VoteReceipt {
        vote_id: vote.id,
        candidate_id: vote.candidate_id,
        voted_at: vote.voted_at,
        status_synced,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::voting::testing::{open_at, Fixture};
    use crate::voting::Ineligibility;

    fn ballot(fixture: &Fixture) -> CastBallot {
        CastBallot { candidate_id: fixture.candidates[0].id, selfie: None }
    }

    #[test]
    fn eligible_voter_casts_once() {
        let fixture = Fixture::open();
        let session = fixture.voter_session("E1");

        let receipt = submit_vote(&fixture.store, &fixture.feed, &session, ballot(&fixture), open_at()).unwrap();
        assert!(receipt.status_synced);

        let employee = fixture.store.find_employee(&EmployeeId::parse("E1").unwrap()).unwrap().unwrap();
        assert!(employee.has_voted);
        let vote = fixture.store.find_vote_by_employee(&employee.employee_id).unwrap().unwrap();
        assert_eq!(vote.selfie_url, NO_SELFIE);
    }

    #[test]
    fn session_ends_after_submission() {
        let fixture = Fixture::open();
        let session = fixture.voter_session("E1");
        submit_vote(&fixture.store, &fixture.feed, &session, ballot(&fixture), open_at()).unwrap();
        assert!(fixture.store.find_session(&session.token).unwrap().is_none());
    }

    #[test]
    fn revote_is_refused_as_already_voted() {
        let fixture = Fixture::open();
        let first = fixture.voter_session("E1");
        submit_vote(&fixture.store, &fixture.feed, &first, ballot(&fixture), open_at()).unwrap();

        let second = fixture.new_session_for(&first);
        let err = submit_vote(&fixture.store, &fixture.feed, &second, ballot(&fixture), open_at()).unwrap_err();
        assert!(matches!(err, VoteError::Ineligible(Ineligibility::AlreadyVoted)));

        let eligibility = check_eligibility(&fixture.store, &first.user_id).unwrap();
        assert_eq!(eligibility.into_result(), Err(Ineligibility::AlreadyVoted));
    }

    #[test]
    fn closed_schedule_blocks_before_any_lookup() {
        let fixture = Fixture::new();
        let session = fixture.voter_session("E1");
        let err = submit_vote(&fixture.store, &fixture.feed, &session, ballot(&fixture), open_at()).unwrap_err();
        assert!(matches!(err, VoteError::ScheduleClosed(ScheduleStatus::Inactive)));
        assert!(fixture.store.find_vote_by_employee(&EmployeeId::parse("E1").unwrap()).unwrap().is_none());
    }

    #[test]
    fn unregistered_identity_never_reaches_insert() {
        let fixture = Fixture::open();
        let session = VoterSession { token: Id::new(), user_id: Id::new() };
        let err = submit_vote(&fixture.store, &fixture.feed, &session, ballot(&fixture), open_at()).unwrap_err();
        assert!(matches!(err, VoteError::Ineligible(Ineligibility::NotRegistered)));
        assert!(fixture.store.list_votes().unwrap().is_empty());
    }

    #[test]
    fn unknown_candidate_is_rejected() {
        let fixture = Fixture::open();
        let session = fixture.voter_session("E1");
        let bogus = CastBallot { candidate_id: Id::new(), selfie: None };
        let err = submit_vote(&fixture.store, &fixture.feed, &session, bogus, open_at()).unwrap_err();
        assert!(matches!(err, VoteError::UnknownCandidate(_)));
    }

    #[test]
    fn flag_update_failure_keeps_the_vote() {
        let fixture = Fixture::open();
        let session = fixture.voter_session("E1");
        fixture.store.fail_on("set_has_voted", StoreError::Backend(String::from("connection reset")));

        let receipt = submit_vote(&fixture.store, &fixture.feed, &session, ballot(&fixture), open_at()).unwrap();
        assert!(!receipt.status_synced);

        let again = fixture.new_session_for(&session);
        let err = submit_vote(&fixture.store, &fixture.feed, &again, ballot(&fixture), open_at()).unwrap_err();
        assert!(matches!(err, VoteError::Ineligible(Ineligibility::VoteRecorded)));
    }

    #[test]
    fn insert_failure_surfaces_backend_message() {
        let fixture = Fixture::open();
        let session = fixture.voter_session("E1");
        fixture.store.fail_on("insert_vote", StoreError::Backend(String::from("disk full")));
        let err = submit_vote(&fixture.store, &fixture.feed, &session, ballot(&fixture), open_at()).unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn successful_vote_is_published() {
        let fixture = Fixture::open();
        let mut changes = fixture.feed.subscribe();
        let session = fixture.voter_session("E1");
        submit_vote(&fixture.store, &fixture.feed, &session, ballot(&fixture), open_at()).unwrap();
        assert!(matches!(changes.try_recv(), Ok(VoteChange::Cast { .. })));
    }

    #[test]
    fn racing_submissions_persist_at_most_one_vote() {
        let fixture = Arc::new(Fixture::open());
        let first = fixture.voter_session("E1");
        let second = fixture.new_session_for(&first);

        let handles: Vec<_> = [first, second].into_iter()
            .map(|session| {
                let fixture = Arc::clone(&fixture);
                thread::spawn(move || {
                    submit_vote(&fixture.store, &fixture.feed, &session, ballot(&fixture), open_at())
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert_eq!(fixture.store.list_votes().unwrap().len(), 1);
        for outcome in outcomes.iter().filter_map(|o| o.as_ref().err()) {
            assert!(matches!(
                outcome,
                VoteError::AlreadyVoted
                    | VoteError::Ineligible(Ineligibility::AlreadyVoted)
                    | VoteError::Ineligible(Ineligibility::VoteRecorded)
            ));
        }
    }

    #[test]
    fn store_constraint_alone_stops_a_second_insert() {
        let fixture = Fixture::open();
        let session = fixture.voter_session("E1");
        let employee_id = EmployeeId::parse("E1").unwrap();
        fixture.store.insert_vote(Vote::new(NewVote {
            employee_id: employee_id.clone(),
            candidate_id: fixture.candidates[1].id,
            selfie_url: None,
        }, open_at())).unwrap();
        // the eligibility double-check misses the existing row
        fixture.store.fail_on("find_vote_by_employee", StoreError::Backend(String::from("timeout")));

        let err = submit_vote(&fixture.store, &fixture.feed, &session, ballot(&fixture), open_at()).unwrap_err();
        assert!(matches!(err, VoteError::AlreadyVoted));
        assert_eq!(fixture.store.list_votes().unwrap().len(), 1);
    }
}
