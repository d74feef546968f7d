//! Admin console workflows.
//!
//! The multi-step ones (cascading delete, bulk reset, profile reconciliation)
//! do not stop at the first failure. They run every step, record what each
//! one did, and hand back a report whose `complete` flag says whether the
//! data is consistent again.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::candidate::{Candidate, NewCandidate, UnvalidatedCandidate};
use super::employee::Employee;
use super::id::{EmployeeId, Id};
use super::results::{VoteChange, VoteFeed};
use super::schedule::{NewVotingSettings, UnvalidatedVotingSettings, VotingSettings};
use super::voter::VoterProfile;
use crate::error::{self, ValidationError};
use crate::store::{StoreError, VotingStore};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("registration {0} does not exist")]
    RegistrationNotFound(Id),
    #[error("registration {0} is already approved")]
    AlreadyApproved(Id),
    #[error("registration {0} has no verified account yet; the voter must confirm their email first")]
    AccountUnverified(Id),
    #[error("candidate {0} does not exist")]
    CandidateNotFound(Id),
    #[error("employee {0} does not exist")]
    EmployeeNotFound(EmployeeId),
}

/// What one step of a multi-step operation did.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Done { rows: usize },
    Failed { error: String },
}

impl Outcome {
    fn of(result: Result<usize, StoreError>) -> Outcome {
        match result {
            Ok(rows) => Outcome::Done { rows },
            Err(err) => Outcome::Failed { error: err.to_string() },
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done { .. })
    }
}

/// Approves a verified registration and provisions the voter profile that
/// makes its account eligible.
pub fn approve_registration(
    store: &dyn VotingStore,
    id: &Id,
    approved_by: &str,
    now: DateTime<Utc>,
) -> Result<VoterProfile, AdminError> {
    let registration = store.find_registration(id)?.ok_or(AdminError::RegistrationNotFound(*id))?;
    if registration.is_approved {
        return Err(AdminError::AlreadyApproved(*id));
    }
    let Some(user_id) = registration.user_id else {
        return Err(AdminError::AccountUnverified(*id));
    };

    let profile = VoterProfile::from_registration(&registration, user_id, now);
    let profile = store.approve_registration(id, approved_by, now, profile)?;
    info!(registration_id = %id, employee_id = %profile.employee_id, approved_by, "registration approved");
    Ok(profile)
}

/// Deletes the registration outright, along with the account it created, so
/// the NIP and email can be registered again.
pub fn reject_registration(store: &dyn VotingStore, id: &Id) -> Result<(), AdminError> {
    let registration = store.find_registration(id)?.ok_or(AdminError::RegistrationNotFound(*id))?;
    if store.delete_registration(id)? == 0 {
        return Err(AdminError::RegistrationNotFound(*id));
    }
    let accounts_removed = store.delete_accounts_by_employee(&registration.employee_id)?;
    info!(registration_id = %id, employee_id = %registration.employee_id, accounts_removed, "registration rejected");
    Ok(())
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStep {
    Votes,
    VoterProfile,
    VoterRegistration,
    Account,
    Employee,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CascadeStepReport {
    pub step: CascadeStep,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CascadeReport {
    pub employee_id: EmployeeId,
    pub steps: Vec<CascadeStepReport>,
    pub complete: bool,
}

/// Removes an employee and everything hanging off it, dependents first. A
/// failed step does not stop the later ones; the report lists what is left.
pub fn delete_employee(
    store: &dyn VotingStore,
    feed: &VoteFeed,
    employee_id: &EmployeeId,
) -> Result<CascadeReport, AdminError> {
    if store.find_employee(employee_id)?.is_none() {
        return Err(AdminError::EmployeeNotFound(employee_id.clone()));
    }

    let order = [
        CascadeStep::Votes,
        CascadeStep::VoterProfile,
        CascadeStep::VoterRegistration,
        CascadeStep::Account,
        CascadeStep::Employee,
    ];
    let mut steps = Vec::with_capacity(order.len());
    for step in order {
        let result = match step {
            CascadeStep::Votes => store.delete_votes_by_employee(employee_id),
            CascadeStep::VoterProfile => store.delete_profile_by_employee(employee_id),
            CascadeStep::VoterRegistration => store.delete_registration_by_employee(employee_id),
            CascadeStep::Account => store.delete_accounts_by_employee(employee_id),
            CascadeStep::Employee => store.delete_employee(employee_id),
        };
        let outcome = Outcome::of(result);
        match &outcome {
            Outcome::Done { rows } if step == CascadeStep::Votes && *rows > 0 => {
                feed.publish(VoteChange::Removed { employee_id: employee_id.clone() });
            }
            Outcome::Failed { error } => {
                warn!(%employee_id, ?step, %error, "cascading delete step failed, continuing");
            }
            Outcome::Done { .. } => {}
        }
        steps.push(CascadeStepReport { step, outcome });
    }

    let complete = steps.iter().all(|s| s.outcome.is_done());
    info!(%employee_id, complete, "employee deleted");
    Ok(CascadeReport { employee_id: employee_id.clone(), steps, complete })
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResetOutcome {
    Reset,
    NotFound,
    Invalid { error: String },
    Failed { error: String },
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ResetItem {
    pub employee_id: String,
    #[serde(flatten)]
    pub outcome: ResetOutcome,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct BulkResetReport {
    pub items: Vec<ResetItem>,
    pub succeeded: usize,
    pub failed: usize,
    pub complete: bool,
}

/// Clears the voted flag of each listed employee independently. Vote rows are
/// left alone.
pub fn bulk_reset(store: &dyn VotingStore, employee_ids: &[String]) -> Result<BulkResetReport, AdminError> {
    if employee_ids.iter().all(|raw| raw.trim().is_empty()) {
        return Err(error::employee_ids_empty().into());
    }

    let items: Vec<ResetItem> = employee_ids.iter()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            let outcome = match EmployeeId::parse(raw) {
                Err(err) => ResetOutcome::Invalid { error: err.to_string() },
                Ok(employee_id) => match store.set_has_voted(&employee_id, false) {
                    Ok(0) => ResetOutcome::NotFound,
                    Ok(_) => ResetOutcome::Reset,
                    Err(err) => {
                        warn!(%employee_id, error = %err, "could not reset voted flag");
                        ResetOutcome::Failed { error: err.to_string() }
                    }
                },
            };
            ResetItem { employee_id: raw.trim().to_string(), outcome }
        })
        .collect();

    let succeeded = items.iter().filter(|i| i.outcome == ResetOutcome::Reset).count();
    let failed = items.len() - succeeded;
    info!(succeeded, failed, "bulk voting status reset");
    Ok(BulkResetReport { complete: failed == 0, items, succeeded, failed })
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VoteReset {
    pub employee_id: EmployeeId,
    pub votes_removed: usize,
}

/// Lets one employee vote again: deletes their vote, then clears the flag.
pub fn reset_vote(
    store: &dyn VotingStore,
    feed: &VoteFeed,
    employee_id: &EmployeeId,
) -> Result<VoteReset, AdminError> {
    if store.find_employee(employee_id)?.is_none() {
        return Err(AdminError::EmployeeNotFound(employee_id.clone()));
    }

    let votes_removed = store.delete_votes_by_employee(employee_id)?;
    if votes_removed > 0 {
        feed.publish(VoteChange::Removed { employee_id: employee_id.clone() });
    }
    store.set_has_voted(employee_id, false)?;

    info!(%employee_id, votes_removed, "vote reset");
    Ok(VoteReset { employee_id: employee_id.clone(), votes_removed })
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Adds newline-separated NIPs to the roster. NIPs already on it (or repeated
/// in the input) are skipped.
pub fn import_employees(store: &dyn VotingStore, raw: &str, now: DateTime<Utc>) -> Result<ImportReport, AdminError> {
    let lines: Vec<&str> = raw.lines().map(str::trim).filter(|line| !line.is_empty()).collect();
    if lines.is_empty() {
        return Err(error::employee_ids_empty().into());
    }

    let employee_ids = lines.iter()
        .map(|line| EmployeeId::parse(line))
        .collect::<Result<BTreeSet<_>, _>>()?;
    let employees = employee_ids.into_iter()
        .map(|employee_id| Employee::new(employee_id, None, now))
        .collect();

    let inserted = store.import_employees(employees)?;
    let skipped = lines.len() - inserted;
    info!(inserted, skipped, "employees imported");
    Ok(ImportReport { inserted, skipped })
}

pub fn add_candidate(
    store: &dyn VotingStore,
    form: UnvalidatedCandidate,
    now: DateTime<Utc>,
) -> Result<Candidate, AdminError> {
    let candidate = store.insert_candidate(Candidate::new(NewCandidate::try_from(form)?, now))?;
    info!(candidate_id = %candidate.id, order_number = candidate.order_number, "candidate added");
    Ok(candidate)
}

/// Fails with a conflict while votes for the candidate exist.
pub fn delete_candidate(store: &dyn VotingStore, id: &Id) -> Result<(), AdminError> {
    if store.delete_candidate(id)? == 0 {
        return Err(AdminError::CandidateNotFound(*id));
    }
    info!(candidate_id = %id, "candidate deleted");
    Ok(())
}

/// Stores a new settings row; it takes effect as the newest one.
pub fn save_settings(
    store: &dyn VotingStore,
    form: UnvalidatedVotingSettings,
    now: DateTime<Utc>,
) -> Result<VotingSettings, AdminError> {
    let settings = store.insert_settings(VotingSettings::new(NewVotingSettings::try_from(form)?, now))?;
    info!(
        settings_id = %settings.id,
        start = %settings.start_time,
        end = %settings.end_time,
        is_active = settings.is_active,
        "voting settings saved"
    );
    Ok(settings)
}

/// Everything that decides whether an account can vote, in one place.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VoterDiagnostics {
    pub user_id: Id,
    pub employee_id: Option<EmployeeId>,
    pub email: Option<String>,
    pub has_profile: bool,
    pub profile_active: bool,
    pub registration_exists: bool,
    pub registration_approved: bool,
    pub employee_exists: bool,
    pub has_voted: bool,
    pub vote_exists: bool,
    pub last_vote_at: Option<DateTime<Utc>>,
    pub can_vote: bool,
}

pub fn diagnose_voter(store: &dyn VotingStore, user_id: &Id) -> Result<VoterDiagnostics, AdminError> {
    let profile = store.find_profile_by_user(user_id)?;
    let account = store.find_account(user_id)?;

    let employee_id = profile.as_ref()
        .map(|p| p.employee_id.clone())
        .or_else(|| account.as_ref().map(|a| a.employee_id.clone()));
    let email = profile.as_ref()
        .map(|p| p.email.clone())
        .or_else(|| account.as_ref().map(|a| a.email.clone()));

    let (registration, employee, vote) = match &employee_id {
        Some(employee_id) => (
            store.find_registration_by_employee(employee_id)?,
            store.find_employee(employee_id)?,
            store.find_vote_by_employee(employee_id)?,
        ),
        None => (None, None, None),
    };

    let has_profile = profile.is_some();
    let profile_active = profile.as_ref().is_some_and(|p| p.is_active);
    let has_voted = employee.as_ref().is_some_and(|e| e.has_voted);
    Ok(VoterDiagnostics {
        user_id: *user_id,
        employee_id,
        email,
        has_profile,
        profile_active,
        registration_exists: registration.is_some(),
        registration_approved: registration.as_ref().is_some_and(|r| r.is_approved),
        employee_exists: employee.is_some(),
        has_voted,
        vote_exists: vote.is_some(),
        last_vote_at: vote.map(|v| v.voted_at),
        can_vote: profile_active && employee.is_some() && !has_voted,
    })
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Created { profile_id: Id },
    AlreadyProvisioned,
    NoAccount,
    Failed { error: String },
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ReconcileItem {
    pub registration_id: Id,
    pub employee_id: EmployeeId,
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ReconcileReport {
    pub items: Vec<ReconcileItem>,
    pub created: usize,
    pub complete: bool,
}

/// Provisions the missing profile of every approved registration whose
/// account is known.
pub fn reconcile_profiles(store: &dyn VotingStore, now: DateTime<Utc>) -> Result<ReconcileReport, AdminError> {
    let registrations = store.list_approved_registrations()?;

    let items: Vec<ReconcileItem> = registrations.iter()
        .map(|registration| {
            let outcome = match registration.user_id {
                None => ReconcileOutcome::NoAccount,
                Some(user_id) => match store.find_profile_by_employee(&registration.employee_id) {
                    Ok(Some(_)) => ReconcileOutcome::AlreadyProvisioned,
                    Ok(None) => {
                        let profile = VoterProfile::from_registration(registration, user_id, now);
                        match store.insert_profile(profile) {
                            Ok(profile) => ReconcileOutcome::Created { profile_id: profile.id },
                            Err(err) => ReconcileOutcome::Failed { error: err.to_string() },
                        }
                    }
                    Err(err) => ReconcileOutcome::Failed { error: err.to_string() },
                },
            };
            if let ReconcileOutcome::Failed { error } = &outcome {
                warn!(employee_id = %registration.employee_id, %error, "could not reconcile voter profile");
            }
            ReconcileItem {
                registration_id: registration.id,
                employee_id: registration.employee_id.clone(),
                outcome,
            }
        })
        .collect();

    let created = items.iter().filter(|i| matches!(i.outcome, ReconcileOutcome::Created { .. })).count();
    let complete = !items.iter().any(|i| matches!(i.outcome, ReconcileOutcome::Failed { .. }));
    info!(created, checked = items.len(), "voter profiles reconciled");
    Ok(ReconcileReport { items, created, complete })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::auth::ADMIN_IDENTITY;
    use crate::voting::testing::{open_at, Fixture, TEST_BCRYPT_COST, TEST_PASSWORD};
    use crate::voting::eligibility::Eligibility;
    use crate::voting::{
        check_eligibility, register_voter, submit_vote, CastBallot, Ineligibility, RegistrationRequest,
    };

    fn nip(raw: &str) -> EmployeeId {
        EmployeeId::parse(raw).unwrap()
    }

    fn cast(fixture: &Fixture, raw_nip: &str) -> Id {
        let session = fixture.voter_session(raw_nip);
        let ballot = CastBallot { candidate_id: fixture.candidates[0].id, selfie: None };
        submit_vote(&fixture.store, &fixture.feed, &session, ballot, open_at()).unwrap();
        session.user_id
    }

    #[test]
    fn approval_provisions_an_eligible_profile() {
        let fixture = Fixture::new();
        let account = fixture.account("E2", true);
        let registration_id = account.registration_id.unwrap();

        let profile = approve_registration(&fixture.store, &registration_id, ADMIN_IDENTITY, open_at()).unwrap();
        assert_eq!(profile.user_id, account.id);
        assert!(check_eligibility(&fixture.store, &account.id).unwrap().is_eligible());

        let registration = fixture.store.find_registration(&registration_id).unwrap().unwrap();
        assert_eq!(registration.approved_by.as_deref(), Some(ADMIN_IDENTITY));
        assert!(matches!(
            approve_registration(&fixture.store, &registration_id, ADMIN_IDENTITY, open_at()),
            Err(AdminError::AlreadyApproved(_))
        ));
    }

    #[test]
    fn unverified_registration_cannot_be_approved() {
        let fixture = Fixture::new();
        let account = fixture.account("E2", false);
        assert!(matches!(
            approve_registration(&fixture.store, &account.registration_id.unwrap(), ADMIN_IDENTITY, open_at()),
            Err(AdminError::AccountUnverified(_))
        ));
    }

    #[test]
    fn rejection_deletes_the_registration_and_its_account() {
        let fixture = Fixture::new();
        let account = fixture.account("E2", false);
        let id = account.registration_id.unwrap();
        reject_registration(&fixture.store, &id).unwrap();
        assert!(fixture.store.find_registration(&id).unwrap().is_none());
        assert!(fixture.store.find_account(&account.id).unwrap().is_none());
        assert!(matches!(reject_registration(&fixture.store, &id), Err(AdminError::RegistrationNotFound(_))));
    }

    #[test]
    fn rejected_voter_can_register_again() {
        let fixture = Fixture::new();
        let request = || RegistrationRequest {
            employee_id: String::from("E2"),
            email: String::from("e2@union.id"),
            password: String::from(TEST_PASSWORD),
            face_photo: None,
        };
        let first = register_voter(&fixture.store, request(), TEST_BCRYPT_COST, open_at()).unwrap();
        reject_registration(&fixture.store, &first.registration_id).unwrap();

        let second = register_voter(&fixture.store, request(), TEST_BCRYPT_COST, open_at()).unwrap();
        assert_ne!(second.registration_id, first.registration_id);
        assert!(fixture.store.find_account_by_email("e2@union.id").unwrap().is_some());
    }

    #[test]
    fn cascade_removes_everything_for_a_voter() {
        let fixture = Fixture::open();
        let user_id = cast(&fixture, "E1");

        let report = delete_employee(&fixture.store, &fixture.feed, &nip("E1")).unwrap();
        assert!(report.complete);
        assert_eq!(report.steps.len(), 5);
        assert!(fixture.store.find_employee(&nip("E1")).unwrap().is_none());
        assert!(fixture.store.find_profile_by_user(&user_id).unwrap().is_none());
        assert!(fixture.store.find_account(&user_id).unwrap().is_none());
        assert!(fixture.store.find_account_by_email("e1@union.id").unwrap().is_none());
        assert!(fixture.store.list_votes().unwrap().is_empty());
    }

    #[test]
    fn cascade_reports_a_failed_step_and_keeps_going() {
        let fixture = Fixture::open();
        cast(&fixture, "E1");
        fixture.store.fail_on("delete_registration_by_employee", StoreError::Backend(String::from("lock timeout")));

        let report = delete_employee(&fixture.store, &fixture.feed, &nip("E1")).unwrap();
        assert!(!report.complete);
        let outcomes: Vec<bool> = report.steps.iter().map(|s| s.outcome.is_done()).collect();
        // the employee row is still referenced by the surviving registration
        assert_eq!(outcomes, vec![true, true, false, true, false]);
        assert!(fixture.store.list_votes().unwrap().is_empty());
        assert!(fixture.store.find_employee(&nip("E1")).unwrap().is_some());
    }

    #[test]
    fn cascade_of_unknown_employee_is_not_found() {
        let fixture = Fixture::new();
        assert!(matches!(
            delete_employee(&fixture.store, &fixture.feed, &nip("E404")),
            Err(AdminError::EmployeeNotFound(_))
        ));
    }

    #[test]
    fn bulk_reset_reports_each_item() {
        let fixture = Fixture::new();
        fixture.store.set_has_voted(&nip("E1"), true).unwrap();
        fixture.store.fail_on("set_has_voted", StoreError::Backend(String::from("timeout")));

        let ids = ["E2", "E1", "E404", "bad nip", ""].map(String::from);
        let report = bulk_reset(&fixture.store, &ids).unwrap();
        let outcomes: Vec<&ResetOutcome> = report.items.iter().map(|i| &i.outcome).collect();
        assert!(matches!(outcomes[0], ResetOutcome::Failed { .. }));
        assert_eq!(outcomes[1], &ResetOutcome::Reset);
        assert_eq!(outcomes[2], &ResetOutcome::NotFound);
        assert!(matches!(outcomes[3], ResetOutcome::Invalid { .. }));
        assert_eq!(report.items.len(), 4);
        assert_eq!((report.succeeded, report.failed, report.complete), (1, 3, false));
        assert!(!fixture.store.find_employee(&nip("E1")).unwrap().unwrap().has_voted);
    }

    #[test]
    fn bulk_reset_needs_ids() {
        let fixture = Fixture::new();
        assert!(matches!(bulk_reset(&fixture.store, &[]), Err(AdminError::Validation(_))));
        assert!(matches!(bulk_reset(&fixture.store, &[String::from("  ")]), Err(AdminError::Validation(_))));
    }

    #[test]
    fn reset_vote_lets_the_employee_vote_again() {
        let fixture = Fixture::open();
        let user_id = cast(&fixture, "E1");
        assert!(!check_eligibility(&fixture.store, &user_id).unwrap().is_eligible());

        let reset = reset_vote(&fixture.store, &fixture.feed, &nip("E1")).unwrap();
        assert_eq!(reset.votes_removed, 1);
        assert!(check_eligibility(&fixture.store, &user_id).unwrap().is_eligible());
    }

    #[test]
    fn reset_vote_surfaces_flag_failure() {
        let fixture = Fixture::open();
        let user_id = cast(&fixture, "E1");
        fixture.store.fail_on("set_has_voted", StoreError::Backend(String::from("timeout")));
        assert!(matches!(reset_vote(&fixture.store, &fixture.feed, &nip("E1")), Err(AdminError::Store(_))));
        match check_eligibility(&fixture.store, &user_id).unwrap() {
            Eligibility::Ineligible { reason, .. } => assert_eq!(reason, Ineligibility::AlreadyVoted),
            other => panic!("expected ineligible, got {other:?}"),
        }
    }

    #[test]
    fn import_counts_inserted_and_skipped() {
        let fixture = Fixture::new();
        let report = import_employees(&fixture.store, "E1\n\n  E4  \nE5\nE4\n", open_at()).unwrap();
        assert_eq!(report, ImportReport { inserted: 2, skipped: 2 });
        assert_eq!(fixture.store.count_employees().unwrap(), 5);
    }

    #[test]
    fn import_rejects_empty_or_malformed_input() {
        let fixture = Fixture::new();
        assert!(matches!(import_employees(&fixture.store, " \n\n", open_at()), Err(AdminError::Validation(_))));
        assert!(matches!(import_employees(&fixture.store, "E6\nE 7", open_at()), Err(AdminError::Validation(_))));
        assert_eq!(fixture.store.count_employees().unwrap(), 3);
    }

    #[test]
    fn candidates_with_votes_cannot_be_deleted() {
        let fixture = Fixture::open();
        cast(&fixture, "E1");
        assert!(matches!(
            delete_candidate(&fixture.store, &fixture.candidates[0].id),
            Err(AdminError::Store(StoreError::ForeignKeyViolation(_)))
        ));
        delete_candidate(&fixture.store, &fixture.candidates[1].id).unwrap();
        assert!(matches!(
            delete_candidate(&fixture.store, &fixture.candidates[1].id),
            Err(AdminError::CandidateNotFound(_))
        ));
    }

    #[test]
    fn added_candidate_takes_its_ballot_position() {
        let fixture = Fixture::new();
        let form = UnvalidatedCandidate {
            name: String::from("Citra"),
            order_number: String::from("0"),
            ..Default::default()
        };
        assert!(matches!(add_candidate(&fixture.store, form, open_at()), Err(AdminError::Validation(_))));

        add_candidate(&fixture.store, UnvalidatedCandidate {
            name: String::from("Citra"),
            order_number: String::from("3"),
            ..Default::default()
        }, open_at()).unwrap();
        let names: Vec<String> = fixture.store.list_candidates().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names.last().map(String::as_str), Some("Citra"));
    }

    #[test]
    fn saved_settings_become_current() {
        let fixture = Fixture::open();
        let saved = save_settings(&fixture.store, UnvalidatedVotingSettings {
            voting_name: String::new(),
            start_time: open_at() + Duration::days(1),
            end_time: open_at() + Duration::days(2),
            is_active: true,
        }, open_at()).unwrap();
        assert_eq!(fixture.store.latest_settings().unwrap(), Some(saved));
    }

    #[test]
    fn diagnostics_explain_an_unapproved_account() {
        let fixture = Fixture::new();
        let account = fixture.account("E2", true);
        let report = diagnose_voter(&fixture.store, &account.id).unwrap();
        assert!(!report.has_profile);
        assert!(report.registration_exists);
        assert!(!report.registration_approved);
        assert!(report.employee_exists);
        assert!(!report.can_vote);
    }

    #[test]
    fn diagnostics_show_a_cast_vote() {
        let fixture = Fixture::open();
        let user_id = cast(&fixture, "E1");
        let report = diagnose_voter(&fixture.store, &user_id).unwrap();
        assert!(report.profile_active && report.has_voted && report.vote_exists);
        assert_eq!(report.last_vote_at, Some(open_at()));
        assert!(!report.can_vote);
    }

    #[test]
    fn reconciliation_fills_missing_profiles_only() {
        let fixture = Fixture::new();
        fixture.voter_with_profile("E1", true);
        let orphan = fixture.voter_with_profile("E2", true);
        fixture.store.delete_profile_by_employee(&nip("E2")).unwrap();

        let report = reconcile_profiles(&fixture.store, open_at()).unwrap();
        assert!(report.complete);
        assert_eq!(report.created, 1);
        assert_eq!(report.items.len(), 2);
        assert!(check_eligibility(&fixture.store, &orphan).unwrap().is_eligible());

        let again = reconcile_profiles(&fixture.store, open_at()).unwrap();
        assert_eq!(again.created, 0);
    }
}
