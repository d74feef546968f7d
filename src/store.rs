//! Persistence seam shared by every workflow.
//!
//! Workflows never reach a database directly; they are handed a
//! `&dyn VotingStore`. The PostgreSQL implementation lives in `web::db`, and
//! [`MemoryStore`] backs the tests and local demos. Both enforce the same
//! uniqueness rules, most importantly one vote per employee.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::{Account, Session};
use crate::voting::{
    Candidate, Employee, EmployeeId, Id, Vote, VoteRecord, VoteTally, VoterProfile,
    VoterRegistration, VotingSettings,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("duplicate value violates unique constraint \"{0}\"")]
    UniqueViolation(String),
    #[error("record is still referenced (constraint \"{0}\")")]
    ForeignKeyViolation(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Names of the unique constraints workflows react to.
pub mod constraints {
    pub const VOTES_EMPLOYEE_ID: &str = "votes_employee_id_key";
    pub const REGISTRATIONS_EMPLOYEE_ID: &str = "voter_registrations_employee_id_key";
    pub const ACCOUNTS_EMAIL: &str = "accounts_email_key";
}

pub trait VotingStore: Send + Sync {
    fn latest_settings(&self) -> Result<Option<VotingSettings>, StoreError>;
    fn insert_settings(&self, settings: VotingSettings) -> Result<VotingSettings, StoreError>;

    fn find_employee(&self, employee_id: &EmployeeId) -> Result<Option<Employee>, StoreError>;
    /// Newest first.
    fn list_employees(&self) -> Result<Vec<Employee>, StoreError>;
    fn count_employees(&self) -> Result<i64, StoreError>;
    /// Inserts the employees whose NIP is not on the roster yet and returns how
    /// many were inserted.
    fn import_employees(&self, employees: Vec<Employee>) -> Result<usize, StoreError>;
    fn set_has_voted(&self, employee_id: &EmployeeId, has_voted: bool) -> Result<usize, StoreError>;
    fn delete_employee(&self, employee_id: &EmployeeId) -> Result<usize, StoreError>;

    fn find_profile_by_user(&self, user_id: &Id) -> Result<Option<VoterProfile>, StoreError>;
    fn find_profile_by_employee(&self, employee_id: &EmployeeId) -> Result<Option<VoterProfile>, StoreError>;
    /// Whether an active profile or an approved registration already uses `email`.
    fn email_in_use(&self, email: &str) -> Result<bool, StoreError>;
    fn insert_profile(&self, profile: VoterProfile) -> Result<VoterProfile, StoreError>;
    fn delete_profile_by_employee(&self, employee_id: &EmployeeId) -> Result<usize, StoreError>;

    fn find_registration(&self, id: &Id) -> Result<Option<VoterRegistration>, StoreError>;
    fn find_registration_by_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<VoterRegistration>, StoreError>;
    /// Oldest first.
    fn list_registrations(&self, pending_only: bool) -> Result<Vec<VoterRegistration>, StoreError>;
    fn list_approved_registrations(&self) -> Result<Vec<VoterRegistration>, StoreError>;
    fn insert_registration(&self, registration: VoterRegistration) -> Result<VoterRegistration, StoreError>;
    fn link_registration_account(&self, id: &Id, user_id: &Id) -> Result<usize, StoreError>;
    /// Marks the registration approved and provisions `profile` in a single
    /// transaction. An existing profile for the same employee is replaced.
    fn approve_registration(
        &self,
        id: &Id,
        approved_by: &str,
        approved_at: DateTime<Utc>,
        profile: VoterProfile,
    ) -> Result<VoterProfile, StoreError>;
    fn delete_registration(&self, id: &Id) -> Result<usize, StoreError>;
    fn delete_registration_by_employee(&self, employee_id: &EmployeeId) -> Result<usize, StoreError>;

    /// Ballot order.
    fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError>;
    fn find_candidate(&self, id: &Id) -> Result<Option<Candidate>, StoreError>;
    fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, StoreError>;
    fn delete_candidate(&self, id: &Id) -> Result<usize, StoreError>;

    fn find_vote_by_employee(&self, employee_id: &EmployeeId) -> Result<Option<Vote>, StoreError>;
    /// Fails with [`StoreError::UniqueViolation`] naming
    /// [`constraints::VOTES_EMPLOYEE_ID`] when the employee already voted.
    fn insert_vote(&self, vote: Vote) -> Result<Vote, StoreError>;
    fn delete_votes_by_employee(&self, employee_id: &EmployeeId) -> Result<usize, StoreError>;
    /// Newest first, with the chosen candidate's name.
    fn list_votes(&self) -> Result<Vec<VoteRecord>, StoreError>;
    /// Every candidate with its vote count, in ballot order.
    fn vote_tallies(&self) -> Result<Vec<VoteTally>, StoreError>;

    fn insert_account(&self, account: Account) -> Result<Account, StoreError>;
    fn find_account(&self, id: &Id) -> Result<Option<Account>, StoreError>;
    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    /// Stamps the account holding `verification_token` as confirmed (keeping an
    /// earlier stamp) and returns it.
    fn confirm_account(
        &self,
        verification_token: &Id,
        confirmed_at: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError>;

    /// Deletes the accounts of `employee_id`. Their sessions and any voter
    /// profile they own go with them.
    fn delete_accounts_by_employee(&self, employee_id: &EmployeeId) -> Result<usize, StoreError>;

    fn insert_session(&self, session: Session) -> Result<Session, StoreError>;
    fn find_session(&self, token: &Id) -> Result<Option<Session>, StoreError>;
    fn delete_session(&self, token: &Id) -> Result<usize, StoreError>;
}
