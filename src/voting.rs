mod admin;
mod ballot;
mod candidate;
mod eligibility;
mod employee;
mod id;
mod registration;
mod results;
mod schedule;
mod voter;

#[cfg(test)]
pub mod testing;

pub use admin::{
    add_candidate, approve_registration, bulk_reset, delete_candidate, delete_employee, diagnose_voter,
    import_employees, reconcile_profiles, reject_registration, reset_vote, save_settings, AdminError,
};
pub use ballot::{submit_vote, CastBallot, NewVote, Vote, VoteError, VoteRecord};
pub use candidate::{Candidate, NewCandidate, UnvalidatedCandidate};
pub use eligibility::{check_eligibility, EligibilityReport, Ineligibility};
pub use employee::Employee;
pub use id::{EmployeeId, Id};
pub use registration::{register_voter, RegistrationError, RegistrationRequest};
pub use results::{load_results, VoteChange, VoteFeed, VoteResult, VoteTally};
pub use schedule::{resolve_schedule, ScheduleStatus, UnvalidatedVotingSettings, VotingSettings, VotingStatus};
pub use voter::{VoterProfile, VoterRegistration};
