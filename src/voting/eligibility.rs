use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::id::{EmployeeId, Id};
use super::voter::VoterProfile;
use crate::store::{StoreError, VotingStore};

/// Why an identity may not vote. The messages are shown to the voter as-is.
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Ineligibility {
    #[error("your account has not been activated or approved by an admin yet; please contact an admin")]
    NotRegistered,
    #[error("your voter account exists but is not active; please contact an admin")]
    ProfileInactive,
    #[error("employee record {employee_id} could not be found; please contact an admin")]
    EmployeeMissing { employee_id: EmployeeId },
    #[error("you have already voted; each voter may vote only once")]
    AlreadyVoted,
    #[error("you have already voted; a vote for your NIP is already recorded")]
    VoteRecorded,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Eligibility {
    Eligible { profile: VoterProfile },
    /// `profile` is kept when the voter is known but has already voted.
    Ineligible { reason: Ineligibility, profile: Option<VoterProfile> },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible { .. })
    }

    pub fn into_result(self) -> Result<VoterProfile, Ineligibility> {
        match self {
            Eligibility::Eligible { profile } => Ok(profile),
            Eligibility::Ineligible { reason, .. } => Err(reason),
        }
    }
}

/// What a voter is told about their eligibility.
#[derive(Debug, Serialize)]
pub struct EligibilityReport {
    pub eligible: bool,
    #[serde(flatten)]
    pub reason: Option<Ineligibility>,
    pub message: Option<String>,
    pub profile: Option<VoterProfile>,
}

impl From<Eligibility> for EligibilityReport {
    fn from(value: Eligibility) -> Self {
        match value {
            Eligibility::Eligible { profile } => EligibilityReport {
                eligible: true,
                reason: None,
                message: None,
                profile: Some(profile),
            },
            Eligibility::Ineligible { reason, profile } => EligibilityReport {
                eligible: false,
                message: Some(reason.to_string()),
                reason: Some(reason),
                profile,
            },
        }
    }
}

/// Decides whether `user_id` may cast a vote right now.
///
/// The checks run in order, each its own store round trip: an active voter
/// profile, the linked employee, the employee's voted flag, and finally the
/// vote table itself in case the flag drifted from it. None of this is atomic
/// with a later vote insert; the insert's unique constraint is what finally
/// prevents a second vote.
pub fn check_eligibility(store: &dyn VotingStore, user_id: &Id) -> Result<Eligibility, StoreError> {
    let profile = match store.find_profile_by_user(user_id)? {
        None => {
            debug!(%user_id, "no voter profile");
            return Ok(Eligibility::Ineligible { reason: Ineligibility::NotRegistered, profile: None });
        }
        Some(profile) if !profile.is_active => {
            debug!(%user_id, employee_id = %profile.employee_id, "voter profile inactive");
            return Ok(Eligibility::Ineligible { reason: Ineligibility::ProfileInactive, profile: None });
        }
        Some(profile) => profile,
    };

    let employee = match store.find_employee(&profile.employee_id)? {
        Some(employee) => employee,
        None => {
            warn!(%user_id, employee_id = %profile.employee_id, "voter profile points at a missing employee");
            let reason = Ineligibility::EmployeeMissing { employee_id: profile.employee_id };
            return Ok(Eligibility::Ineligible { reason, profile: None });
        }
    };

    if employee.has_voted {
        return Ok(Eligibility::Ineligible { reason: Ineligibility::AlreadyVoted, profile: Some(profile) });
    }

    match store.find_vote_by_employee(&profile.employee_id) {
        Ok(Some(vote)) => {
            warn!(
                employee_id = %profile.employee_id,
                vote_id = %vote.id,
                "vote recorded but employee not flagged as voted"
            );
            return Ok(Eligibility::Ineligible { reason: Ineligibility::VoteRecorded, profile: Some(profile) });
        }
        Ok(None) => {}
        Err(err) => {
            warn!(employee_id = %profile.employee_id, error = %err, "could not double-check vote table, continuing");
        }
    }

    info!(%user_id, employee_id = %profile.employee_id, "voter is eligible");
    Ok(Eligibility::Eligible { profile })
}
