use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::{EmployeeId, Id};

/// A self-registration awaiting (or past) admin review.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VoterRegistration {
    pub id: Id,
    pub employee_id: EmployeeId,
    pub email: String,
    pub face_photo_url: Option<String>,
    /// Account linked once the registrant verifies their email.
    pub user_id: Option<Id>,
    pub is_approved: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub registration_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewVoterRegistration {
    pub employee_id: EmployeeId,
    pub email: String,
    pub face_photo_url: Option<String>,
}

impl VoterRegistration {
    pub fn new(
        NewVoterRegistration { employee_id, email, face_photo_url }: NewVoterRegistration,
        now: DateTime<Utc>,
    ) -> VoterRegistration {
        VoterRegistration {
            id: Id::new(),
            employee_id,
            email,
            face_photo_url,
            user_id: None,
            is_approved: false,
            approved_by: None,
            approved_at: None,
            registration_date: now,
            updated_at: now,
        }
    }
}

/// Links an authenticated account to the employee it votes as.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VoterProfile {
    pub id: Id,
    pub user_id: Id,
    pub employee_id: EmployeeId,
    pub email: String,
    pub face_photo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VoterProfile {
    /// An active profile provisioned from an approved registration.
    pub fn from_registration(registration: &VoterRegistration, user_id: Id, now: DateTime<Utc>) -> VoterProfile {
        VoterProfile {
            id: Id::new(),
            user_id,
            employee_id: registration.employee_id.clone(),
            email: registration.email.clone(),
            face_photo_url: registration.face_photo_url.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
