use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::id::{EmployeeId, Id};
use super::voter::{NewVoterRegistration, VoterRegistration};
use crate::auth::{self, AuthError, NewAccount};
use crate::error::ValidationError;
use crate::store::{constraints, StoreError, VotingStore};

/// The registration form.
#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub employee_id: String,
    pub email: String,
    pub password: String,
    /// Face photo as a data URL.
    #[serde(default)]
    pub face_photo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegistrationReceipt {
    pub registration_id: Id,
    pub employee_id: EmployeeId,
    pub email: String,
    /// Delivered out of band, never in the response.
    #[serde(skip)]
    pub verification_token: Id,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("NIP {0} was not found in the employee records")]
    UnknownEmployee(EmployeeId),
    #[error("NIP {employee_id} is already registered with {email} and approved")]
    AlreadyApproved { employee_id: EmployeeId, email: String },
    #[error("NIP {0} is already registered and awaiting admin approval")]
    PendingApproval(EmployeeId),
    #[error("NIP {0} has already been used for a registration")]
    EmployeeTaken(EmployeeId),
    #[error("email {0} is already registered")]
    EmailTaken(String),
}

impl From<AuthError> for RegistrationError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::EmailTaken(email) => RegistrationError::EmailTaken(email),
            AuthError::Validation(err) => RegistrationError::Validation(err),
            AuthError::Store(err) => RegistrationError::Store(err),
            other => RegistrationError::Auth(other),
        }
    }
}

/// Registers an employee as a prospective voter and creates the account they
/// will sign in with once an admin approves them.
pub fn register_voter(
    store: &dyn VotingStore,
    request: RegistrationRequest,
    bcrypt_cost: u32,
    now: DateTime<Utc>,
) -> Result<RegistrationReceipt, RegistrationError> {
    let RegistrationRequest { employee_id, email, password, face_photo } = request;
    let employee_id = EmployeeId::parse(&employee_id)?;
    let email = auth::normalize_email(&email)?;
    auth::validate_password(&password)?;

    if store.find_employee(&employee_id)?.is_none() {
        return Err(RegistrationError::UnknownEmployee(employee_id));
    }

    if let Some(existing) = store.find_registration_by_employee(&employee_id)? {
        return Err(if existing.is_approved {
            RegistrationError::AlreadyApproved { employee_id, email: existing.email }
        } else {
            RegistrationError::PendingApproval(employee_id)
        });
    }

    if store.email_in_use(&email)? {
        return Err(RegistrationError::EmailTaken(email));
    }

    let registration = VoterRegistration::new(NewVoterRegistration {
        employee_id: employee_id.clone(),
        email: email.clone(),
        face_photo_url: face_photo.filter(|photo| !photo.trim().is_empty()),
    }, now);
    let registration = match store.insert_registration(registration) {
        Ok(registration) => registration,
        Err(StoreError::UniqueViolation(constraint)) if constraint == constraints::REGISTRATIONS_EMPLOYEE_ID => {
            return Err(RegistrationError::EmployeeTaken(employee_id));
        }
        Err(err) => return Err(err.into()),
    };

    let account = auth::sign_up(store, NewAccount {
        email: &email,
        password: &password,
        employee_id: employee_id.clone(),
        registration_id: Some(registration.id),
    }, bcrypt_cost, now);
    let account = match account {
        Ok(account) => account,
        Err(err) => {
            // the NIP stays free for another attempt
            if let Err(cleanup) = store.delete_registration(&registration.id) {
                warn!(%employee_id, error = %cleanup, "could not remove registration after failed sign up");
            }
            return Err(err.into());
        }
    };

    info!(%employee_id, registration_id = %registration.id, "voter registered");
    Ok(RegistrationReceipt {
        registration_id: registration.id,
        employee_id,
        email,
        verification_token: account.verification_token,
    })
}
