use std::convert::{From, Infallible};
use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::auth::AuthError;
use crate::store::StoreError;
use crate::voting::{AdminError, RegistrationError, VoteError};

#[derive(Debug, Error, PartialEq)]
#[error("Validation error: {message}")]
pub struct ValidationError {
    message: String,
}

pub fn employee_id_empty() -> ValidationError {
    ValidationError {
        message: String::from("NIP must not be empty"),
    }
}

pub fn employee_id_too_long(max: usize, len: usize) -> ValidationError {
    ValidationError {
        message: format!("NIP must be at most {max} characters, got {len}"),
    }
}

pub fn employee_id_malformed(raw: &str) -> ValidationError {
    ValidationError {
        message: format!("NIP must not contain spaces, got '{raw}'"),
    }
}

pub fn employee_ids_empty() -> ValidationError {
    ValidationError {
        message: String::from("list of NIPs must not be empty"),
    }
}

pub fn email_malformed(email: &str) -> ValidationError {
    ValidationError {
        message: format!("'{email}' is not a valid email address"),
    }
}

pub fn password_too_short(min: usize, len: usize) -> ValidationError {
    ValidationError {
        message: format!("password must be at least {min} characters, got {len}"),
    }
}

pub fn candidate_name_empty() -> ValidationError {
    ValidationError {
        message: String::from("candidate name must not be empty"),
    }
}

pub fn candidate_order_invalid(raw: &str) -> ValidationError {
    ValidationError {
        message: format!("order number must be a positive whole number, got '{raw}'"),
    }
}

pub fn schedule_window_invalid(start: &DateTime<Utc>, end: &DateTime<Utc>) -> ValidationError {
    ValidationError {
        message: format!("voting must end after it starts, got start {start} and end {end}"),
    }
}

pub fn bearer_token_malformed() -> ValidationError {
    ValidationError {
        message: String::from("authorization header must be 'Bearer <session token>'"),
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// A failure on its way out of an HTTP handler: the status to answer with and
/// the message shown to the user.
#[derive(Debug)]
pub struct HttpError {
    pub code: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        HttpError { code, message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for HttpError { }

impl Reply for HttpError {
    fn into_response(self) -> Response {
        reply::with_status(reply::json(&ErrorBody { error: &self.message }), self.code).into_response()
    }
}

pub fn internal(message: impl Into<String>) -> HttpError {
    HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, message)
}

impl From<Infallible> for HttpError {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}

impl From<ValidationError> for HttpError {
    fn from(value: ValidationError) -> Self {
        HttpError::new(StatusCode::BAD_REQUEST, value.to_string())
    }
}

impl From<StoreError> for HttpError {
    fn from(value: StoreError) -> Self {
        let code = match value {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::UniqueViolation(_) | StoreError::ForeignKeyViolation(_) => StatusCode::CONFLICT,
            StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpError::new(code, value.to_string())
    }
}

impl From<VoteError> for HttpError {
    fn from(value: VoteError) -> Self {
        match value {
            VoteError::Store(err) => {
                let mut http = HttpError::from(err);
                http.message = format!("failed to save vote: {}", http.message);
                http
            }
            VoteError::ScheduleClosed(_) => HttpError::new(StatusCode::LOCKED, value.to_string()),
            VoteError::Ineligible(_) => HttpError::new(StatusCode::FORBIDDEN, value.to_string()),
            VoteError::AlreadyVoted => HttpError::new(StatusCode::CONFLICT, value.to_string()),
            VoteError::UnknownCandidate(_) => HttpError::new(StatusCode::NOT_FOUND, value.to_string()),
        }
    }
}

impl From<AdminError> for HttpError {
    fn from(value: AdminError) -> Self {
        match value {
            AdminError::Validation(err) => err.into(),
            AdminError::Store(err) => err.into(),
            AdminError::RegistrationNotFound(_)
            | AdminError::CandidateNotFound(_)
            | AdminError::EmployeeNotFound(_) => {
                HttpError::new(StatusCode::NOT_FOUND, value.to_string())
            }
            AdminError::AlreadyApproved(_) | AdminError::AccountUnverified(_) => {
                HttpError::new(StatusCode::CONFLICT, value.to_string())
            }
        }
    }
}

impl From<RegistrationError> for HttpError {
    fn from(value: RegistrationError) -> Self {
        match value {
            RegistrationError::Validation(err) => err.into(),
            RegistrationError::Auth(err) => err.into(),
            RegistrationError::Store(err) => err.into(),
            RegistrationError::UnknownEmployee(_) => HttpError::new(StatusCode::NOT_FOUND, value.to_string()),
            RegistrationError::AlreadyApproved { .. }
            | RegistrationError::PendingApproval(_)
            | RegistrationError::EmployeeTaken(_)
            | RegistrationError::EmailTaken(_) => HttpError::new(StatusCode::CONFLICT, value.to_string()),
        }
    }
}

impl From<AuthError> for HttpError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Validation(err) => err.into(),
            AuthError::Store(err) => err.into(),
            AuthError::MissingToken | AuthError::InvalidSession | AuthError::InvalidCredentials => {
                HttpError::new(StatusCode::UNAUTHORIZED, value.to_string())
            }
            AuthError::Forbidden | AuthError::EmailUnconfirmed => {
                HttpError::new(StatusCode::FORBIDDEN, value.to_string())
            }
            AuthError::ScheduleClosed(_) => HttpError::new(StatusCode::LOCKED, value.to_string()),
            AuthError::UnknownVerification => HttpError::new(StatusCode::NOT_FOUND, value.to_string()),
            AuthError::EmailTaken(_) => HttpError::new(StatusCode::CONFLICT, value.to_string()),
            AuthError::Hash(_) => internal(value.to_string()),
        }
    }
}
