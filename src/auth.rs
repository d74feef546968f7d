//! Accounts, sessions and the checks that guard the HTTP surface.
//!
//! An account is the email and password identity a voter signs in with; its
//! id is the `user_id` a voter profile points at. Sessions are opaque bearer
//! tokens kept in the store so a vote submission can end one for good.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{self, ValidationError};
use crate::store::{constraints, StoreError, VotingStore};
use crate::voting::{resolve_schedule, EmployeeId, Id, ScheduleStatus};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Recorded as the approver of registrations approved from the admin console.
pub const ADMIN_IDENTITY: &str = "admin";

#[derive(Clone, Debug)]
pub struct Account {
    pub id: Id,
    pub email: String,
    pub password_hash: String,
    pub employee_id: EmployeeId,
    pub registration_id: Option<Id>,
    pub verification_token: Id,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub employee_id: EmployeeId,
    pub registration_id: Option<Id>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    Voter,
    Admin,
}

#[derive(Clone, Debug, Serialize)]
pub struct Session {
    pub token: Id,
    pub account_id: Option<Id>,
    pub role: SessionRole,
    pub created_at: DateTime<Utc>,
}

/// A session known to belong to a signed-in voter.
#[derive(Clone, Debug)]
pub struct VoterSession {
    pub token: Id,
    pub user_id: Id,
}

#[derive(Clone, Debug)]
pub struct AdminSession {
    pub token: Id,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("sign in required")]
    MissingToken,
    #[error("session is invalid or has ended; please sign in again")]
    InvalidSession,
    #[error("this session may not use this endpoint")]
    Forbidden,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email address has not been confirmed yet; check your inbox for the verification link")]
    EmailUnconfirmed,
    #[error("sign in is closed: {}", .0.describe())]
    ScheduleClosed(ScheduleStatus),
    #[error("verification link is invalid")]
    UnknownVerification,
    #[error("email {0} is already registered")]
    EmailTaken(String),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Trims and lower-cases `raw`, requiring a single `@` with text on both sides.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(email),
        _ => Err(error::email_malformed(raw.trim())),
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(error::password_too_short(MIN_PASSWORD_LEN, len));
    }
    Ok(())
}

/// Creates an unconfirmed account with a fresh verification token.
pub fn sign_up(
    store: &dyn VotingStore,
    NewAccount { email, password, employee_id, registration_id }: NewAccount<'_>,
    bcrypt_cost: u32,
    now: DateTime<Utc>,
) -> Result<Account, AuthError> {
    let email = normalize_email(email)?;
    validate_password(password)?;

    let account = Account {
        id: Id::new(),
        email: email.clone(),
        password_hash: bcrypt::hash(password, bcrypt_cost)?,
        employee_id,
        registration_id,
        verification_token: Id::new(),
        email_confirmed_at: None,
        created_at: now,
    };
    match store.insert_account(account) {
        Ok(account) => {
            info!(account_id = %account.id, employee_id = %account.employee_id, "account created");
            Ok(account)
        }
        Err(StoreError::UniqueViolation(constraint)) if constraint == constraints::ACCOUNTS_EMAIL => {
            Err(AuthError::EmailTaken(email))
        }
        Err(err) => Err(err.into()),
    }
}

/// Confirms the account holding `token` and links it to its registration.
/// Following the same link twice is harmless.
pub fn verify_email(store: &dyn VotingStore, token: &Id, now: DateTime<Utc>) -> Result<Account, AuthError> {
    let account = store.confirm_account(token, now)?.ok_or(AuthError::UnknownVerification)?;
    if let Some(registration_id) = account.registration_id {
        if store.link_registration_account(&registration_id, &account.id)? == 0 {
            warn!(account_id = %account.id, %registration_id, "verified account has no registration left to link");
        }
    }
    info!(account_id = %account.id, "email confirmed");
    Ok(account)
}

/// Starts a voter session. Only possible while voting is open.
pub fn sign_in(store: &dyn VotingStore, credentials: &Credentials, now: DateTime<Utc>) -> Result<Session, AuthError> {
    let schedule = resolve_schedule(store, now);
    if !schedule.is_open {
        return Err(AuthError::ScheduleClosed(schedule.status));
    }

    let email = credentials.email.trim().to_lowercase();
    let Some(account) = store.find_account_by_email(&email)? else {
        debug!("sign in for unknown email");
        return Err(AuthError::InvalidCredentials);
    };
    if !bcrypt::verify(&credentials.password, &account.password_hash)? {
        debug!(account_id = %account.id, "sign in with wrong password");
        return Err(AuthError::InvalidCredentials);
    }
    if !account.is_confirmed() {
        return Err(AuthError::EmailUnconfirmed);
    }

    let session = store.insert_session(Session {
        token: Id::new(),
        account_id: Some(account.id),
        role: SessionRole::Voter,
        created_at: now,
    })?;
    info!(account_id = %account.id, "voter signed in");
    Ok(session)
}

pub fn admin_login(
    store: &dyn VotingStore,
    password: &str,
    admin_password_hash: &str,
    now: DateTime<Utc>,
) -> Result<Session, AuthError> {
    if !bcrypt::verify(password, admin_password_hash)? {
        warn!("failed admin login");
        return Err(AuthError::InvalidCredentials);
    }
    let session = store.insert_session(Session {
        token: Id::new(),
        account_id: None,
        role: SessionRole::Admin,
        created_at: now,
    })?;
    info!("admin signed in");
    Ok(session)
}

/// Ends the session behind `token`; an unknown token is not an error.
pub fn sign_out(store: &dyn VotingStore, token: &Id) -> Result<(), AuthError> {
    if store.delete_session(token)? == 0 {
        debug!("sign out of a session that was already gone");
    }
    Ok(())
}

/// Like [`sign_out`] for callers that cannot report a failure.
pub fn end_session(store: &dyn VotingStore, token: &Id) {
    if let Err(err) = sign_out(store, token) {
        warn!(error = %err, "could not end session");
    }
}

/// Extracts the session token from an `Authorization` header value.
pub fn parse_bearer(header: Option<&str>) -> Result<Id, AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?;
    let token = header.trim()
        .strip_prefix("Bearer ")
        .ok_or_else(error::bearer_token_malformed)?;
    Ok(token.trim().parse::<Id>().map_err(|_| error::bearer_token_malformed())?)
}

/// Looks up the session behind `token`. A session older than `ttl` is removed
/// and treated like an unknown one.
pub fn resolve_session(
    store: &dyn VotingStore,
    token: &Id,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<Session, AuthError> {
    let session = store.find_session(token)?.ok_or(AuthError::InvalidSession)?;
    if now - session.created_at > ttl {
        debug!(role = ?session.role, "session expired");
        end_session(store, token);
        return Err(AuthError::InvalidSession);
    }
    Ok(session)
}

pub fn require_voter(session: Session) -> Result<VoterSession, AuthError> {
    match (session.role, session.account_id) {
        (SessionRole::Voter, Some(user_id)) => Ok(VoterSession { token: session.token, user_id }),
        _ => Err(AuthError::Forbidden),
    }
}

pub fn require_admin(session: Session) -> Result<AdminSession, AuthError> {
    match session.role {
        SessionRole::Admin => Ok(AdminSession { token: session.token }),
        SessionRole::Voter => Err(AuthError::Forbidden),
    }
}
