use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::auth::{self, SessionRole};
use crate::voting::{self, EmployeeId, Id};
use super::schema;

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::voting_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VotingSettings {
    pub id: Uuid,
    pub voting_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<VotingSettings> for voting::VotingSettings {
    fn from(row: VotingSettings) -> Self {
        voting::VotingSettings {
            id: Id(row.id),
            voting_name: row.voting_name,
            start_time: row.start_time.and_utc(),
            end_time: row.end_time.and_utc(),
            is_active: row.is_active,
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
        }
    }
}

impl From<&voting::VotingSettings> for VotingSettings {
    fn from(settings: &voting::VotingSettings) -> Self {
        VotingSettings {
            id: settings.id.0,
            voting_name: settings.voting_name.clone(),
            start_time: settings.start_time.naive_utc(),
            end_time: settings.end_time.naive_utc(),
            is_active: settings.is_active,
            created_at: settings.created_at.naive_utc(),
            updated_at: settings.updated_at.naive_utc(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::employees)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Employee {
    pub id: Uuid,
    pub employee_id: String,
    pub employee_name: Option<String>,
    pub has_voted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Employee> for voting::Employee {
    fn from(row: Employee) -> Self {
        voting::Employee {
            id: Id(row.id),
            employee_id: EmployeeId::from_stored(row.employee_id),
            employee_name: row.employee_name,
            has_voted: row.has_voted,
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
        }
    }
}

impl From<voting::Employee> for Employee {
    fn from(employee: voting::Employee) -> Self {
        Employee {
            id: employee.id.0,
            employee_id: employee.employee_id.as_str().to_string(),
            employee_name: employee.employee_name,
            has_voted: employee.has_voted,
            created_at: employee.created_at.naive_utc(),
            updated_at: employee.updated_at.naive_utc(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::voter_profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VoterProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub employee_id: String,
    pub email: String,
    pub face_photo_url: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<VoterProfile> for voting::VoterProfile {
    fn from(row: VoterProfile) -> Self {
        voting::VoterProfile {
            id: Id(row.id),
            user_id: Id(row.user_id),
            employee_id: EmployeeId::from_stored(row.employee_id),
            email: row.email,
            face_photo_url: row.face_photo_url,
            is_active: row.is_active,
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
        }
    }
}

impl From<&voting::VoterProfile> for VoterProfile {
    fn from(profile: &voting::VoterProfile) -> Self {
        VoterProfile {
            id: profile.id.0,
            user_id: profile.user_id.0,
            employee_id: profile.employee_id.as_str().to_string(),
            email: profile.email.clone(),
            face_photo_url: profile.face_photo_url.clone(),
            is_active: profile.is_active,
            created_at: profile.created_at.naive_utc(),
            updated_at: profile.updated_at.naive_utc(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::voter_registrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VoterRegistration {
    pub id: Uuid,
    pub employee_id: String,
    pub email: String,
    pub face_photo_url: Option<String>,
    pub user_id: Option<Uuid>,
    pub is_approved: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub registration_date: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<VoterRegistration> for voting::VoterRegistration {
    fn from(row: VoterRegistration) -> Self {
        voting::VoterRegistration {
            id: Id(row.id),
            employee_id: EmployeeId::from_stored(row.employee_id),
            email: row.email,
            face_photo_url: row.face_photo_url,
            user_id: row.user_id.map(Id),
            is_approved: row.is_approved,
            approved_by: row.approved_by,
            approved_at: row.approved_at.map(|t| t.and_utc()),
            registration_date: row.registration_date.and_utc(),
            updated_at: row.updated_at.and_utc(),
        }
    }
}

impl From<&voting::VoterRegistration> for VoterRegistration {
    fn from(registration: &voting::VoterRegistration) -> Self {
        VoterRegistration {
            id: registration.id.0,
            employee_id: registration.employee_id.as_str().to_string(),
            email: registration.email.clone(),
            face_photo_url: registration.face_photo_url.clone(),
            user_id: registration.user_id.map(|id| id.0),
            is_approved: registration.is_approved,
            approved_by: registration.approved_by.clone(),
            approved_at: registration.approved_at.map(|t| t.naive_utc()),
            registration_date: registration.registration_date.naive_utc(),
            updated_at: registration.updated_at.naive_utc(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::candidates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
    pub description: Option<String>,
    pub order_number: i32,
    pub created_at: NaiveDateTime,
}

impl From<Candidate> for voting::Candidate {
    fn from(row: Candidate) -> Self {
        voting::Candidate {
            id: Id(row.id),
            name: row.name,
            photo_url: row.photo_url,
            description: row.description,
            order_number: row.order_number,
            created_at: row.created_at.and_utc(),
        }
    }
}

impl From<&voting::Candidate> for Candidate {
    fn from(candidate: &voting::Candidate) -> Self {
        Candidate {
            id: candidate.id.0,
            name: candidate.name.clone(),
            photo_url: candidate.photo_url.clone(),
            description: candidate.description.clone(),
            order_number: candidate.order_number,
            created_at: candidate.created_at.naive_utc(),
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = schema::vote_results)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VoteResult {
    pub id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
    pub description: Option<String>,
    pub order_number: i32,
    pub created_at: NaiveDateTime,
    pub vote_count: i64,
}

impl From<VoteResult> for voting::VoteTally {
    fn from(row: VoteResult) -> Self {
        voting::VoteTally {
            candidate: voting::Candidate {
                id: Id(row.id),
                name: row.name,
                photo_url: row.photo_url,
                description: row.description,
                order_number: row.order_number,
                created_at: row.created_at.and_utc(),
            },
            vote_count: row.vote_count,
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::votes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Vote {
    pub id: Uuid,
    pub employee_id: String,
    pub candidate_id: Uuid,
    pub selfie_url: String,
    pub voted_at: NaiveDateTime,
}

impl From<Vote> for voting::Vote {
    fn from(row: Vote) -> Self {
        voting::Vote {
            id: Id(row.id),
            employee_id: EmployeeId::from_stored(row.employee_id),
            candidate_id: Id(row.candidate_id),
            selfie_url: row.selfie_url,
            voted_at: row.voted_at.and_utc(),
        }
    }
}

impl From<&voting::Vote> for Vote {
    fn from(vote: &voting::Vote) -> Self {
        Vote {
            id: vote.id.0,
            employee_id: vote.employee_id.as_str().to_string(),
            candidate_id: vote.candidate_id.0,
            selfie_url: vote.selfie_url.clone(),
            voted_at: vote.voted_at.naive_utc(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub employee_id: String,
    pub registration_id: Option<Uuid>,
    pub verification_token: Uuid,
    pub email_confirmed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl From<Account> for auth::Account {
    fn from(row: Account) -> Self {
        auth::Account {
            id: Id(row.id),
            email: row.email,
            password_hash: row.password_hash,
            employee_id: EmployeeId::from_stored(row.employee_id),
            registration_id: row.registration_id.map(Id),
            verification_token: Id(row.verification_token),
            email_confirmed_at: row.email_confirmed_at.map(|t| t.and_utc()),
            created_at: row.created_at.and_utc(),
        }
    }
}

impl From<&auth::Account> for Account {
    fn from(account: &auth::Account) -> Self {
        Account {
            id: account.id.0,
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            employee_id: account.employee_id.as_str().to_string(),
            registration_id: account.registration_id.map(|id| id.0),
            verification_token: account.verification_token.0,
            email_confirmed_at: account.email_confirmed_at.map(|t| t.naive_utc()),
            created_at: account.created_at.naive_utc(),
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Session {
    pub token: Uuid,
    pub account_id: Option<Uuid>,
    pub role: String,
    pub created_at: NaiveDateTime,
}

impl From<Session> for auth::Session {
    fn from(row: Session) -> Self {
        auth::Session {
            token: Id(row.token),
            account_id: row.account_id.map(Id),
            role: match row.role.as_str() {
                "admin" => SessionRole::Admin,
                _ => SessionRole::Voter,
            },
            created_at: row.created_at.and_utc(),
        }
    }
}

impl From<&auth::Session> for Session {
    fn from(session: &auth::Session) -> Self {
        Session {
            token: session.token.0,
            account_id: session.account_id.map(|id| id.0),
            role: String::from(match session.role {
                SessionRole::Admin => "admin",
                SessionRole::Voter => "voter",
            }),
            created_at: session.created_at.naive_utc(),
        }
    }
}
