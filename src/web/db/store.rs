use chrono::{DateTime, Utc};
use diesel::dsl::{exists, now};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};

use super::{models, schema, PgPool};
use crate::auth::{Account, Session};
use crate::store::{StoreError, VotingStore};
use crate::voting::{
    Candidate, Employee, EmployeeId, Id, Vote, VoteRecord, VoteTally, VoterProfile, VoterRegistration,
    VotingSettings,
};

type Conn = PooledConnection<ConnectionManager<PgConnection>>;

/// [`VotingStore`] over a PostgreSQL connection pool. Each call checks out a
/// connection for its own duration.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> PgStore {
        PgStore { pool }
    }

    fn conn(&self) -> Result<Conn, StoreError> {
        self.pool.get().map_err(|e| StoreError::Backend(format!("could not get connection: {e}")))
    }
}

impl VotingStore for PgStore {
    fn latest_settings(&self) -> Result<Option<VotingSettings>, StoreError> {
        use schema::voting_settings::dsl::*;
        let row = voting_settings
            .order(created_at.desc())
            .select(models::VotingSettings::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn insert_settings(&self, settings: VotingSettings) -> Result<VotingSettings, StoreError> {
        diesel::insert_into(schema::voting_settings::table)
            .values(models::VotingSettings::from(&settings))
            .execute(&mut self.conn()?)?;
        Ok(settings)
    }

    fn find_employee(&self, nip: &EmployeeId) -> Result<Option<Employee>, StoreError> {
        use schema::employees::dsl::*;
        let row = employees
            .filter(employee_id.eq(nip.as_str()))
            .select(models::Employee::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        use schema::employees::dsl::*;
        let rows = employees
            .order(created_at.desc())
            .select(models::Employee::as_select())
            .load(&mut self.conn()?)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn count_employees(&self) -> Result<i64, StoreError> {
        Ok(schema::employees::table.count().get_result(&mut self.conn()?)?)
    }

    fn import_employees(&self, new_employees: Vec<Employee>) -> Result<usize, StoreError> {
        use schema::employees::dsl::*;
        let rows: Vec<models::Employee> = new_employees.into_iter().map(Into::into).collect();
        Ok(diesel::insert_into(employees)
            .values(&rows)
            .on_conflict(employee_id)
            .do_nothing()
            .execute(&mut self.conn()?)?)
    }

    fn set_has_voted(&self, nip: &EmployeeId, voted: bool) -> Result<usize, StoreError> {
        use schema::employees::dsl::*;
        Ok(diesel::update(employees.filter(employee_id.eq(nip.as_str())))
            .set((has_voted.eq(voted), updated_at.eq(now)))
            .execute(&mut self.conn()?)?)
    }

    fn delete_employee(&self, nip: &EmployeeId) -> Result<usize, StoreError> {
        use schema::employees::dsl::*;
        Ok(diesel::delete(employees.filter(employee_id.eq(nip.as_str()))).execute(&mut self.conn()?)?)
    }

    fn find_profile_by_user(&self, account: &Id) -> Result<Option<VoterProfile>, StoreError> {
        use schema::voter_profiles::dsl::*;
        let row = voter_profiles
            .filter(user_id.eq(account.0))
            .select(models::VoterProfile::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn find_profile_by_employee(&self, nip: &EmployeeId) -> Result<Option<VoterProfile>, StoreError> {
        use schema::voter_profiles::dsl::*;
        let row = voter_profiles
            .filter(employee_id.eq(nip.as_str()))
            .select(models::VoterProfile::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn email_in_use(&self, address: &str) -> Result<bool, StoreError> {
        use schema::{voter_profiles, voter_registrations};
        let conn = &mut self.conn()?;
        let profile_uses = diesel::select(exists(
            voter_profiles::table
                .filter(voter_profiles::email.eq(address))
                .filter(voter_profiles::is_active.eq(true)),
        )).get_result::<bool>(conn)?;
        if profile_uses {
            return Ok(true);
        }
        Ok(diesel::select(exists(
            voter_registrations::table
                .filter(voter_registrations::email.eq(address))
                .filter(voter_registrations::is_approved.eq(true)),
        )).get_result::<bool>(conn)?)
    }

    fn insert_profile(&self, profile: VoterProfile) -> Result<VoterProfile, StoreError> {
        diesel::insert_into(schema::voter_profiles::table)
            .values(models::VoterProfile::from(&profile))
            .execute(&mut self.conn()?)?;
        Ok(profile)
    }

    fn delete_profile_by_employee(&self, nip: &EmployeeId) -> Result<usize, StoreError> {
        use schema::voter_profiles::dsl::*;
        Ok(diesel::delete(voter_profiles.filter(employee_id.eq(nip.as_str()))).execute(&mut self.conn()?)?)
    }

    fn find_registration(&self, registration: &Id) -> Result<Option<VoterRegistration>, StoreError> {
        use schema::voter_registrations::dsl::*;
        let row = voter_registrations
            .find(registration.0)
            .select(models::VoterRegistration::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn find_registration_by_employee(&self, nip: &EmployeeId) -> Result<Option<VoterRegistration>, StoreError> {
        use schema::voter_registrations::dsl::*;
        let row = voter_registrations
            .filter(employee_id.eq(nip.as_str()))
            .select(models::VoterRegistration::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn list_registrations(&self, pending_only: bool) -> Result<Vec<VoterRegistration>, StoreError> {
        use schema::voter_registrations::dsl::*;
        let mut query = voter_registrations.into_boxed();
        if pending_only {
            query = query.filter(is_approved.eq(false));
        }
        let rows = query
            .order(registration_date.asc())
            .select(models::VoterRegistration::as_select())
            .load(&mut self.conn()?)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn list_approved_registrations(&self) -> Result<Vec<VoterRegistration>, StoreError> {
        use schema::voter_registrations::dsl::*;
        let rows = voter_registrations
            .filter(is_approved.eq(true))
            .order(registration_date.asc())
            .select(models::VoterRegistration::as_select())
            .load(&mut self.conn()?)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn insert_registration(&self, registration: VoterRegistration) -> Result<VoterRegistration, StoreError> {
        diesel::insert_into(schema::voter_registrations::table)
            .values(models::VoterRegistration::from(&registration))
            .execute(&mut self.conn()?)?;
        Ok(registration)
    }

    fn link_registration_account(&self, registration: &Id, account: &Id) -> Result<usize, StoreError> {
        use schema::voter_registrations::dsl::*;
        Ok(diesel::update(voter_registrations.find(registration.0))
            .set((user_id.eq(Some(account.0)), updated_at.eq(now)))
            .execute(&mut self.conn()?)?)
    }

    fn approve_registration(
        &self,
        registration: &Id,
        approver: &str,
        at: DateTime<Utc>,
        profile: VoterProfile,
    ) -> Result<VoterProfile, StoreError> {
        use schema::{voter_profiles, voter_registrations};
        self.conn()?.transaction::<_, StoreError, _>(|conn| {
            let approved = diesel::update(voter_registrations::table.find(registration.0))
                .set((
                    voter_registrations::is_approved.eq(true),
                    voter_registrations::approved_by.eq(Some(approver)),
                    voter_registrations::approved_at.eq(Some(at.naive_utc())),
                    voter_registrations::updated_at.eq(at.naive_utc()),
                ))
                .execute(conn)?;
            if approved == 0 {
                return Err(StoreError::NotFound("voter registration"));
            }

            diesel::delete(
                voter_profiles::table.filter(voter_profiles::employee_id.eq(profile.employee_id.as_str())),
            ).execute(conn)?;
            diesel::insert_into(voter_profiles::table)
                .values(models::VoterProfile::from(&profile))
                .execute(conn)?;
            Ok(())
        })?;
        Ok(profile)
    }

    fn delete_registration(&self, registration: &Id) -> Result<usize, StoreError> {
        use schema::voter_registrations::dsl::*;
        Ok(diesel::delete(voter_registrations.find(registration.0)).execute(&mut self.conn()?)?)
    }

    fn delete_registration_by_employee(&self, nip: &EmployeeId) -> Result<usize, StoreError> {
        use schema::voter_registrations::dsl::*;
        Ok(diesel::delete(voter_registrations.filter(employee_id.eq(nip.as_str()))).execute(&mut self.conn()?)?)
    }

    fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        use schema::candidates::dsl::*;
        let rows = candidates
            .order((order_number.asc(), created_at.asc()))
            .select(models::Candidate::as_select())
            .load(&mut self.conn()?)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn find_candidate(&self, candidate: &Id) -> Result<Option<Candidate>, StoreError> {
        use schema::candidates::dsl::*;
        let row = candidates
            .find(candidate.0)
            .select(models::Candidate::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, StoreError> {
        diesel::insert_into(schema::candidates::table)
            .values(models::Candidate::from(&candidate))
            .execute(&mut self.conn()?)?;
        Ok(candidate)
    }

    fn delete_candidate(&self, candidate: &Id) -> Result<usize, StoreError> {
        use schema::candidates::dsl::*;
        Ok(diesel::delete(candidates.find(candidate.0)).execute(&mut self.conn()?)?)
    }

    fn find_vote_by_employee(&self, nip: &EmployeeId) -> Result<Option<Vote>, StoreError> {
        use schema::votes::dsl::*;
        let row = votes
            .filter(employee_id.eq(nip.as_str()))
            .select(models::Vote::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn insert_vote(&self, vote: Vote) -> Result<Vote, StoreError> {
        diesel::insert_into(schema::votes::table)
            .values(models::Vote::from(&vote))
            .execute(&mut self.conn()?)?;
        Ok(vote)
    }

    fn delete_votes_by_employee(&self, nip: &EmployeeId) -> Result<usize, StoreError> {
        use schema::votes::dsl::*;
        Ok(diesel::delete(votes.filter(employee_id.eq(nip.as_str()))).execute(&mut self.conn()?)?)
    }

    fn list_votes(&self) -> Result<Vec<VoteRecord>, StoreError> {
        use schema::{candidates, votes};
        let rows: Vec<(models::Vote, String)> = votes::table
            .inner_join(candidates::table)
            .order(votes::voted_at.desc())
            .select((models::Vote::as_select(), candidates::name))
            .load(&mut self.conn()?)?;
        Ok(rows.into_iter()
            .map(|(vote, candidate_name)| VoteRecord { vote: vote.into(), candidate_name })
            .collect())
    }

    fn vote_tallies(&self) -> Result<Vec<VoteTally>, StoreError> {
        use schema::vote_results::dsl::*;
        let rows = vote_results
            .order((order_number.asc(), created_at.asc()))
            .select(models::VoteResult::as_select())
            .load(&mut self.conn()?)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn insert_account(&self, account: Account) -> Result<Account, StoreError> {
        diesel::insert_into(schema::accounts::table)
            .values(models::Account::from(&account))
            .execute(&mut self.conn()?)?;
        Ok(account)
    }

    fn find_account(&self, account: &Id) -> Result<Option<Account>, StoreError> {
        use schema::accounts::dsl::*;
        let row = accounts
            .find(account.0)
            .select(models::Account::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn find_account_by_email(&self, address: &str) -> Result<Option<Account>, StoreError> {
        use schema::accounts::dsl::*;
        let row = accounts
            .filter(email.eq(address))
            .select(models::Account::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn confirm_account(&self, token: &Id, at: DateTime<Utc>) -> Result<Option<Account>, StoreError> {
        use schema::accounts::dsl::*;
        let conn = &mut self.conn()?;
        diesel::update(accounts.filter(verification_token.eq(token.0)).filter(email_confirmed_at.is_null()))
            .set(email_confirmed_at.eq(Some(at.naive_utc())))
            .execute(conn)?;
        let row = accounts
            .filter(verification_token.eq(token.0))
            .select(models::Account::as_select())
            .first(conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn insert_session(&self, session: Session) -> Result<Session, StoreError> {
        diesel::insert_into(schema::sessions::table)
            .values(models::Session::from(&session))
            .execute(&mut self.conn()?)?;
        Ok(session)
    }

    fn find_session(&self, session: &Id) -> Result<Option<Session>, StoreError> {
        use schema::sessions::dsl::*;
        let row = sessions
            .find(session.0)
            .select(models::Session::as_select())
            .first(&mut self.conn()?)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn delete_accounts_by_employee(&self, nip: &EmployeeId) -> Result<usize, StoreError> {
        use schema::accounts::dsl::*;
        Ok(diesel::delete(accounts.filter(employee_id.eq(nip.as_str()))).execute(&mut self.conn()?)?)
    }

    fn delete_session(&self, session: &Id) -> Result<usize, StoreError> {
        use schema::sessions::dsl::*;
        Ok(diesel::delete(sessions.find(session.0)).execute(&mut self.conn()?)?)
    }
}
