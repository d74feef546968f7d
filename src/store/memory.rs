use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{constraints, StoreError, VotingStore};
use crate::auth::{Account, Session};
use crate::voting::{
    Candidate, Employee, EmployeeId, Id, Vote, VoteRecord, VoteTally, VoterProfile,
    VoterRegistration, VotingSettings,
};

#[derive(Default)]
struct Tables {
    settings: Vec<VotingSettings>,
    employees: Vec<Employee>,
    profiles: Vec<VoterProfile>,
    registrations: Vec<VoterRegistration>,
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
    accounts: Vec<Account>,
    sessions: HashMap<Id, Session>,
}

/// Process-local store with the same constraints as the PostgreSQL schema.
/// Every operation runs under one lock, so each call is atomic on its own but
/// nothing spans two calls.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failures: Mutex<Vec<(Option<&'static str>, StoreError)>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Makes the next call, whatever it is, fail with `err`.
    #[cfg(test)]
    pub fn fail_next(&self, err: StoreError) {
        self.failures.lock().unwrap_or_else(|e| e.into_inner()).push((None, err));
    }

    /// Makes the next call to `operation` fail with `err`.
    #[cfg(test)]
    pub fn fail_on(&self, operation: &'static str, err: StoreError) {
        self.failures.lock().unwrap_or_else(|e| e.into_inner()).push((Some(operation), err));
    }

    fn begin(&self, operation: &'static str) -> Result<MutexGuard<'_, Tables>, StoreError> {
        {
            let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
            let hit = failures.iter().position(|(target, _)| target.map_or(true, |t| t == operation));
            if let Some(index) = hit {
                return Err(failures.remove(index).1);
            }
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend(format!("memory store poisoned during {operation}")))
    }
}

fn retain_count<T>(rows: &mut Vec<T>, keep: impl Fn(&T) -> bool) -> usize {
    let before = rows.len();
    rows.retain(keep);
    before - rows.len()
}

impl VotingStore for MemoryStore {
    fn latest_settings(&self) -> Result<Option<VotingSettings>, StoreError> {
        let tables = self.begin("latest_settings")?;
        Ok(tables.settings.iter().max_by_key(|s| s.created_at).cloned())
    }

    fn insert_settings(&self, settings: VotingSettings) -> Result<VotingSettings, StoreError> {
        let mut tables = self.begin("insert_settings")?;
        tables.settings.push(settings.clone());
        Ok(settings)
    }

    fn find_employee(&self, employee_id: &EmployeeId) -> Result<Option<Employee>, StoreError> {
        let tables = self.begin("find_employee")?;
        Ok(tables.employees.iter().find(|e| &e.employee_id == employee_id).cloned())
    }

    fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let tables = self.begin("list_employees")?;
        let mut employees = tables.employees.clone();
        employees.reverse();
        employees.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(employees)
    }

    fn count_employees(&self) -> Result<i64, StoreError> {
        let tables = self.begin("count_employees")?;
        Ok(tables.employees.len() as i64)
    }

    fn import_employees(&self, employees: Vec<Employee>) -> Result<usize, StoreError> {
        let mut tables = self.begin("import_employees")?;
        let mut inserted = 0;
        for employee in employees {
            if tables.employees.iter().any(|e| e.employee_id == employee.employee_id) {
                continue;
            }
            tables.employees.push(employee);
            inserted += 1;
        }
        Ok(inserted)
    }

    fn set_has_voted(&self, employee_id: &EmployeeId, has_voted: bool) -> Result<usize, StoreError> {
        let mut tables = self.begin("set_has_voted")?;
        let mut updated = 0;
        for employee in tables.employees.iter_mut().filter(|e| &e.employee_id == employee_id) {
            employee.has_voted = has_voted;
            updated += 1;
        }
        Ok(updated)
    }

    fn delete_employee(&self, employee_id: &EmployeeId) -> Result<usize, StoreError> {
        let mut tables = self.begin("delete_employee")?;
        let referenced = tables.votes.iter().any(|v| &v.employee_id == employee_id)
            || tables.profiles.iter().any(|p| &p.employee_id == employee_id)
            || tables.registrations.iter().any(|r| &r.employee_id == employee_id);
        if referenced {
            return Err(StoreError::ForeignKeyViolation(String::from("employees_employee_id_fkey")));
        }
        Ok(retain_count(&mut tables.employees, |e| &e.employee_id != employee_id))
    }

    fn find_profile_by_user(&self, user_id: &Id) -> Result<Option<VoterProfile>, StoreError> {
        let tables = self.begin("find_profile_by_user")?;
        Ok(tables.profiles.iter().find(|p| &p.user_id == user_id).cloned())
    }

    fn find_profile_by_employee(&self, employee_id: &EmployeeId) -> Result<Option<VoterProfile>, StoreError> {
        let tables = self.begin("find_profile_by_employee")?;
        Ok(tables.profiles.iter().find(|p| &p.employee_id == employee_id).cloned())
    }

    fn email_in_use(&self, email: &str) -> Result<bool, StoreError> {
        let tables = self.begin("email_in_use")?;
        Ok(tables.profiles.iter().any(|p| p.is_active && p.email == email)
            || tables.registrations.iter().any(|r| r.is_approved && r.email == email))
    }

    fn insert_profile(&self, profile: VoterProfile) -> Result<VoterProfile, StoreError> {
        let mut tables = self.begin("insert_profile")?;
        if tables.profiles.iter().any(|p| p.employee_id == profile.employee_id) {
            return Err(StoreError::UniqueViolation(String::from("voter_profiles_employee_id_key")));
        }
        if tables.profiles.iter().any(|p| p.user_id == profile.user_id) {
            return Err(StoreError::UniqueViolation(String::from("voter_profiles_user_id_key")));
        }
        tables.profiles.push(profile.clone());
        Ok(profile)
    }

    fn delete_profile_by_employee(&self, employee_id: &EmployeeId) -> Result<usize, StoreError> {
        let mut tables = self.begin("delete_profile_by_employee")?;
        Ok(retain_count(&mut tables.profiles, |p| &p.employee_id != employee_id))
    }

    fn find_registration(&self, id: &Id) -> Result<Option<VoterRegistration>, StoreError> {
        let tables = self.begin("find_registration")?;
        Ok(tables.registrations.iter().find(|r| &r.id == id).cloned())
    }

    fn find_registration_by_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<VoterRegistration>, StoreError> {
        let tables = self.begin("find_registration_by_employee")?;
        Ok(tables.registrations.iter().find(|r| &r.employee_id == employee_id).cloned())
    }

    fn list_registrations(&self, pending_only: bool) -> Result<Vec<VoterRegistration>, StoreError> {
        let tables = self.begin("list_registrations")?;
        let mut registrations: Vec<VoterRegistration> = tables.registrations.iter()
            .filter(|r| !pending_only || !r.is_approved)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.registration_date);
        Ok(registrations)
    }

    fn list_approved_registrations(&self) -> Result<Vec<VoterRegistration>, StoreError> {
        let tables = self.begin("list_approved_registrations")?;
        let mut registrations: Vec<VoterRegistration> = tables.registrations.iter()
            .filter(|r| r.is_approved)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.registration_date);
        Ok(registrations)
    }

    fn insert_registration(&self, registration: VoterRegistration) -> Result<VoterRegistration, StoreError> {
        let mut tables = self.begin("insert_registration")?;
        if tables.registrations.iter().any(|r| r.employee_id == registration.employee_id) {
            return Err(StoreError::UniqueViolation(String::from(constraints::REGISTRATIONS_EMPLOYEE_ID)));
        }
        if !tables.employees.iter().any(|e| e.employee_id == registration.employee_id) {
            return Err(StoreError::ForeignKeyViolation(String::from("voter_registrations_employee_id_fkey")));
        }
        tables.registrations.push(registration.clone());
        Ok(registration)
    }

    fn link_registration_account(&self, id: &Id, user_id: &Id) -> Result<usize, StoreError> {
        let mut tables = self.begin("link_registration_account")?;
        let mut updated = 0;
        for registration in tables.registrations.iter_mut().filter(|r| &r.id == id) {
            registration.user_id = Some(*user_id);
            updated += 1;
        }
        Ok(updated)
    }

    fn approve_registration(
        &self,
        id: &Id,
        approved_by: &str,
        approved_at: DateTime<Utc>,
        profile: VoterProfile,
    ) -> Result<VoterProfile, StoreError> {
        let mut tables = self.begin("approve_registration")?;
        if tables.profiles.iter().any(|p| p.user_id == profile.user_id && p.employee_id != profile.employee_id) {
            return Err(StoreError::UniqueViolation(String::from("voter_profiles_user_id_key")));
        }
        let registration = tables.registrations.iter_mut()
            .find(|r| &r.id == id)
            .ok_or(StoreError::NotFound("voter registration"))?;
        registration.is_approved = true;
        registration.approved_by = Some(approved_by.to_string());
        registration.approved_at = Some(approved_at);
        registration.updated_at = approved_at;

        tables.profiles.retain(|p| p.employee_id != profile.employee_id);
        tables.profiles.push(profile.clone());
        Ok(profile)
    }

    fn delete_registration(&self, id: &Id) -> Result<usize, StoreError> {
        let mut tables = self.begin("delete_registration")?;
        Ok(retain_count(&mut tables.registrations, |r| &r.id != id))
    }

    fn delete_registration_by_employee(&self, employee_id: &EmployeeId) -> Result<usize, StoreError> {
        let mut tables = self.begin("delete_registration_by_employee")?;
        Ok(retain_count(&mut tables.registrations, |r| &r.employee_id != employee_id))
    }

    fn list_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        let tables = self.begin("list_candidates")?;
        let mut candidates = tables.candidates.clone();
        candidates.sort_by_key(|c| c.order_number);
        Ok(candidates)
    }

    fn find_candidate(&self, id: &Id) -> Result<Option<Candidate>, StoreError> {
        let tables = self.begin("find_candidate")?;
        Ok(tables.candidates.iter().find(|c| &c.id == id).cloned())
    }

    fn insert_candidate(&self, candidate: Candidate) -> Result<Candidate, StoreError> {
        let mut tables = self.begin("insert_candidate")?;
        tables.candidates.push(candidate.clone());
        Ok(candidate)
    }

    fn delete_candidate(&self, id: &Id) -> Result<usize, StoreError> {
        let mut tables = self.begin("delete_candidate")?;
        if tables.votes.iter().any(|v| &v.candidate_id == id) {
            return Err(StoreError::ForeignKeyViolation(String::from("votes_candidate_id_fkey")));
        }
        Ok(retain_count(&mut tables.candidates, |c| &c.id != id))
    }

    fn find_vote_by_employee(&self, employee_id: &EmployeeId) -> Result<Option<Vote>, StoreError> {
        let tables = self.begin("find_vote_by_employee")?;
        Ok(tables.votes.iter().find(|v| &v.employee_id == employee_id).cloned())
    }

    fn insert_vote(&self, vote: Vote) -> Result<Vote, StoreError> {
        let mut tables = self.begin("insert_vote")?;
        if tables.votes.iter().any(|v| v.employee_id == vote.employee_id) {
            return Err(StoreError::UniqueViolation(String::from(constraints::VOTES_EMPLOYEE_ID)));
        }
        if !tables.candidates.iter().any(|c| c.id == vote.candidate_id) {
            return Err(StoreError::ForeignKeyViolation(String::from("votes_candidate_id_fkey")));
        }
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    fn delete_votes_by_employee(&self, employee_id: &EmployeeId) -> Result<usize, StoreError> {
        let mut tables = self.begin("delete_votes_by_employee")?;
        Ok(retain_count(&mut tables.votes, |v| &v.employee_id != employee_id))
    }

    fn list_votes(&self) -> Result<Vec<VoteRecord>, StoreError> {
        let tables = self.begin("list_votes")?;
        let mut records: Vec<VoteRecord> = tables.votes.iter()
            .rev()
            .map(|vote| VoteRecord {
                vote: vote.clone(),
                candidate_name: tables.candidates.iter()
                    .find(|c| c.id == vote.candidate_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        records.sort_by(|a, b| b.vote.voted_at.cmp(&a.vote.voted_at));
        Ok(records)
    }

    fn vote_tallies(&self) -> Result<Vec<VoteTally>, StoreError> {
        let tables = self.begin("vote_tallies")?;
        let mut tallies: Vec<VoteTally> = tables.candidates.iter()
            .map(|candidate| VoteTally {
                vote_count: tables.votes.iter().filter(|v| v.candidate_id == candidate.id).count() as i64,
                candidate: candidate.clone(),
            })
            .collect();
        tallies.sort_by_key(|t| t.candidate.order_number);
        Ok(tallies)
    }

    fn insert_account(&self, account: Account) -> Result<Account, StoreError> {
        let mut tables = self.begin("insert_account")?;
        if tables.accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::UniqueViolation(String::from(constraints::ACCOUNTS_EMAIL)));
        }
        tables.accounts.push(account.clone());
        Ok(account)
    }

    fn find_account(&self, id: &Id) -> Result<Option<Account>, StoreError> {
        let tables = self.begin("find_account")?;
        Ok(tables.accounts.iter().find(|a| &a.id == id).cloned())
    }

    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.begin("find_account_by_email")?;
        Ok(tables.accounts.iter().find(|a| a.email == email).cloned())
    }

    fn confirm_account(
        &self,
        verification_token: &Id,
        confirmed_at: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError> {
        let mut tables = self.begin("confirm_account")?;
        let account = tables.accounts.iter_mut().find(|a| &a.verification_token == verification_token);
        Ok(account.map(|account| {
            if account.email_confirmed_at.is_none() {
                account.email_confirmed_at = Some(confirmed_at);
            }
            account.clone()
        }))
    }

    fn insert_session(&self, session: Session) -> Result<Session, StoreError> {
        let mut tables = self.begin("insert_session")?;
        tables.sessions.insert(session.token, session.clone());
        Ok(session)
    }

    fn delete_accounts_by_employee(&self, employee_id: &EmployeeId) -> Result<usize, StoreError> {
        let mut tables = self.begin("delete_accounts_by_employee")?;
        let owned: Vec<Id> = tables.accounts.iter()
            .filter(|a| &a.employee_id == employee_id)
            .map(|a| a.id)
            .collect();
        tables.sessions.retain(|_, s| s.account_id.map_or(true, |id| !owned.contains(&id)));
        tables.profiles.retain(|p| !owned.contains(&p.user_id));
        Ok(retain_count(&mut tables.accounts, |a| !owned.contains(&a.id)))
    }

    fn find_session(&self, token: &Id) -> Result<Option<Session>, StoreError> {
        let tables = self.begin("find_session")?;
        Ok(tables.sessions.get(token).cloned())
    }

    fn delete_session(&self, token: &Id) -> Result<usize, StoreError> {
        let mut tables = self.begin("delete_session")?;
        Ok(tables.sessions.remove(token).map_or(0, |_| 1))
    }
}
