//! Seeded in-memory elections for workflow and route tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::schedule::NewVotingSettings;
use super::voter::NewVoterRegistration;
use super::{Candidate, Employee, EmployeeId, Id, NewCandidate, VoteFeed, VoterProfile, VoterRegistration, VotingSettings};
use crate::auth::{self, Account, NewAccount, Session, SessionRole, VoterSession, ADMIN_IDENTITY};
use crate::store::{MemoryStore, VotingStore};

pub const TEST_BCRYPT_COST: u32 = 4;
pub const TEST_PASSWORD: &str = "rahasia-serikat";

/// A moment inside the window opened by [`Fixture::open`].
pub fn open_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap()
}

fn nip(raw: &str) -> EmployeeId {
    EmployeeId::parse(raw).unwrap()
}

pub struct Fixture {
    pub store: MemoryStore,
    pub feed: VoteFeed,
    pub candidates: Vec<Candidate>,
}

impl Fixture {
    /// Employees E1 to E3 and two candidates, with no voting window.
    pub fn new() -> Fixture {
        let store = MemoryStore::new();
        let roster = ["E1", "E2", "E3"].into_iter()
            .map(|raw| Employee::new(nip(raw), Some(format!("Employee {raw}")), open_at() - Duration::days(7)))
            .collect();
        store.import_employees(roster).unwrap();

        let candidates = [("Ayu Lestari", 1), ("Budi Santoso", 2)].into_iter()
            .map(|(name, order_number)| {
                store.insert_candidate(Candidate::new(NewCandidate {
                    name: String::from(name),
                    description: None,
                    photo_url: None,
                    order_number,
                }, open_at() - Duration::days(7))).unwrap()
            })
            .collect();

        Fixture { store, feed: VoteFeed::default(), candidates }
    }

    /// Like [`Fixture::new`] with an active window around [`open_at`].
    pub fn open() -> Fixture {
        Fixture::open_around(open_at())
    }

    /// Like [`Fixture::new`] with an active window around `at`.
    pub fn open_around(at: DateTime<Utc>) -> Fixture {
        let fixture = Fixture::new();
        fixture.store.insert_settings(VotingSettings::new(NewVotingSettings {
            voting_name: String::from("Union Chair Election"),
            start_time: at - Duration::hours(2),
            end_time: at + Duration::hours(8),
            is_active: true,
        }, at - Duration::days(1))).unwrap();
        fixture
    }

    /// A registration for `raw_nip` and its account, optionally verified.
    pub fn account(&self, raw_nip: &str, confirmed: bool) -> Account {
        let email = format!("{}@union.id", raw_nip.to_lowercase());
        let registration = self.store.insert_registration(VoterRegistration::new(NewVoterRegistration {
            employee_id: nip(raw_nip),
            email: email.clone(),
            face_photo_url: None,
        }, open_at() - Duration::days(3))).unwrap();

        let account = auth::sign_up(&self.store, NewAccount {
            email: &email,
            password: TEST_PASSWORD,
            employee_id: nip(raw_nip),
            registration_id: Some(registration.id),
        }, TEST_BCRYPT_COST, open_at() - Duration::days(3)).unwrap();

        if !confirmed {
            return account;
        }
        auth::verify_email(&self.store, &account.verification_token, open_at() - Duration::days(3)).unwrap()
    }

    /// A verified, approved voter for `raw_nip`; returns the account id.
    pub fn voter_with_profile(&self, raw_nip: &str, active: bool) -> Id {
        let account = self.account(raw_nip, true);
        let registration = self.store.find_registration_by_employee(&nip(raw_nip)).unwrap().unwrap();
        let mut profile = VoterProfile::from_registration(&registration, account.id, open_at() - Duration::days(2));
        profile.is_active = active;
        self.store
            .approve_registration(&registration.id, ADMIN_IDENTITY, open_at() - Duration::days(2), profile)
            .unwrap();
        account.id
    }

    /// An active profile whose employee is not on the roster.
    pub fn profile_without_employee(&self, raw_nip: &str) -> Id {
        let user_id = Id::new();
        self.store.insert_profile(VoterProfile {
            id: Id::new(),
            user_id,
            employee_id: nip(raw_nip),
            email: format!("{}@union.id", raw_nip.to_lowercase()),
            face_photo_url: None,
            is_active: true,
            created_at: open_at(),
            updated_at: open_at(),
        }).unwrap();
        user_id
    }

    /// A signed-in, eligible voter for `raw_nip`.
    pub fn voter_session(&self, raw_nip: &str) -> VoterSession {
        let user_id = self.voter_with_profile(raw_nip, true);
        self.session_for(user_id)
    }

    /// Another session for the same voter, as from a second browser.
    pub fn new_session_for(&self, session: &VoterSession) -> VoterSession {
        self.session_for(session.user_id)
    }

    // Sessions are stamped with the wall clock; routes check their age against it.
    fn session_for(&self, user_id: Id) -> VoterSession {
        let session = self.store.insert_session(Session {
            token: Id::new(),
            account_id: Some(user_id),
            role: SessionRole::Voter,
            created_at: Utc::now(),
        }).unwrap();
        VoterSession { token: session.token, user_id }
    }

    pub fn admin_session(&self) -> Session {
        self.store.insert_session(Session {
            token: Id::new(),
            account_id: None,
            role: SessionRole::Admin,
            created_at: Utc::now(),
        }).unwrap()
    }
}
