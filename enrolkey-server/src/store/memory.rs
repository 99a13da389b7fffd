//! In-memory storage implementation

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use enrolkey_core::{
    Account, AccountDraft, AccountId, AccountProvisioner, AccountStore, CourseId,
    CourseOfferRepository, EnrolmentApplier, Error, GroupId, GroupSecret, GroupSecretRepository,
    MatchedOffer, OfferId, OfferScope, SelfEnrolmentOffer,
};

use super::{
    CatalogStore, Course, Enrolment, Group, OfferRecord, OfferSettings, Session, SessionId,
    SessionStore, StoreResult,
};
use crate::crypto::{generate_token, hash_password, verify_password};

struct StoredAccount {
    account: Account,
    password_hash: String,
}

/// In-memory store backing every collaborator trait
pub struct InMemoryStore {
    accounts: RwLock<HashMap<AccountId, StoredAccount>>,
    courses: RwLock<HashMap<CourseId, Course>>,
    offers: RwLock<Vec<OfferRecord>>,
    groups: RwLock<Vec<Group>>,
    enrolments: RwLock<Vec<Enrolment>>,
    group_members: RwLock<HashSet<(GroupId, AccountId)>>,
    sessions: RwLock<HashMap<SessionId, Session>>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            courses: RwLock::new(HashMap::new()),
            offers: RwLock::new(Vec::new()),
            groups: RwLock::new(Vec::new()),
            enrolments: RwLock::new(Vec::new()),
            group_members: RwLock::new(HashSet::new()),
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Ids are unique across all tables
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn offer_record(&self, id: OfferId) -> Option<OfferRecord> {
        self.offers
            .read()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountProvisioner for InMemoryStore {
    fn create_account(&self, draft: AccountDraft) -> StoreResult<AccountId> {
        let password_hash = hash_password(&draft.password)?;
        let email = draft.email.to_lowercase();

        let mut accounts = self.accounts.write().unwrap();
        if accounts.values().any(|a| a.account.username == draft.username) {
            return Err(Error::UsernameTaken);
        }
        if accounts.values().any(|a| a.account.email == email) {
            return Err(Error::EmailTaken);
        }

        let id = AccountId(self.next_id());
        accounts.insert(
            id,
            StoredAccount {
                account: Account {
                    id,
                    username: draft.username,
                    email,
                    auth_type: draft.auth_type,
                    confirmed: draft.confirmed,
                    secret: draft.secret,
                    profile: draft.profile,
                },
                password_hash,
            },
        );
        Ok(id)
    }
}

impl AccountStore for InMemoryStore {
    fn get_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .unwrap()
            .get(&id)
            .map(|a| a.account.clone()))
    }

    fn get_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .unwrap()
            .values()
            .find(|a| a.account.username == username)
            .map(|a| a.account.clone()))
    }

    fn set_confirmed(&self, id: AccountId, confirmed: bool) -> StoreResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        let stored = accounts.get_mut(&id).ok_or(Error::AccountNotFound)?;
        stored.account.confirmed = confirmed;
        Ok(())
    }

    fn check_password(&self, id: AccountId, password: &str) -> StoreResult<bool> {
        let hash = {
            let accounts = self.accounts.read().unwrap();
            let stored = accounts.get(&id).ok_or(Error::AccountNotFound)?;
            stored.password_hash.clone()
        };
        verify_password(password, &hash)
    }

    fn set_password(&self, id: AccountId, password: &str) -> StoreResult<()> {
        let password_hash = hash_password(password)?;
        let mut accounts = self.accounts.write().unwrap();
        let stored = accounts.get_mut(&id).ok_or(Error::AccountNotFound)?;
        stored.password_hash = password_hash;
        Ok(())
    }
}

impl CourseOfferRepository for InMemoryStore {
    fn offers_with_secret(&self, secret: &str) -> StoreResult<Vec<SelfEnrolmentOffer>> {
        Ok(self
            .offers
            .read()
            .unwrap()
            .iter()
            .filter(|o| o.settings.scope == OfferScope::Course && o.settings.secret == secret)
            .map(OfferRecord::to_offer)
            .collect())
    }
}

impl GroupSecretRepository for InMemoryStore {
    fn group_offers_with_secret(
        &self,
        secret: &str,
    ) -> StoreResult<Vec<(SelfEnrolmentOffer, GroupSecret)>> {
        let groups = self.groups.read().unwrap();
        let offers = self.offers.read().unwrap();

        let mut matched = Vec::new();
        for group in groups.iter().filter(|g| g.secret == secret) {
            for offer in offers.iter().filter(|o| {
                o.settings.scope == OfferScope::Group && o.settings.course_id == group.course_id
            }) {
                matched.push((
                    offer.to_offer(),
                    GroupSecret {
                        group_id: group.id,
                        course_id: group.course_id,
                        secret: group.secret.clone(),
                    },
                ));
            }
        }
        Ok(matched)
    }
}

impl EnrolmentApplier for InMemoryStore {
    fn can_self_enrol(&self, offer: &MatchedOffer) -> bool {
        let Some(record) = self.offer_record(offer.offer_id()) else {
            return false;
        };
        let enrolled = self
            .enrolments
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.offer_id == record.id)
            .count();
        record.settings.admits(enrolled, Utc::now())
    }

    fn apply_enrolment(&self, offer: &MatchedOffer, account: AccountId) -> StoreResult<()> {
        let offer_id = offer.offer_id();
        let record = self
            .offer_record(offer_id)
            .ok_or(Error::OfferNotFound(offer_id))?;

        let mut enrolments = self.enrolments.write().unwrap();
        let already = enrolments
            .iter()
            .any(|e| e.offer_id == offer_id && e.account == account);

        if !already {
            // Re-checked under the write lock
            let enrolled = enrolments.iter().filter(|e| e.offer_id == offer_id).count();
            if !record.settings.admits(enrolled, Utc::now()) {
                return Err(Error::Enrolment {
                    offer: offer_id,
                    reason: "enrolment closed or full".to_string(),
                });
            }
            enrolments.push(Enrolment {
                offer_id,
                account,
                enrolled_at: Utc::now(),
            });
        }

        if let Some(group) = offer.group_id {
            self.group_members.write().unwrap().insert((group, account));
        }
        Ok(())
    }
}

impl CatalogStore for InMemoryStore {
    fn add_course(&self, name: &str) -> StoreResult<CourseId> {
        let id = CourseId(self.next_id());
        self.courses.write().unwrap().insert(
            id,
            Course {
                id,
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    fn get_course(&self, id: CourseId) -> StoreResult<Option<Course>> {
        Ok(self.courses.read().unwrap().get(&id).cloned())
    }

    fn add_offer(&self, settings: OfferSettings) -> StoreResult<OfferId> {
        let id = OfferId(self.next_id());
        self.offers
            .write()
            .unwrap()
            .push(OfferRecord { id, settings });
        Ok(id)
    }

    fn get_offer(&self, id: OfferId) -> StoreResult<Option<OfferRecord>> {
        Ok(self.offer_record(id))
    }

    fn add_group(&self, course_id: CourseId, name: &str, secret: &str) -> StoreResult<GroupId> {
        let id = GroupId(self.next_id());
        self.groups.write().unwrap().push(Group {
            id,
            course_id,
            name: name.to_string(),
            secret: secret.to_string(),
        });
        Ok(id)
    }

    fn list_enrolments(&self, account: AccountId) -> StoreResult<Vec<Enrolment>> {
        Ok(self
            .enrolments
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.account == account)
            .cloned()
            .collect())
    }

    fn group_members(&self, group: GroupId) -> StoreResult<Vec<AccountId>> {
        let mut members: Vec<AccountId> = self
            .group_members
            .read()
            .unwrap()
            .iter()
            .filter(|(g, _)| *g == group)
            .map(|(_, a)| *a)
            .collect();
        members.sort();
        Ok(members)
    }
}

impl SessionStore for InMemoryStore {
    fn create_session(&self, account: AccountId) -> StoreResult<Session> {
        let session = Session {
            id: SessionId(generate_token()),
            account,
            csrf_token: generate_token(),
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get_session(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    fn delete_session(&self, session_id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(session_id);
        Ok(())
    }
}
