//! Shared fixtures for provider tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use enrolkey_core::{
    Account, AccountDraft, AccountId, AccountProvisioner, AccountStore, CourseId,
    CourseOfferRepository, EnrolKeyAuth, EnrolmentApplier, Error, Event, EventSink, GroupId,
    GroupSecret, GroupSecretRepository, MatchedOffer, Notifier, OfferId, OfferScope,
    RegistrationRequest, Result, SelfEnrolmentOffer, SignupPolicy,
};

/// Host stand-in holding everything in memory
#[derive(Default)]
pub struct MemoryHost {
    pub accounts: RwLock<Vec<(Account, String)>>,
    pub offers: Vec<SelfEnrolmentOffer>,
    pub groups: Vec<GroupSecret>,
    /// Offers whose admission check fails
    pub closed: HashSet<OfferId>,
    /// Offers whose application fails after admission
    pub broken: HashSet<OfferId>,
    pub enrolments: RwLock<Vec<(AccountId, OfferId, Option<GroupId>, String)>>,
    /// Makes create_account fail
    pub reject_accounts: bool,
}

impl MemoryHost {
    pub fn course_offer(mut self, id: u64, course: u64, secret: &str) -> Self {
        self.offers.push(SelfEnrolmentOffer {
            offer_id: OfferId(id),
            course_id: CourseId(course),
            expected_secret: secret.to_string(),
            scope: OfferScope::Course,
        });
        self
    }

    pub fn group_offer(mut self, id: u64, course: u64) -> Self {
        self.offers.push(SelfEnrolmentOffer {
            offer_id: OfferId(id),
            course_id: CourseId(course),
            expected_secret: String::new(),
            scope: OfferScope::Group,
        });
        self
    }

    pub fn group(mut self, id: u64, course: u64, secret: &str) -> Self {
        self.groups.push(GroupSecret {
            group_id: GroupId(id),
            course_id: CourseId(course),
            secret: secret.to_string(),
        });
        self
    }

    pub fn closed(mut self, id: u64) -> Self {
        self.closed.insert(OfferId(id));
        self
    }

    pub fn broken(mut self, id: u64) -> Self {
        self.broken.insert(OfferId(id));
        self
    }

    pub fn account_count(&self) -> usize {
        self.accounts.read().unwrap().len()
    }

    pub fn account(&self, username: &str) -> Option<Account> {
        self.get_account_by_username(username).unwrap()
    }

    pub fn enrolled_offers(&self, account: AccountId) -> Vec<OfferId> {
        self.enrolments
            .read()
            .unwrap()
            .iter()
            .filter(|(a, ..)| *a == account)
            .map(|(_, o, ..)| *o)
            .collect()
    }

    /// Insert an account directly, bypassing signup
    pub fn insert_account(&self, username: &str, auth_type: &str, confirmed: bool) -> AccountId {
        let mut accounts = self.accounts.write().unwrap();
        let id = AccountId(accounts.len() as u64 + 1);
        accounts.push((
            Account {
                id,
                username: username.to_string(),
                email: format!("{}@example.com", username),
                auth_type: auth_type.to_string(),
                confirmed,
                secret: format!("secret-{}", username),
                profile: BTreeMap::new(),
            },
            "hashed:password1".to_string(),
        ));
        id
    }
}

impl CourseOfferRepository for MemoryHost {
    fn offers_with_secret(&self, secret: &str) -> Result<Vec<SelfEnrolmentOffer>> {
        Ok(self
            .offers
            .iter()
            .filter(|o| o.scope == OfferScope::Course && o.expected_secret == secret)
            .cloned()
            .collect())
    }
}

impl GroupSecretRepository for MemoryHost {
    fn group_offers_with_secret(
        &self,
        secret: &str,
    ) -> Result<Vec<(SelfEnrolmentOffer, GroupSecret)>> {
        let mut out = Vec::new();
        for group in self.groups.iter().filter(|g| g.secret == secret) {
            for offer in self
                .offers
                .iter()
                .filter(|o| o.scope == OfferScope::Group && o.course_id == group.course_id)
            {
                out.push((offer.clone(), group.clone()));
            }
        }
        Ok(out)
    }
}

impl AccountProvisioner for MemoryHost {
    fn create_account(&self, draft: AccountDraft) -> Result<AccountId> {
        if self.reject_accounts {
            return Err(Error::Store("disk full".to_string()));
        }
        let mut accounts = self.accounts.write().unwrap();
        if accounts.iter().any(|(a, _)| a.username == draft.username) {
            return Err(Error::UsernameTaken);
        }
        let id = AccountId(accounts.len() as u64 + 1);
        accounts.push((
            Account {
                id,
                username: draft.username,
                email: draft.email,
                auth_type: draft.auth_type,
                confirmed: draft.confirmed,
                secret: draft.secret,
                profile: draft.profile,
            },
            // Stands in for a hash
            format!("hashed:{}", draft.password),
        ));
        Ok(id)
    }
}

impl AccountStore for MemoryHost {
    fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .unwrap()
            .iter()
            .find(|(a, _)| a.id == id)
            .map(|(a, _)| a.clone()))
    }

    fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .unwrap()
            .iter()
            .find(|(a, _)| a.username == username)
            .map(|(a, _)| a.clone()))
    }

    fn set_confirmed(&self, id: AccountId, confirmed: bool) -> Result<()> {
        let mut accounts = self.accounts.write().unwrap();
        let (account, _) = accounts
            .iter_mut()
            .find(|(a, _)| a.id == id)
            .ok_or(Error::AccountNotFound)?;
        account.confirmed = confirmed;
        Ok(())
    }

    fn check_password(&self, id: AccountId, password: &str) -> Result<bool> {
        let accounts = self.accounts.read().unwrap();
        let (_, hash) = accounts
            .iter()
            .find(|(a, _)| a.id == id)
            .ok_or(Error::AccountNotFound)?;
        Ok(*hash == format!("hashed:{}", password))
    }

    fn set_password(&self, id: AccountId, password: &str) -> Result<()> {
        let mut accounts = self.accounts.write().unwrap();
        let (_, hash) = accounts
            .iter_mut()
            .find(|(a, _)| a.id == id)
            .ok_or(Error::AccountNotFound)?;
        *hash = format!("hashed:{}", password);
        Ok(())
    }
}

impl EnrolmentApplier for MemoryHost {
    fn can_self_enrol(&self, offer: &MatchedOffer) -> bool {
        !self.closed.contains(&offer.offer_id())
    }

    fn apply_enrolment(&self, offer: &MatchedOffer, account: AccountId) -> Result<()> {
        if self.broken.contains(&offer.offer_id()) {
            return Err(Error::Enrolment {
                offer: offer.offer_id(),
                reason: "enrolment plugin error".to_string(),
            });
        }
        self.enrolments.write().unwrap().push((
            account,
            offer.offer_id(),
            offer.group_id,
            offer.secret_used.clone(),
        ));
        Ok(())
    }
}

/// Notifier that records recipients, or fails on demand
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Secret sent to a username, if any
    pub fn secret_for(&self, username: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .find(|(u, _)| u == username)
            .map(|(_, s)| s.clone())
    }
}

impl Notifier for RecordingNotifier {
    fn send_confirmation(&self, account: &Account) -> std::result::Result<(), String> {
        if self.fail {
            return Err("smtp unreachable".to_string());
        }
        self.sent
            .write()
            .unwrap()
            .push((account.username.clone(), account.secret.clone()));
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct RecordingEvents(pub Arc<RwLock<Vec<Event>>>);

impl RecordingEvents {
    pub fn all(&self) -> Vec<Event> {
        self.0.read().unwrap().clone()
    }
}

impl EventSink for RecordingEvents {
    fn emit(&self, event: Event) {
        self.0.write().unwrap().push(event);
    }
}

pub type TestAuth = EnrolKeyAuth<MemoryHost, RecordingNotifier, RecordingEvents>;

pub fn provider(
    host: MemoryHost,
    policy: SignupPolicy,
) -> (TestAuth, Arc<MemoryHost>, RecordingNotifier, RecordingEvents) {
    let host = Arc::new(host);
    let notifier = RecordingNotifier::default();
    let events = RecordingEvents::default();
    let auth = EnrolKeyAuth::new(host.clone(), notifier.clone(), events.clone(), policy);
    (auth, host, notifier, events)
}

pub fn signup_request(username: &str, token: &str) -> RegistrationRequest {
    let mut profile = BTreeMap::new();
    profile.insert("firstname".to_string(), "Test".to_string());
    RegistrationRequest {
        username: username.to_string(),
        password: "password1".to_string(),
        email: format!("{}@example.com", username),
        signup_token: token.to_string(),
        profile,
    }
}
