//! Host collaborator interfaces
//!
//! Accounts, offers and groups are owned by the host. The core reaches them
//! only through these traits.

use crate::enrolment::EnrolmentApplier;
use crate::types::{Account, AccountDraft, AccountId, GroupSecret, SelfEnrolmentOffer};
use crate::Result;

/// Course-wide self-enrolment offers
pub trait CourseOfferRepository: Send + Sync {
    /// Course-scoped offers whose `expected_secret` equals `secret` exactly
    fn offers_with_secret(&self, secret: &str) -> Result<Vec<SelfEnrolmentOffer>>;
}

/// Group secrets joined against group-scoped offers
pub trait GroupSecretRepository: Send + Sync {
    /// Pairs of (group-scoped offer, group) where the group's secret equals
    /// `secret` exactly and the group belongs to the offer's course
    fn group_offers_with_secret(
        &self,
        secret: &str,
    ) -> Result<Vec<(SelfEnrolmentOffer, GroupSecret)>>;
}

/// Creates accounts atomically
pub trait AccountProvisioner: Send + Sync {
    /// Hash the password, assign an id and persist the account with its
    /// profile fields. Nothing is stored when this fails.
    fn create_account(&self, draft: AccountDraft) -> Result<AccountId>;
}

/// Account lookups and updates
pub trait AccountStore: Send + Sync {
    fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    fn get_account_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// Flip the confirmed flag
    fn set_confirmed(&self, id: AccountId, confirmed: bool) -> Result<()>;

    /// Check a plaintext password against the stored hash
    fn check_password(&self, id: AccountId, password: &str) -> Result<bool>;

    /// Hash and store a new password
    fn set_password(&self, id: AccountId, password: &str) -> Result<()>;
}

/// Everything the provider needs from the host's persistence layer
pub trait Host:
    AccountProvisioner + AccountStore + CourseOfferRepository + GroupSecretRepository + EnrolmentApplier
{
}

impl<T> Host for T where
    T: AccountProvisioner
        + AccountStore
        + CourseOfferRepository
        + GroupSecretRepository
        + EnrolmentApplier
{
}
