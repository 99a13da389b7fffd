//! Enrolment-Key Core Library
//!
//! Self-registration gated by an enrolment key:
//! - A signup token is matched against course-wide and group-scoped
//!   self-enrolment offers
//! - Every matched offer the host still admits is applied to the new account
//! - Accounts can be confirmed later with a per-account secret

pub mod confirmation;
pub mod context;
pub mod enrolment;
pub mod error;
pub mod events;
pub mod provider;
pub mod repository;
pub mod resolver;
pub mod types;

pub use confirmation::{confirm_account, ConfirmOutcome};
pub use context::RequestContext;
pub use enrolment::{apply_offers, AppliedOffers, EnrolmentApplier};
pub use error::{Error, SignupError};
pub use events::{Event, EventSink};
pub use provider::{AuthProvider, EnrolKeyAuth, Notifier, SignupOutcome, SignupPolicy};
pub use repository::{
    AccountProvisioner, AccountStore, CourseOfferRepository, GroupSecretRepository, Host,
};
pub use resolver::KeyResolver;
pub use types::{
    Account, AccountDraft, AccountId, CourseId, GroupId, GroupSecret, MatchedOffer, OfferId,
    OfferScope, RegistrationRequest, SelfEnrolmentOffer, UnknownScope, AUTH_TYPE,
};

/// Result type for enrolkey-core operations
pub type Result<T> = std::result::Result<T, Error>;
