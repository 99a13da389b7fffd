//! Storage for accounts, the enrolment catalog and sessions

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use models::*;
pub use sqlite::SqliteStore;

use enrolkey_core::{AccountId, CourseId, GroupId, Host, OfferId};

/// Result type for store operations
pub type StoreResult<T> = enrolkey_core::Result<T>;

/// Trait for session storage
pub trait SessionStore: Send + Sync {
    /// Create a new session for an account
    fn create_session(&self, account: AccountId) -> StoreResult<Session>;

    /// Get a session by ID
    fn get_session(&self, session_id: &SessionId) -> StoreResult<Option<Session>>;

    /// Delete a session
    fn delete_session(&self, session_id: &SessionId) -> StoreResult<()>;
}

/// Courses, offers and groups as configured on the host
pub trait CatalogStore: Send + Sync {
    fn add_course(&self, name: &str) -> StoreResult<CourseId>;

    fn get_course(&self, id: CourseId) -> StoreResult<Option<Course>>;

    fn add_offer(&self, settings: OfferSettings) -> StoreResult<OfferId>;

    fn get_offer(&self, id: OfferId) -> StoreResult<Option<OfferRecord>>;

    /// Add a group carrying its own enrolment secret
    fn add_group(&self, course_id: CourseId, name: &str, secret: &str) -> StoreResult<GroupId>;

    /// Enrolments of an account, oldest first
    fn list_enrolments(&self, account: AccountId) -> StoreResult<Vec<Enrolment>>;

    fn group_members(&self, group: GroupId) -> StoreResult<Vec<AccountId>>;
}

/// Everything the server needs from one backing store
pub trait Store: Host + SessionStore + CatalogStore + 'static {}

impl<T> Store for T where T: Host + SessionStore + CatalogStore + 'static {}
