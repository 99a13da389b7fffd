//! Per-request context

use crate::types::AccountId;

/// Carried explicitly through a request in place of ambient session state
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    identity: Option<AccountId>,
    under_test: bool,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that never records an authenticated identity
    pub fn for_test() -> Self {
        Self {
            identity: None,
            under_test: true,
        }
    }

    pub fn identity(&self) -> Option<AccountId> {
        self.identity
    }

    pub fn is_under_test(&self) -> bool {
        self.under_test
    }

    /// Record the account the request is now authenticated as.
    /// Ignored for test contexts.
    pub fn authenticate(&mut self, account: AccountId) {
        if self.is_under_test() {
            return;
        }
        self.identity = Some(account);
    }
}
