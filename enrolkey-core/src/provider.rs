//! The enrolment-key auth provider
//!
//! Signup runs in a fixed order: validate, provision the account, resolve the
//! enrolment key, apply every admitted offer, then send the confirmation
//! email when the policy asks for one.

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::confirmation::{confirm_account, ConfirmOutcome};
use crate::context::RequestContext;
use crate::enrolment::{apply_offers, AppliedOffers};
use crate::error::SignupError;
use crate::events::{Event, EventSink};
use crate::repository::Host;
use crate::resolver::KeyResolver;
use crate::types::{Account, AccountDraft, AccountId, MatchedOffer, RegistrationRequest, AUTH_TYPE};
use crate::{Error, Result};

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length
pub const MAX_PASSWORD_LENGTH: usize = 80;

/// Length of generated confirmation secrets
const SECRET_LENGTH: usize = 15;

/// Capability interface of an authentication plugin
pub trait AuthProvider {
    /// Auth type stamped on accounts this provider owns
    fn auth_type(&self) -> &str;

    fn can_signup(&self) -> bool {
        true
    }

    fn can_confirm(&self) -> bool {
        true
    }

    /// Passwords are stored by the host
    fn is_internal(&self) -> bool {
        true
    }

    fn can_change_password(&self) -> bool {
        true
    }

    fn can_reset_password(&self) -> bool {
        true
    }

    /// Check credentials. Unknown accounts, foreign auth types, unconfirmed
    /// accounts and wrong passwords all yield `false`.
    fn user_login(&self, username: &str, password: &str) -> Result<bool>;

    fn user_update_password(
        &self,
        account: AccountId,
        new_password: &str,
    ) -> std::result::Result<(), SignupError>;

    fn user_signup(
        &self,
        ctx: &mut RequestContext,
        request: RegistrationRequest,
    ) -> std::result::Result<SignupOutcome, SignupError>;

    fn user_confirm(&self, username: &str, secret: &str) -> Result<ConfirmOutcome>;
}

/// Sends the confirmation email for a freshly created account
pub trait Notifier: Send + Sync {
    fn send_confirmation(&self, account: &Account) -> std::result::Result<(), String>;
}

/// Signup switches
#[derive(Debug, Clone, Copy, Default)]
pub struct SignupPolicy {
    /// New accounts start unconfirmed and receive a confirmation email
    pub require_confirmation: bool,
    /// Reject tokens that unlock nothing, before any account is created
    pub require_key: bool,
}

/// Result of a completed signup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupOutcome {
    pub account: AccountId,
    pub applied: AppliedOffers,
    /// A confirmation email was sent and the account awaits confirmation
    pub confirmation_pending: bool,
}

/// Self-registration gated by an enrolment key
pub struct EnrolKeyAuth<H, N, V> {
    host: Arc<H>,
    notifier: N,
    events: V,
    policy: SignupPolicy,
}

impl<H, N, V> EnrolKeyAuth<H, N, V>
where
    H: Host,
    N: Notifier,
    V: EventSink,
{
    pub fn new(host: Arc<H>, notifier: N, events: V, policy: SignupPolicy) -> Self {
        Self {
            host,
            notifier,
            events,
            policy,
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn policy(&self) -> SignupPolicy {
        self.policy
    }

    /// Offers the token unlocks, without side effects
    pub fn resolve_offers(&self, token: &str) -> Result<Vec<MatchedOffer>> {
        KeyResolver::new(self.host.as_ref(), self.host.as_ref()).resolve_offers(token)
    }
}

impl<H, N, V> AuthProvider for EnrolKeyAuth<H, N, V>
where
    H: Host,
    N: Notifier,
    V: EventSink,
{
    fn auth_type(&self) -> &str {
        AUTH_TYPE
    }

    fn user_login(&self, username: &str, password: &str) -> Result<bool> {
        let Some(account) = self.host.get_account_by_username(username)? else {
            return Ok(false);
        };
        if account.auth_type != AUTH_TYPE || !account.confirmed {
            return Ok(false);
        }
        self.host.check_password(account.id, password)
    }

    fn user_update_password(
        &self,
        account: AccountId,
        new_password: &str,
    ) -> std::result::Result<(), SignupError> {
        validate_password(new_password)?;
        self.host.set_password(account, new_password)?;
        Ok(())
    }

    fn user_signup(
        &self,
        ctx: &mut RequestContext,
        request: RegistrationRequest,
    ) -> std::result::Result<SignupOutcome, SignupError> {
        validate_request(&request)?;

        // An empty token unlocks nothing, even groups stored without a key
        let has_token = !request.signup_token.is_empty();

        let prefetched = if self.policy.require_key {
            let matched = if has_token {
                self.resolve_offers(&request.signup_token)?
            } else {
                Vec::new()
            };
            if matched.is_empty() {
                return Err(SignupError::InvalidKey);
            }
            Some(matched)
        } else {
            None
        };

        let draft = AccountDraft {
            username: request.username.clone(),
            password: request.password,
            email: request.email,
            auth_type: AUTH_TYPE.to_string(),
            confirmed: !self.policy.require_confirmation,
            secret: generate_confirmation_secret(),
            profile: request.profile,
        };
        let account_id = self
            .host
            .create_account(draft)
            .map_err(SignupError::Provisioning)?;

        tracing::info!(account = %account_id, username = %request.username, "Account created");
        self.events.emit(Event::AccountCreated {
            account: account_id,
            username: request.username,
        });
        ctx.authenticate(account_id);

        let matched = match prefetched {
            Some(matched) => matched,
            None if has_token => self.resolve_offers(&request.signup_token)?,
            None => Vec::new(),
        };
        let applied = apply_offers(self.host.as_ref(), account_id, &matched);
        tracing::info!(
            account = %account_id,
            matched = matched.len(),
            applied = applied.len(),
            "Enrolment key processed"
        );
        self.events.emit(Event::EnrolmentsApplied {
            account: account_id,
            offers: applied.0.clone(),
        });

        if self.policy.require_confirmation {
            let account = self
                .host
                .get_account(account_id)?
                .ok_or(Error::AccountNotFound)?;
            self.notifier
                .send_confirmation(&account)
                .map_err(|reason| SignupError::Notification {
                    account_id,
                    reason,
                })?;
        }

        Ok(SignupOutcome {
            account: account_id,
            applied,
            confirmation_pending: self.policy.require_confirmation,
        })
    }

    fn user_confirm(&self, username: &str, secret: &str) -> Result<ConfirmOutcome> {
        confirm_account(self.host.as_ref(), AUTH_TYPE, username, secret)
    }
}

/// Enforce password length limits
pub fn validate_password(password: &str) -> std::result::Result<(), SignupError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(SignupError::PasswordTooShort);
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(SignupError::PasswordTooLong);
    }
    Ok(())
}

fn validate_request(request: &RegistrationRequest) -> std::result::Result<(), SignupError> {
    if request.username.is_empty() || request.username.chars().any(char::is_whitespace) {
        return Err(SignupError::Validation("invalid username".to_string()));
    }

    match request.email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(SignupError::Validation("invalid email".to_string())),
    }

    validate_password(&request.password)
}

/// Random alphanumeric secret for the confirmation link
pub fn generate_confirmation_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}
