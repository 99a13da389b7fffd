//! Email sending abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleEmailSender;
pub use smtp::{SmtpConfig, SmtpEmailSender};

use enrolkey_core::{Account, Notifier};

/// Trait for sending account confirmation emails
pub trait EmailSender: Send + Sync {
    /// Send the confirmation link for a new account
    fn send_confirmation(&self, email: &str, username: &str, link: &str) -> Result<(), String>;
}

/// Allow using Box<dyn EmailSender> as an EmailSender
impl EmailSender for Box<dyn EmailSender> {
    fn send_confirmation(&self, email: &str, username: &str, link: &str) -> Result<(), String> {
        (**self).send_confirmation(email, username, link)
    }
}

/// Build the link a new account follows to confirm itself.
///
/// Both parts are percent-encoded; only the separating `/` stays literal.
pub fn confirmation_link(public_url: &str, secret: &str, username: &str) -> String {
    format!(
        "{}/confirm?data={}/{}",
        public_url.trim_end_matches('/'),
        urlencoding::encode(secret),
        urlencoding::encode(username)
    )
}

/// Delivers signup confirmations through an [`EmailSender`]
pub struct MailNotifier<E> {
    sender: E,
    public_url: String,
}

impl<E: EmailSender> MailNotifier<E> {
    pub fn new(sender: E, public_url: impl Into<String>) -> Self {
        Self {
            sender,
            public_url: public_url.into(),
        }
    }
}

impl<E: EmailSender> Notifier for MailNotifier<E> {
    fn send_confirmation(&self, account: &Account) -> Result<(), String> {
        let link = confirmation_link(&self.public_url, &account.secret, &account.username);
        self.sender
            .send_confirmation(&account.email, &account.username, &link)
    }
}
