//! Console-based email sender for development

use super::EmailSender;

/// Email sender that logs to console (for development)
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailSender for ConsoleEmailSender {
    fn send_confirmation(&self, email: &str, username: &str, link: &str) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  CONFIRM ACCOUNT {} <{}>", username, email);
        println!("  LINK: {}", link);
        println!("========================================");
        println!();

        tracing::info!(email = %email, username = %username, "Confirmation link sent");

        Ok(())
    }
}
