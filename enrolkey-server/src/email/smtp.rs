//! SMTP delivery of confirmation links

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use super::EmailSender;

/// SMTP relay settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server host (e.g., "smtp.resend.com")
    pub host: String,
    /// SMTP server port (typically 465 for TLS, 587 for STARTTLS)
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password (or API key for services like Resend)
    pub password: String,
    /// From email address
    pub from_email: String,
    /// From name (optional)
    pub from_name: Option<String>,
}

impl SmtpConfig {
    /// Read `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD` and `SMTP_FROM_EMAIL`
    /// (all required) plus `SMTP_PORT` (465) and `SMTP_FROM_NAME`
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `None` unless every required setting is present and non-empty
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|s| !s.is_empty());

        Some(Self {
            host: get("SMTP_HOST")?,
            port: get("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(465),
            username: get("SMTP_USERNAME")?,
            password: get("SMTP_PASSWORD")?,
            from_email: get("SMTP_FROM_EMAIL")?,
            from_name: get("SMTP_FROM_NAME"),
        })
    }

    fn sender_mailbox(&self) -> Result<Mailbox, String> {
        let address = match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_email),
            None => self.from_email.clone(),
        };
        address
            .parse()
            .map_err(|e| format!("Invalid from address: {}", e))
    }
}

/// Build the confirmation email for a new account
pub fn confirmation_message(
    from: Mailbox,
    email: &str,
    username: &str,
    link: &str,
) -> Result<Message, String> {
    let to: Mailbox = email
        .parse()
        .map_err(|e| format!("Invalid to address: {}", e))?;

    let body = format!(
        "Hi {},\n\n\
         A new account has been requested with this email address.\n\n\
         To confirm it, open this link:\n\n{}\n\n\
         If you didn't sign up, you can safely ignore this email.",
        username, link
    );

    Message::builder()
        .from(from)
        .to(to)
        .subject("Confirm your new account")
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|e| format!("Failed to build email: {}", e))
}

/// Sends confirmation emails through an SMTP relay
pub struct SmtpEmailSender {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Connect to the relay; fails if it cannot be reached
    pub fn new(config: SmtpConfig) -> Result<Self, String> {
        let from = config.sender_mailbox()?;
        let creds = Credentials::new(config.username, config.password);

        let transport = SmtpTransport::relay(&config.host)
            .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
            .port(config.port)
            .credentials(creds)
            .build();

        transport
            .test_connection()
            .map_err(|e| format!("SMTP connection test failed: {}", e))?;

        tracing::info!(host = %config.host, port = config.port, "SMTP connection established");

        Ok(Self { transport, from })
    }
}

impl EmailSender for SmtpEmailSender {
    fn send_confirmation(&self, email: &str, username: &str, link: &str) -> Result<(), String> {
        let message = confirmation_message(self.from.clone(), email, username, link)?;

        self.transport
            .send(&message)
            .map_err(|e| format!("Failed to send email: {}", e))?;

        tracing::info!(email = %email, username = %username, "Confirmation email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("SMTP_HOST", "smtp.example.com"),
        ("SMTP_USERNAME", "mailer"),
        ("SMTP_PASSWORD", "hunter22"),
        ("SMTP_FROM_EMAIL", "noreply@example.com"),
    ];

    #[test]
    fn test_config_requires_all_settings() {
        let config = SmtpConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.port, 465);
        assert!(config.from_name.is_none());

        let missing_password: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "SMTP_PASSWORD")
            .collect();
        assert!(SmtpConfig::from_lookup(lookup(&missing_password)).is_none());
    }

    #[test]
    fn test_config_optional_settings() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SMTP_PORT", "587"));
        vars.push(("SMTP_FROM_NAME", "Course Signup"));

        let config = SmtpConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.port, 587);
        let from = config.sender_mailbox().unwrap();
        assert_eq!(from.name.as_deref(), Some("Course Signup"));
        assert_eq!(from.email.to_string(), "noreply@example.com");
    }

    #[test]
    fn test_confirmation_message_carries_link() {
        let from: Mailbox = "noreply@example.com".parse().unwrap();
        let link = "http://localhost:3000/confirm?data=abc/ada";

        let message = confirmation_message(from, "ada@example.com", "ada", link).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("To: ada@example.com"));
        assert!(raw.contains("Subject: Confirm your new account"));
        assert!(raw.contains(link));
    }

    #[test]
    fn test_confirmation_message_rejects_bad_address() {
        let from: Mailbox = "noreply@example.com".parse().unwrap();
        assert!(confirmation_message(from, "not an address", "ada", "link").is_err());
    }
}
