//! Server configuration

use enrolkey_core::SignupPolicy;

use crate::email::SmtpConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// SQLite database path; in-memory stores when unset
    pub db_path: Option<String>,

    /// New accounts start unconfirmed and receive a confirmation link
    pub require_confirmation: bool,

    /// Refuse signups whose token unlocks no offer
    pub require_key: bool,

    /// Base URL used when building confirmation links
    pub public_url: String,

    /// SMTP configuration; console output when unset
    pub smtp: Option<SmtpConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            db_path: None,
            require_confirmation: false,
            require_key: false,
            public_url: "http://localhost:3000".to_string(),
            smtp: None,
        }
    }
}

impl Config {
    /// Create config from environment variables
    ///
    /// - ENROLKEY_PORT (default: 3000)
    /// - ENROLKEY_DB
    /// - ENROLKEY_REQUIRE_CONFIRMATION (default: false)
    /// - ENROLKEY_REQUIRE_KEY (default: false)
    /// - ENROLKEY_PUBLIC_URL (default: http://localhost:3000)
    /// - SMTP_* (see [`SmtpConfig::from_env`])
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|s| !s.is_empty());
        let defaults = Self::default();

        Self {
            port: get("ENROLKEY_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            db_path: get("ENROLKEY_DB"),
            require_confirmation: get("ENROLKEY_REQUIRE_CONFIRMATION")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.require_confirmation),
            require_key: get("ENROLKEY_REQUIRE_KEY")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.require_key),
            public_url: get("ENROLKEY_PUBLIC_URL").unwrap_or(defaults.public_url),
            smtp: SmtpConfig::from_lookup(&lookup),
        }
    }

    pub fn policy(&self) -> SignupPolicy {
        SignupPolicy {
            require_confirmation: self.require_confirmation,
            require_key: self.require_key,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
