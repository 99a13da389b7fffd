//! Data model for enrolment-key signup

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Auth type recorded on every account this provider creates
pub const AUTH_TYPE: &str = "enrolkey";

/// Unique account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub u64);

/// Identifier of a self-enrolment offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the secret of a self-enrolment offer lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferScope {
    /// The course-wide secret is stored on the offer itself
    Course,
    /// Each group of the course carries its own secret
    Group,
}

impl OfferScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferScope::Course => "course",
            OfferScope::Group => "group",
        }
    }

}

/// A scope string that names neither `course` nor `group`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown offer scope: {0}")]
pub struct UnknownScope(pub String);

impl FromStr for OfferScope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "course" => Ok(OfferScope::Course),
            "group" => Ok(OfferScope::Group),
            other => Err(UnknownScope(other.to_string())),
        }
    }
}

/// A configured self-enrolment instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfEnrolmentOffer {
    pub offer_id: OfferId,
    pub course_id: CourseId,
    /// Course-wide secret; unused for group-scoped offers
    pub expected_secret: String,
    pub scope: OfferScope,
}

/// A group's enrolment secret, associated to offers by course id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSecret {
    pub group_id: GroupId,
    pub course_id: CourseId,
    pub secret: String,
}

/// An offer unlocked by a signup token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedOffer {
    pub offer: SelfEnrolmentOffer,
    /// The secret to hand to the enrolment plugin
    pub secret_used: String,
    /// Set when the match came through a group secret
    pub group_id: Option<GroupId>,
}

impl MatchedOffer {
    pub fn direct(offer: SelfEnrolmentOffer) -> Self {
        let secret_used = offer.expected_secret.clone();
        Self {
            offer,
            secret_used,
            group_id: None,
        }
    }

    pub fn via_group(offer: SelfEnrolmentOffer, group: GroupSecret) -> Self {
        Self {
            offer,
            secret_used: group.secret,
            group_id: Some(group.group_id),
        }
    }

    pub fn offer_id(&self) -> OfferId {
        self.offer.offer_id
    }
}

/// A signup submission
#[derive(Clone, Deserialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub signup_token: String,
    #[serde(default)]
    pub profile: BTreeMap<String, String>,
}

// Keeps the plaintext password out of logs.
impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

/// Account record handed to the provisioner
#[derive(Clone)]
pub struct AccountDraft {
    pub username: String,
    /// Plaintext; the provisioner hashes it before storage
    pub password: String,
    pub email: String,
    pub auth_type: String,
    pub confirmed: bool,
    /// Confirmation secret
    pub secret: String,
    pub profile: BTreeMap<String, String>,
}

impl fmt::Debug for AccountDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountDraft")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("auth_type", &self.auth_type)
            .field("confirmed", &self.confirmed)
            .finish_non_exhaustive()
    }
}

/// A stored account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub auth_type: String,
    pub confirmed: bool,
    pub secret: String,
    pub profile: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse() {
        assert_eq!("course".parse(), Ok(OfferScope::Course));
        assert_eq!("group".parse(), Ok(OfferScope::Group));
        assert_eq!(
            "Course".parse::<OfferScope>(),
            Err(UnknownScope("Course".to_string()))
        );
        assert_eq!(OfferScope::Group.as_str().parse(), Ok(OfferScope::Group));
    }
}
