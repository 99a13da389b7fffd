//! Data models for server storage

use chrono::{DateTime, Utc};
use enrolkey_core::{AccountId, CourseId, GroupId, OfferId, OfferScope, SelfEnrolmentOffer};
use serde::{Deserialize, Serialize};

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// A logged-in session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub account: AccountId,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
}

/// A course group with its own enrolment secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub course_id: CourseId,
    pub name: String,
    pub secret: String,
}

/// Settings of a self-enrolment instance on a course
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferSettings {
    pub course_id: CourseId,
    pub scope: OfferScope,
    /// Course-wide secret; empty for group-scoped offers
    pub secret: String,
    pub enabled: bool,
    pub enrol_start: Option<DateTime<Utc>>,
    pub enrol_end: Option<DateTime<Utc>>,
    /// Zero or `None` means unlimited
    pub max_enrolled: Option<u32>,
}

impl OfferSettings {
    /// Enabled course-wide offer with no window or capacity limit
    pub fn course(course_id: CourseId, secret: &str) -> Self {
        Self {
            course_id,
            scope: OfferScope::Course,
            secret: secret.to_string(),
            enabled: true,
            enrol_start: None,
            enrol_end: None,
            max_enrolled: None,
        }
    }

    /// Enabled group-scoped offer; secrets live on the course's groups
    pub fn group(course_id: CourseId) -> Self {
        Self {
            scope: OfferScope::Group,
            secret: String::new(),
            ..Self::course(course_id, "")
        }
    }

    pub fn window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.enrol_start = start;
        self.enrol_end = end;
        self
    }

    pub fn capacity(mut self, max_enrolled: u32) -> Self {
        self.max_enrolled = Some(max_enrolled);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether the instance admits a new enrolment right now
    pub fn admits(&self, enrolled: usize, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        if self.enrol_start.is_some_and(|start| now < start) {
            return false;
        }
        if self.enrol_end.is_some_and(|end| now >= end) {
            return false;
        }
        match self.max_enrolled {
            Some(max) if max > 0 => enrolled < max as usize,
            _ => true,
        }
    }
}

/// A stored offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferRecord {
    pub id: OfferId,
    pub settings: OfferSettings,
}

impl OfferRecord {
    pub fn to_offer(&self) -> SelfEnrolmentOffer {
        SelfEnrolmentOffer {
            offer_id: self.id,
            course_id: self.settings.course_id,
            expected_secret: self.settings.secret.clone(),
            scope: self.settings.scope,
        }
    }
}

/// An applied enrolment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrolment {
    pub offer_id: OfferId,
    pub account: AccountId,
    pub enrolled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_admits_open_offer() {
        let settings = OfferSettings::course(CourseId(1), "key");
        assert!(settings.admits(1000, Utc::now()));
    }

    #[test]
    fn test_disabled_offer_refused() {
        let settings = OfferSettings::course(CourseId(1), "key").disabled();
        assert!(!settings.admits(0, Utc::now()));
    }

    #[test]
    fn test_window_bounds() {
        let now = Utc::now();
        let settings = OfferSettings::course(CourseId(1), "key")
            .window(Some(now - Duration::hours(1)), Some(now + Duration::hours(1)));
        assert!(settings.admits(0, now));
        assert!(!settings.admits(0, now - Duration::hours(2)));
        assert!(!settings.admits(0, now + Duration::hours(1)));
    }

    #[test]
    fn test_capacity() {
        let settings = OfferSettings::course(CourseId(1), "key").capacity(2);
        assert!(settings.admits(1, Utc::now()));
        assert!(!settings.admits(2, Utc::now()));

        let unlimited = OfferSettings::course(CourseId(1), "key").capacity(0);
        assert!(unlimited.admits(50, Utc::now()));
    }
}
