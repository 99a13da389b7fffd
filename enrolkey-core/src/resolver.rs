//! Enrolment-key resolution
//!
//! A signup token unlocks every offer whose secret it equals: course-wide
//! offers first, then group-scoped offers through their groups' secrets.

use crate::repository::{CourseOfferRepository, GroupSecretRepository};
use crate::types::MatchedOffer;
use crate::Result;

/// Resolves a signup token into the offers it unlocks
pub struct KeyResolver<'a, C: ?Sized, G: ?Sized> {
    courses: &'a C,
    groups: &'a G,
}

impl<'a, C, G> KeyResolver<'a, C, G>
where
    C: CourseOfferRepository + ?Sized,
    G: GroupSecretRepository + ?Sized,
{
    pub fn new(courses: &'a C, groups: &'a G) -> Self {
        Self { courses, groups }
    }

    /// Every offer the token matches, direct course matches before group
    /// matches, in discovery order. Duplicates across the two passes are
    /// kept. An empty result is not an error.
    pub fn resolve_offers(&self, token: &str) -> Result<Vec<MatchedOffer>> {
        let mut matched: Vec<MatchedOffer> = self
            .courses
            .offers_with_secret(token)?
            .into_iter()
            .map(MatchedOffer::direct)
            .collect();
        let direct = matched.len();

        matched.extend(
            self.groups
                .group_offers_with_secret(token)?
                .into_iter()
                .map(|(offer, group)| MatchedOffer::via_group(offer, group)),
        );

        tracing::debug!(
            direct,
            via_group = matched.len() - direct,
            "Resolved enrolment key"
        );

        Ok(matched)
    }
}
