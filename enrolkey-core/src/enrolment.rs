//! Applying matched offers to a new account

use std::fmt;

use crate::types::{AccountId, MatchedOffer, OfferId};
use crate::Result;

/// The host's self-enrolment plugin
pub trait EnrolmentApplier: Send + Sync {
    /// Whether the offer currently admits self-enrolment (window open,
    /// capacity left, instance enabled)
    fn can_self_enrol(&self, offer: &MatchedOffer) -> bool;

    /// Enrol the account using the matched secret
    fn apply_enrolment(&self, offer: &MatchedOffer, account: AccountId) -> Result<()>;
}

/// Ids of the offers actually applied, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedOffers(pub Vec<OfferId>);

impl AppliedOffers {
    pub fn ids(&self) -> &[OfferId] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Parse a comma-joined id list, ignoring blank and malformed entries
    pub fn parse(list: &str) -> Self {
        Self(
            list.split(',')
                .filter_map(|s| s.trim().parse().ok())
                .map(OfferId)
                .collect(),
        )
    }
}

/// Comma-joined, as carried by the results view
impl fmt::Display for AppliedOffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}", id)?;
            first = false;
        }
        Ok(())
    }
}

/// Apply every matched offer the host admits.
///
/// Offers are independent: a refused admission or a failed application is
/// logged and skipped, and the remaining offers are still attempted.
pub fn apply_offers<A>(applier: &A, account: AccountId, matched: &[MatchedOffer]) -> AppliedOffers
where
    A: EnrolmentApplier + ?Sized,
{
    let mut applied = Vec::with_capacity(matched.len());

    for offer in matched {
        let offer_id = offer.offer_id();

        if !applier.can_self_enrol(offer) {
            tracing::warn!(%offer_id, %account, "Self-enrolment not admitted, skipping offer");
            continue;
        }

        match applier.apply_enrolment(offer, account) {
            Ok(()) => {
                tracing::info!(%offer_id, %account, group = ?offer.group_id, "Enrolment applied");
                applied.push(offer_id);
            }
            Err(e) => {
                tracing::warn!(%offer_id, %account, error = %e, "Enrolment failed, skipping offer");
            }
        }
    }

    AppliedOffers(applied)
}
