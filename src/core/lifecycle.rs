//! Status lifecycle rules.
//!
//! Every status mutation in the crate goes through one of the validators below
//! before it is written. Setting a request or subscription status to its
//! current value is accepted and treated as a no-op by callers. A repeated
//! admin review is not: approved and rejected partners stay where they are.
//!
//! Waste requests move strictly forward one step at a time:
//! `assigned -> accepted -> in_progress -> completed`.
//!
//! Partner verification starts at `pending` and ends at `approved` or
//! `rejected`. The only way out of `rejected` is a document resubmission,
//! which puts the partner back to `pending`.

use crate::{
    entities::{RequestStatus, SubscriptionStatus, VerificationStatus},
    errors::{Error, Result},
};

/// Who is asking for a verification change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationTrigger {
    /// An admin reviewed the partner
    AdminReview,
    /// The partner uploaded a new document
    DocumentResubmission,
}

const fn request_successor(status: RequestStatus) -> Option<RequestStatus> {
    match status {
        RequestStatus::Assigned => Some(RequestStatus::Accepted),
        RequestStatus::Accepted => Some(RequestStatus::InProgress),
        RequestStatus::InProgress => Some(RequestStatus::Completed),
        RequestStatus::Completed => None,
    }
}

/// Validates a waste-request status change.
///
/// Leaving `assigned` requires a partner on the request.
pub fn validate_request_transition(
    from: RequestStatus,
    to: RequestStatus,
    has_partner: bool,
) -> Result<()> {
    if from == to {
        return Ok(());
    }

    if request_successor(from) != Some(to) {
        return Err(Error::InvalidTransition {
            entity: "waste request",
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    if from == RequestStatus::Assigned && !has_partner {
        return Err(Error::Validation {
            message: "A partner must be assigned before the request can be accepted".to_string(),
        });
    }

    Ok(())
}

/// Returns true while a request may still be handed to a different partner.
#[must_use]
pub const fn can_reassign(status: RequestStatus) -> bool {
    matches!(status, RequestStatus::Assigned | RequestStatus::Accepted)
}

/// Validates a partner verification change.
pub fn validate_verification_transition(
    from: VerificationStatus,
    to: VerificationStatus,
    trigger: VerificationTrigger,
) -> Result<()> {
    if from == to && trigger == VerificationTrigger::DocumentResubmission {
        return Ok(());
    }

    let allowed = matches!(
        (from, to, trigger),
        (
            VerificationStatus::Pending,
            VerificationStatus::Approved | VerificationStatus::Rejected,
            VerificationTrigger::AdminReview,
        ) | (
            VerificationStatus::Rejected,
            VerificationStatus::Pending,
            VerificationTrigger::DocumentResubmission,
        )
    );

    if allowed {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            entity: "partner verification",
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Validates a subscription status change.
///
/// `None` means the partner never subscribed. Activation is accepted from any
/// state (renewal or a new plan); expiry and cancellation need an active one.
pub fn validate_subscription_transition(
    from: Option<SubscriptionStatus>,
    to: SubscriptionStatus,
) -> Result<()> {
    match (from, to) {
        (_, SubscriptionStatus::Active)
        | (
            Some(SubscriptionStatus::Active),
            SubscriptionStatus::Expired | SubscriptionStatus::Cancelled,
        ) => Ok(()),
        (from, to) => Err(Error::InvalidTransition {
            entity: "subscription",
            from: from.map_or_else(|| "none".to_string(), |s| s.to_string()),
            to: to.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_forward_steps() {
        assert!(
            validate_request_transition(RequestStatus::Assigned, RequestStatus::Accepted, true)
                .is_ok()
        );
        assert!(
            validate_request_transition(RequestStatus::Accepted, RequestStatus::InProgress, true)
                .is_ok()
        );
        assert!(
            validate_request_transition(RequestStatus::InProgress, RequestStatus::Completed, true)
                .is_ok()
        );
    }

    #[test]
    fn test_request_skipping_and_backwards_rejected() {
        let skip =
            validate_request_transition(RequestStatus::Assigned, RequestStatus::Completed, true);
        assert!(matches!(skip, Err(Error::InvalidTransition { .. })));

        let back =
            validate_request_transition(RequestStatus::Completed, RequestStatus::Accepted, true);
        assert!(matches!(back, Err(Error::InvalidTransition { .. })));
    }

    #[test]
    fn test_request_same_status_is_noop() {
        assert!(
            validate_request_transition(RequestStatus::Completed, RequestStatus::Completed, true)
                .is_ok()
        );
    }

    #[test]
    fn test_accept_requires_partner() {
        let result =
            validate_request_transition(RequestStatus::Assigned, RequestStatus::Accepted, false);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_can_reassign() {
        assert!(can_reassign(RequestStatus::Assigned));
        assert!(can_reassign(RequestStatus::Accepted));
        assert!(!can_reassign(RequestStatus::InProgress));
        assert!(!can_reassign(RequestStatus::Completed));
    }

    #[test]
    fn test_verification_review_from_pending() {
        for to in [VerificationStatus::Approved, VerificationStatus::Rejected] {
            assert!(
                validate_verification_transition(
                    VerificationStatus::Pending,
                    to,
                    VerificationTrigger::AdminReview
                )
                .is_ok()
            );
        }
    }

    #[test]
    fn test_rejected_partner_cannot_be_reapproved_directly() {
        let result = validate_verification_transition(
            VerificationStatus::Rejected,
            VerificationStatus::Approved,
            VerificationTrigger::AdminReview,
        );
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
    }

    #[test]
    fn test_resubmission_reopens_rejected_partner() {
        assert!(
            validate_verification_transition(
                VerificationStatus::Rejected,
                VerificationStatus::Pending,
                VerificationTrigger::DocumentResubmission
            )
            .is_ok()
        );
        // An admin cannot push a partner back to pending
        assert!(
            validate_verification_transition(
                VerificationStatus::Rejected,
                VerificationStatus::Pending,
                VerificationTrigger::AdminReview
            )
            .is_err()
        );
    }

    #[test]
    fn test_approved_is_terminal() {
        let result = validate_verification_transition(
            VerificationStatus::Approved,
            VerificationStatus::Rejected,
            VerificationTrigger::AdminReview,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_repeated_admin_review_rejected() {
        for status in [VerificationStatus::Approved, VerificationStatus::Rejected] {
            let result =
                validate_verification_transition(status, status, VerificationTrigger::AdminReview);
            assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        }
    }

    #[test]
    fn test_subscription_transitions() {
        assert!(validate_subscription_transition(None, SubscriptionStatus::Active).is_ok());
        assert!(
            validate_subscription_transition(
                Some(SubscriptionStatus::Expired),
                SubscriptionStatus::Active
            )
            .is_ok()
        );
        assert!(
            validate_subscription_transition(
                Some(SubscriptionStatus::Active),
                SubscriptionStatus::Cancelled
            )
            .is_ok()
        );
        assert!(validate_subscription_transition(None, SubscriptionStatus::Cancelled).is_err());
        assert!(
            validate_subscription_transition(
                Some(SubscriptionStatus::Cancelled),
                SubscriptionStatus::Expired
            )
            .is_err()
        );
    }
}
