//! Who may do what to a booking.
//!
//! The table is pure: the caller supplies the actor's role, the resolved
//! [`Relationship`], and an [`Action`] carrying whatever booking state the
//! rule depends on.

use crate::errors::LifecycleError;
use crate::lifecycle::resolver::Relationship;
use crate::models::{BookingStatus, PaymentStatus, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    View,
    EditDetails {
        status: BookingStatus,
    },
    Cancel {
        status: BookingStatus,
    },
    ChangeStatus,
    ChangePayment {
        status: BookingStatus,
        payment_status: PaymentStatus,
        owner_payment_used: bool,
        changes_amount: bool,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::View => "VIEW",
            Action::EditDetails { .. } => "EDIT_DETAILS",
            Action::Cancel { .. } => "CANCEL",
            Action::ChangeStatus => "CHANGE_STATUS",
            Action::ChangePayment { .. } => "CHANGE_PAYMENT",
        }
    }
}

pub fn decide(role: Role, rel: &Relationship, action: Action) -> Result<(), LifecycleError> {
    let is_admin = role == Role::Admin;
    let is_manager = role == Role::Manager && rel.is_garage_manager;
    let is_staff = role == Role::Worker && rel.is_garage_worker;

    let verdict = match action {
        Action::Create => Verdict::allow_if(role == Role::User, "only customers can request bookings"),
        Action::View => Verdict::allow_if(
            rel.is_owner || is_admin || is_manager || is_staff,
            "not related to this booking",
        ),
        Action::EditDetails { status } => {
            if !rel.is_owner {
                Verdict::Deny("only the booking owner can edit details")
            } else if status != BookingStatus::Pending {
                Verdict::Deny("details can only be edited while the booking is pending")
            } else {
                Verdict::Allow
            }
        }
        Action::Cancel { status } => {
            if !(rel.is_owner || is_admin) {
                Verdict::Deny("only the booking owner or an admin can cancel")
            } else if status.is_terminal() {
                Verdict::Deny("booking is already closed")
            } else {
                Verdict::Allow
            }
        }
        Action::ChangeStatus => Verdict::allow_if(
            is_admin || is_manager || is_staff,
            "only staff of this garage or an admin can change status",
        ),
        Action::ChangePayment {
            status,
            payment_status,
            owner_payment_used,
            changes_amount,
        } => {
            if is_admin || is_manager {
                Verdict::Allow
            } else if !rel.is_owner {
                Verdict::Deny("only the garage manager, an admin or the owner can change payment")
            } else if owner_payment_used {
                Verdict::Deny("owner has already used their payment change")
            } else if status != BookingStatus::Completed || payment_status != PaymentStatus::Pending {
                Verdict::Deny("owner can only settle payment once, after completion")
            } else if changes_amount {
                Verdict::Deny("owner cannot change the amount")
            } else {
                Verdict::Allow
            }
        }
    };

    match verdict {
        Verdict::Allow => Ok(()),
        Verdict::Deny(reason) => {
            tracing::warn!(role = role.as_str(), action = action.name(), reason, "authorization denied");
            Err(LifecycleError::Forbidden(reason.to_string()))
        }
    }
}

enum Verdict {
    Allow,
    Deny(&'static str),
}

impl Verdict {
    fn allow_if(allowed: bool, reason: &'static str) -> Self {
        if allowed {
            Verdict::Allow
        } else {
            Verdict::Deny(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Relationship {
        Relationship {
            is_owner: true,
            ..Default::default()
        }
    }

    fn manager() -> Relationship {
        Relationship {
            is_garage_manager: true,
            ..Default::default()
        }
    }

    fn garage_worker() -> Relationship {
        Relationship {
            is_garage_worker: true,
            ..Default::default()
        }
    }

    fn stranger() -> Relationship {
        Relationship::default()
    }

    fn pay(status: BookingStatus, payment_status: PaymentStatus) -> Action {
        Action::ChangePayment {
            status,
            payment_status,
            owner_payment_used: false,
            changes_amount: false,
        }
    }

    #[test]
    fn test_create_requires_user_role() {
        assert!(decide(Role::User, &stranger(), Action::Create).is_ok());
        assert!(decide(Role::Manager, &stranger(), Action::Create).is_err());
        assert!(decide(Role::Worker, &stranger(), Action::Create).is_err());
    }

    #[test]
    fn test_view() {
        assert!(decide(Role::User, &owner(), Action::View).is_ok());
        assert!(decide(Role::Admin, &stranger(), Action::View).is_ok());
        assert!(decide(Role::Manager, &manager(), Action::View).is_ok());
        assert!(decide(Role::Worker, &garage_worker(), Action::View).is_ok());
        assert!(decide(Role::User, &stranger(), Action::View).is_err());
        assert!(decide(Role::Manager, &stranger(), Action::View).is_err());
        assert!(decide(Role::Worker, &stranger(), Action::View).is_err());
    }

    #[test]
    fn test_edit_details_owner_only_while_pending() {
        let pending = Action::EditDetails {
            status: BookingStatus::Pending,
        };
        assert!(decide(Role::User, &owner(), pending).is_ok());
        assert!(decide(Role::User, &stranger(), pending).is_err());
        assert!(decide(Role::Admin, &stranger(), pending).is_err());
        assert!(decide(Role::Manager, &manager(), pending).is_err());

        for status in [
            BookingStatus::Confirmed,
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            let action = Action::EditDetails { status };
            assert!(decide(Role::User, &owner(), action).is_err(), "{status}");
        }
    }

    #[test]
    fn test_cancel() {
        let open = Action::Cancel {
            status: BookingStatus::Confirmed,
        };
        assert!(decide(Role::User, &owner(), open).is_ok());
        assert!(decide(Role::Admin, &stranger(), open).is_ok());
        assert!(decide(Role::User, &stranger(), open).is_err());
        assert!(decide(Role::Manager, &manager(), open).is_err());

        for status in [BookingStatus::Completed, BookingStatus::Cancelled] {
            assert!(decide(Role::User, &owner(), Action::Cancel { status }).is_err());
            assert!(decide(Role::Admin, &stranger(), Action::Cancel { status }).is_err());
        }
    }

    #[test]
    fn test_change_status() {
        assert!(decide(Role::Admin, &stranger(), Action::ChangeStatus).is_ok());
        assert!(decide(Role::Manager, &manager(), Action::ChangeStatus).is_ok());
        assert!(decide(Role::Worker, &garage_worker(), Action::ChangeStatus).is_ok());

        let err = decide(Role::Manager, &stranger(), Action::ChangeStatus).unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
        assert!(decide(Role::Worker, &stranger(), Action::ChangeStatus).is_err());
        assert!(decide(Role::User, &owner(), Action::ChangeStatus).is_err());
    }

    #[test]
    fn test_relationship_needs_matching_role() {
        // a USER who happens to be listed as garage manager gains nothing
        assert!(decide(Role::User, &manager(), Action::ChangeStatus).is_err());
        assert!(decide(Role::Manager, &garage_worker(), Action::ChangeStatus).is_err());
    }

    #[test]
    fn test_change_payment_staff() {
        for payment_status in PaymentStatus::ALL {
            for status in BookingStatus::ALL {
                assert!(decide(Role::Admin, &stranger(), pay(status, payment_status)).is_ok());
                assert!(decide(Role::Manager, &manager(), pay(status, payment_status)).is_ok());
                assert!(decide(Role::Worker, &garage_worker(), pay(status, payment_status)).is_err());
            }
        }
    }

    #[test]
    fn test_change_payment_owner_one_shot() {
        assert!(decide(
            Role::User,
            &owner(),
            pay(BookingStatus::Completed, PaymentStatus::Pending)
        )
        .is_ok());

        for payment_status in [PaymentStatus::Paid, PaymentStatus::Refunded, PaymentStatus::Failed] {
            assert!(decide(Role::User, &owner(), pay(BookingStatus::Completed, payment_status)).is_err());
        }
        for status in [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::InProgress] {
            assert!(decide(Role::User, &owner(), pay(status, PaymentStatus::Pending)).is_err());
        }
        assert!(decide(
            Role::User,
            &stranger(),
            pay(BookingStatus::Completed, PaymentStatus::Pending)
        )
        .is_err());
    }

    #[test]
    fn test_owner_payment_right_is_spent_for_good() {
        let spent = Action::ChangePayment {
            status: BookingStatus::Completed,
            payment_status: PaymentStatus::Pending,
            owner_payment_used: true,
            changes_amount: false,
        };
        let err = decide(Role::User, &owner(), spent).unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
        assert!(decide(Role::Manager, &manager(), spent).is_ok());
        assert!(decide(Role::Admin, &stranger(), spent).is_ok());
    }

    #[test]
    fn test_owner_cannot_change_amount() {
        let action = Action::ChangePayment {
            status: BookingStatus::Completed,
            payment_status: PaymentStatus::Pending,
            owner_payment_used: false,
            changes_amount: true,
        };
        assert!(decide(Role::User, &owner(), action).is_err());
        assert!(decide(Role::Manager, &manager(), action).is_ok());
    }
}
