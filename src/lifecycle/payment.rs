use crate::models::{Booking, PaymentStatus, PaymentUpdate};

/// A payment write keyed on the payment state that was read.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentChange {
    pub expected: PaymentStatus,
    pub owner_payment_used: bool,
    pub update: PaymentUpdate,
}

/// The payment track has no graph: reconciliation happens outside this
/// service, so any value may follow any other once authorized.
pub struct PaymentStatusController;

impl PaymentStatusController {
    /// `by_owner` marks the write as the owner's one self-service change,
    /// even when it leaves the payment status where it was.
    pub fn apply(
        booking: &Booking,
        requested: PaymentStatus,
        amount: Option<f64>,
        by_owner: bool,
    ) -> PaymentChange {
        PaymentChange {
            expected: booking.payment_status,
            owner_payment_used: booking.owner_payment_used,
            update: PaymentUpdate {
                payment_status: requested,
                amount,
                by_owner,
            },
        }
    }

    /// True when the request would overwrite the recorded amount.
    pub fn changes_amount(booking: &Booking, amount: Option<f64>) -> bool {
        match amount {
            Some(a) => booking.amount != Some(a),
            None => false,
        }
    }
}
