//! Storage contracts the lifecycle core depends on.
//!
//! Every mutating call is a conditional write: it names the value the caller
//! read and fails with `Conflict` when the stored booking has moved on.

use crate::errors::LifecycleError;
use crate::models::{Booking, BookingDetails, BookingStatus, NewBooking, PaymentStatus, PaymentUpdate};

pub trait BookingRepository: Send + Sync {
    /// `NotFound` if there is no booking with this id.
    fn get(&self, id: &str) -> Result<Booking, LifecycleError>;

    /// Inserts a booking owned by `customer_id` in {PENDING, PENDING}.
    fn create(&self, customer_id: &str, fields: &NewBooking) -> Result<Booking, LifecycleError>;

    fn update_status(
        &self,
        id: &str,
        expected: BookingStatus,
        new_status: BookingStatus,
        worker_id: Option<&str>,
    ) -> Result<Booking, LifecycleError>;

    /// Keyed on both the payment status and the owner flag that were read, so
    /// an owner change racing any other payment write loses with `Conflict`.
    fn update_payment(
        &self,
        id: &str,
        expected: PaymentStatus,
        owner_payment_used: bool,
        update: &PaymentUpdate,
    ) -> Result<Booking, LifecycleError>;

    fn update_details(
        &self,
        id: &str,
        expected: BookingStatus,
        details: &BookingDetails,
    ) -> Result<Booking, LifecycleError>;
}

pub trait GarageRepository: Send + Sync {
    fn manager_of(&self, garage_id: &str) -> anyhow::Result<Option<String>>;
    fn exists(&self, garage_id: &str) -> anyhow::Result<bool>;
}

pub trait WorkerRepository: Send + Sync {
    fn belongs_to_garage(&self, worker_id: &str, garage_id: &str) -> anyhow::Result<bool>;
    /// The worker record (if any) behind a user account.
    fn worker_of(&self, actor_id: &str) -> anyhow::Result<Option<String>>;
}
