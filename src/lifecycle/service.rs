use std::sync::Arc;

use serde::Serialize;

use crate::errors::LifecycleError;
use crate::lifecycle::payment::PaymentStatusController;
use crate::lifecycle::policy::{self, Action};
use crate::lifecycle::repository::{BookingRepository, GarageRepository, WorkerRepository};
use crate::lifecycle::resolver::{ActorResolver, Relationship, Resolution};
use crate::lifecycle::transitions::StatusTransitionEngine;
use crate::models::{
    Actor, Booking, BookingDetails, BookingStatus, NewBooking, NotificationEvent, NotificationType,
    PaymentStatus, Role,
};

/// Result of a lifecycle operation: the booking as persisted plus the
/// notifications it produced. Delivering those is up to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub booking: Booking,
    pub events: Vec<NotificationEvent>,
}

pub struct BookingLifecycleService {
    bookings: Arc<dyn BookingRepository>,
    garages: Arc<dyn GarageRepository>,
    workers: Arc<dyn WorkerRepository>,
}

impl BookingLifecycleService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        garages: Arc<dyn GarageRepository>,
        workers: Arc<dyn WorkerRepository>,
    ) -> Self {
        Self {
            bookings,
            garages,
            workers,
        }
    }

    pub fn create_booking(&self, actor: &Actor, fields: &NewBooking) -> Result<Outcome, LifecycleError> {
        policy::decide(actor.role, &Relationship::default(), Action::Create)?;

        if fields.service_type.trim().is_empty() {
            return Err(LifecycleError::Validation("service type is required".to_string()));
        }
        validate_duration(fields.estimated_duration)?;

        if !self.garages.exists(&fields.garage_id)? {
            return Err(LifecycleError::NotFound(format!("garage {}", fields.garage_id)));
        }

        let booking = self.bookings.create(&actor.id, fields)?;
        tracing::info!(booking_id = %booking.id, garage_id = %booking.garage_id, customer_id = %actor.id, "booking created");

        let events = self
            .resolver()
            .garage_manager(&booking.garage_id)
            .map(|manager_id| NotificationEvent {
                recipient_id: manager_id,
                kind: NotificationType::NewBooking,
                message: format!(
                    "New booking request for {} on {}",
                    booking.service_type,
                    booking.scheduled_time.format("%Y-%m-%d %H:%M")
                ),
                booking_id: booking.id.clone(),
            })
            .into_iter()
            .collect();

        Ok(Outcome { booking, events })
    }

    pub fn view_booking(&self, actor: &Actor, booking_id: &str) -> Result<Booking, LifecycleError> {
        let booking = self.bookings.get(booking_id)?;
        let rel = self.resolve(actor, &booking).relationship;
        policy::decide(actor.role, &rel, Action::View)?;
        Ok(booking)
    }

    pub fn update_booking_details(
        &self,
        actor: &Actor,
        booking_id: &str,
        details: &BookingDetails,
    ) -> Result<Outcome, LifecycleError> {
        if details.is_empty() {
            return Err(LifecycleError::Validation("nothing to update".to_string()));
        }
        if let Some(duration) = details.estimated_duration {
            validate_duration(duration)?;
        }
        if matches!(&details.service_type, Some(s) if s.trim().is_empty()) {
            return Err(LifecycleError::Validation("service type cannot be blank".to_string()));
        }

        let booking = self.bookings.get(booking_id)?;
        let rel = self.resolve(actor, &booking).relationship;
        policy::decide(
            actor.role,
            &rel,
            Action::EditDetails {
                status: booking.status,
            },
        )?;

        let updated = self.bookings.update_details(booking_id, booking.status, details)?;
        tracing::info!(booking_id = %booking_id, actor_id = %actor.id, "booking details updated");

        Ok(Outcome {
            booking: updated,
            events: vec![],
        })
    }

    pub fn cancel_booking(&self, actor: &Actor, booking_id: &str) -> Result<Outcome, LifecycleError> {
        let booking = self.bookings.get(booking_id)?;
        let resolution = self.resolve(actor, &booking);
        policy::decide(
            actor.role,
            &resolution.relationship,
            Action::Cancel {
                status: booking.status,
            },
        )?;

        let change = StatusTransitionEngine::new(self.workers.as_ref()).apply(
            &booking,
            BookingStatus::Cancelled,
            None,
        )?;
        let updated = self
            .bookings
            .update_status(booking_id, change.expected, change.new_status, None)?;
        tracing::info!(booking_id = %booking_id, actor_id = %actor.id, from = %change.expected, "booking cancelled");

        let events = resolution
            .garage_manager
            .map(|manager_id| NotificationEvent {
                recipient_id: manager_id,
                kind: NotificationType::Cancellation,
                message: format!("Booking for {} was cancelled", updated.service_type),
                booking_id: updated.id.clone(),
            })
            .into_iter()
            .collect();

        Ok(Outcome {
            booking: updated,
            events,
        })
    }

    pub fn change_status(
        &self,
        actor: &Actor,
        booking_id: &str,
        requested: BookingStatus,
        worker_id: Option<&str>,
    ) -> Result<Outcome, LifecycleError> {
        let booking = self.bookings.get(booking_id)?;

        // Closed bookings reject every status change, whoever asks.
        if booking.status.is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                from: booking.status,
                to: requested,
            });
        }

        let rel = self.resolve(actor, &booking).relationship;
        policy::decide(actor.role, &rel, Action::ChangeStatus)?;

        let change =
            StatusTransitionEngine::new(self.workers.as_ref()).apply(&booking, requested, worker_id)?;
        let updated = self.bookings.update_status(
            booking_id,
            change.expected,
            change.new_status,
            change.worker_id.as_deref(),
        )?;
        tracing::info!(
            booking_id = %booking_id,
            actor_id = %actor.id,
            from = %change.expected,
            to = %change.new_status,
            worker_id = ?change.worker_id,
            "booking status changed"
        );

        let events = owner_of(&updated)
            .map(|owner_id| NotificationEvent {
                recipient_id: owner_id,
                kind: NotificationType::Status,
                message: format!("Your booking is now {}", updated.status),
                booking_id: updated.id.clone(),
            })
            .into_iter()
            .collect();

        Ok(Outcome {
            booking: updated,
            events,
        })
    }

    pub fn change_payment(
        &self,
        actor: &Actor,
        booking_id: &str,
        requested: PaymentStatus,
        amount: Option<f64>,
    ) -> Result<Outcome, LifecycleError> {
        let booking = self.bookings.get(booking_id)?;
        let rel = self.resolve(actor, &booking).relationship;
        policy::decide(
            actor.role,
            &rel,
            Action::ChangePayment {
                status: booking.status,
                payment_status: booking.payment_status,
                owner_payment_used: booking.owner_payment_used,
                changes_amount: PaymentStatusController::changes_amount(&booking, amount),
            },
        )?;

        // Only a change granted through the owner rule spends the owner's right.
        let staff = actor.role == Role::Admin || (actor.role == Role::Manager && rel.is_garage_manager);
        let by_owner = rel.is_owner && !staff;
        let change = PaymentStatusController::apply(&booking, requested, amount, by_owner);
        let updated = self.bookings.update_payment(
            booking_id,
            change.expected,
            change.owner_payment_used,
            &change.update,
        )?;
        tracing::info!(
            booking_id = %booking_id,
            actor_id = %actor.id,
            from = %change.expected,
            to = %requested,
            "payment status changed"
        );

        let events = owner_of(&updated)
            .filter(|owner_id| *owner_id != actor.id)
            .map(|owner_id| NotificationEvent {
                recipient_id: owner_id,
                kind: NotificationType::Payment,
                message: format!("Payment for your booking is now {}", updated.payment_status),
                booking_id: updated.id.clone(),
            })
            .into_iter()
            .collect();

        Ok(Outcome {
            booking: updated,
            events,
        })
    }

    fn resolver(&self) -> ActorResolver<'_> {
        ActorResolver::new(self.garages.as_ref(), self.workers.as_ref())
    }

    /// One resolution per operation; its manager id also addresses notifications.
    fn resolve(&self, actor: &Actor, booking: &Booking) -> Resolution {
        self.resolver().resolve_with_manager(&actor.id, booking)
    }
}

fn owner_of(booking: &Booking) -> Option<String> {
    Some(booking.customer_id.clone()).filter(|id| !id.is_empty())
}

fn validate_duration(minutes: i32) -> Result<(), LifecycleError> {
    if minutes <= 0 {
        return Err(LifecycleError::Validation(
            "estimated duration must be positive".to_string(),
        ));
    }
    Ok(())
}
