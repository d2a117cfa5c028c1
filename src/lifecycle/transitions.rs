use crate::errors::LifecycleError;
use crate::lifecycle::repository::WorkerRepository;
use crate::models::{Booking, BookingStatus};

/// Every edge of the status graph. COMPLETED and CANCELLED have none.
pub const EDGES: [(BookingStatus, BookingStatus); 6] = [
    (BookingStatus::Pending, BookingStatus::Confirmed),
    (BookingStatus::Pending, BookingStatus::Cancelled),
    (BookingStatus::Confirmed, BookingStatus::InProgress),
    (BookingStatus::Confirmed, BookingStatus::Cancelled),
    (BookingStatus::InProgress, BookingStatus::Completed),
    (BookingStatus::InProgress, BookingStatus::Cancelled),
];

pub fn is_allowed(from: BookingStatus, to: BookingStatus) -> bool {
    EDGES.contains(&(from, to))
}

/// A validated change, ready for a conditional write keyed on `expected`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub expected: BookingStatus,
    pub new_status: BookingStatus,
    pub worker_id: Option<String>,
}

pub struct StatusTransitionEngine<'a> {
    workers: &'a dyn WorkerRepository,
}

impl<'a> StatusTransitionEngine<'a> {
    pub fn new(workers: &'a dyn WorkerRepository) -> Self {
        Self { workers }
    }

    /// The worker is checked before the edge, so an assignment outside the
    /// booking's garage is rejected whatever status was asked for.
    pub fn apply(
        &self,
        booking: &Booking,
        requested: BookingStatus,
        worker_id: Option<&str>,
    ) -> Result<StatusChange, LifecycleError> {
        if let Some(worker_id) = worker_id {
            let belongs = self
                .workers
                .belongs_to_garage(worker_id, &booking.garage_id)
                .map_err(LifecycleError::Storage)?;
            if !belongs {
                return Err(LifecycleError::Validation(format!(
                    "worker {worker_id} does not belong to garage {}",
                    booking.garage_id
                )));
            }
        }

        if !is_allowed(booking.status, requested) {
            return Err(LifecycleError::InvalidTransition {
                from: booking.status,
                to: requested,
            });
        }

        Ok(StatusChange {
            expected: booking.status,
            new_status: requested,
            worker_id: worker_id.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use chrono::NaiveDateTime;

    struct OneGarage;

    impl WorkerRepository for OneGarage {
        fn belongs_to_garage(&self, worker_id: &str, garage_id: &str) -> anyhow::Result<bool> {
            Ok(garage_id == "g1" && (worker_id == "w1" || worker_id == "w2"))
        }

        fn worker_of(&self, _actor_id: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
    }

    struct Offline;

    impl WorkerRepository for Offline {
        fn belongs_to_garage(&self, _: &str, _: &str) -> anyhow::Result<bool> {
            anyhow::bail!("connection reset")
        }

        fn worker_of(&self, _: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("connection reset")
        }
    }

    fn booking(status: BookingStatus) -> Booking {
        let ts = NaiveDateTime::parse_from_str("2025-06-16 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Booking {
            id: "b1".to_string(),
            customer_id: "u1".to_string(),
            garage_id: "g1".to_string(),
            worker_id: None,
            service_type: "brake pads".to_string(),
            description: None,
            scheduled_time: ts,
            estimated_duration: 90,
            status,
            payment_status: PaymentStatus::Pending,
            amount: None,
            owner_payment_used: false,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_only_listed_edges_pass() {
        let engine = StatusTransitionEngine::new(&OneGarage);
        let mut allowed = 0;
        for from in BookingStatus::ALL {
            for to in BookingStatus::ALL {
                let result = engine.apply(&booking(from), to, None);
                if EDGES.contains(&(from, to)) {
                    let change = result.unwrap();
                    assert_eq!(change.expected, from);
                    assert_eq!(change.new_status, to);
                    allowed += 1;
                } else {
                    assert!(
                        matches!(result, Err(LifecycleError::InvalidTransition { .. })),
                        "{from} -> {to} should be rejected"
                    );
                }
            }
        }
        assert_eq!(allowed, 6);
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for from in [BookingStatus::Completed, BookingStatus::Cancelled] {
            for to in BookingStatus::ALL {
                assert!(!is_allowed(from, to));
            }
        }
    }

    #[test]
    fn test_assignment_with_any_transition() {
        let engine = StatusTransitionEngine::new(&OneGarage);
        let change = engine
            .apply(&booking(BookingStatus::Confirmed), BookingStatus::InProgress, Some("w2"))
            .unwrap();
        assert_eq!(change.worker_id.as_deref(), Some("w2"));
    }

    #[test]
    fn test_foreign_worker_is_validation_error_for_any_target() {
        let engine = StatusTransitionEngine::new(&OneGarage);
        for to in BookingStatus::ALL {
            let err = engine
                .apply(&booking(BookingStatus::Pending), to, Some("w9"))
                .unwrap_err();
            assert!(matches!(err, LifecycleError::Validation(_)), "{to}");
        }
    }

    #[test]
    fn test_lookup_failure_is_storage_error() {
        let engine = StatusTransitionEngine::new(&Offline);
        let err = engine
            .apply(&booking(BookingStatus::Pending), BookingStatus::Confirmed, Some("w1"))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Storage(_)));
    }
}
