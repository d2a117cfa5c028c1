use crate::lifecycle::repository::{GarageRepository, WorkerRepository};
use crate::models::Booking;

/// How an actor relates to one particular booking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relationship {
    pub is_owner: bool,
    pub is_garage_manager: bool,
    pub is_assigned_worker: bool,
    pub is_garage_worker: bool,
}

/// A relationship plus the garage manager looked up while computing it, so
/// the operation can address notifications without asking the store again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub relationship: Relationship,
    pub garage_manager: Option<String>,
}

pub struct ActorResolver<'a> {
    garages: &'a dyn GarageRepository,
    workers: &'a dyn WorkerRepository,
}

impl<'a> ActorResolver<'a> {
    pub fn new(garages: &'a dyn GarageRepository, workers: &'a dyn WorkerRepository) -> Self {
        Self { garages, workers }
    }

    pub fn resolve(&self, actor_id: &str, booking: &Booking) -> Relationship {
        self.resolve_with_manager(actor_id, booking).relationship
    }

    /// Never fails: a lookup that errors or finds nothing counts as "no relationship".
    pub fn resolve_with_manager(&self, actor_id: &str, booking: &Booking) -> Resolution {
        let is_owner = booking.customer_id == actor_id;

        let garage_manager = self.garage_manager(&booking.garage_id);
        let is_garage_manager = garage_manager.as_deref() == Some(actor_id);

        let worker_id = match self.workers.worker_of(actor_id) {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(error = %e, actor_id = %actor_id, "worker lookup failed");
                None
            }
        };

        let (is_assigned_worker, is_garage_worker) = match worker_id {
            Some(worker_id) => {
                let assigned = booking.worker_id.as_deref() == Some(worker_id.as_str());
                let at_garage = self
                    .workers
                    .belongs_to_garage(&worker_id, &booking.garage_id)
                    .unwrap_or_else(|e| {
                        tracing::warn!(error = %e, worker_id = %worker_id, "garage membership lookup failed");
                        false
                    });
                (assigned, at_garage)
            }
            None => (false, false),
        };

        Resolution {
            relationship: Relationship {
                is_owner,
                is_garage_manager,
                is_assigned_worker,
                is_garage_worker,
            },
            garage_manager,
        }
    }

    /// The manager of a garage; a missing, blank or failed lookup is `None`.
    pub fn garage_manager(&self, garage_id: &str) -> Option<String> {
        match self.garages.manager_of(garage_id) {
            Ok(manager) => manager.filter(|id| !id.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, garage_id = %garage_id, "manager lookup failed");
                None
            }
        }
    }
}
