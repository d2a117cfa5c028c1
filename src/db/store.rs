//! SQLite-backed implementation of the lifecycle repositories.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::db::queries;
use crate::errors::LifecycleError;
use crate::lifecycle::repository::{BookingRepository, GarageRepository, WorkerRepository};
use crate::models::{
    Booking, BookingDetails, BookingStatus, Garage, NewBooking, PaymentStatus, PaymentUpdate, Worker,
};

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self::from_shared(Arc::new(Mutex::new(conn)))
    }

    pub fn from_shared(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }

    pub fn insert_garage(&self, id: &str, manager_id: &str, name: &str) -> anyhow::Result<()> {
        let garage = Garage {
            id: id.to_string(),
            manager_id: manager_id.to_string(),
            name: name.to_string(),
        };
        queries::insert_garage(&*self.lock()?, &garage)
    }

    pub fn insert_worker(&self, id: &str, user_id: &str, garage_id: &str) -> anyhow::Result<()> {
        let worker = Worker {
            id: id.to_string(),
            user_id: user_id.to_string(),
            garage_id: garage_id.to_string(),
            status: "active".to_string(),
        };
        queries::insert_worker(&*self.lock()?, &worker)
    }
}

/// Reads the booking back after a conditional write, or explains why nothing was written.
fn written_or_explain(
    conn: &Connection,
    id: &str,
    written: usize,
    stale: impl FnOnce() -> String,
) -> Result<Booking, LifecycleError> {
    if written == 0 {
        if queries::booking_exists(conn, id)? {
            return Err(LifecycleError::Conflict(stale()));
        }
        return Err(LifecycleError::NotFound(format!("booking {id}")));
    }
    queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| LifecycleError::NotFound(format!("booking {id}")))
}

impl BookingRepository for SqliteStore {
    fn get(&self, id: &str) -> Result<Booking, LifecycleError> {
        queries::get_booking_by_id(&*self.lock()?, id)?
            .ok_or_else(|| LifecycleError::NotFound(format!("booking {id}")))
    }

    fn create(&self, customer_id: &str, fields: &NewBooking) -> Result<Booking, LifecycleError> {
        let booking = queries::new_booking_row(customer_id, fields);
        queries::create_booking(&*self.lock()?, &booking)?;
        Ok(booking)
    }

    fn update_status(
        &self,
        id: &str,
        expected: BookingStatus,
        new_status: BookingStatus,
        worker_id: Option<&str>,
    ) -> Result<Booking, LifecycleError> {
        let conn = self.lock()?;
        let written = queries::update_booking_status(&conn, id, expected, new_status, worker_id)?;
        written_or_explain(&conn, id, written, || {
            format!("booking {id} is no longer {expected}")
        })
    }

    fn update_payment(
        &self,
        id: &str,
        expected: PaymentStatus,
        owner_payment_used: bool,
        update: &PaymentUpdate,
    ) -> Result<Booking, LifecycleError> {
        let conn = self.lock()?;
        let written =
            queries::update_booking_payment(&conn, id, expected, owner_payment_used, update)?;
        written_or_explain(&conn, id, written, || {
            format!("payment for booking {id} changed since it was read")
        })
    }

    fn update_details(
        &self,
        id: &str,
        expected: BookingStatus,
        details: &BookingDetails,
    ) -> Result<Booking, LifecycleError> {
        let conn = self.lock()?;
        let written = queries::update_booking_details(&conn, id, expected, details)?;
        written_or_explain(&conn, id, written, || {
            format!("booking {id} is no longer {expected}")
        })
    }
}

impl GarageRepository for SqliteStore {
    fn manager_of(&self, garage_id: &str) -> anyhow::Result<Option<String>> {
        queries::get_garage_manager(&*self.lock()?, garage_id)
    }

    fn exists(&self, garage_id: &str) -> anyhow::Result<bool> {
        queries::garage_exists(&*self.lock()?, garage_id)
    }
}

impl WorkerRepository for SqliteStore {
    fn belongs_to_garage(&self, worker_id: &str, garage_id: &str) -> anyhow::Result<bool> {
        queries::worker_in_garage(&*self.lock()?, worker_id, garage_id)
    }

    fn worker_of(&self, actor_id: &str) -> anyhow::Result<Option<String>> {
        queries::get_worker_for_user(&*self.lock()?, actor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::NaiveDateTime;

    fn store_with_booking() -> (SqliteStore, Booking) {
        let store = SqliteStore::new(db::init_db(":memory:").unwrap());
        store.insert_garage("g1", "m1", "Northside Motors").unwrap();
        let booking = store
            .create(
                "u1",
                &NewBooking {
                    garage_id: "g1".to_string(),
                    service_type: "MOT".to_string(),
                    description: None,
                    scheduled_time: NaiveDateTime::parse_from_str("2025-06-20 09:00", "%Y-%m-%d %H:%M").unwrap(),
                    estimated_duration: 60,
                },
            )
            .unwrap();
        (store, booking)
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (store, _) = store_with_booking();
        assert!(matches!(store.get("nope"), Err(LifecycleError::NotFound(_))));
    }

    #[test]
    fn test_stale_status_write_is_conflict() {
        let (store, booking) = store_with_booking();
        store
            .update_status(&booking.id, BookingStatus::Pending, BookingStatus::Confirmed, None)
            .unwrap();

        let err = store
            .update_status(&booking.id, BookingStatus::Pending, BookingStatus::Cancelled, None)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict(_)));
    }

    #[test]
    fn test_write_to_missing_booking_is_not_found() {
        let (store, _) = store_with_booking();
        let err = store
            .update_status("ghost", BookingStatus::Pending, BookingStatus::Confirmed, None)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
    }

    #[test]
    fn test_stale_payment_write_is_conflict() {
        let (store, booking) = store_with_booking();
        let update = PaymentUpdate {
            payment_status: PaymentStatus::Paid,
            amount: None,
            by_owner: false,
        };
        store
            .update_payment(&booking.id, PaymentStatus::Pending, false, &update)
            .unwrap();
        let err = store
            .update_payment(&booking.id, PaymentStatus::Pending, false, &update)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict(_)));
    }

    #[test]
    fn test_owner_write_marks_flag() {
        let (store, booking) = store_with_booking();
        let update = PaymentUpdate {
            payment_status: PaymentStatus::Pending,
            amount: None,
            by_owner: true,
        };
        let updated = store
            .update_payment(&booking.id, PaymentStatus::Pending, false, &update)
            .unwrap();
        assert!(updated.owner_payment_used);
        assert_eq!(updated.payment_status, PaymentStatus::Pending);

        let err = store
            .update_payment(&booking.id, PaymentStatus::Pending, false, &update)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict(_)));
    }
}
