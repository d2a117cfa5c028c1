use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingDetails, BookingStatus, Garage, NewBooking, NotificationEvent, NotificationType,
    PaymentStatus, PaymentUpdate, StoredNotification, Worker,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, customer_id, garage_id, worker_id, service_type, description, \
     scheduled_time, estimated_duration, status, payment_status, amount, created_at, updated_at, \
     owner_payment_used";

fn now_str() -> String {
    Utc::now().naive_utc().format(TS_FORMAT).to_string()
}

// ── Garages & workers ──

pub fn insert_garage(conn: &Connection, garage: &Garage) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO garages (id, manager_id, name) VALUES (?1, ?2, ?3)",
        params![garage.id, garage.manager_id, garage.name],
    )?;
    Ok(())
}

pub fn get_garage_manager(conn: &Connection, garage_id: &str) -> anyhow::Result<Option<String>> {
    let manager: Option<String> = conn
        .query_row(
            "SELECT manager_id FROM garages WHERE id = ?1",
            params![garage_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(manager)
}

pub fn garage_exists(conn: &Connection, garage_id: &str) -> anyhow::Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM garages WHERE id = ?1",
        params![garage_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn insert_worker(conn: &Connection, worker: &Worker) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO workers (id, user_id, garage_id, status) VALUES (?1, ?2, ?3, ?4)",
        params![worker.id, worker.user_id, worker.garage_id, worker.status],
    )?;
    Ok(())
}

pub fn worker_in_garage(conn: &Connection, worker_id: &str, garage_id: &str) -> anyhow::Result<bool> {
    let found: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM workers WHERE id = ?1 AND garage_id = ?2",
        params![worker_id, garage_id],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn get_worker_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Option<String>> {
    let worker: Option<String> = conn
        .query_row(
            "SELECT id FROM workers WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(worker)
}

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, customer_id, garage_id, worker_id, service_type, description,
                               scheduled_time, estimated_duration, status, payment_status, amount,
                               created_at, updated_at, owner_payment_used)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            booking.id,
            booking.customer_id,
            booking.garage_id,
            booking.worker_id,
            booking.service_type,
            booking.description,
            booking.scheduled_time.format(TS_FORMAT).to_string(),
            booking.estimated_duration,
            booking.status.as_str(),
            booking.payment_status.as_str(),
            booking.amount,
            booking.created_at.format(TS_FORMAT).to_string(),
            booking.updated_at.format(TS_FORMAT).to_string(),
            booking.owner_payment_used,
        ],
    )?;
    Ok(())
}

/// Builds the row for a fresh booking; the id is a random UUID.
pub fn new_booking_row(customer_id: &str, fields: &NewBooking) -> Booking {
    let now = Utc::now().naive_utc();
    Booking {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: customer_id.to_string(),
        garage_id: fields.garage_id.clone(),
        worker_id: None,
        service_type: fields.service_type.clone(),
        description: fields.description.clone(),
        scheduled_time: fields.scheduled_time,
        estimated_duration: fields.estimated_duration,
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Pending,
        amount: None,
        owner_payment_used: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_booking_row(row)));

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn booking_exists(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM bookings WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Conditional on the current status. Returns the number of rows written.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    status: BookingStatus,
    worker_id: Option<&str>,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, worker_id = COALESCE(?2, worker_id), updated_at = ?3
         WHERE id = ?4 AND status = ?5",
        params![status.as_str(), worker_id, now_str(), id, expected.as_str()],
    )?;
    Ok(count)
}

/// Conditional on the payment status and owner flag that were read.
/// A missing amount keeps the recorded one; the owner flag is never cleared.
pub fn update_booking_payment(
    conn: &Connection,
    id: &str,
    expected: PaymentStatus,
    owner_payment_used: bool,
    update: &PaymentUpdate,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE bookings SET payment_status = ?1, amount = COALESCE(?2, amount),
           owner_payment_used = (owner_payment_used OR ?3), updated_at = ?4
         WHERE id = ?5 AND payment_status = ?6 AND owner_payment_used = ?7",
        params![
            update.payment_status.as_str(),
            update.amount,
            update.by_owner,
            now_str(),
            id,
            expected.as_str(),
            owner_payment_used
        ],
    )?;
    Ok(count)
}

pub fn update_booking_details(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    details: &BookingDetails,
) -> anyhow::Result<usize> {
    let scheduled_time = details
        .scheduled_time
        .map(|t| t.format(TS_FORMAT).to_string());
    let count = conn.execute(
        "UPDATE bookings SET
           service_type = COALESCE(?1, service_type),
           description = COALESCE(?2, description),
           scheduled_time = COALESCE(?3, scheduled_time),
           estimated_duration = COALESCE(?4, estimated_duration),
           updated_at = ?5
         WHERE id = ?6 AND status = ?7",
        params![
            details.service_type,
            details.description,
            scheduled_time,
            details.estimated_duration,
            now_str(),
            id,
            expected.as_str()
        ],
    )?;
    Ok(count)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let status_str: String = row.get(8)?;
    let payment_str: String = row.get(9)?;
    let scheduled_str: String = row.get(6)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status: {status_str}"))?;
    let payment_status = PaymentStatus::parse(&payment_str)
        .ok_or_else(|| anyhow::anyhow!("unknown payment status: {payment_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        garage_id: row.get(2)?,
        worker_id: row.get(3)?,
        service_type: row.get(4)?,
        description: row.get(5)?,
        scheduled_time: NaiveDateTime::parse_from_str(&scheduled_str, TS_FORMAT)?,
        estimated_duration: row.get(7)?,
        status,
        payment_status,
        amount: row.get(10)?,
        owner_payment_used: row.get(13)?,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, TS_FORMAT)?,
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, TS_FORMAT)?,
    })
}

// ── Notifications ──

pub fn insert_notification(conn: &Connection, event: &NotificationEvent) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO notifications (recipient_id, kind, message, booking_id) VALUES (?1, ?2, ?3, ?4)",
        params![
            event.recipient_id,
            event.kind.as_str(),
            event.message,
            event.booking_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_notifications_since(
    conn: &Connection,
    recipient_id: &str,
    since_id: i64,
) -> anyhow::Result<Vec<StoredNotification>> {
    let mut stmt = conn.prepare(
        "SELECT id, recipient_id, kind, message, booking_id, created_at
         FROM notifications WHERE recipient_id = ?1 AND id > ?2
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![recipient_id, since_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut notifications = vec![];
    for row in rows {
        let (id, recipient_id, kind, message, booking_id, created_at) = row?;
        let Some(kind) = NotificationType::parse(&kind) else {
            tracing::warn!(id, kind = %kind, "skipping notification of unknown type");
            continue;
        };
        notifications.push(StoredNotification {
            id,
            event: NotificationEvent {
                recipient_id,
                kind,
                message,
                booking_id,
            },
            created_at,
        });
    }
    Ok(notifications)
}
