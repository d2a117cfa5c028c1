use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub garage_id: String,
    pub worker_id: Option<String>,
    pub service_type: String,
    pub description: Option<String>,
    pub scheduled_time: NaiveDateTime,
    pub estimated_duration: i32,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub amount: Option<f64>,
    /// Set once the owner has spent their single self-service payment change.
    pub owner_payment_used: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::InProgress => "IN_PROGRESS",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "IN_PROGRESS" => Some(BookingStatus::InProgress),
            "COMPLETED" => Some(BookingStatus::Completed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses have no outgoing edges.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Refunded,
        PaymentStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields supplied by the customer when requesting a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub garage_id: String,
    pub service_type: String,
    pub description: Option<String>,
    pub scheduled_time: NaiveDateTime,
    pub estimated_duration: i32,
}

/// Partial update of the customer-editable fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingDetails {
    pub service_type: Option<String>,
    pub description: Option<String>,
    pub scheduled_time: Option<NaiveDateTime>,
    pub estimated_duration: Option<i32>,
}

impl BookingDetails {
    pub fn is_empty(&self) -> bool {
        self.service_type.is_none()
            && self.description.is_none()
            && self.scheduled_time.is_none()
            && self.estimated_duration.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatus,
    pub amount: Option<f64>,
    /// The write spends the owner's self-service change.
    #[serde(default)]
    pub by_owner: bool,
}
