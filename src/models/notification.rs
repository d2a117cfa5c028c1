use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    NewBooking,
    Cancellation,
    Status,
    Payment,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::NewBooking => "NEW_BOOKING",
            NotificationType::Cancellation => "CANCELLATION",
            NotificationType::Status => "STATUS",
            NotificationType::Payment => "PAYMENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW_BOOKING" => Some(NotificationType::NewBooking),
            "CANCELLATION" => Some(NotificationType::Cancellation),
            "STATUS" => Some(NotificationType::Status),
            "PAYMENT" => Some(NotificationType::Payment),
            _ => None,
        }
    }
}

/// Descriptor of a notification; delivering it is someone else's job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEvent {
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    pub booking_id: String,
}

/// A notification as stored by the sink, with its sequence id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredNotification {
    pub id: i64,
    #[serde(flatten)]
    pub event: NotificationEvent,
    pub created_at: String,
}
