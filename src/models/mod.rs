pub mod actor;
pub mod booking;
pub mod garage;
pub mod notification;

pub use actor::{Actor, Role};
pub use booking::{Booking, BookingDetails, BookingStatus, NewBooking, PaymentStatus, PaymentUpdate};
pub use garage::{Garage, Worker};
pub use notification::{NotificationEvent, NotificationType, StoredNotification};
