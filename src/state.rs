use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::lifecycle::BookingLifecycleService;
use crate::models::StoredNotification;
use crate::notifications::NotificationSink;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub lifecycle: BookingLifecycleService,
    pub notifications: Box<dyn NotificationSink>,
    pub notification_tx: broadcast::Sender<StoredNotification>,
}
