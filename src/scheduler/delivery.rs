//! Delivery sinks
//!
//! Where due reminders go. Only local delivery is modeled: a log line or an
//! in-process channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{AppError, Result};
use crate::models::reminder::{Reminder, ReminderCategory};
use crate::scheduler::clock::ClockReading;

/// One firing of one reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// `{reminder_id}@{YYYY-MM-DD}T{HH:MM}`, stable across retries of the same firing
    pub dedupe_key: String,
    pub reminder_id: String,
    pub owner_id: String,
    pub category: ReminderCategory,
}

impl Notification {
    pub fn dedupe_key(reminder: &Reminder, reading: &ClockReading) -> String {
        format!("{}@{}", reminder.id, reading.minute_stamp())
    }

    pub fn for_reminder(reminder: &Reminder, reading: &ClockReading) -> Self {
        Self {
            title: reminder.title.clone(),
            body: reminder.message.clone(),
            dedupe_key: Self::dedupe_key(reminder, reading),
            reminder_id: reminder.id.clone(),
            owner_id: reminder.owner_id.clone(),
            category: reminder.category,
        }
    }
}

#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Delivers by logging the notification
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

#[async_trait]
impl DeliverySink for TracingSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            owner = %notification.owner_id,
            reminder = %notification.reminder_id,
            category = %notification.category,
            dedupe_key = %notification.dedupe_key,
            "🔔 {}: {}",
            notification.title,
            notification.body
        );
        Ok(())
    }
}

/// Forwards notifications to an in-process receiver
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DeliverySink for ChannelSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.tx
            .send(notification.clone())
            .map_err(|_| AppError::Delivery("notification receiver dropped".to_string()))
    }
}
