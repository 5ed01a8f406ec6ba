//! Snapshot sources
//!
//! The engine pulls a fresh reminder set at the start of every evaluation and
//! keeps nothing between ticks except its firing ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::Result;
use crate::models::reminder::Reminder;
use crate::models::reminder_repository::ReminderRepository;

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<Reminder>>;

    /// Called after a reminder was delivered. Sources without write access
    /// ignore it.
    async fn mark_triggered(&self, _reminder: &Reminder, _at: DateTime<Utc>) -> Result<()> {
        Ok(())
    }
}

/// One owner's reminders, read straight from the repository
#[derive(Clone)]
pub struct OwnerSnapshot {
    repo: Arc<dyn ReminderRepository>,
    owner_id: String,
}

impl OwnerSnapshot {
    pub fn new(repo: Arc<dyn ReminderRepository>, owner_id: &str) -> Self {
        Self {
            repo,
            owner_id: owner_id.to_string(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

#[async_trait]
impl SnapshotSource for OwnerSnapshot {
    async fn snapshot(&self) -> Result<Vec<Reminder>> {
        self.repo.list_by_owner(&self.owner_id).await
    }

    async fn mark_triggered(&self, reminder: &Reminder, at: DateTime<Utc>) -> Result<()> {
        // re-read so a concurrent edit is not overwritten with snapshot data
        let Some(mut current) = self.repo.find_one(&self.owner_id, &reminder.id).await? else {
            return Ok(());
        };
        current.last_triggered = Some(at);
        self.repo.update(&current).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::reminder::TimeOfDay;
    use crate::models::reminder_repository::InMemoryReminderRepository;

    #[tokio::test]
    async fn test_owner_snapshot_is_scoped_and_fresh() {
        let repo = Arc::new(InMemoryReminderRepository::new());
        let mine = Reminder::new("alice", "Walk", "m", TimeOfDay::at(18, 0));
        let theirs = Reminder::new("bob", "Walk", "m", TimeOfDay::at(18, 0));
        repo.create(&mine).await.unwrap();
        repo.create(&theirs).await.unwrap();

        let source = OwnerSnapshot::new(repo.clone(), "alice");
        let snapshot = source.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, mine.id);

        repo.delete("alice", &mine.id).await.unwrap();
        assert!(source.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_triggered_records_timestamp() {
        let repo = Arc::new(InMemoryReminderRepository::new());
        let reminder = Reminder::new("alice", "Walk", "m", TimeOfDay::at(18, 0));
        repo.create(&reminder).await.unwrap();

        let source = OwnerSnapshot::new(repo.clone(), "alice");
        let at = Utc::now();
        source.mark_triggered(&reminder, at).await.unwrap();

        let stored = repo.find_one("alice", &reminder.id).await.unwrap().unwrap();
        assert_eq!(stored.last_triggered, Some(at));
    }

    #[tokio::test]
    async fn test_mark_triggered_tolerates_deleted_reminder() {
        let repo = Arc::new(InMemoryReminderRepository::new());
        let reminder = Reminder::new("alice", "Walk", "m", TimeOfDay::at(18, 0));

        let source = OwnerSnapshot::new(repo, "alice");
        assert!(source.mark_triggered(&reminder, Utc::now()).await.is_ok());
    }
}
