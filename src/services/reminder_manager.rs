//! Reminder Manager Service
//!
//! Owner-scoped reminder operations:
//! - Listing all reminders, or today's active ones
//! - Create / update / toggle / delete with field validation
//! - Seeding the default daily routine from the template catalog
//!
//! Every successful mutation asks the attached scheduler for an immediate
//! evaluation so a change to a reminder due this minute takes effect at once.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::dosha::Dosha;
use crate::models::reminder::{DaysOfWeek, NewReminder, Reminder, ReminderUpdates};
use crate::models::reminder_repository::ReminderRepository;
use crate::models::validation::ValidationError;
use crate::scheduler::SchedulerEngine;
use crate::services::template_catalog;

#[derive(Clone)]
pub struct ReminderManager {
    repo: Arc<dyn ReminderRepository>,
    scheduler: Option<Arc<SchedulerEngine>>,
    /// Held by seeding and by `create`, so no insert can slip in between
    /// the empty-owner check and the seeded batch
    seed_lock: Arc<Mutex<()>>,
}

impl ReminderManager {
    pub fn new(repo: Arc<dyn ReminderRepository>) -> Self {
        Self {
            repo,
            scheduler: None,
            seed_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Attach a scheduler to re-evaluate after mutations
    pub fn with_scheduler(mut self, scheduler: Arc<SchedulerEngine>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// All reminders of an owner, sorted by time
    pub async fn list(&self, owner_id: &str) -> Result<Vec<Reminder>> {
        self.repo.list_by_owner(owner_id).await
    }

    /// Active reminders scheduled on `weekday` (0 = Sunday), sorted by time
    pub async fn today(&self, owner_id: &str, weekday: u8) -> Result<Vec<Reminder>> {
        if weekday > 6 {
            return Err(AppError::invalid(ValidationError::DayOutOfRange {
                field: "weekday".to_string(),
                day: weekday as i64,
            }));
        }

        let reminders = self.repo.list_by_owner(owner_id).await?;
        Ok(reminders
            .into_iter()
            .filter(|r| r.is_active && r.is_scheduled_on(weekday))
            .collect())
    }

    pub async fn create(&self, owner_id: &str, input: NewReminder) -> Result<Reminder> {
        let reminder = input.into_reminder(owner_id)?;
        let guard = self.seed_lock.lock().await;
        let created = self.repo.create(&reminder).await?;
        drop(guard);
        tracing::info!(
            "Created reminder {} '{}' at {} for {}",
            created.id,
            created.title,
            created.time,
            owner_id
        );
        self.notify_scheduler().await;
        Ok(created)
    }

    pub async fn update(
        &self,
        owner_id: &str,
        id: &str,
        updates: &ReminderUpdates,
    ) -> Result<Reminder> {
        let mut reminder = self.find(owner_id, id).await?;
        updates.apply_to(&mut reminder)?;
        let updated = self.repo.update(&reminder).await?;
        tracing::debug!("Updated reminder {} for {}", id, owner_id);
        self.notify_scheduler().await;
        Ok(updated)
    }

    /// Flip `is_active`
    pub async fn toggle(&self, owner_id: &str, id: &str) -> Result<Reminder> {
        let mut reminder = self.find(owner_id, id).await?;
        reminder.is_active = !reminder.is_active;
        reminder.touch();
        let updated = self.repo.update(&reminder).await?;
        tracing::debug!(
            "Reminder {} is now {}",
            id,
            if updated.is_active { "active" } else { "inactive" }
        );
        self.notify_scheduler().await;
        Ok(updated)
    }

    pub async fn delete(&self, owner_id: &str, id: &str) -> Result<()> {
        if !self.repo.delete(owner_id, id).await? {
            return Err(not_found(id));
        }
        tracing::info!("Deleted reminder {} for {}", id, owner_id);
        self.notify_scheduler().await;
        Ok(())
    }

    /// Create the default daily routine for an owner with no reminders.
    ///
    /// One reminder per template of the dominant label's set, every day of
    /// the week. Unrecognized or combined labels use the general set.
    pub async fn seed_defaults(&self, owner_id: &str, dominant: &str) -> Result<Vec<Reminder>> {
        if owner_id.trim().is_empty() {
            return Err(AppError::invalid(ValidationError::missing("owner_id")));
        }

        let guard = self.seed_lock.lock().await;

        let existing = self.repo.count_by_owner(owner_id).await?;
        if existing > 0 {
            return Err(AppError::AlreadyInitialized(format!(
                "owner {} already has {} reminders",
                owner_id, existing
            )));
        }

        let dosha = Dosha::parse_or_general(dominant);
        let reminders: Vec<Reminder> = template_catalog::templates_for(dominant)
            .iter()
            .map(|template| {
                let mut reminder =
                    Reminder::new(owner_id, template.title, template.message, template.time)
                        .with_dosha(dosha)
                        .with_category(template.category)
                        .with_days(DaysOfWeek::all());
                reminder.is_custom = false;
                reminder
            })
            .collect();

        let created = self.repo.create_many(&reminders).await?;
        tracing::info!(
            "Seeded {} default reminders for {} (dominant '{}', templates '{}')",
            created.len(),
            owner_id,
            dominant,
            dosha
        );
        drop(guard);

        self.notify_scheduler().await;
        Ok(created)
    }

    async fn find(&self, owner_id: &str, id: &str) -> Result<Reminder> {
        self.repo
            .find_one(owner_id, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn notify_scheduler(&self) {
        if let Some(scheduler) = &self.scheduler {
            let report = scheduler.evaluate_now().await;
            if report.delivered > 0 {
                tracing::debug!("Immediate evaluation delivered {} reminders", report.delivered);
            }
        }
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Reminder not found: {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::models::reminder::{ReminderCategory, TimeOfDay};
    use crate::models::reminder_repository::InMemoryReminderRepository;
    use crate::scheduler::{ChannelSink, ManualClock, OwnerSnapshot};
    use chrono::NaiveDate;

    fn manager() -> (ReminderManager, Arc<InMemoryReminderRepository>) {
        let repo = Arc::new(InMemoryReminderRepository::new());
        (ReminderManager::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let (manager, _) = manager();
        let created = manager
            .create("alice", NewReminder::new("  Tea  ", "Ginger tea", "16:30"))
            .await
            .unwrap();

        assert_eq!(created.title, "Tea");
        assert_eq!(created.time, TimeOfDay::at(16, 30));
        assert_eq!(created.days_of_week, DaysOfWeek::all());
        assert_eq!(created.category, ReminderCategory::General);
        assert_eq!(created.dosha_type, Dosha::General);
        assert!(created.is_active);
        assert!(!created.is_custom);
    }

    #[tokio::test]
    async fn test_create_reports_every_invalid_field() {
        let (manager, repo) = manager();
        let mut input = NewReminder::new("", "body", "24:00");
        input.days_of_week = Some(vec![1, 7]);

        let err = manager.create("alice", input).await.unwrap_err();
        assert_eq!(err.invalid_fields(), vec!["title", "time", "days_of_week"]);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_today_filters_by_day_and_active() {
        let (manager, _) = manager();
        let mut weekend = NewReminder::new("Long walk", "m", "08:00");
        weekend.days_of_week = Some(vec![0, 6]);
        manager.create("alice", weekend).await.unwrap();
        let daily = manager
            .create("alice", NewReminder::new("Oil pulling", "m", "06:00"))
            .await
            .unwrap();
        let paused = manager
            .create("alice", NewReminder::new("Nap", "m", "14:00"))
            .await
            .unwrap();
        manager.toggle("alice", &paused.id).await.unwrap();

        let wednesday = manager.today("alice", 3).await.unwrap();
        assert_eq!(wednesday.len(), 1);
        assert_eq!(wednesday[0].id, daily.id);

        let saturday = manager.today("alice", 6).await.unwrap();
        let titles: Vec<&str> = saturday.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Oil pulling", "Long walk"]);

        let err = manager.today("alice", 7).await.unwrap_err();
        assert_eq!(err.invalid_fields(), vec!["weekday"]);
    }

    #[tokio::test]
    async fn test_update_ignores_empty_text() {
        let (manager, _) = manager();
        let created = manager
            .create("alice", NewReminder::new("Tea", "Ginger tea", "16:30"))
            .await
            .unwrap();

        let updates = ReminderUpdates {
            title: Some(String::new()),
            message: Some("Fennel tea".into()),
            time: Some("17:00".into()),
            ..Default::default()
        };
        let updated = manager.update("alice", &created.id, &updates).await.unwrap();
        assert_eq!(updated.title, "Tea");
        assert_eq!(updated.message, "Fennel tea");
        assert_eq!(updated.time, TimeOfDay::at(17, 0));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_reminder_untouched() {
        let (manager, _) = manager();
        let created = manager
            .create("alice", NewReminder::new("Tea", "Ginger tea", "16:30"))
            .await
            .unwrap();

        let updates = ReminderUpdates {
            time: Some("7:00".into()),
            ..Default::default()
        };
        assert!(matches!(
            manager.update("alice", &created.id, &updates).await,
            Err(AppError::InvalidInput(_))
        ));
        let stored = manager.list("alice").await.unwrap();
        assert_eq!(stored[0].time, TimeOfDay::at(16, 30));
    }

    #[tokio::test]
    async fn test_other_owner_sees_not_found() {
        let (manager, _) = manager();
        let created = manager
            .create("alice", NewReminder::new("Tea", "m", "16:30"))
            .await
            .unwrap();

        assert!(matches!(
            manager.toggle("bob", &created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            manager
                .update("bob", &created.id, &ReminderUpdates::default())
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            manager.delete("bob", &created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(manager.list("alice").await.unwrap().len(), 1);

        manager.delete("alice", &created.id).await.unwrap();
        assert!(matches!(
            manager.delete("alice", &created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_seed_defaults_uses_dominant_templates() {
        let (manager, _) = manager();
        let seeded = manager.seed_defaults("alice", "Kapha").await.unwrap();

        assert_eq!(seeded.len(), 5);
        assert!(seeded.iter().all(|r| r.dosha_type == Dosha::Kapha));
        assert!(seeded.iter().all(|r| !r.is_custom && r.is_active));
        assert!(seeded.iter().all(|r| r.days_of_week == DaysOfWeek::all()));

        let listed = manager.list("alice").await.unwrap();
        assert_eq!(listed[0].title, "Early Rising");
        assert_eq!(listed[0].time, TimeOfDay::at(5, 30));
    }

    #[tokio::test]
    async fn test_seed_defaults_combined_label_falls_back_to_general() {
        let (manager, _) = manager();
        let seeded = manager.seed_defaults("alice", "vata+pitta").await.unwrap();
        assert!(seeded.iter().all(|r| r.dosha_type == Dosha::General));
        assert!(seeded.iter().any(|r| r.title == "Morning Routine"));
    }

    #[tokio::test]
    async fn test_seed_defaults_refuses_non_empty_owner() {
        let (manager, repo) = manager();
        manager
            .create("alice", NewReminder::new("Tea", "m", "16:30"))
            .await
            .unwrap();

        assert!(matches!(
            manager.seed_defaults("alice", "vata").await,
            Err(AppError::AlreadyInitialized(_))
        ));
        assert_eq!(repo.len(), 1);

        // other owners are unaffected
        assert_eq!(manager.seed_defaults("bob", "vata").await.unwrap().len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_seeding_creates_one_set() {
        let (manager, repo) = manager();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.seed_defaults("alice", "pitta").await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppError::AlreadyInitialized(_)) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(repo.len(), 5);
    }

    /// Store whose single inserts take a while to land
    struct SlowCreateRepo {
        inner: InMemoryReminderRepository,
    }

    #[async_trait::async_trait]
    impl ReminderRepository for SlowCreateRepo {
        async fn create(&self, reminder: &Reminder) -> Result<Reminder> {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.inner.create(reminder).await
        }

        async fn create_many(&self, reminders: &[Reminder]) -> Result<Vec<Reminder>> {
            self.inner.create_many(reminders).await
        }

        async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Reminder>> {
            self.inner.list_by_owner(owner_id).await
        }

        async fn find_one(&self, owner_id: &str, id: &str) -> Result<Option<Reminder>> {
            self.inner.find_one(owner_id, id).await
        }

        async fn update(&self, reminder: &Reminder) -> Result<Reminder> {
            self.inner.update(reminder).await
        }

        async fn delete(&self, owner_id: &str, id: &str) -> Result<bool> {
            self.inner.delete(owner_id, id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeding_waits_for_in_flight_create() {
        let repo = Arc::new(SlowCreateRepo {
            inner: InMemoryReminderRepository::new(),
        });
        let manager = ReminderManager::new(repo.clone());

        let creating = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .create("alice", NewReminder::new("Tea", "Green tea", "16:00"))
                    .await
            })
        };
        // let the insert start before seeding
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;

        assert!(matches!(
            manager.seed_defaults("alice", "vata").await,
            Err(AppError::AlreadyInitialized(_))
        ));
        creating.await.unwrap().unwrap();

        let stored = manager.list("alice").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Tea");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_triggers_immediate_evaluation() {
        let repo = Arc::new(InMemoryReminderRepository::new());
        let scheduler = Arc::new(SchedulerEngine::new(SchedulerConfig::default()));
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let clock = Arc::new(ManualClock::at(date, TimeOfDay::at(10, 15)));
        let (sink, mut rx) = ChannelSink::new();
        scheduler
            .start(
                Arc::new(OwnerSnapshot::new(repo.clone(), "alice")),
                Arc::new(sink),
                clock,
            )
            .await
            .unwrap();

        let manager = ReminderManager::new(repo).with_scheduler(scheduler.clone());
        let created = manager
            .create("alice", NewReminder::new("Hydrate", "Warm water", "10:15"))
            .await
            .unwrap();

        let fired = rx.try_recv().unwrap();
        assert_eq!(fired.reminder_id, created.id);

        // toggling twice within the minute does not fire it again
        manager.toggle("alice", &created.id).await.unwrap();
        manager.toggle("alice", &created.id).await.unwrap();
        assert!(rx.try_recv().is_err());

        scheduler.stop().await;
    }
}
