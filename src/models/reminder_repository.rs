//! Reminder 仓储
//!
//! 提醒记录的持久化边界。所有按 ID 的访问都带上 owner，
//! 不属于该 owner 的记录与不存在等同。

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::reminder::Reminder;

/// Reminder 仓储 trait
#[async_trait]
pub trait ReminderRepository: Send + Sync {
    /// 创建提醒
    async fn create(&self, reminder: &Reminder) -> Result<Reminder>;

    /// 批量创建
    async fn create_many(&self, reminders: &[Reminder]) -> Result<Vec<Reminder>> {
        let mut created = Vec::with_capacity(reminders.len());
        for reminder in reminders {
            created.push(self.create(reminder).await?);
        }
        Ok(created)
    }

    /// 列出用户的全部提醒，按时间升序
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Reminder>>;

    /// 获取用户的某条提醒
    async fn find_one(&self, owner_id: &str, id: &str) -> Result<Option<Reminder>>;

    /// 更新提醒，记录不存在或不属于该用户时返回 NotFound
    async fn update(&self, reminder: &Reminder) -> Result<Reminder>;

    /// 删除提醒，返回是否删除
    async fn delete(&self, owner_id: &str, id: &str) -> Result<bool>;

    /// 统计用户提醒数量
    async fn count_by_owner(&self, owner_id: &str) -> Result<u64> {
        Ok(self.list_by_owner(owner_id).await?.len() as u64)
    }
}

/// 内存实现
#[derive(Clone, Default)]
pub struct InMemoryReminderRepository {
    reminders: Arc<DashMap<String, Reminder>>,
}

impl InMemoryReminderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有用户的记录总数
    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }
}

#[async_trait]
impl ReminderRepository for InMemoryReminderRepository {
    async fn create(&self, reminder: &Reminder) -> Result<Reminder> {
        if self.reminders.contains_key(&reminder.id) {
            return Err(AppError::Storage(format!(
                "reminder already exists: {}",
                reminder.id
            )));
        }
        self.reminders.insert(reminder.id.clone(), reminder.clone());
        tracing::debug!("Created reminder {} for owner {}", reminder.id, reminder.owner_id);
        Ok(reminder.clone())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Reminder>> {
        let mut reminders: Vec<Reminder> = self
            .reminders
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect();
        reminders.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(reminders)
    }

    async fn find_one(&self, owner_id: &str, id: &str) -> Result<Option<Reminder>> {
        Ok(self
            .reminders
            .get(id)
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.value().clone()))
    }

    async fn update(&self, reminder: &Reminder) -> Result<Reminder> {
        match self.reminders.get_mut(&reminder.id) {
            Some(mut entry) if entry.owner_id == reminder.owner_id => {
                *entry = reminder.clone();
                Ok(reminder.clone())
            }
            _ => Err(AppError::NotFound(format!("Reminder not found: {}", reminder.id))),
        }
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<bool> {
        Ok(self
            .reminders
            .remove_if(id, |_, reminder| reminder.owner_id == owner_id)
            .is_some())
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<u64> {
        Ok(self
            .reminders
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .count() as u64)
    }
}
