//! 提醒数据模型
//!
//! 每日提醒记录、时间与星期掩码。

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::dosha::Dosha;
use crate::models::validation::{ValidationError, ValidationResult, Violations, require_text};

static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("valid time pattern"));

/// 24 小时制 HH:MM 时间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// 编译期构造，非法值在常量求值时报错
    pub const fn at(hour: u8, minute: u8) -> Self {
        assert!(hour < 24 && minute < 60);
        Self { hour, minute }
    }

    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// 距午夜的分钟数
    pub fn minutes_since_midnight(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    /// 与另一时间的绝对分钟差（不跨午夜回绕）
    pub fn distance_minutes(&self, other: &TimeOfDay) -> u32 {
        self.minutes_since_midnight()
            .abs_diff(other.minutes_since_midnight())
    }

    pub(crate) fn parse_field(field: &str, value: &str) -> ValidationResult<Self> {
        value.parse().map_err(|_| ValidationError::InvalidTime {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// 时间格式错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid HH:MM time: {0}")]
pub struct ParseTimeError(String);

impl FromStr for TimeOfDay {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TIME_PATTERN
            .captures(s)
            .ok_or_else(|| ParseTimeError(s.to_string()))?;
        let hour: u8 = caps[1].parse().map_err(|_| ParseTimeError(s.to_string()))?;
        let minute: u8 = caps[2].parse().map_err(|_| ParseTimeError(s.to_string()))?;
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ParseTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

/// 星期集合，0 = 周日 ... 6 = 周六
///
/// 内部为 7 位掩码，序列化为升序整数数组。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<u8>")]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    const ALL_BITS: u8 = 0b0111_1111;

    pub const fn all() -> Self {
        Self(Self::ALL_BITS)
    }

    /// 从星期序号构造，越界序号报错
    pub fn from_days<I>(days: I) -> ValidationResult<Self>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut mask = 0u8;
        for day in days {
            if !(0..=6).contains(&day) {
                return Err(ValidationError::DayOutOfRange {
                    field: "days_of_week".to_string(),
                    day,
                });
            }
            mask |= 1u8 << day;
        }
        Ok(Self(mask))
    }

    pub fn contains(&self, weekday: u8) -> bool {
        weekday < 7 && self.0 & (1u8 << weekday) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..7).filter(|day| self.contains(*day))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.iter().collect()
    }
}

impl Default for DaysOfWeek {
    fn default() -> Self {
        Self::all()
    }
}

impl TryFrom<Vec<i64>> for DaysOfWeek {
    type Error = ValidationError;

    fn try_from(days: Vec<i64>) -> Result<Self, Self::Error> {
        Self::from_days(days)
    }
}

impl From<DaysOfWeek> for Vec<u8> {
    fn from(days: DaysOfWeek) -> Self {
        days.to_vec()
    }
}

/// 提醒类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReminderCategory {
    Meditation,
    Yoga,
    Diet,
    Sleep,
    Exercise,
    Herbs,
    #[default]
    General,
}

impl ReminderCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderCategory::Meditation => "meditation",
            ReminderCategory::Yoga => "yoga",
            ReminderCategory::Diet => "diet",
            ReminderCategory::Sleep => "sleep",
            ReminderCategory::Exercise => "exercise",
            ReminderCategory::Herbs => "herbs",
            ReminderCategory::General => "general",
        }
    }
}

impl fmt::Display for ReminderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 提醒记录
///
/// 每条提醒只属于一个用户；调度器只回写 `last_triggered`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    /// 唯一标识
    pub id: String,

    /// 所属用户
    pub owner_id: String,

    /// 标题
    pub title: String,

    /// 内容
    pub message: String,

    /// 触发时间
    pub time: TimeOfDay,

    /// 对应体质
    pub dosha_type: Dosha,

    /// 类别
    pub category: ReminderCategory,

    /// 生效的星期
    pub days_of_week: DaysOfWeek,

    /// 是否启用
    pub is_active: bool,

    /// 是否用户自建
    pub is_custom: bool,

    /// 最近一次触发时间
    pub last_triggered: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    /// 创建新提醒，默认每天启用
    pub fn new(owner_id: &str, title: &str, message: &str, time: TimeOfDay) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            time,
            dosha_type: Dosha::General,
            category: ReminderCategory::General,
            days_of_week: DaysOfWeek::all(),
            is_active: true,
            is_custom: false,
            last_triggered: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_dosha(mut self, dosha: Dosha) -> Self {
        self.dosha_type = dosha;
        self
    }

    pub fn with_category(mut self, category: ReminderCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_days(mut self, days: DaysOfWeek) -> Self {
        self.days_of_week = days;
        self
    }

    /// 是否安排在指定星期（不考虑启用状态）
    pub fn is_scheduled_on(&self, weekday: u8) -> bool {
        self.days_of_week.contains(weekday)
    }

    /// 在给定时刻是否应触发
    pub fn is_due_at(&self, time: TimeOfDay, weekday: u8) -> bool {
        self.is_active && self.time == time && self.is_scheduled_on(weekday)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// 新建提醒的输入
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewReminder {
    pub title: String,
    pub message: String,
    /// 原始 HH:MM 字符串，创建时校验
    pub time: String,
    pub dosha_type: Option<Dosha>,
    pub category: Option<ReminderCategory>,
    pub days_of_week: Option<Vec<i64>>,
    pub is_custom: Option<bool>,
}

impl NewReminder {
    pub fn new(title: &str, message: &str, time: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            time: time.to_string(),
            ..Default::default()
        }
    }

    /// 校验并生成提醒记录，一次报告所有出错字段
    pub fn into_reminder(self, owner_id: &str) -> crate::error::Result<Reminder> {
        let mut violations = Violations::new();
        violations.check(require_text("title", &self.title));
        violations.check(require_text("message", &self.message));
        let time = violations.check(TimeOfDay::parse_field("time", &self.time));
        let days = match self.days_of_week {
            Some(days) => violations.check(DaysOfWeek::from_days(days)),
            None => Some(DaysOfWeek::all()),
        };
        violations.finish()?;

        let (Some(time), Some(days)) = (time, days) else {
            return Err(crate::error::AppError::Internal(
                "validated reminder fields missing".to_string(),
            ));
        };

        let mut reminder = Reminder::new(owner_id, self.title.trim(), &self.message, time)
            .with_dosha(self.dosha_type.unwrap_or_default())
            .with_category(self.category.unwrap_or_default())
            .with_days(days);
        reminder.is_custom = self.is_custom.unwrap_or(false);
        Ok(reminder)
    }
}

/// 部分更新输入
///
/// 空标题或空内容视为未提供。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderUpdates {
    pub title: Option<String>,
    pub message: Option<String>,
    pub time: Option<String>,
    pub dosha_type: Option<Dosha>,
    pub category: Option<ReminderCategory>,
    pub days_of_week: Option<Vec<i64>>,
    pub is_active: Option<bool>,
}

impl ReminderUpdates {
    /// 校验后应用到提醒上；校验失败时提醒保持不变
    pub fn apply_to(&self, reminder: &mut Reminder) -> crate::error::Result<()> {
        let mut violations = Violations::new();
        let time = match &self.time {
            Some(raw) => violations.check(TimeOfDay::parse_field("time", raw)),
            None => None,
        };
        let days = match &self.days_of_week {
            Some(raw) => violations.check(DaysOfWeek::from_days(raw.iter().copied())),
            None => None,
        };
        violations.finish()?;

        if let Some(title) = self.title.as_deref().filter(|t| !t.trim().is_empty()) {
            reminder.title = title.trim().to_string();
        }
        if let Some(message) = self.message.as_deref().filter(|m| !m.trim().is_empty()) {
            reminder.message = message.to_string();
        }
        if let Some(time) = time {
            reminder.time = time;
        }
        if let Some(dosha) = self.dosha_type {
            reminder.dosha_type = dosha;
        }
        if let Some(category) = self.category {
            reminder.category = category;
        }
        if let Some(days) = days {
            reminder.days_of_week = days;
        }
        if let Some(is_active) = self.is_active {
            reminder.is_active = is_active;
        }
        reminder.touch();
        Ok(())
    }
}
