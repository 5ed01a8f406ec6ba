//! 核心数据模型模块
//!
//! 定义体质评分、评估记录与每日提醒的数据结构，以及对应的仓储 trait。

pub mod assessment;
pub mod assessment_repository;
pub mod dosha;
pub mod reminder;
pub mod reminder_repository;
pub mod validation;

pub use assessment::*;
pub use dosha::*;
pub use reminder::*;
