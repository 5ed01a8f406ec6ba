//! Dinacharya - 体质评分与每日作息提醒
//!
//! 将体质分类器的概率分布聚合为 vata / pitta / kapha 三项评分，并按用户的
//! 作息提醒在指定时间、指定星期投递通知，每次计划触发最多投递一次。

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod scheduler;
pub mod services;
