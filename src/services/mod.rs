//! 服务模块

pub mod assessment;
pub mod reminder_manager;
pub mod score_aggregator;
pub mod template_catalog;

pub use assessment::{AssessmentService, Classifier, REQUIRED_FEATURES};
pub use reminder_manager::ReminderManager;
pub use score_aggregator::aggregate;
pub use template_catalog::{ReminderTemplate, nearest_in, nearest_template, templates_for};
