//! 体质评估记录
//!
//! 每个用户只保留最新一次评估，新评估整体覆盖旧记录。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::dosha::{ClassifierOutput, DoshaScores};

/// 评估方式
pub const ASSESSMENT_METHOD_ML: &str = "ML-Model";

/// 体质评估
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// 所属用户
    pub owner_id: String,

    /// 聚合后的评分
    pub scores: DoshaScores,

    /// 分类器原始预测
    pub raw_prediction: String,

    /// 置信度
    pub confidence: f64,

    /// 原始概率分布
    pub probabilities: HashMap<String, f64>,

    /// 问卷答案
    pub features: HashMap<String, String>,

    /// 评估方式
    pub method: String,

    /// 评估时间
    pub assessed_at: DateTime<Utc>,
}

impl Assessment {
    pub fn from_classifier(
        owner_id: &str,
        output: ClassifierOutput,
        scores: DoshaScores,
        features: HashMap<String, String>,
    ) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            scores,
            raw_prediction: output.prediction,
            confidence: output.confidence,
            probabilities: output.probabilities,
            features,
            method: ASSESSMENT_METHOD_ML.to_string(),
            assessed_at: Utc::now(),
        }
    }

    /// 模板选择使用的体质标签
    pub fn dominant(&self) -> &str {
        &self.scores.dominant
    }
}
