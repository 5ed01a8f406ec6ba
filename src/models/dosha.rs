//! 体质（Dosha）数据模型
//!
//! 分类器输出、三项体质评分以及体质标签。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{AppError, Result};
use crate::models::validation::{ValidationError, Violations};

/// 体质类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dosha {
    Vata,
    Pitta,
    Kapha,
    /// 未评估或无法识别时的通用类型
    #[default]
    General,
}

impl Dosha {
    /// 三种主要体质，按固定顺序
    pub const PRIMARY: [Dosha; 3] = [Dosha::Vata, Dosha::Pitta, Dosha::Kapha];

    /// 大小写不敏感解析，组合标签与未知标签返回 None
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "vata" => Some(Dosha::Vata),
            "pitta" => Some(Dosha::Pitta),
            "kapha" => Some(Dosha::Kapha),
            "general" => Some(Dosha::General),
            _ => None,
        }
    }

    /// 解析失败时回退到 General
    pub fn parse_or_general(label: &str) -> Self {
        Self::parse(label).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dosha::Vata => "vata",
            Dosha::Pitta => "pitta",
            Dosha::Kapha => "kapha",
            Dosha::General => "general",
        }
    }
}

impl fmt::Display for Dosha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分类器原始输出
///
/// 由外部推理进程产生，每次评估提交生成一次，之后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierOutput {
    /// 预测标签（可能是组合标签，如 "Vata+Pitta"）
    pub prediction: String,

    /// 置信度 (0.0-1.0)
    pub confidence: f64,

    /// 各标签概率，键名大小写不固定
    #[serde(default)]
    pub probabilities: HashMap<String, f64>,
}

impl ClassifierOutput {
    /// 解析分类器输出的 JSON
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw.trim())
            .map_err(|e| AppError::Classifier(format!("malformed classifier output: {}", e)))
    }

    /// 校验输出的数值范围
    pub fn validate(&self) -> Result<()> {
        let mut violations = Violations::new();

        if self.prediction.trim().is_empty() {
            violations.push(ValidationError::missing("prediction"));
        }

        if !self.confidence.is_finite() {
            violations.push(ValidationError::NotFinite {
                field: "confidence".to_string(),
            });
        } else if !(0.0..=1.0).contains(&self.confidence) {
            violations.push(ValidationError::OutOfRange {
                field: "confidence".to_string(),
                min: 0.0,
                max: 1.0,
                value: self.confidence,
            });
        }

        for error in check_probabilities(&self.probabilities) {
            violations.push(error);
        }
        for label in sorted_labels(&self.probabilities) {
            let value = self.probabilities[label];
            if value.is_finite() && value > 1.0 {
                violations.push(ValidationError::OutOfRange {
                    field: format!("probabilities.{}", label),
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }

        violations.finish()
    }

    /// 聚合为三项体质评分
    pub fn aggregate(&self) -> Result<DoshaScores> {
        crate::services::score_aggregator::aggregate(&self.probabilities, &self.prediction)
    }
}

/// 单个概率值必须是有限的非负数
fn check_probability(label: &str, value: f64) -> std::result::Result<(), ValidationError> {
    let field = format!("probabilities.{}", label);
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

/// 标签按不区分大小写的顺序排列，同名时大写在前
fn sorted_labels(probabilities: &HashMap<String, f64>) -> Vec<&String> {
    let mut labels: Vec<&String> = probabilities.keys().collect();
    labels.sort_by(|a, b| {
        a.to_ascii_lowercase()
            .cmp(&b.to_ascii_lowercase())
            .then_with(|| a.cmp(b))
    });
    labels
}

/// 校验全部概率值，并拒绝仅大小写不同的重复标签
///
/// 标签按大小写不敏感方式查找，重复标签会使结果取决于哈希表的遍历顺序。
pub(crate) fn check_probabilities(probabilities: &HashMap<String, f64>) -> Vec<ValidationError> {
    let labels = sorted_labels(probabilities);
    let mut errors: Vec<ValidationError> = labels
        .iter()
        .filter_map(|label| check_probability(label, probabilities[*label]).err())
        .collect();
    for pair in labels.windows(2) {
        if pair[0].eq_ignore_ascii_case(pair[1]) {
            errors.push(ValidationError::DuplicateLabel {
                field: format!("probabilities.{}", pair[1]),
                label: pair[0].clone(),
            });
        }
    }
    errors
}

/// 三项体质评分
///
/// 百分比各自独立取整，不保证总和为 100。
/// `dominant` 直接取自分类器预测，不从百分比重新推导。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoshaScores {
    pub vata: u32,
    pub pitta: u32,
    pub kapha: u32,
    /// 小写的预测标签
    pub dominant: String,
}

impl DoshaScores {
    /// 指定体质的百分比，General 没有分数
    pub fn score(&self, dosha: Dosha) -> Option<u32> {
        match dosha {
            Dosha::Vata => Some(self.vata),
            Dosha::Pitta => Some(self.pitta),
            Dosha::Kapha => Some(self.kapha),
            Dosha::General => None,
        }
    }

    /// 百分比最高的体质，并列时取 vata/pitta/kapha 中靠前者
    pub fn leading(&self) -> Dosha {
        let mut best = Dosha::Vata;
        for dosha in Dosha::PRIMARY {
            if self.score(dosha) > self.score(best) {
                best = dosha;
            }
        }
        best
    }

    /// 用于模板选择的体质类型
    pub fn dominant_dosha(&self) -> Dosha {
        Dosha::parse_or_general(&self.dominant)
    }

    /// 预测标签与最高分是否一致
    pub fn agrees_with_prediction(&self) -> bool {
        self.dominant_dosha() == self.leading()
    }
}
