//! Assessment 仓储
//!
//! 保存每个用户最近一次的体质评估。

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::models::assessment::Assessment;

/// Assessment 仓储 trait
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// 保存评估，覆盖该用户已有记录
    async fn save(&self, assessment: &Assessment) -> Result<Assessment>;

    /// 获取用户最近一次评估
    async fn get(&self, owner_id: &str) -> Result<Option<Assessment>>;
}

/// 内存实现
#[derive(Clone, Default)]
pub struct InMemoryAssessmentRepository {
    assessments: Arc<DashMap<String, Assessment>>,
}

impl InMemoryAssessmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryAssessmentRepository {
    async fn save(&self, assessment: &Assessment) -> Result<Assessment> {
        self.assessments
            .insert(assessment.owner_id.clone(), assessment.clone());
        Ok(assessment.clone())
    }

    async fn get(&self, owner_id: &str) -> Result<Option<Assessment>> {
        Ok(self
            .assessments
            .get(owner_id)
            .map(|entry| entry.value().clone()))
    }
}
