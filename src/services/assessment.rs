//! Assessment Service
//!
//! Runs a questionnaire through the constitution classifier, aggregates the
//! resulting distribution into dosha scores and stores the assessment.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::assessment::Assessment;
use crate::models::assessment_repository::AssessmentRepository;
use crate::models::dosha::{ClassifierOutput, Dosha};
use crate::models::validation::{ValidationError, Violations};

/// Questionnaire features the classifier was trained on, in training order
pub const REQUIRED_FEATURES: [&str; 29] = [
    "Body Size",
    "Body Weight",
    "Height",
    "Bone Structure",
    "Complexion",
    "General feel of skin",
    "Texture of Skin",
    "Skin Sensitivity",
    "Hair Color",
    "Appearance of Hair",
    "Shape of face",
    "Eyes",
    "Eyelashes",
    "Blinking of Eyes",
    "Cheeks",
    "Nose",
    "Teeth and gums",
    "Lips",
    "Nails",
    "Appetite",
    "Liking tastes",
    "Metabolism Type",
    "Climate Preference",
    "Stress Levels",
    "Sleep Patterns",
    "Dietary Habits",
    "Physical Activity Level",
    "Water Intake",
    "Digestion Quality",
];

/// Constitution classifier boundary
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, features: &HashMap<String, String>) -> Result<ClassifierOutput>;
}

#[derive(Clone)]
pub struct AssessmentService {
    classifier: Arc<dyn Classifier>,
    repo: Arc<dyn AssessmentRepository>,
}

impl AssessmentService {
    pub fn new(classifier: Arc<dyn Classifier>, repo: Arc<dyn AssessmentRepository>) -> Self {
        Self { classifier, repo }
    }

    /// Assess an owner from questionnaire answers.
    ///
    /// All 29 features must carry a non-blank answer; every missing one is
    /// reported. Classifier failures and out-of-range output surface as a
    /// single `Classifier` error and nothing is stored.
    pub async fn assess(
        &self,
        owner_id: &str,
        features: HashMap<String, String>,
    ) -> Result<Assessment> {
        let mut violations = Violations::new();
        for name in REQUIRED_FEATURES {
            let answered = features.get(name).is_some_and(|v| !v.trim().is_empty());
            if !answered {
                violations.push(ValidationError::missing(name));
            }
        }
        violations.finish()?;

        tracing::info!(
            "Classifying {} features for {}",
            features.len(),
            owner_id
        );
        let output = self
            .classifier
            .classify(&features)
            .await
            .map_err(classifier_failure)?;
        output.validate().map_err(classifier_failure)?;
        let scores = output.aggregate().map_err(classifier_failure)?;

        tracing::info!(
            "Assessed {}: dominant '{}' (confidence {:.2}) vata={} pitta={} kapha={}",
            owner_id,
            scores.dominant,
            output.confidence,
            scores.vata,
            scores.pitta,
            scores.kapha
        );

        let assessment = Assessment::from_classifier(owner_id, output, scores, features);
        self.repo.save(&assessment).await
    }

    pub async fn latest(&self, owner_id: &str) -> Result<Option<Assessment>> {
        self.repo.get(owner_id).await
    }

    /// Dominant label used for seeding; `general` when never assessed
    pub async fn dominant_for(&self, owner_id: &str) -> Result<String> {
        Ok(self
            .repo
            .get(owner_id)
            .await?
            .map(|a| a.dominant().to_string())
            .unwrap_or_else(|| Dosha::General.as_str().to_string()))
    }
}

fn classifier_failure(err: AppError) -> AppError {
    match err {
        AppError::Classifier(_) => err,
        other => AppError::Classifier(other.to_string()),
    }
}
