use tracing::debug;

use super::calculator::{linear_score, percentage_achieved, score};
use super::domain::{
    AchievementSignal, ElementId, ElementKind, ElementReference, LearningElement, ScoreError,
    ScoreMetadata, ScoreResult, UserId,
};
use super::oracle::Oracles;

/// Computes the achievement score of one element for one user.
pub struct ElementScorer {
    oracles: Oracles,
}

impl ElementScorer {
    pub fn new(oracles: Oracles) -> Self {
        Self { oracles }
    }

    pub fn oracles(&self) -> &Oracles {
        &self.oracles
    }

    /// Score an element as delivered by the platform, rejecting unresolved shapes.
    pub fn score_reference(&self, reference: ElementReference, user: UserId) -> ScoreResult {
        let element = LearningElement::try_from(reference)?;
        self.score_for(&element, user)
    }

    pub fn score_for(&self, element: &LearningElement, user: UserId) -> ScoreResult {
        let metadata = self.admit(element, user)?;
        let signal = self.signal(element, user)?;
        let achieved = reduce(element.id, signal, metadata.max_score)?;

        debug!(
            element_id = %element.id,
            kind = element.kind.label(),
            %user,
            score = achieved,
            max_score = metadata.max_score,
            "element scored"
        );
        Ok(achieved)
    }

    /// Enrollment, container registration, then valid metadata, in that order.
    fn admit(&self, element: &LearningElement, user: UserId) -> Result<ScoreMetadata, ScoreError> {
        if !self.oracles.enrollment.is_enrolled(element.container_id, user)? {
            return Err(ScoreError::UserNotEnrolled {
                user_id: user,
                container_id: element.container_id,
            });
        }

        if !self.oracles.containers.is_scored(element.container_id)? {
            return Err(ScoreError::ContainerNotScored {
                container_id: element.container_id,
            });
        }

        let metadata = self
            .oracles
            .metadata
            .get(element.id)?
            .ok_or(ScoreError::ElementNotScored {
                element_id: element.id,
            })?;

        // Scores must stay within [0, max_score].
        if !metadata.max_score.is_finite() || metadata.max_score < 0.0 {
            return Err(ScoreError::InvalidMaxScore {
                element_id: element.id,
                max_score: metadata.max_score,
            });
        }
        Ok(metadata)
    }

    fn signal(
        &self,
        element: &LearningElement,
        user: UserId,
    ) -> Result<AchievementSignal, ScoreError> {
        match element.kind {
            ElementKind::Interactive => {
                let grade = self.oracles.grades.grade(element, user)?;
                Ok(AchievementSignal::Grade(grade))
            }
            ElementKind::Primitive => {
                if !self.oracles.completion.is_enabled(element)? {
                    return Err(ScoreError::CompletionNotEnabled {
                        element_id: element.id,
                    });
                }
                let state = self.oracles.completion.state(element, user)?;
                Ok(AchievementSignal::Completion(state))
            }
        }
    }
}

fn reduce(element_id: ElementId, signal: AchievementSignal, max_score: f64) -> ScoreResult {
    match signal {
        AchievementSignal::Grade(None) => {
            debug!(%element_id, "no graded submission yet, assuming 0%");
            Ok(0.0)
        }
        AchievementSignal::Grade(Some(grade)) => {
            let achieved = percentage_achieved(grade.raw, grade.max, grade.min)?;
            Ok(linear_score(max_score, achieved))
        }
        AchievementSignal::Completion(state) => {
            let achieved = if state.is_successful() { 1.0 } else { 0.0 };
            Ok(score(max_score, achieved))
        }
    }
}
