use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::scoring::domain::{
    CompletionState, ContainerId, ElementId, ElementKind, ElementReference, GradeSignal,
    LearningElement, ScoreMetadata, UserId,
};
use crate::scoring::oracle::{
    CompletionOracle, ContainerScoringCheck, ElementDirectory, EnrollmentCheck, GradeOracle,
    OracleError, Oracles, ScoreMetadataStore,
};
use crate::scoring::{BatchScoreAggregator, ElementScorer};

pub(super) const STUDENT: UserId = UserId(7);
pub(super) const OUTSIDER: UserId = UserId(99);
pub(super) const COURSE: ContainerId = ContainerId(10);
pub(super) const PLAIN_COURSE: ContainerId = ContainerId(20);

#[derive(Default)]
pub(super) struct FakePlatform {
    pub(super) elements: HashMap<ElementId, ElementReference>,
    pub(super) metadata: HashMap<ElementId, f64>,
    pub(super) scored_containers: HashSet<ContainerId>,
    pub(super) enrollments: HashSet<(ContainerId, UserId)>,
    pub(super) tracked: HashSet<ElementId>,
    pub(super) completion: HashMap<(ElementId, UserId), CompletionState>,
    pub(super) grades: HashMap<(ElementId, UserId), GradeSignal>,
    pub(super) offline_grades: HashSet<ElementId>,
    pub(super) slow_grades: HashMap<ElementId, Duration>,
    pub(super) flaky_grade_failures: Arc<AtomicUsize>,
    pub(super) grade_calls: Arc<AtomicUsize>,
    pub(super) grades_in_flight: Arc<AtomicUsize>,
    pub(super) peak_grades_in_flight: Arc<AtomicUsize>,
}

impl FakePlatform {
    /// Scored course with the student enrolled and no elements yet.
    pub(super) fn course() -> Self {
        let mut platform = Self::default();
        platform.scored_containers.insert(COURSE);
        platform.enrollments.insert((COURSE, STUDENT));
        platform
    }

    pub(super) fn with_primitive(mut self, id: i64, max_score: f64) -> Self {
        self.add_element(id, COURSE, ElementKind::Primitive);
        self.metadata.insert(ElementId(id), max_score);
        self.tracked.insert(ElementId(id));
        self
    }

    pub(super) fn with_interactive(mut self, id: i64, max_score: f64) -> Self {
        self.add_element(id, COURSE, ElementKind::Interactive);
        self.metadata.insert(ElementId(id), max_score);
        self
    }

    pub(super) fn with_unscored(mut self, id: i64, container: ContainerId) -> Self {
        self.add_element(id, container, ElementKind::Primitive);
        self.tracked.insert(ElementId(id));
        self
    }

    pub(super) fn with_row(mut self, id: i64) -> Self {
        self.elements.insert(
            ElementId(id),
            ElementReference::Row {
                id: ElementId(id),
                container_id: COURSE,
                module_type_id: 17,
            },
        );
        self.metadata.insert(ElementId(id), 5.0);
        self
    }

    pub(super) fn completed(mut self, id: i64, state: CompletionState) -> Self {
        self.completion.insert((ElementId(id), STUDENT), state);
        self
    }

    pub(super) fn graded(mut self, id: i64, raw: f64, min: f64, max: f64) -> Self {
        self.grades
            .insert((ElementId(id), STUDENT), GradeSignal { raw, min, max });
        self
    }

    fn add_element(&mut self, id: i64, container_id: ContainerId, kind: ElementKind) {
        self.elements.insert(
            ElementId(id),
            ElementReference::Resolved(LearningElement {
                id: ElementId(id),
                container_id,
                kind,
            }),
        );
    }

    pub(super) fn element(&self, id: i64) -> LearningElement {
        match self.elements.get(&ElementId(id)) {
            Some(ElementReference::Resolved(element)) => *element,
            other => panic!("element {id} is not resolved: {other:?}"),
        }
    }
}

impl CompletionOracle for FakePlatform {
    fn is_enabled(&self, element: &LearningElement) -> Result<bool, OracleError> {
        Ok(self.tracked.contains(&element.id))
    }

    fn state(
        &self,
        element: &LearningElement,
        user: UserId,
    ) -> Result<CompletionState, OracleError> {
        Ok(self
            .completion
            .get(&(element.id, user))
            .copied()
            .unwrap_or_default())
    }
}

impl GradeOracle for FakePlatform {
    fn grade(
        &self,
        element: &LearningElement,
        user: UserId,
    ) -> Result<Option<GradeSignal>, OracleError> {
        self.grade_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.slow_grades.get(&element.id) {
            let running = self.grades_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_grades_in_flight
                .fetch_max(running, Ordering::SeqCst);
            std::thread::sleep(*delay);
            self.grades_in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        if self.offline_grades.contains(&element.id) {
            return Err(OracleError::Unavailable("gradebook offline".to_string()));
        }
        let remaining = self.flaky_grade_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.flaky_grade_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(OracleError::Unavailable("gradebook busy".to_string()));
        }
        Ok(self.grades.get(&(element.id, user)).copied())
    }
}

impl ScoreMetadataStore for FakePlatform {
    fn get(&self, element_id: ElementId) -> Result<Option<ScoreMetadata>, OracleError> {
        Ok(self
            .metadata
            .get(&element_id)
            .map(|max_score| ScoreMetadata {
                element_id,
                max_score: *max_score,
            }))
    }
}

impl EnrollmentCheck for FakePlatform {
    fn is_enrolled(&self, container_id: ContainerId, user: UserId) -> Result<bool, OracleError> {
        Ok(self.enrollments.contains(&(container_id, user)))
    }
}

impl ContainerScoringCheck for FakePlatform {
    fn is_scored(&self, container_id: ContainerId) -> Result<bool, OracleError> {
        Ok(self.scored_containers.contains(&container_id))
    }
}

impl ElementDirectory for FakePlatform {
    fn resolve(&self, element_id: ElementId) -> Result<Option<ElementReference>, OracleError> {
        Ok(self.elements.get(&element_id).cloned())
    }
}

pub(super) fn scorer(platform: FakePlatform) -> ElementScorer {
    ElementScorer::new(Oracles::from_platform(Arc::new(platform)))
}

pub(super) fn aggregator(platform: FakePlatform) -> BatchScoreAggregator {
    BatchScoreAggregator::new(Oracles::from_platform(Arc::new(platform)))
}

pub(super) fn ids(raw: &[i64]) -> Vec<ElementId> {
    raw.iter().copied().map(ElementId).collect()
}
