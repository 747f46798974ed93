use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a learning element (a course module on the host platform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub i64);

/// Identifier of the container (course) owning learning elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which achievement signal an element produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Completion-tracked activity scored all-or-nothing.
    Primitive,
    /// Graded activity (H5P-style) scored linearly against its grading scale.
    Interactive,
}

impl ElementKind {
    pub const fn label(self) -> &'static str {
        match self {
            ElementKind::Primitive => "primitive",
            ElementKind::Interactive => "interactive",
        }
    }
}

/// Canonical, fully resolved view of a learning element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningElement {
    pub id: ElementId,
    pub container_id: ContainerId,
    pub kind: ElementKind,
}

/// Element reference as handed over by the platform.
///
/// The platform exposes course modules in two incompatible shapes. Only the
/// resolved shape can be scored; translating raw rows is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ElementReference {
    Resolved(LearningElement),
    /// Raw course-module row, which names the module type by numeric id only.
    Row {
        id: ElementId,
        container_id: ContainerId,
        module_type_id: i64,
    },
}

impl ElementReference {
    pub fn id(&self) -> ElementId {
        match self {
            ElementReference::Resolved(element) => element.id,
            ElementReference::Row { id, .. } => *id,
        }
    }

    pub fn container_id(&self) -> ContainerId {
        match self {
            ElementReference::Resolved(element) => element.container_id,
            ElementReference::Row { container_id, .. } => *container_id,
        }
    }
}

impl From<LearningElement> for ElementReference {
    fn from(element: LearningElement) -> Self {
        ElementReference::Resolved(element)
    }
}

impl TryFrom<ElementReference> for LearningElement {
    type Error = ScoreError;

    fn try_from(reference: ElementReference) -> Result<Self, Self::Error> {
        match reference {
            ElementReference::Resolved(element) => Ok(element),
            ElementReference::Row { id, .. } => {
                Err(ScoreError::MalformedElementReference { element_id: id })
            }
        }
    }
}

/// Declares that an element participates in scoring and what it is worth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetadata {
    pub element_id: ElementId,
    pub max_score: f64,
}

/// Completion state reported for a tracked element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    #[default]
    Incomplete,
    Complete,
    /// Completed with a passing grade.
    CompletePass,
    /// Completed but the passing grade was missed.
    CompleteFail,
}

impl CompletionState {
    pub const fn is_successful(self) -> bool {
        matches!(self, CompletionState::Complete | CompletionState::CompletePass)
    }
}

/// Raw grade together with the bounds of its grading scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeSignal {
    pub raw: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-request achievement reading, shaped by element kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AchievementSignal {
    Completion(CompletionState),
    /// `None` until the user has a graded submission.
    Grade(Option<GradeSignal>),
}

pub type ScoreResult = Result<f64, ScoreError>;

/// Reasons a score could not be produced for an element.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("element {element_id} is not a resolved element reference")]
    MalformedElementReference { element_id: ElementId },
    #[error("element {element_id} does not exist")]
    UnknownElement { element_id: ElementId },
    #[error("user {user_id} is not enrolled in container {container_id}")]
    UserNotEnrolled {
        user_id: UserId,
        container_id: ContainerId,
    },
    #[error("container {container_id} is not registered for scoring")]
    ContainerNotScored { container_id: ContainerId },
    #[error("element {element_id} has no score metadata")]
    ElementNotScored { element_id: ElementId },
    #[error("element {element_id} declares an invalid max score {max_score}")]
    InvalidMaxScore { element_id: ElementId, max_score: f64 },
    #[error("completion tracking is not enabled for element {element_id}")]
    CompletionNotEnabled { element_id: ElementId },
    #[error("grading scale [{min}, {max}] is degenerate")]
    DivisionByZero { min: f64, max: f64 },
    #[error("oracle unavailable: {reason}")]
    OracleUnavailable { reason: String },
    #[error("no user given and no current user available")]
    NoCurrentUser,
}

impl ScoreError {
    /// Stable machine-readable code for reports.
    pub const fn code(&self) -> &'static str {
        match self {
            ScoreError::MalformedElementReference { .. } => "malformed_element_reference",
            ScoreError::UnknownElement { .. } => "unknown_element",
            ScoreError::UserNotEnrolled { .. } => "user_not_enrolled",
            ScoreError::ContainerNotScored { .. } => "container_not_scored",
            ScoreError::ElementNotScored { .. } => "element_not_scored",
            ScoreError::InvalidMaxScore { .. } => "invalid_max_score",
            ScoreError::CompletionNotEnabled { .. } => "completion_not_enabled",
            ScoreError::DivisionByZero { .. } => "division_by_zero",
            ScoreError::OracleUnavailable { .. } => "oracle_unavailable",
            ScoreError::NoCurrentUser => "no_current_user",
        }
    }

    /// Only oracle outages may succeed on a later attempt.
    pub const fn is_transient(&self) -> bool {
        matches!(self, ScoreError::OracleUnavailable { .. })
    }
}
