//! Core types for Cortex MI
//!
//! This module provides the identifiers shared across the system:
//! - Subject identifiers for the PhysioNet motor movement/imagery cohort
//! - Run identifiers and the task catalog mapping tasks to run triples
//! - Artifact keys addressing a persisted (subject, task) training result
//! - Integer class labels

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Integer-coded class assignment of one epoch.
pub type ClassLabel = i32;

// ============================================================================
// Subject Identifiers
// ============================================================================

/// Subject number in the recording cohort (1..=110).
///
/// # Example
///
/// ```
/// use cortex_mi_core::types::SubjectId;
///
/// assert!(SubjectId::new(42).is_ok());
/// assert!(SubjectId::new(0).is_err());
/// assert_eq!(SubjectId::all().count(), 110);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SubjectId(u8);

impl SubjectId {
    /// Lowest subject number
    pub const MIN: u8 = 1;

    /// Highest subject number
    pub const MAX: u8 = 110;

    /// Create a subject identifier, rejecting numbers outside the cohort.
    pub fn new(number: u8) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&number) {
            Ok(Self(number))
        } else {
            Err(ValidationError::out_of_range(
                "subject",
                format_args!("{}..={}", Self::MIN, Self::MAX),
                number,
            ))
        }
    }

    /// Subject number
    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Every subject in the cohort, in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<u8> for SubjectId {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubjectId> for u8 {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Runs and Tasks
// ============================================================================

/// Recording run number within a subject session (1..=14).
///
/// Runs 1 and 2 are eyes-open/eyes-closed baselines; runs 3-14 alternate
/// between the four motor tasks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RunId(u8);

impl RunId {
    /// Highest run number in a session
    pub const MAX: u8 = 14;

    /// Create a run identifier.
    pub fn new(number: u8) -> Result<Self, ValidationError> {
        if (1..=Self::MAX).contains(&number) {
            Ok(Self(number))
        } else {
            Err(ValidationError::out_of_range("run", format_args!("1..={}", Self::MAX), number))
        }
    }

    /// Run number
    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RunId {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RunId> for u8 {
    fn from(id: RunId) -> Self {
        id.0
    }
}

/// 1-based ordinal of a task inside a [`TaskCatalog`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u8);

impl TaskId {
    /// Create a task ordinal. Validity is checked against a catalog.
    #[inline]
    #[must_use]
    pub const fn new(ordinal: u8) -> Self {
        Self(ordinal)
    }

    /// Ordinal value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One experimental task: a name and the three runs recorded for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    name: String,
    runs: [RunId; 3],
}

impl TaskDefinition {
    /// Create a task definition.
    pub fn new(name: impl Into<String>, runs: [RunId; 3]) -> Self {
        Self { name: name.into(), runs }
    }

    /// Human-readable task name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs recorded for this task
    #[must_use]
    pub const fn runs(&self) -> &[RunId; 3] {
        &self.runs
    }
}

/// Ordered catalog of tasks; a [`TaskId`] is a 1-based position in it.
///
/// The catalog is passed explicitly to the loader and to artifact naming so
/// the mapping from task ordinal to run triple is never implicit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaskDefinition>", into = "Vec<TaskDefinition>")]
pub struct TaskCatalog {
    tasks: Vec<TaskDefinition>,
}

impl TaskCatalog {
    /// Build a catalog from task definitions in ordinal order.
    pub fn new(tasks: Vec<TaskDefinition>) -> Result<Self, ValidationError> {
        if tasks.is_empty() {
            return Err(ValidationError::InvalidParameter {
                parameter: "catalog",
                reason: "task catalog must contain at least one task".to_string(),
            });
        }
        if tasks.len() > usize::from(u8::MAX) {
            return Err(ValidationError::InvalidParameter {
                parameter: "catalog",
                reason: format!("task catalog holds {} tasks, at most 255 allowed", tasks.len()),
            });
        }
        Ok(Self { tasks })
    }

    /// Look up a task by ordinal.
    pub fn get(&self, id: TaskId) -> Result<&TaskDefinition, ValidationError> {
        usize::from(id.0)
            .checked_sub(1)
            .and_then(|index| self.tasks.get(index))
            .ok_or_else(|| {
                let (low, high) = self.range();
                ValidationError::out_of_range("task", format_args!("{low}..={high}"), id)
            })
    }

    /// Inclusive range of valid task ordinals.
    #[must_use]
    pub fn range(&self) -> (TaskId, TaskId) {
        (TaskId(1), TaskId(self.len() as u8))
    }

    /// All task ordinals in order.
    pub fn ids(&self) -> impl Iterator<Item = TaskId> {
        (1..=self.len() as u8).map(TaskId)
    }

    /// Tasks paired with their ordinals.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &TaskDefinition)> {
        self.ids().zip(self.tasks.iter())
    }

    /// Ordinal of the task recorded with exactly these runs.
    #[must_use]
    pub fn index_of(&self, runs: &[RunId]) -> Option<TaskId> {
        self.iter()
            .find(|(_, task)| task.runs.as_slice() == runs)
            .map(|(id, _)| id)
    }

    /// Number of tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl TryFrom<Vec<TaskDefinition>> for TaskCatalog {
    type Error = ValidationError;

    fn try_from(tasks: Vec<TaskDefinition>) -> Result<Self, Self::Error> {
        Self::new(tasks)
    }
}

impl From<TaskCatalog> for Vec<TaskDefinition> {
    fn from(catalog: TaskCatalog) -> Self {
        catalog.tasks
    }
}

impl Default for TaskCatalog {
    /// The four motor tasks of the PhysioNet EEG Motor Movement/Imagery set.
    fn default() -> Self {
        let task = |name: &str, runs: [u8; 3]| TaskDefinition {
            name: name.to_string(),
            runs: runs.map(RunId),
        };

        Self {
            tasks: vec![
                task("open and close left or right fist", [3, 7, 11]),
                task("imagine opening and closing left or right fist", [4, 8, 12]),
                task("open and close both fists or both feet", [5, 9, 13]),
                task("imagine opening and closing both fists or both feet", [6, 10, 14]),
            ],
        }
    }
}

// ============================================================================
// Artifact Keys
// ============================================================================

/// Identity of one (subject, task) training result.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// Subject the model was trained for
    pub subject: SubjectId,
    /// Task the model was trained on
    pub task: TaskId,
}

impl ArtifactKey {
    /// Create a key.
    #[must_use]
    pub const fn new(subject: SubjectId, task: TaskId) -> Self {
        Self { subject, task }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}_t{}", self.subject, self.task)
    }
}

// ============================================================================
// Tests
// ============================================================================
