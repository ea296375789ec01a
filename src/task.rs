//! Units of work: one generation step each, with declared dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PanelError;
use crate::specialists::{Persona, COORDINATOR_ID};
use crate::tasks::prompts::MARKDOWN_INSTRUCTION;

/// Id of the single synthesis unit.
pub const SYNTHESIS_ID: &str = "synthesis";

/// Id of the single quality review unit.
pub const REVIEW_ID: &str = "quality_review";

/// `roger_martin.assessment`
pub fn assessment_id(specialist: &str) -> String {
    format!("{}.assessment", specialist)
}

/// `roger_martin.response`
pub fn response_id(specialist: &str) -> String {
    format!("{}.response", specialist)
}

/// What a unit does. Dependencies are recovered by kind, never by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Assessment,
    Response,
    Synthesis,
    Review,
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitKind::Assessment => "assessment",
            UnitKind::Response => "response",
            UnitKind::Synthesis => "synthesis",
            UnitKind::Review => "review",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a unit. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
}

/// One step of a panel run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOfWork {
    pub id: String,
    pub kind: UnitKind,
    /// Specialist id, or `coordinator`.
    pub owner: String,
    /// Fully rendered prompt, persona included.
    pub prompt: String,
    /// Ids of earlier units whose outputs form this unit's context, in order.
    pub dependencies: Vec<String>,
    pub status: UnitStatus,
    /// Set once, when the unit finishes successfully.
    pub output: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl UnitOfWork {
    pub fn new(
        id: impl Into<String>,
        kind: UnitKind,
        owner: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            owner: owner.into(),
            prompt: prompt.into(),
            dependencies: Vec::new(),
            status: UnitStatus::Pending,
            output: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// The owning specialist, or `None` for coordinator units.
    pub fn specialist(&self) -> Option<&str> {
        (self.owner != COORDINATOR_ID).then_some(self.owner.as_str())
    }

    pub(crate) fn start(&mut self) {
        self.status = UnitStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Record the output and mark the unit done. Outputs are write-once.
    pub(crate) fn complete(&mut self, output: String) -> Result<(), PanelError> {
        if self.output.is_some() {
            return Err(PanelError::defect(&self.id, "output already recorded"));
        }
        self.output = Some(output);
        self.status = UnitStatus::Done;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub(crate) fn fail(&mut self) {
        self.status = UnitStatus::Failed;
        self.finished_at = Some(Utc::now());
    }

    /// Execution time in seconds, if the unit has finished.
    pub fn execution_duration(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    /// Error for a failed invocation of this unit.
    pub(crate) fn execution_error(&self, reason: impl Into<String>) -> PanelError {
        PanelError::UnitExecution {
            unit_id: self.id.clone(),
            kind: self.kind,
            specialist: self.specialist().map(str::to_string),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unit(id={}, kind={}, owner={})", self.id, self.kind, self.owner)
    }
}

/// Persona preamble, task description, expected output and, optionally,
/// markdown formatting rules.
pub fn render_prompt(persona: &Persona, description: &str, expected_output: &str, markdown: bool) -> String {
    let mut slices = vec![
        format!("{}\n", persona.preamble()),
        description.to_string(),
        format!("Expected Output: {}", expected_output),
    ];
    if markdown {
        slices.push(MARKDOWN_INSTRUCTION.to_string());
    }
    slices.join("\n")
}
