//! Sequential executor.
//!
//! Runs a validated unit list strictly in order, one unit at a time. Each
//! unit sees its prompt plus the outputs of its dependencies, in the order
//! the dependencies are declared. The first failure aborts the run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PanelError;
use crate::graph::validate_graph;
use crate::llms::GeneratorSet;
use crate::task::{UnitKind, UnitOfWork};

/// Called after every unit that finishes successfully.
pub type UnitCallback = Arc<dyn Fn(&UnitOfWork) + Send + Sync>;

/// Appended to an approved synthesis.
pub const APPROVAL_FOOTER: &str = "*✅ Reviewed and approved by the panel coordinator.*";

/// Heading for review feedback appended to a synthesis that was not approved.
pub const REVIEW_NOTES_HEADING: &str = "## 📝 Quality Review Notes";

/// Per-run state: the bound message and every output recorded so far.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    original_message: String,
    outputs: HashMap<String, String>,
}

impl ExecutionContext {
    pub fn new(original_message: impl Into<String>) -> Self {
        Self {
            original_message: original_message.into(),
            outputs: HashMap::new(),
        }
    }

    pub fn original_message(&self) -> &str {
        &self.original_message
    }

    pub fn output(&self, unit_id: &str) -> Option<&str> {
        self.outputs.get(unit_id).map(String::as_str)
    }

    /// Record a unit's output. A second write for the same unit is a defect.
    pub fn record(&mut self, unit_id: &str, output: &str) -> Result<(), PanelError> {
        if self.outputs.contains_key(unit_id) {
            return Err(PanelError::defect(unit_id, "output already recorded"));
        }
        self.outputs.insert(unit_id.to_string(), output.to_string());
        Ok(())
    }

    /// Dependency outputs for `unit`, in declared order.
    pub fn context_for(&self, unit: &UnitOfWork) -> Result<Vec<String>, PanelError> {
        unit.dependencies
            .iter()
            .map(|dep| {
                self.output(dep)
                    .map(str::to_string)
                    .ok_or_else(|| PanelError::defect(&unit.id, format!("no recorded output for dependency '{}'", dep)))
            })
            .collect()
    }
}

/// Outcome of the quality review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Approved,
    RevisionRequested,
}

impl ReviewVerdict {
    /// A review approves when its text opens with `APPROVED`, ignoring case
    /// and leading markdown emphasis.
    pub fn from_review(review: &str) -> Self {
        if after_approval(review).is_some() {
            ReviewVerdict::Approved
        } else {
            ReviewVerdict::RevisionRequested
        }
    }
}

/// Text following a leading `APPROVED`, or `None` when the review does not approve.
fn after_approval(review: &str) -> Option<&str> {
    let head = review.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_' | '#' | '`'));
    match head.get(..8) {
        Some(word) if word.eq_ignore_ascii_case("approved") => Some(&head[8..]),
        _ => None,
    }
}

/// Synthesis combined with the review outcome.
///
/// An approval gets the footer. Any remarks the reviewer added after the
/// approval, and every revision request, follow under the review notes heading.
pub fn compose_final_text(synthesis: &str, review: &str, verdict: ReviewVerdict) -> String {
    let synthesis = synthesis.trim_end();
    let notes = format!("{}\n\n{}\n", REVIEW_NOTES_HEADING, review.trim());

    match verdict {
        ReviewVerdict::Approved => {
            let remarks = after_approval(review).map_or(false, |rest| rest.chars().any(char::is_alphanumeric));
            if remarks {
                format!("{}\n\n---\n\n{}\n\n{}", synthesis, APPROVAL_FOOTER, notes)
            } else {
                format!("{}\n\n---\n\n{}\n", synthesis, APPROVAL_FOOTER)
            }
        }
        ReviewVerdict::RevisionRequested => format!("{}\n\n---\n\n{}", synthesis, notes),
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Every unit, all `Done`, outputs recorded.
    pub units: Vec<UnitOfWork>,
    pub synthesis: String,
    pub review: String,
    pub verdict: ReviewVerdict,
    pub final_text: String,
}

/// Executes a unit list in order against a [`GeneratorSet`].
#[derive(Clone)]
pub struct SequentialExecutor {
    generators: GeneratorSet,
    unit_timeout: Option<Duration>,
    on_unit_complete: Option<UnitCallback>,
}

impl SequentialExecutor {
    pub fn new(generators: GeneratorSet) -> Self {
        Self {
            generators,
            unit_timeout: None,
            on_unit_complete: None,
        }
    }

    pub fn with_unit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.unit_timeout = timeout;
        self
    }

    pub fn with_unit_callback(mut self, callback: UnitCallback) -> Self {
        self.on_unit_complete = Some(callback);
        self
    }

    /// Run `units` for `message`.
    pub async fn run(&self, mut units: Vec<UnitOfWork>, message: &str) -> Result<ExecutionReport, PanelError> {
        if message.trim().is_empty() {
            return Err(PanelError::InputEmpty);
        }
        validate_graph(&units)?;

        let mut ctx = ExecutionContext::new(message);
        log::debug!(
            "Executing {} units for a {}-character message",
            units.len(),
            ctx.original_message().chars().count()
        );

        for unit in units.iter_mut() {
            let context = ctx.context_for(unit)?;
            unit.start();
            log::debug!(
                "Starting {} (owner={}, {} context items)",
                unit.id,
                unit.owner,
                context.len()
            );

            let output = match self.invoke(unit, &context).await {
                Ok(output) => output,
                Err(reason) => {
                    unit.fail();
                    log::error!("Unit {} failed: {}", unit.id, reason);
                    return Err(unit.execution_error(reason));
                }
            };

            ctx.record(&unit.id, &output)?;
            unit.complete(output)?;
            log::debug!(
                "Finished {} in {:.2}s",
                unit.id,
                unit.execution_duration().unwrap_or_default()
            );

            if let Some(callback) = &self.on_unit_complete {
                callback(&*unit);
            }
        }

        let synthesis = output_of_kind(&units, UnitKind::Synthesis)?;
        let review = output_of_kind(&units, UnitKind::Review)?;
        let verdict = ReviewVerdict::from_review(&review);
        let final_text = compose_final_text(&synthesis, &review, verdict);

        log::info!("Panel run finished: {} units, verdict {:?}", units.len(), verdict);

        Ok(ExecutionReport {
            units,
            synthesis,
            review,
            verdict,
            final_text,
        })
    }

    /// One generation call, bounded by the unit timeout. Empty output is a failure.
    async fn invoke(&self, unit: &UnitOfWork, context: &[String]) -> Result<String, String> {
        let generator = self.generators.for_owner(&unit.owner);
        let call = generator.generate(&unit.prompt, context);

        let result = match self.unit_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| format!("timed out after {}s", limit.as_secs_f64()))?,
            None => call.await,
        };

        let output = result.map_err(|e| e.to_string())?;
        if output.trim().is_empty() {
            return Err("generator returned empty output".to_string());
        }
        Ok(output)
    }
}

impl std::fmt::Debug for SequentialExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialExecutor")
            .field("generators", &self.generators)
            .field("unit_timeout", &self.unit_timeout)
            .field("on_unit_complete", &self.on_unit_complete.is_some())
            .finish()
    }
}

fn output_of_kind(units: &[UnitOfWork], kind: UnitKind) -> Result<String, PanelError> {
    let unit = units
        .iter()
        .find(|u| u.kind == kind)
        .ok_or_else(|| PanelError::defect(kind.to_string(), format!("graph has no {} unit", kind)))?;
    unit.output
        .clone()
        .ok_or_else(|| PanelError::defect(&unit.id, "finished without output"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::graph::TaskGraphBuilder;
    use crate::llms::testing::{ScriptedGenerator, StalledGenerator};
    use crate::routing::SelectionResult;
    use crate::specialists::SpecialistRegistry;
    use crate::task::UnitStatus;

    const MESSAGE: &str = "Subject: scaling our 150-person team";

    fn units(ids: &[&str]) -> Vec<UnitOfWork> {
        let registry = SpecialistRegistry::builtin().unwrap();
        let known: Vec<String> = registry.ids().into_iter().map(str::to_string).collect();
        let selection = SelectionResult::from_ids(ids, &known, 3);
        TaskGraphBuilder::new(&registry).build(&selection, MESSAGE).unwrap()
    }

    fn script() -> ScriptedGenerator {
        script_with_review("APPROVED")
    }

    fn script_with_review(review: &str) -> ScriptedGenerator {
        ScriptedGenerator::new("fallback")
            .reply("area of expertise as Julie Zhuo", "RELEVANT: team scaling")
            .reply("area of expertise as Roger Martin", "RELEVANT: strategy")
            .reply("your expertise as Julie Zhuo", "Julie says: grow managers first.")
            .reply("your expertise as Roger Martin", "Roger says: choose where to play.")
            .reply(
                "Compile all expert responses",
                "## 🎯 Key Insights from Expert Panel\n\n### 👥 Julie Zhuo on Team Dynamics & Scaling\n...\n\n### 📈 Roger Martin on Strategy & Market Positioning\n...\n\n## 🎯 Integrated Recommendations\n1. Act.",
            )
            .reply("Review the synthesized reply", review)
    }

    fn executor(generator: Arc<ScriptedGenerator>) -> SequentialExecutor {
        SequentialExecutor::new(GeneratorSet::new(generator))
    }

    #[tokio::test]
    async fn test_runs_in_order_with_dependency_context() {
        let generator = Arc::new(script());
        let report = executor(generator.clone())
            .run(units(&["julie_zhuo", "roger_martin"]), MESSAGE)
            .await
            .unwrap();

        let calls = generator.calls();
        assert_eq!(calls.len(), 6);
        assert!(calls[0].context.is_empty());
        assert_eq!(calls[1].context, vec!["RELEVANT: team scaling".to_string()]);
        assert_eq!(
            calls[4].context,
            vec![
                "Julie says: grow managers first.".to_string(),
                "Roger says: choose where to play.".to_string()
            ]
        );
        assert_eq!(calls[5].context, vec![report.synthesis.clone()]);

        assert!(report.units.iter().all(|u| u.status == UnitStatus::Done));
        assert_eq!(report.verdict, ReviewVerdict::Approved);
        assert_eq!(report.final_text.matches("### ").count(), 2);
        assert!(report.final_text.contains("## 🎯 Integrated Recommendations"));
        assert!(report.final_text.contains(APPROVAL_FOOTER));
    }

    #[tokio::test]
    async fn test_failing_assessment_aborts_before_response_and_synthesis() {
        let generator = Arc::new(script().fail_on("area of expertise as Julie Zhuo"));
        let err = executor(generator.clone())
            .run(units(&["julie_zhuo", "roger_martin"]), MESSAGE)
            .await
            .unwrap_err();

        match err {
            PanelError::UnitExecution { unit_id, kind, specialist, .. } => {
                assert_eq!(unit_id, "julie_zhuo.assessment");
                assert_eq!(kind, UnitKind::Assessment);
                assert_eq!(specialist.as_deref(), Some("julie_zhuo"));
            }
            other => panic!("expected UnitExecution, got {:?}", other),
        }
        assert_eq!(generator.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_output_is_failure() {
        let generator = Arc::new(script().empty_on("Compile all expert responses"));
        let err = executor(generator.clone())
            .run(units(&["roger_martin"]), MESSAGE)
            .await
            .unwrap_err();

        assert_eq!(err.unit_id(), Some("synthesis"));
        assert!(err.to_string().contains("empty output"));
        // review never invoked
        assert_eq!(generator.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_revision_feedback_is_appended() {
        let generator = Arc::new(script_with_review("Add a timeline for the reorg."));
        let report = executor(generator)
            .run(units(&["roger_martin"]), MESSAGE)
            .await
            .unwrap();

        assert_eq!(report.verdict, ReviewVerdict::RevisionRequested);
        assert!(report
            .final_text
            .ends_with("## 📝 Quality Review Notes\n\nAdd a timeline for the reorg.\n"));
    }

    #[tokio::test]
    async fn test_empty_selection_still_synthesizes() {
        let generator = Arc::new(script());
        let report = executor(generator.clone()).run(units(&[]), MESSAGE).await.unwrap();

        let calls = generator.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].context.is_empty());
        assert_eq!(report.units.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_graph_fails_fast() {
        let generator = Arc::new(script());
        let bad = vec![
            UnitOfWork::new("b", UnitKind::Response, "x", "p").with_dependencies(vec!["a".to_string()]),
            UnitOfWork::new("a", UnitKind::Assessment, "x", "p"),
        ];
        let err = executor(generator.clone()).run(bad, MESSAGE).await.unwrap_err();
        assert!(matches!(err, PanelError::GraphConstructionDefect { .. }));
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unit_callback_sees_each_finished_unit() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let exec = executor(Arc::new(script())).with_unit_callback(Arc::new(move |unit: &UnitOfWork| {
            sink.lock().unwrap().push((unit.id.clone(), unit.status));
        }));

        exec.run(units(&["julie_zhuo"]), MESSAGE).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], ("julie_zhuo.assessment".to_string(), UnitStatus::Done));
        assert_eq!(seen[3].0, "quality_review");
    }

    #[tokio::test]
    async fn test_unit_timeout() {
        let exec = SequentialExecutor::new(GeneratorSet::new(Arc::new(StalledGenerator)))
            .with_unit_timeout(Some(Duration::from_millis(50)));
        let err = exec.run(units(&["chris_voss"]), MESSAGE).await.unwrap_err();

        assert_eq!(err.unit_id(), Some("chris_voss.assessment"));
        assert!(err.to_string().contains("timed out after 0.05s"));
    }

    #[test]
    fn test_review_verdict() {
        assert_eq!(ReviewVerdict::from_review("APPROVED"), ReviewVerdict::Approved);
        assert_eq!(ReviewVerdict::from_review("  approved - looks good"), ReviewVerdict::Approved);
        assert_eq!(ReviewVerdict::from_review("**APPROVED**"), ReviewVerdict::Approved);
        assert_eq!(ReviewVerdict::from_review("Not approved"), ReviewVerdict::RevisionRequested);
        assert_eq!(ReviewVerdict::from_review(""), ReviewVerdict::RevisionRequested);
    }

    #[test]
    fn test_approval_with_remarks_keeps_them() {
        let review = "APPROVED, but add a 90-day timeline for the reorg.";
        let verdict = ReviewVerdict::from_review(review);
        assert_eq!(verdict, ReviewVerdict::Approved);

        let text = compose_final_text("SYN", review, verdict);
        assert_eq!(
            text,
            format!(
                "SYN\n\n---\n\n{}\n\n{}\n\n{}\n",
                APPROVAL_FOOTER, REVIEW_NOTES_HEADING, review
            )
        );
    }

    #[test]
    fn test_bare_approval_gets_only_the_footer() {
        for review in ["APPROVED", "**Approved.**", "  approved!\n"] {
            let text = compose_final_text("SYN\n", review, ReviewVerdict::from_review(review));
            assert_eq!(text, format!("SYN\n\n---\n\n{}\n", APPROVAL_FOOTER));
        }
    }

    #[tokio::test]
    async fn test_approving_review_remarks_reach_final_text() {
        let generator = Arc::new(script_with_review("APPROVED. Name an owner for each action."));
        let report = executor(generator)
            .run(units(&["roger_martin"]), MESSAGE)
            .await
            .unwrap();

        assert_eq!(report.verdict, ReviewVerdict::Approved);
        assert!(report.final_text.contains(APPROVAL_FOOTER));
        assert!(report
            .final_text
            .ends_with("## 📝 Quality Review Notes\n\nAPPROVED. Name an owner for each action.\n"));
    }

    #[test]
    fn test_context_record_is_write_once() {
        let mut ctx = ExecutionContext::new("m");
        ctx.record("a", "one").unwrap();
        assert!(ctx.record("a", "two").is_err());
        assert_eq!(ctx.output("a"), Some("one"));
        assert_eq!(ctx.original_message(), "m");
    }
}
