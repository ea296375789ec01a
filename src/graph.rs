//! Task graph builder.
//!
//! For a selection of k specialists the graph is, in order:
//!
//! ```text
//! a.assessment -> a.response ┐
//! b.assessment -> b.response ├-> synthesis -> quality_review
//! ...                        ┘
//! ```
//!
//! `2k + 2` units. Every dependency points at a unit created earlier in the
//! same list, so list order is a valid execution order.

use std::collections::{HashMap, HashSet};

use crate::error::PanelError;
use crate::routing::SelectionResult;
use crate::specialists::{SpecialistProfile, SpecialistRegistry, COORDINATOR_ID};
use crate::task::{assessment_id, render_prompt, response_id, UnitKind, UnitOfWork, REVIEW_ID, SYNTHESIS_ID};
use crate::tasks::prompts::{
    ASSESSMENT_EXPECTED_OUTPUT, RESPONSE_EXPECTED_OUTPUT, REVIEW_EXPECTED_OUTPUT, REVIEW_TEMPLATE,
    SYNTHESIS_EXPECTED_OUTPUT, SYNTHESIS_TEMPLATE,
};
use crate::utilities::string_utils::interpolate;

/// Builds the per-request unit graph for a selection.
#[derive(Debug, Clone, Copy)]
pub struct TaskGraphBuilder<'a> {
    registry: &'a SpecialistRegistry,
}

impl<'a> TaskGraphBuilder<'a> {
    pub fn new(registry: &'a SpecialistRegistry) -> Self {
        Self { registry }
    }

    /// Build the ordered, validated unit list for `selection` and `message`.
    pub fn build(&self, selection: &SelectionResult, message: &str) -> Result<Vec<UnitOfWork>, PanelError> {
        if message.trim().is_empty() {
            return Err(PanelError::InputEmpty);
        }

        let mut units = Vec::with_capacity(selection.len() * 2 + 2);
        let mut panel: Vec<&SpecialistProfile> = Vec::with_capacity(selection.len());

        for id in selection.iter() {
            let profile = self
                .registry
                .get(id)
                .ok_or_else(|| PanelError::defect(assessment_id(id), format!("unknown specialist '{}'", id)))?;
            panel.push(profile);

            let assessment = assessment_id(id);
            units.push(UnitOfWork::new(
                assessment.clone(),
                UnitKind::Assessment,
                id.clone(),
                self.specialist_prompt(profile, &profile.assessment_template, ASSESSMENT_EXPECTED_OUTPUT, message)?,
            ));
            units.push(
                UnitOfWork::new(
                    response_id(id),
                    UnitKind::Response,
                    id.clone(),
                    self.specialist_prompt(profile, &profile.response_template, RESPONSE_EXPECTED_OUTPUT, message)?,
                )
                .with_dependencies(vec![assessment]),
            );
        }

        let response_ids: Vec<String> = units
            .iter()
            .filter(|u| u.kind == UnitKind::Response)
            .map(|u| u.id.clone())
            .collect();

        units.push(
            UnitOfWork::new(
                SYNTHESIS_ID,
                UnitKind::Synthesis,
                COORDINATOR_ID,
                self.synthesis_prompt(&panel, message)?,
            )
            .with_dependencies(response_ids),
        );

        units.push(
            UnitOfWork::new(
                REVIEW_ID,
                UnitKind::Review,
                COORDINATOR_ID,
                self.coordinator_prompt(REVIEW_ID, REVIEW_TEMPLATE, REVIEW_EXPECTED_OUTPUT, &[("message", message)], false)?,
            )
            .with_dependencies(vec![SYNTHESIS_ID.to_string()]),
        );

        validate_graph(&units)?;
        log::debug!("Built {} units for selection {}", units.len(), selection);
        Ok(units)
    }

    fn specialist_prompt(
        &self,
        profile: &SpecialistProfile,
        template: &str,
        expected_output: &str,
        message: &str,
    ) -> Result<String, PanelError> {
        let description = interpolate(template, &profile.template_inputs(message)).map_err(|missing| {
            PanelError::defect(
                assessment_id(&profile.id),
                format!("template references unknown placeholder '{}'", missing),
            )
        })?;
        Ok(render_prompt(&profile.persona, &description, expected_output, false))
    }

    fn synthesis_prompt(&self, panel: &[&SpecialistProfile], message: &str) -> Result<String, PanelError> {
        let experts = panel
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}. {}", i + 1, p.label()))
            .collect::<Vec<_>>()
            .join("\n");
        self.coordinator_prompt(
            SYNTHESIS_ID,
            SYNTHESIS_TEMPLATE,
            SYNTHESIS_EXPECTED_OUTPUT,
            &[("experts", experts.as_str()), ("message", message)],
            true,
        )
    }

    fn coordinator_prompt(
        &self,
        unit_id: &str,
        template: &str,
        expected_output: &str,
        inputs: &[(&str, &str)],
        markdown: bool,
    ) -> Result<String, PanelError> {
        let inputs: HashMap<&str, &str> = inputs.iter().copied().collect();
        let description = interpolate(template, &inputs)
            .map_err(|missing| PanelError::defect(unit_id, format!("missing prompt input '{}'", missing)))?;
        Ok(render_prompt(
            &self.registry.coordinator().persona,
            &description,
            expected_output,
            markdown,
        ))
    }
}

/// Check that `units` is a valid execution order.
///
/// Unit ids are unique, dependency lists are duplicate-free, and every
/// dependency names a unit that appears earlier in the list.
pub fn validate_graph(units: &[UnitOfWork]) -> Result<(), PanelError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(units.len());

    for unit in units {
        let mut deps: HashSet<&str> = HashSet::with_capacity(unit.dependencies.len());
        for dep in &unit.dependencies {
            if !deps.insert(dep.as_str()) {
                return Err(PanelError::defect(&unit.id, format!("duplicate dependency '{}'", dep)));
            }
            if dep == &unit.id {
                return Err(PanelError::defect(&unit.id, "unit depends on itself"));
            }
            if !seen.contains(dep.as_str()) {
                let reason = if units.iter().any(|u| &u.id == dep) {
                    format!("dependency '{}' is not scheduled before this unit", dep)
                } else {
                    format!("depends on unknown unit '{}'", dep)
                };
                return Err(PanelError::defect(&unit.id, reason));
            }
        }
        if !seen.insert(unit.id.as_str()) {
            return Err(PanelError::defect(&unit.id, "duplicate unit id"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SpecialistRegistry {
        SpecialistRegistry::builtin().unwrap()
    }

    fn selection(ids: &[&str]) -> SelectionResult {
        let registry = registry();
        let known: Vec<String> = registry.ids().into_iter().map(str::to_string).collect();
        SelectionResult::from_ids(ids, &known, 5)
    }

    #[test]
    fn test_unit_counts_for_zero_one_and_max() {
        let registry = registry();
        let builder = TaskGraphBuilder::new(&registry);

        for ids in [
            vec![],
            vec!["chris_voss"],
            vec!["simon_sinek", "julie_zhuo", "roger_martin"],
        ] {
            let k = ids.len();
            let units = builder.build(&selection(&ids), "Help us grow.").unwrap();
            assert_eq!(units.len(), 2 * k + 2);

            let synthesis = units.iter().find(|u| u.kind == UnitKind::Synthesis).unwrap();
            assert_eq!(synthesis.dependencies.len(), k);
            assert_eq!(synthesis.owner, COORDINATOR_ID);

            let review = units.last().unwrap();
            assert_eq!(review.kind, UnitKind::Review);
            assert_eq!(review.dependencies, vec![SYNTHESIS_ID.to_string()]);
        }
    }

    #[test]
    fn test_response_depends_only_on_its_assessment() {
        let registry = registry();
        let units = TaskGraphBuilder::new(&registry)
            .build(&selection(&["julie_zhuo", "roger_martin"]), "Subject: scaling our 150-person team")
            .unwrap();

        let ids: Vec<&str> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "julie_zhuo.assessment",
                "julie_zhuo.response",
                "roger_martin.assessment",
                "roger_martin.response",
                "synthesis",
                "quality_review",
            ]
        );

        for unit in units.iter().filter(|u| u.kind == UnitKind::Response) {
            let owner = unit.specialist().unwrap();
            assert_eq!(unit.dependencies, vec![format!("{}.assessment", owner)]);
        }
        for unit in units.iter().filter(|u| u.kind == UnitKind::Assessment) {
            assert!(unit.dependencies.is_empty());
        }
        assert_eq!(
            units[4].dependencies,
            vec!["julie_zhuo.response".to_string(), "roger_martin.response".to_string()]
        );
    }

    #[test]
    fn test_prompts_bind_persona_and_message() {
        let registry = registry();
        let units = TaskGraphBuilder::new(&registry)
            .build(&selection(&["chris_voss"]), "Negotiating headcount")
            .unwrap();

        let assessment = &units[0];
        assert!(assessment.prompt.starts_with("You are Negotiation Advisor."));
        assert!(assessment.prompt.contains("as Chris Voss (Negotiation & Persuasion)"));
        assert!(assessment.prompt.contains("Negotiating headcount"));
        assert!(assessment.prompt.contains("Expected Output: Either 'RELEVANT'"));

        let synthesis = &units[2];
        assert!(synthesis.prompt.starts_with("You are Expert Panel Coordinator."));
        assert!(synthesis.prompt.contains("1. 🤝 Chris Voss (Negotiation & Persuasion)"));
        assert!(synthesis.prompt.contains("## 🎯 Integrated Recommendations"));
        assert!(synthesis.prompt.contains(
            "*This response was generated by our Expert Advisory Panel. For follow-up questions or deeper discussion"
        ));
        assert!(synthesis.prompt.contains("Your final answer MUST be formatted in Markdown syntax."));

        let review = &units[3];
        assert!(review.prompt.contains("'APPROVED'"));
        assert!(review.prompt.contains("Negotiating headcount"));
        assert!(!review.prompt.contains("Markdown syntax"));
    }

    #[test]
    fn test_empty_message_rejected() {
        let registry = registry();
        let err = TaskGraphBuilder::new(&registry)
            .build(&selection(&["chris_voss"]), " \t\n")
            .unwrap_err();
        assert!(matches!(err, PanelError::InputEmpty));
    }

    #[test]
    fn test_selection_outside_registry_is_defect() {
        let small = SpecialistRegistry::from_yaml(
            r#"
coordinator: {role: C, goal: G, backstory: B}
specialists:
  - {id: alpha, display_name: Alpha, expertise: A, emoji: "🅰️", role: R, goal: G, backstory: B}
"#,
        )
        .unwrap();
        let err = TaskGraphBuilder::new(&small)
            .build(&selection(&["roger_martin"]), "Hi")
            .unwrap_err();
        assert!(matches!(err, PanelError::GraphConstructionDefect { .. }));
    }

    #[test]
    fn test_validate_graph_rejects_defects() {
        let unit = |id: &str, deps: &[&str]| {
            UnitOfWork::new(id, UnitKind::Assessment, "a", "p")
                .with_dependencies(deps.iter().map(|d| d.to_string()).collect())
        };

        assert!(validate_graph(&[unit("a", &[]), unit("b", &["a"])]).is_ok());

        let forward = validate_graph(&[unit("b", &["a"]), unit("a", &[])]).unwrap_err();
        assert_eq!(forward.unit_id(), Some("b"));
        assert!(forward.to_string().contains("not scheduled before"));

        let unknown = validate_graph(&[unit("a", &["ghost"])]).unwrap_err();
        assert!(unknown.to_string().contains("unknown unit 'ghost'"));

        let dup_dep = validate_graph(&[unit("a", &[]), unit("b", &["a", "a"])]).unwrap_err();
        assert!(dup_dep.to_string().contains("duplicate dependency"));

        let dup_id = validate_graph(&[unit("a", &[]), unit("a", &[])]).unwrap_err();
        assert!(dup_id.to_string().contains("duplicate unit id"));

        let cycle = validate_graph(&[unit("a", &["a"])]).unwrap_err();
        assert!(cycle.to_string().contains("depends on itself"));
    }
}
