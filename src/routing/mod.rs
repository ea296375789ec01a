//! Router step: asks the coordinator which specialists should answer, then
//! parses the free-form answer into a [`SelectionResult`].

pub mod parser;

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PanelError;
use crate::llms::TextGenerator;
use crate::specialists::SpecialistRegistry;
use crate::task::render_prompt;
use crate::tasks::prompts::{ROUTING_EXPECTED_OUTPUT, ROUTING_TEMPLATE};
use crate::utilities::string_utils::interpolate;

pub use parser::{ParsedSelection, SelectionParser, SelectionResult};

/// Result of routing one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingOutcome {
    pub selection: SelectionResult,
    /// Set when the router output could not be parsed and the default
    /// selection was used instead.
    pub degraded: bool,
    /// Raw router text, kept for display and auditing.
    pub router_output: String,
}

/// Builds the routing prompt and interprets the answer.
#[derive(Debug, Clone)]
pub struct Router {
    parser: SelectionParser,
    max_experts: usize,
    timeout: Option<Duration>,
}

impl Router {
    pub fn new(parser: SelectionParser, max_experts: usize) -> Self {
        Self {
            parser,
            max_experts,
            timeout: None,
        }
    }

    /// Bound the routing call. `None` waits for the generator indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Routing prompt for `message`, under the coordinator persona.
    pub fn prompt(&self, registry: &SpecialistRegistry, message: &str) -> Result<String, PanelError> {
        let catalogue = registry
            .iter()
            .map(|s| format!("- {}: {}", s.id, s.label()))
            .collect::<Vec<_>>()
            .join("\n");
        let max_experts = self.max_experts.to_string();
        let inputs = HashMap::from([
            ("max_experts", max_experts.as_str()),
            ("catalogue", catalogue.as_str()),
            ("message", message),
        ]);

        let description = interpolate(ROUTING_TEMPLATE, &inputs).map_err(|missing| PanelError::RouterFailure {
            reason: format!("routing template references unknown input '{}'", missing),
        })?;
        Ok(render_prompt(
            &registry.coordinator().persona,
            &description,
            ROUTING_EXPECTED_OUTPUT,
            false,
        ))
    }

    /// Ask `generator` to route `message`, then parse its answer.
    ///
    /// A generation failure or timeout is fatal. An empty answer is not: it
    /// falls back to the default selection with `degraded` set.
    pub async fn route(
        &self,
        registry: &SpecialistRegistry,
        message: &str,
        generator: &dyn TextGenerator,
    ) -> Result<RoutingOutcome, PanelError> {
        if message.trim().is_empty() {
            return Err(PanelError::InputEmpty);
        }

        let prompt = self.prompt(registry, message)?;
        log::debug!("Routing message ({} chars) across {} specialists", message.len(), registry.len());

        let call = generator.generate(&prompt, &[]);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| PanelError::RouterFailure {
                    reason: format!("timed out after {}s", limit.as_secs_f64()),
                })?,
            None => call.await,
        };
        let router_output = result.map_err(|e| PanelError::RouterFailure { reason: e.to_string() })?;

        Ok(self.from_output(registry, router_output))
    }

    /// Parse an existing router answer without calling a generator.
    pub fn from_output(&self, registry: &SpecialistRegistry, router_output: String) -> RoutingOutcome {
        let known: Vec<String> = registry.ids().into_iter().map(str::to_string).collect();
        let ParsedSelection { selection, degraded } =
            self.parser.parse(&router_output, &known, self.max_experts);

        if degraded {
            log::warn!(
                "Router output could not be parsed; falling back to default selection {}",
                selection
            );
        } else {
            log::info!("Routed to {}", selection);
        }

        RoutingOutcome {
            selection,
            degraded,
            router_output,
        }
    }

    /// A caller-supplied selection, bypassing the router entirely.
    pub fn fixed<I, S>(&self, registry: &SpecialistRegistry, ids: I) -> RoutingOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known: Vec<String> = registry.ids().into_iter().map(str::to_string).collect();
        let selection = SelectionResult::from_ids(ids, &known, self.max_experts);
        log::info!("Using fixed selection {}", selection);
        RoutingOutcome {
            selection,
            degraded: false,
            router_output: String::new(),
        }
    }
}
