//! The panel pipeline: route, build the unit graph, execute, persist.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PanelConfig;
use crate::error::PanelError;
use crate::executor::{ExecutionReport, ReviewVerdict, SequentialExecutor, UnitCallback};
use crate::graph::TaskGraphBuilder;
use crate::llms::GeneratorSet;
use crate::routing::{Router, RoutingOutcome, SelectionParser};
use crate::specialists::{SpecialistRegistry, COORDINATOR_ID};
use crate::task::{UnitKind, UnitOfWork};

/// Everything produced by one panel run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelOutput {
    pub run_id: Uuid,
    pub message: String,
    pub routing: RoutingOutcome,
    pub units: Vec<UnitOfWork>,
    pub synthesis: String,
    pub review: String,
    pub verdict: ReviewVerdict,
    /// Synthesis plus the review outcome. This is what gets persisted.
    pub final_text: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PanelOutput {
    /// Outputs of the response units, in panel order, keyed by specialist id.
    pub fn responses(&self) -> Vec<(&str, &str)> {
        self.units
            .iter()
            .filter(|u| u.kind == UnitKind::Response)
            .filter_map(|u| Some((u.specialist()?, u.output.as_deref()?)))
            .collect()
    }

    /// Wall-clock duration of the run in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Write the final text to `path`, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PanelError> {
        let path = path.as_ref();
        let persist_err = |source| PanelError::Persist {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(persist_err)?;
        }
        std::fs::write(path, &self.final_text).map_err(persist_err)?;

        log::info!("Panel response saved to {}", path.display());
        Ok(())
    }
}

/// Entry point for panel requests.
///
/// Holds the immutable registry and the generator set; each call builds and
/// runs its own unit graph, so one `ExpertPanel` can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct ExpertPanel {
    registry: Arc<SpecialistRegistry>,
    config: PanelConfig,
    generators: GeneratorSet,
    router: Router,
    unit_callback: Option<UnitCallbackSlot>,
}

#[derive(Clone)]
struct UnitCallbackSlot(UnitCallback);

impl std::fmt::Debug for UnitCallbackSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnitCallback")
    }
}

impl ExpertPanel {
    pub fn new(registry: Arc<SpecialistRegistry>, config: PanelConfig, generators: GeneratorSet) -> Self {
        let router = Router::new(
            SelectionParser::new(config.default_specialists.clone()),
            config.max_experts,
        )
        .with_timeout(config.unit_timeout);
        Self {
            registry,
            config,
            generators,
            router,
            unit_callback: None,
        }
    }

    /// Load the registry and create provider-backed generators from `config`.
    pub fn from_config(config: PanelConfig) -> Result<Self, PanelError> {
        let registry = SpecialistRegistry::load(&config)?;
        let generators = GeneratorSet::from_config(&config, &registry)?;
        log::info!(
            "Expert panel ready: {} specialists, model {}",
            registry.len(),
            config.llm_model
        );
        Ok(Self::new(Arc::new(registry), config, generators))
    }

    /// Invoke `callback` after every unit that finishes.
    pub fn with_unit_callback(mut self, callback: UnitCallback) -> Self {
        self.unit_callback = Some(UnitCallbackSlot(callback));
        self
    }

    pub fn registry(&self) -> &SpecialistRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Route and answer `message`.
    pub async fn run(&self, message: &str) -> Result<PanelOutput, PanelError> {
        let started_at = Utc::now();
        let routing = self.route(message).await?;
        self.execute_from(message, routing, started_at).await
    }

    /// Answer `message` using an existing router answer instead of calling the router.
    pub async fn run_with_router_output(&self, message: &str, router_output: &str) -> Result<PanelOutput, PanelError> {
        let started_at = Utc::now();
        ensure_message(message)?;
        let routing = self.router.from_output(&self.registry, router_output.to_string());
        self.execute_from(message, routing, started_at).await
    }

    /// Answer `message` with a fixed panel, bypassing the router.
    pub async fn run_with_selection<I, S>(&self, message: &str, ids: I) -> Result<PanelOutput, PanelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let started_at = Utc::now();
        ensure_message(message)?;
        let routing = self.router.fixed(&self.registry, ids);
        self.execute_from(message, routing, started_at).await
    }

    /// Ask the coordinator which specialists should answer `message`.
    pub async fn route(&self, message: &str) -> Result<RoutingOutcome, PanelError> {
        ensure_message(message)?;
        self.router
            .route(&self.registry, message, self.generators.for_owner(COORDINATOR_ID))
            .await
    }

    /// Build and run the unit graph for an existing routing outcome.
    pub async fn execute(&self, message: &str, routing: RoutingOutcome) -> Result<PanelOutput, PanelError> {
        self.execute_from(message, routing, Utc::now()).await
    }

    async fn execute_from(
        &self,
        message: &str,
        routing: RoutingOutcome,
        started_at: DateTime<Utc>,
    ) -> Result<PanelOutput, PanelError> {
        let units = TaskGraphBuilder::new(&self.registry).build(&routing.selection, message)?;

        let mut executor = SequentialExecutor::new(self.generators.clone()).with_unit_timeout(self.config.unit_timeout);
        if let Some(UnitCallbackSlot(callback)) = &self.unit_callback {
            executor = executor.with_unit_callback(callback.clone());
        }

        let ExecutionReport {
            units,
            synthesis,
            review,
            verdict,
            final_text,
        } = executor.run(units, message).await?;

        Ok(PanelOutput {
            run_id: Uuid::new_v4(),
            message: message.to_string(),
            routing,
            units,
            synthesis,
            review,
            verdict,
            final_text,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

fn ensure_message(message: &str) -> Result<(), PanelError> {
    if message.trim().is_empty() {
        Err(PanelError::InputEmpty)
    } else {
        Ok(())
    }
}
