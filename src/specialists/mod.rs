//! Specialist registry.
//!
//! The registry is built once, explicitly, at startup from the embedded
//! `config/specialists.yaml` or from a replacement file. It is immutable
//! afterwards and can be shared across requests behind an `Arc`.
//!
//! Iteration order is the file order. Routing matches and truncation follow
//! it, so reordering the file changes which specialists win a crowded route.

pub mod profile;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::config::PanelConfig;
use crate::tasks::prompts::{MESSAGE_PLACEHOLDER, SPECIALIST_PLACEHOLDERS};
use crate::utilities::string_utils::template_variables;

pub use profile::{CoordinatorProfile, Persona, SpecialistProfile};

/// Owner id of the units the coordinator runs.
pub const COORDINATOR_ID: &str = "coordinator";

const BUILTIN_DEFINITIONS: &str = include_str!("../../config/specialists.yaml");

static SPECIALIST_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$").unwrap());

/// Errors raised while loading or validating specialist definitions.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read specialist definitions from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid specialist definitions: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("specialist registry is empty")]
    Empty,

    #[error("duplicate specialist id '{0}'")]
    DuplicateId(String),

    #[error("invalid specialist id '{0}': ids must be lowercase snake_case")]
    InvalidId(String),

    #[error("specialist id '{0}' is reserved")]
    ReservedId(String),

    #[error("{template} template of '{id}' uses unknown placeholder '{placeholder}'")]
    UnknownPlaceholder {
        id: String,
        template: &'static str,
        placeholder: String,
    },

    #[error("{template} template of '{id}' never uses '{{{placeholder}}}', so the unit would not see the message")]
    MissingPlaceholder {
        id: String,
        template: &'static str,
        placeholder: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct DefinitionsFile {
    coordinator: CoordinatorProfile,
    specialists: Vec<SpecialistProfile>,
}

/// Immutable lookup from specialist id to profile.
#[derive(Debug, Clone)]
pub struct SpecialistRegistry {
    coordinator: CoordinatorProfile,
    specialists: Vec<SpecialistProfile>,
    index: HashMap<String, usize>,
}

impl SpecialistRegistry {
    /// Build and validate a registry.
    pub fn new(
        coordinator: CoordinatorProfile,
        specialists: Vec<SpecialistProfile>,
    ) -> Result<Self, RegistryError> {
        if specialists.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut index = HashMap::with_capacity(specialists.len());
        for (pos, profile) in specialists.iter().enumerate() {
            validate_profile(profile)?;
            if index.insert(profile.id.clone(), pos).is_some() {
                return Err(RegistryError::DuplicateId(profile.id.clone()));
            }
        }

        log::debug!("Specialist registry initialized with {} specialists", specialists.len());

        Ok(Self {
            coordinator,
            specialists,
            index,
        })
    }

    /// The definitions shipped with the crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_yaml(BUILTIN_DEFINITIONS)
    }

    /// Parse definitions from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        let file: DefinitionsFile = serde_yaml::from_str(yaml)?;
        Self::new(file.coordinator, file.specialists)
    }

    /// Load definitions from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading specialist definitions from {}", path.display());
        Self::from_yaml(&content)
    }

    /// The file named by the configuration, or the built-in definitions.
    pub fn load(config: &PanelConfig) -> Result<Self, RegistryError> {
        match &config.specialists_file {
            Some(path) => Self::from_file(path),
            None => Self::builtin(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&SpecialistProfile> {
        self.index.get(id).map(|&pos| &self.specialists[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Profiles in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &SpecialistProfile> {
        self.specialists.iter()
    }

    /// Ids in registry order.
    pub fn ids(&self) -> Vec<&str> {
        self.specialists.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn coordinator(&self) -> &CoordinatorProfile {
        &self.coordinator
    }

    pub fn len(&self) -> usize {
        self.specialists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specialists.is_empty()
    }
}

fn validate_profile(profile: &SpecialistProfile) -> Result<(), RegistryError> {
    if profile.id == COORDINATOR_ID {
        return Err(RegistryError::ReservedId(profile.id.clone()));
    }
    if !SPECIALIST_ID.is_match(&profile.id) {
        return Err(RegistryError::InvalidId(profile.id.clone()));
    }

    for (name, template) in [
        ("assessment", &profile.assessment_template),
        ("response", &profile.response_template),
    ] {
        let variables = template_variables(template);
        if let Some(unknown) = variables
            .iter()
            .find(|v| !SPECIALIST_PLACEHOLDERS.contains(&v.as_str()))
        {
            return Err(RegistryError::UnknownPlaceholder {
                id: profile.id.clone(),
                template: name,
                placeholder: unknown.clone(),
            });
        }
        if !variables.iter().any(|v| v == MESSAGE_PLACEHOLDER) {
            return Err(RegistryError::MissingPlaceholder {
                id: profile.id.clone(),
                template: name,
                placeholder: MESSAGE_PLACEHOLDER,
            });
        }
    }
    Ok(())
}
