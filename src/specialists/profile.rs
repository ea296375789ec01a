//! Specialist and coordinator profiles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tasks::prompts::{DEFAULT_ASSESSMENT_TEMPLATE, DEFAULT_RESPONSE_TEMPLATE};

/// Who a generation call speaks as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl Persona {
    /// Opening lines of every prompt issued under this persona.
    pub fn preamble(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role.trim(),
            self.backstory.trim(),
            self.goal.trim()
        )
    }
}

/// A named domain expert on the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistProfile {
    /// Unique snake_case key, e.g. `roger_martin`.
    pub id: String,
    pub display_name: String,
    /// Expertise tag shown next to the name, e.g. `Strategy & Market Positioning`.
    pub expertise: String,
    pub emoji: String,
    #[serde(flatten)]
    pub persona: Persona,
    /// Model override for this specialist's units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
    #[serde(default = "default_assessment_template")]
    pub assessment_template: String,
    #[serde(default = "default_response_template")]
    pub response_template: String,
}

fn default_assessment_template() -> String {
    DEFAULT_ASSESSMENT_TEMPLATE.to_string()
}

fn default_response_template() -> String {
    DEFAULT_RESPONSE_TEMPLATE.to_string()
}

impl SpecialistProfile {
    /// `🧭 Simon Sinek (Leadership & Vision)`.
    pub fn label(&self) -> String {
        format!("{} {} ({})", self.emoji, self.display_name, self.expertise)
    }

    /// Values for the specialist template placeholders.
    pub fn template_inputs<'a>(&'a self, message: &'a str) -> HashMap<&'static str, &'a str> {
        HashMap::from([
            ("expert", self.display_name.as_str()),
            ("display_name", self.display_name.as_str()),
            ("expertise", self.expertise.as_str()),
            ("message", message),
        ])
    }
}

/// The persona that routes, synthesizes and reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorProfile {
    #[serde(flatten)]
    pub persona: Persona,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
}
