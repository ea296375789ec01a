//! Prompt wording for panel units.

pub mod prompts;
