//! Shared helpers.

pub mod string_utils;
