//! Modules layer - Infrastructure components for external integrations
//!
//! Contains clients and adapters for external services (generative AI).

pub mod ai;
