//! Dependency-ordered, stage-parallel deployment of infrastructure stacks.
//!
//! Projects declare stacks and the projects they depend on. Every
//! `(project, stack)` pair becomes a vertex, dependencies become edges
//! between vertices that share a stack name, and the resulting graph is
//! levelled into stages that run one after another with every vertex of a
//! stage running concurrently.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod preview;
pub mod project;
pub mod validation;
