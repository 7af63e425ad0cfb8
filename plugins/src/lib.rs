//! Pluggable pieces of stackline: the `pulumi` CLI runner, run-event
//! renderers and project source checkout.

pub mod executor;
pub mod factory;
pub mod runner;
pub mod source;
