//! Unit, process-backed and behavioural tests for the supervisor.

mod behaviour;
mod support;
