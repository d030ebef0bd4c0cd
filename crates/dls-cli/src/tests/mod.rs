//! Unit tests for the binary runtimes.

mod support;
