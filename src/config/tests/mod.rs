//! Unit tests for configuration loading and precedence.
//!
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `field_resolution`: Token, repository, date and settings resolution
//! - `env_loading`: Loading from the process environment and CLI arguments

mod helpers;
