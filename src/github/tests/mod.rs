//! Unit tests for repository identity and error classification.

mod repository_locator;
