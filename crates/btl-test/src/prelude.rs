//! Convenience re-exports for tests.

pub use crate::fixtures::*;
pub use crate::mock_backend::{BackendOp, CountingBackend, FailingBackend};
pub use crate::mock_provider::{ScriptedProvider, ScriptedTurn};
pub use crate::init_test_tracing;
