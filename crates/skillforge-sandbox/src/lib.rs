//! skillforge-sandbox — Isolated execution backends.
//!
//! Implements the `SandboxExecutor` and `SandboxSession` traits from
//! `skillforge-core`. The production backend runs submissions in a
//! `node` child process behind a line-oriented JSON protocol; the mock
//! backend scripts outcomes for pipeline tests.

pub mod mock;
pub mod node;
pub mod protocol;

pub use mock::{MockBehavior, MockSandbox};
pub use node::NodeSandbox;
