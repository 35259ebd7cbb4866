//! # Veld Graph
//!
//! A declarative, single-frame scheduler for GPU work.
//!
//! A client declares a set of render passes and, for each pass, the textures
//! and buffers it creates, reads, and writes. The graph then:
//! - renames writes so every logical state of a resource is a distinct node
//! - culls passes whose outputs nothing consumes, by backward ref-counting
//! - computes the producing and last-consuming pass of every live resource
//! - executes the surviving passes in declaration order, bracketing each
//!   pass body with create / pre-read / pre-write / destroy hooks
//!
//! The GPU backend stays opaque: textures, buffers, descriptors, and the
//! render context are associated types of [`GraphBackend`], and all GPU
//! work happens inside the client hooks. Barriers and descriptor updates
//! belong in the pre-read/pre-write hooks; the core only sequences them.

use thiserror::Error;

pub mod backend;
pub mod compile;
pub mod dump;
pub mod execute;
pub mod graph;
pub mod handle;
pub mod pass;
pub mod resource;

pub use backend::{GraphBackend, PassExecuteFn};
pub use compile::GraphStats;
pub use graph::FrameGraph;
pub use handle::{BufferHandle, PassHandle, TextureHandle, UsageFlags};
pub use pass::Phase;
pub use resource::{GraphResources, RecordFlags, ResourceKind};

/// Frame graph contract violations
///
/// Every variant is a programming error on the calling side. The build and
/// execute APIs do not try to recover: a malformed declaration would produce
/// a malformed command stream, so the public methods abort with a panic
/// formatted from one of these values. The `check_*` helpers that produce
/// them are exercised directly by the validation tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("stale or out-of-range texture handle (index {index}, generation {generation})")]
    InvalidTextureHandle { index: u32, generation: u32 },

    #[error("stale or out-of-range buffer handle (index {index}, generation {generation})")]
    InvalidBufferHandle { index: u32, generation: u32 },

    #[error("stale or out-of-range pass handle (index {index}, generation {generation})")]
    InvalidPassHandle { index: u32, generation: u32 },

    #[error("{0} requires an open pass")]
    NoOpenPass(&'static str),

    #[error("pass '{0}' is still open")]
    PassStillOpen(String),

    #[error("pass '{pass}' already declares '{resource}' in its {phase} set")]
    DeclarationConflict {
        pass: String,
        resource: String,
        phase: &'static str,
    },

    #[error("{0} arena is full")]
    CapacityExhausted(&'static str),

    #[error("capacities must be non-zero and below the handle sentinel")]
    InvalidCapacity,

    #[error("the {0} hook is not set")]
    MissingHook(&'static str),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Unwrap a validation result, aborting on caller error.
pub(crate) fn contract<T>(result: GraphResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("frame graph contract violation: {err}"),
    }
}
