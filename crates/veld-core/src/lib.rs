//! # Veld Core
//!
//! Support types shared by the Veld frame graph crates.
//!
//! This crate provides the working-memory side of the graph:
//! - **Scratch allocator**: a fixed-capacity linear allocator that hands the
//!   graph compiler its transient work storage and releases it in bulk
//! - **Usage counters**: carve stats and a high-water mark for sizing
//!   scratch blocks

pub mod memory;

pub use memory::{ScratchAllocator, ScratchStats};
