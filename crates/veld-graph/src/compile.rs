//! Compile
//!
//! Turns the declared pass set into the live set. A pass holds one
//! reference per output node; every read adds one reference to the node it
//! consumes. Culling then walks backward from unreferenced nodes: dropping
//! a node releases its producer, and a fully released producer releases its
//! inputs in turn. Side-effect and final passes are retained regardless.
//! The surviving passes are visited in declaration order to assign every
//! live node its producing pass and last consumer.

use std::ptr::NonNull;

use veld_core::ScratchAllocator;

use crate::backend::GraphBackend;
use crate::graph::FrameGraph;
use crate::resource::{RecordFlags, ResourceKind};
use crate::{GraphError, contract};

/// Counters computed by [`FrameGraph::compile`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Declared passes
    pub passes: usize,
    /// Passes that survived culling
    pub live_passes: usize,
    /// Texture nodes, including renamed versions
    pub textures: usize,
    /// Buffer nodes, including renamed versions
    pub buffers: usize,
    /// Resource nodes touched by a surviving pass
    pub live_resources: usize,
}

#[derive(Clone, Copy)]
struct ResourceSlot {
    kind: ResourceKind,
    index: u32,
}

/// Cull work-stack carved out of the caller's scratch allocator.
///
/// Sized to the total node count: a node's ref-count only ever decreases
/// during culling, so each node enters the stack at most once.
struct WorkStack {
    base: NonNull<ResourceSlot>,
    len: usize,
    capacity: usize,
}

impl WorkStack {
    fn new(scratch: &ScratchAllocator, capacity: usize) -> Self {
        let base = contract(
            scratch
                .alloc_array::<ResourceSlot>(capacity)
                .ok_or(GraphError::CapacityExhausted("compile work-stack")),
        );
        Self {
            base,
            len: 0,
            capacity,
        }
    }

    fn push(&mut self, slot: ResourceSlot) {
        assert!(self.len < self.capacity, "cull work-stack overflow");
        // Safety: the storage holds `capacity` slots and len stays below it
        unsafe { self.base.as_ptr().add(self.len).write(slot) };
        self.len += 1;
    }

    fn pop(&mut self) -> Option<ResourceSlot> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // Safety: slots below `len` were written by push
        Some(unsafe { self.base.as_ptr().add(self.len).read() })
    }
}

impl<B: GraphBackend> FrameGraph<B> {
    /// Cull unreferenced work and assign resource lifetimes.
    ///
    /// Must be called with every pass closed and before [`execute`]. The
    /// scratch allocator provides the cull work-stack storage and is reset
    /// before this returns; it must not hold live allocations the caller
    /// still needs.
    ///
    /// [`execute`]: FrameGraph::execute
    pub fn compile(&mut self, scratch: &ScratchAllocator) {
        if let Some(open) = self.current {
            let err = GraphError::PassStillOpen(self.passes[open].name.clone());
            panic!("frame graph contract violation: {err}");
        }
        if self.passes.is_empty() {
            self.stats = GraphStats::default();
            return;
        }

        let Self {
            res,
            passes,
            lists,
            stats,
            ..
        } = self;

        // Reset per-node state from any previous compile
        for record in res.textures.iter_mut().chain(res.buffers.iter_mut()) {
            record.ref_count = 0;
            record.last = None;
        }

        // Seed ref-counts
        for (i, pass) in passes.iter_mut().enumerate() {
            pass.ref_count = pass.texture_write.len() + pass.buffer_write.len();

            for pos in pass.texture_read.indices() {
                res.textures[lists.texture_read[pos] as usize].ref_count += 1;
            }
            for pos in pass.buffer_read.indices() {
                res.buffers[lists.buffer_read[pos] as usize].ref_count += 1;
            }

            // Written nodes belong to this pass; outputs of a final pass
            // carry a standing reference so they are never culled
            for pos in pass.texture_write.indices() {
                let index = lists.texture_write[pos] as usize;
                res.textures[index].first = Some(i as u32);
                if pass.is_final {
                    res.textures[index].ref_count += 1;
                }
            }
            for pos in pass.buffer_write.indices() {
                let index = lists.buffer_write[pos] as usize;
                res.buffers[index].first = Some(i as u32);
                if pass.is_final {
                    res.buffers[index].ref_count += 1;
                }
            }
        }

        // Cull backward from unreferenced nodes
        {
            let mut stack = WorkStack::new(scratch, res.textures.len() + res.buffers.len());
            for (index, record) in res.textures.iter().enumerate() {
                if record.ref_count == 0 {
                    stack.push(ResourceSlot {
                        kind: ResourceKind::Texture,
                        index: index as u32,
                    });
                }
            }
            for (index, record) in res.buffers.iter().enumerate() {
                if record.ref_count == 0 {
                    stack.push(ResourceSlot {
                        kind: ResourceKind::Buffer,
                        index: index as u32,
                    });
                }
            }

            while let Some(slot) = stack.pop() {
                let producer = res.records(slot.kind)[slot.index as usize].first;
                let Some(producer) = producer else {
                    // Imported nodes have no producer to release
                    continue;
                };
                let pass = &mut passes[producer as usize];
                if pass.flags.contains(RecordFlags::HAS_SIDE_EFFECTS) {
                    continue;
                }

                assert!(pass.ref_count >= 1, "cull underflow in pass '{}'", pass.name);
                pass.ref_count -= 1;
                if pass.ref_count == 0 && !pass.is_final {
                    // The pass is dead; release everything it consumed
                    for pos in pass.texture_read.indices() {
                        let index = lists.texture_read[pos];
                        let record = &mut res.textures[index as usize];
                        debug_assert!(record.ref_count >= 1);
                        record.ref_count -= 1;
                        if record.ref_count == 0 {
                            stack.push(ResourceSlot {
                                kind: ResourceKind::Texture,
                                index,
                            });
                        }
                    }
                    for pos in pass.buffer_read.indices() {
                        let index = lists.buffer_read[pos];
                        let record = &mut res.buffers[index as usize];
                        debug_assert!(record.ref_count >= 1);
                        record.ref_count -= 1;
                        if record.ref_count == 0 {
                            stack.push(ResourceSlot {
                                kind: ResourceKind::Buffer,
                                index,
                            });
                        }
                    }
                }
            }
        }
        // Work-stack storage goes back to the caller in one sweep
        scratch.reset();

        // Lifetimes: visit survivors in declaration order, so the latest
        // toucher of a node ends up as its last consumer
        for (i, pass) in passes.iter().enumerate() {
            if pass.ref_count == 0 && !pass.is_final {
                continue;
            }

            for pos in pass.texture_create.indices() {
                res.textures[lists.texture_create[pos] as usize].first = Some(i as u32);
            }
            for pos in pass.buffer_create.indices() {
                res.buffers[lists.buffer_create[pos] as usize].first = Some(i as u32);
            }

            for pos in pass.texture_read.indices() {
                res.textures[lists.texture_read[pos] as usize].last = Some(i as u32);
            }
            for pos in pass.buffer_read.indices() {
                res.buffers[lists.buffer_read[pos] as usize].last = Some(i as u32);
            }

            for pos in pass.texture_write.indices() {
                res.textures[lists.texture_write[pos] as usize].last = Some(i as u32);
            }
            for pos in pass.buffer_write.indices() {
                res.buffers[lists.buffer_write[pos] as usize].last = Some(i as u32);
            }
        }

        let live_passes = passes.iter().filter(|pass| pass.survives()).count();
        let live_resources = res
            .textures
            .iter()
            .chain(res.buffers.iter())
            .filter(|record| record.last.is_some())
            .count();
        *stats = GraphStats {
            passes: passes.len(),
            live_passes,
            textures: res.textures.len(),
            buffers: res.buffers.len(),
            live_resources,
        };
        log::debug!(
            "compiled frame graph: {live_passes}/{} passes live, {live_resources}/{} resource nodes reachable",
            passes.len(),
            res.textures.len() + res.buffers.len(),
        );
    }
}
