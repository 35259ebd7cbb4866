//! Graph storage and build API
//!
//! The graph owns fixed-capacity arenas for pass records, resource records,
//! payloads, and the per-phase declaration lists. Everything is append-only
//! within a build session; appends never reallocate, so indices handed out
//! earlier stay stable. Capacities are set up front and exhausting them is
//! a caller error.

use crate::backend::{GraphBackend, GraphHooks, PassExecuteFn};
use crate::compile::GraphStats;
use crate::handle::{BufferHandle, PassHandle, TextureHandle, UsageFlags};
use crate::pass::{PassRecord, PhaseLists, PhaseRange, pass_contains};
use crate::resource::{
    BufferPayload, GraphResources, RecordFlags, ResourceKind, ResourceRecord, TexturePayload,
};
use crate::{GraphError, GraphResult, Phase, contract};

fn check_capacity(len: usize, capacity: usize, what: &'static str) -> GraphResult<()> {
    if len < capacity {
        Ok(())
    } else {
        Err(GraphError::CapacityExhausted(what))
    }
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Create => "create",
        Phase::Read => "read",
        Phase::Write => "write",
    }
}

fn list_name(kind: ResourceKind, phase: Phase) -> &'static str {
    match (kind, phase) {
        (ResourceKind::Texture, Phase::Create) => "texture create",
        (ResourceKind::Texture, Phase::Read) => "texture read",
        (ResourceKind::Texture, Phase::Write) => "texture write",
        (ResourceKind::Buffer, Phase::Create) => "buffer create",
        (ResourceKind::Buffer, Phase::Read) => "buffer read",
        (ResourceKind::Buffer, Phase::Write) => "buffer write",
    }
}

/// Single-frame scheduler for GPU passes.
///
/// Lifecycle: declare passes and their resource usage (build), [`compile`]
/// to cull dead work and assign lifetimes, [`execute`] to drive the client
/// hooks, then [`reset`] to rebuild for the next frame on the same
/// allocations.
///
/// [`compile`]: FrameGraph::compile
/// [`execute`]: FrameGraph::execute
/// [`reset`]: FrameGraph::reset
pub struct FrameGraph<B: GraphBackend> {
    pub(crate) res: GraphResources<B>,
    pub(crate) passes: Vec<PassRecord<B>>,
    pub(crate) lists: PhaseLists,
    pub(crate) hooks: GraphHooks<B>,
    /// Pass currently accepting declarations
    pub(crate) current: Option<usize>,
    pub(crate) stats: GraphStats,
    pub(crate) resource_capacity: usize,
    pub(crate) pass_capacity: usize,
}

impl<B: GraphBackend> FrameGraph<B> {
    /// Create a graph sized for `resource_capacity` nodes per resource kind
    /// and `pass_capacity` passes.
    ///
    /// Write-renaming appends one extra node per renamed write, so the
    /// resource capacity must cover declared versions, not just distinct
    /// GPU objects.
    pub fn new(resource_capacity: u32, pass_capacity: u32) -> GraphResult<Self> {
        if resource_capacity == 0
            || pass_capacity == 0
            || resource_capacity == u32::MAX
            || pass_capacity == u32::MAX
        {
            return Err(GraphError::InvalidCapacity);
        }
        Ok(Self {
            res: GraphResources::with_capacity(resource_capacity as usize),
            passes: Vec::with_capacity(pass_capacity as usize),
            lists: PhaseLists::with_capacity(resource_capacity as usize),
            hooks: GraphHooks::default(),
            current: None,
            stats: GraphStats::default(),
            resource_capacity: resource_capacity as usize,
            pass_capacity: pass_capacity as usize,
        })
    }

    /// Drop all passes and resources and start a new build session.
    ///
    /// The generation tag is bumped, so handles issued before the reset
    /// stop validating. Hooks survive; they are backend bindings, not
    /// per-frame state.
    pub fn reset(&mut self) {
        self.res.clear();
        self.lists.clear();
        self.passes.clear();
        self.current = None;
        self.stats = GraphStats::default();
    }

    // ----- hook setters --------------------------------------------------

    /// Set the hook that materializes transient textures
    pub fn set_create_texture(
        &mut self,
        hook: impl FnMut(&mut B::Context, &mut B::Texture, &B::TextureDesc) + 'static,
    ) {
        self.hooks.create_texture = Some(Box::new(hook));
    }

    /// Set the hook invoked before a pass for each non-ignored texture read
    pub fn set_preread_texture(
        &mut self,
        hook: impl FnMut(&mut B::Context, &B::Texture, UsageFlags) + 'static,
    ) {
        self.hooks.preread_texture = Some(Box::new(hook));
    }

    /// Set the hook invoked before a pass for each non-ignored texture write
    pub fn set_prewrite_texture(
        &mut self,
        hook: impl FnMut(&mut B::Context, &B::Texture, UsageFlags) + 'static,
    ) {
        self.hooks.prewrite_texture = Some(Box::new(hook));
    }

    /// Set the hook that releases transient textures
    pub fn set_destroy_texture(
        &mut self,
        hook: impl FnMut(&mut B::Context, &mut B::Texture) + 'static,
    ) {
        self.hooks.destroy_texture = Some(Box::new(hook));
    }

    /// Set the hook that materializes transient buffers
    pub fn set_create_buffer(
        &mut self,
        hook: impl FnMut(&mut B::Context, &mut B::Buffer, &B::BufferDesc) + 'static,
    ) {
        self.hooks.create_buffer = Some(Box::new(hook));
    }

    /// Set the hook invoked before a pass for each non-ignored buffer read
    pub fn set_preread_buffer(
        &mut self,
        hook: impl FnMut(&mut B::Context, &B::Buffer, UsageFlags) + 'static,
    ) {
        self.hooks.preread_buffer = Some(Box::new(hook));
    }

    /// Set the hook invoked before a pass for each non-ignored buffer write
    pub fn set_prewrite_buffer(
        &mut self,
        hook: impl FnMut(&mut B::Context, &B::Buffer, UsageFlags) + 'static,
    ) {
        self.hooks.prewrite_buffer = Some(Box::new(hook));
    }

    /// Set the hook that releases transient buffers
    pub fn set_destroy_buffer(
        &mut self,
        hook: impl FnMut(&mut B::Context, &mut B::Buffer) + 'static,
    ) {
        self.hooks.destroy_buffer = Some(Box::new(hook));
    }

    // ----- passes --------------------------------------------------------

    /// Open a pass; all declarations until [`close_pass`](Self::close_pass)
    /// accrue to it.
    pub fn open_pass(
        &mut self,
        name: impl Into<String>,
        execute: impl FnMut(&GraphResources<B>, &mut B::Context) + 'static,
    ) -> PassHandle {
        self.open_pass_inner(name.into(), Box::new(execute), false)
    }

    /// Open a pass marked as graph output. Final passes are never culled
    /// and their written resources keep a standing reference.
    pub fn open_final_pass(
        &mut self,
        name: impl Into<String>,
        execute: impl FnMut(&GraphResources<B>, &mut B::Context) + 'static,
    ) -> PassHandle {
        self.open_pass_inner(name.into(), Box::new(execute), true)
    }

    fn open_pass_inner(
        &mut self,
        name: String,
        execute: PassExecuteFn<B>,
        is_final: bool,
    ) -> PassHandle {
        if let Some(open) = self.current {
            let err = GraphError::PassStillOpen(self.passes[open].name.clone());
            panic!("frame graph contract violation: {err}");
        }
        contract(check_capacity(self.passes.len(), self.pass_capacity, "pass"));

        let index = self.passes.len() as u32;
        self.passes.push(PassRecord {
            name,
            execute,
            flags: RecordFlags::empty(),
            is_final,
            ref_count: 0,
            texture_create: PhaseRange::start_at(self.lists.texture_create.len() as u32),
            texture_read: PhaseRange::start_at(self.lists.texture_read.len() as u32),
            texture_write: PhaseRange::start_at(self.lists.texture_write.len() as u32),
            buffer_create: PhaseRange::start_at(self.lists.buffer_create.len() as u32),
            buffer_read: PhaseRange::start_at(self.lists.buffer_read.len() as u32),
            buffer_write: PhaseRange::start_at(self.lists.buffer_write.len() as u32),
        });
        self.current = Some(index as usize);
        PassHandle::new(index, self.res.generation)
    }

    /// Close the open pass. Its ranges are frozen from this point on.
    pub fn close_pass(&mut self) {
        if self.current.take().is_none() {
            let err = GraphError::NoOpenPass("close_pass");
            panic!("frame graph contract violation: {err}");
        }
    }

    // ----- textures ------------------------------------------------------

    /// Declare a transient texture owned by the open pass
    pub fn create_texture(
        &mut self,
        name: impl Into<String>,
        object: B::Texture,
        desc: B::TextureDesc,
    ) -> TextureHandle {
        let payload = self.push_texture_payload(object, desc);
        let index = self.create_resource(ResourceKind::Texture, name.into(), payload);
        TextureHandle::new(index, self.res.generation)
    }

    /// Import a client-owned texture. Imported resources are graph-level:
    /// no pass needs to be open, and the create/destroy hooks never fire
    /// for them.
    pub fn import_texture(
        &mut self,
        name: impl Into<String>,
        object: B::Texture,
        desc: B::TextureDesc,
    ) -> TextureHandle {
        let payload = self.push_texture_payload(object, desc);
        let index = self.import_resource(ResourceKind::Texture, name.into(), payload);
        TextureHandle::new(index, self.res.generation)
    }

    /// Declare that the open pass reads `texture`.
    ///
    /// Reading a node the pass creates or writes is a contract violation;
    /// reading the same node again is a no-op.
    pub fn read_texture(&mut self, texture: TextureHandle, flags: UsageFlags) -> TextureHandle {
        let index = contract(self.check_texture(texture));
        let index = self.read_resource(ResourceKind::Texture, index, flags);
        TextureHandle::new(index, self.res.generation)
    }

    /// Declare that the open pass writes `texture`.
    ///
    /// Writing a node the pass created returns the same handle. Writing any
    /// other node is renamed: the pass records a read of the input and a
    /// write of a freshly appended version, and the new handle is returned.
    pub fn write_texture(&mut self, texture: TextureHandle, flags: UsageFlags) -> TextureHandle {
        let index = contract(self.check_texture(texture));
        let index = self.write_resource(ResourceKind::Texture, index, flags);
        TextureHandle::new(index, self.res.generation)
    }

    // ----- buffers -------------------------------------------------------

    /// Declare a transient buffer owned by the open pass
    pub fn create_buffer(
        &mut self,
        name: impl Into<String>,
        object: B::Buffer,
        desc: B::BufferDesc,
    ) -> BufferHandle {
        let payload = self.push_buffer_payload(object, desc);
        let index = self.create_resource(ResourceKind::Buffer, name.into(), payload);
        BufferHandle::new(index, self.res.generation)
    }

    /// Import a client-owned buffer
    pub fn import_buffer(
        &mut self,
        name: impl Into<String>,
        object: B::Buffer,
        desc: B::BufferDesc,
    ) -> BufferHandle {
        let payload = self.push_buffer_payload(object, desc);
        let index = self.import_resource(ResourceKind::Buffer, name.into(), payload);
        BufferHandle::new(index, self.res.generation)
    }

    /// Declare that the open pass reads `buffer`
    pub fn read_buffer(&mut self, buffer: BufferHandle, flags: UsageFlags) -> BufferHandle {
        let index = contract(self.check_buffer(buffer));
        let index = self.read_resource(ResourceKind::Buffer, index, flags);
        BufferHandle::new(index, self.res.generation)
    }

    /// Declare that the open pass writes `buffer`
    pub fn write_buffer(&mut self, buffer: BufferHandle, flags: UsageFlags) -> BufferHandle {
        let index = contract(self.check_buffer(buffer));
        let index = self.write_resource(ResourceKind::Buffer, index, flags);
        BufferHandle::new(index, self.res.generation)
    }

    // ----- shared declaration paths --------------------------------------

    fn push_texture_payload(&mut self, object: B::Texture, desc: B::TextureDesc) -> u32 {
        contract(check_capacity(
            self.res.texture_payloads.len(),
            self.resource_capacity,
            "texture payload",
        ));
        let index = self.res.texture_payloads.len() as u32;
        self.res.texture_payloads.push(TexturePayload { object, desc });
        index
    }

    fn push_buffer_payload(&mut self, object: B::Buffer, desc: B::BufferDesc) -> u32 {
        contract(check_capacity(
            self.res.buffer_payloads.len(),
            self.resource_capacity,
            "buffer payload",
        ));
        let index = self.res.buffer_payloads.len() as u32;
        self.res.buffer_payloads.push(BufferPayload { object, desc });
        index
    }

    fn new_record(&mut self, kind: ResourceKind, record: ResourceRecord) -> u32 {
        let what = match kind {
            ResourceKind::Texture => "texture",
            ResourceKind::Buffer => "buffer",
        };
        contract(check_capacity(
            self.res.records(kind).len(),
            self.resource_capacity,
            what,
        ));
        let records = self.res.records_mut(kind);
        let index = records.len() as u32;
        records.push(record);
        self.res.slot_flags_mut(kind).push(UsageFlags::IGNORED);
        index
    }

    fn push_phase(&mut self, pass: usize, kind: ResourceKind, phase: Phase, index: u32) {
        let list = self.lists.list_mut(kind, phase);
        contract(check_capacity(
            list.len(),
            self.resource_capacity,
            list_name(kind, phase),
        ));
        list.push(index);
        self.passes[pass].range_mut(kind, phase).extend();
    }

    fn create_resource(&mut self, kind: ResourceKind, name: String, payload: u32) -> u32 {
        let pass = contract(self.current_pass("create"));
        let index = self.new_record(
            kind,
            ResourceRecord {
                name,
                first: Some(pass as u32),
                last: None,
                flags: RecordFlags::TRANSIENT,
                ref_count: 0,
                payload,
            },
        );
        self.push_phase(pass, kind, Phase::Create, index);
        index
    }

    fn import_resource(&mut self, kind: ResourceKind, name: String, payload: u32) -> u32 {
        self.new_record(
            kind,
            ResourceRecord {
                name,
                first: None,
                last: None,
                flags: RecordFlags::IMPORTED,
                ref_count: 0,
                payload,
            },
        )
    }

    fn read_resource(&mut self, kind: ResourceKind, index: u32, flags: UsageFlags) -> u32 {
        let pass = contract(self.current_pass("read"));
        contract(self.check_no_conflict(pass, kind, index, &[Phase::Create, Phase::Write]));

        if self.declared_in(pass, kind, Phase::Read, index) {
            return index;
        }
        self.push_phase(pass, kind, Phase::Read, index);
        self.res.slot_flags_mut(kind)[index as usize] = flags;
        index
    }

    fn write_resource(&mut self, kind: ResourceKind, index: u32, flags: UsageFlags) -> u32 {
        let pass = contract(self.current_pass("write"));
        contract(self.check_no_conflict(pass, kind, index, &[Phase::Read]));

        // Second write of the same node within one pass is a no-op
        if self.declared_in(pass, kind, Phase::Write, index) {
            return index;
        }

        if self.declared_in(pass, kind, Phase::Create, index) {
            // The pass owns this node; write it in place
            self.push_phase(pass, kind, Phase::Write, index);
            self.res.slot_flags_mut(kind)[index as usize] = flags;
            if self.res.records(kind)[index as usize]
                .flags
                .contains(RecordFlags::IMPORTED)
            {
                self.passes[pass].flags |= RecordFlags::HAS_SIDE_EFFECTS;
            }
            return index;
        }

        // Write-renaming: the mutation becomes a read of the input plus a
        // write of a new version produced by this pass, keeping the
        // dependency graph acyclic
        self.read_resource(kind, index, UsageFlags::IGNORED);

        let source = &self.res.records(kind)[index as usize];
        let clone = ResourceRecord {
            name: source.name.clone(),
            first: Some(pass as u32),
            last: None,
            flags: source.flags & (RecordFlags::IMPORTED | RecordFlags::TRANSIENT),
            ref_count: 0,
            payload: source.payload,
        };
        if clone.flags.contains(RecordFlags::IMPORTED) {
            self.passes[pass].flags |= RecordFlags::HAS_SIDE_EFFECTS;
        }
        let clone_index = self.new_record(kind, clone);
        self.push_phase(pass, kind, Phase::Write, clone_index);
        self.res.slot_flags_mut(kind)[clone_index as usize] = flags;
        clone_index
    }

    // ----- validation ----------------------------------------------------

    fn current_pass(&self, op: &'static str) -> GraphResult<usize> {
        self.current.ok_or(GraphError::NoOpenPass(op))
    }

    fn check_texture(&self, handle: TextureHandle) -> GraphResult<u32> {
        if self.res.is_valid_texture(handle) {
            Ok(handle.index())
        } else {
            Err(GraphError::InvalidTextureHandle {
                index: handle.index(),
                generation: handle.generation(),
            })
        }
    }

    fn check_buffer(&self, handle: BufferHandle) -> GraphResult<u32> {
        if self.res.is_valid_buffer(handle) {
            Ok(handle.index())
        } else {
            Err(GraphError::InvalidBufferHandle {
                index: handle.index(),
                generation: handle.generation(),
            })
        }
    }

    fn check_pass(&self, handle: PassHandle) -> GraphResult<usize> {
        if (handle.index() as usize) < self.passes.len()
            && handle.generation() == self.res.generation
        {
            Ok(handle.index() as usize)
        } else {
            Err(GraphError::InvalidPassHandle {
                index: handle.index(),
                generation: handle.generation(),
            })
        }
    }

    fn declared_in(&self, pass: usize, kind: ResourceKind, phase: Phase, index: u32) -> bool {
        pass_contains(
            self.lists.list(kind, phase),
            self.passes[pass].range(kind, phase),
            index,
        )
    }

    fn check_no_conflict(
        &self,
        pass: usize,
        kind: ResourceKind,
        index: u32,
        phases: &[Phase],
    ) -> GraphResult<()> {
        for &phase in phases {
            if self.declared_in(pass, kind, phase, index) {
                return Err(GraphError::DeclarationConflict {
                    pass: self.passes[pass].name.clone(),
                    resource: self.res.records(kind)[index as usize].name.clone(),
                    phase: phase_name(phase),
                });
            }
        }
        Ok(())
    }

    // ----- accessors -----------------------------------------------------

    /// Borrow the resource view pass bodies receive
    pub fn resources(&self) -> &GraphResources<B> {
        &self.res
    }

    /// Check a texture handle against this graph
    pub fn is_valid_texture(&self, handle: TextureHandle) -> bool {
        self.res.is_valid_texture(handle)
    }

    /// Check a buffer handle against this graph
    pub fn is_valid_buffer(&self, handle: BufferHandle) -> bool {
        self.res.is_valid_buffer(handle)
    }

    /// Check a pass handle against this graph
    pub fn is_valid_pass(&self, handle: PassHandle) -> bool {
        self.check_pass(handle).is_ok()
    }

    /// Get the GPU object behind a texture handle
    pub fn texture(&self, handle: TextureHandle) -> &B::Texture {
        self.res.texture(handle)
    }

    /// Get the descriptor behind a texture handle
    pub fn texture_desc(&self, handle: TextureHandle) -> &B::TextureDesc {
        self.res.texture_desc(handle)
    }

    /// Get the usage word stored for a texture slot
    pub fn texture_flags(&self, handle: TextureHandle) -> UsageFlags {
        self.res.texture_flags(handle)
    }

    /// Get the GPU object behind a buffer handle
    pub fn buffer(&self, handle: BufferHandle) -> &B::Buffer {
        self.res.buffer(handle)
    }

    /// Get the descriptor behind a buffer handle
    pub fn buffer_desc(&self, handle: BufferHandle) -> &B::BufferDesc {
        self.res.buffer_desc(handle)
    }

    /// Get the usage word stored for a buffer slot
    pub fn buffer_flags(&self, handle: BufferHandle) -> UsageFlags {
        self.res.buffer_flags(handle)
    }

    /// Whether the pass declares the texture in the given phase
    pub fn pass_contains_texture(
        &self,
        pass: PassHandle,
        phase: Phase,
        texture: TextureHandle,
    ) -> bool {
        let pass = contract(self.check_pass(pass));
        let index = contract(self.check_texture(texture));
        self.declared_in(pass, ResourceKind::Texture, phase, index)
    }

    /// Whether the pass declares the buffer in the given phase
    pub fn pass_contains_buffer(
        &self,
        pass: PassHandle,
        phase: Phase,
        buffer: BufferHandle,
    ) -> bool {
        let pass = contract(self.check_pass(pass));
        let index = contract(self.check_buffer(buffer));
        self.declared_in(pass, ResourceKind::Buffer, phase, index)
    }

    /// Get a pass's name
    pub fn pass_name(&self, pass: PassHandle) -> &str {
        let pass = contract(self.check_pass(pass));
        &self.passes[pass].name
    }

    /// Get a pass's flag set
    pub fn pass_record_flags(&self, pass: PassHandle) -> RecordFlags {
        let pass = contract(self.check_pass(pass));
        self.passes[pass].flags
    }

    /// Get a pass's reference count as of the last compile
    pub fn pass_ref_count(&self, pass: PassHandle) -> u32 {
        let pass = contract(self.check_pass(pass));
        self.passes[pass].ref_count
    }

    /// Get a texture node's reference count as of the last compile
    pub fn texture_ref_count(&self, texture: TextureHandle) -> u32 {
        let index = contract(self.check_texture(texture));
        self.res.textures[index as usize].ref_count
    }

    /// Get a buffer node's reference count as of the last compile
    pub fn buffer_ref_count(&self, buffer: BufferHandle) -> u32 {
        let index = contract(self.check_buffer(buffer));
        self.res.buffers[index as usize].ref_count
    }

    /// Get the pass that produces a texture node
    pub fn texture_producer(&self, texture: TextureHandle) -> Option<PassHandle> {
        let index = contract(self.check_texture(texture));
        self.res.textures[index as usize]
            .first
            .map(|pass| PassHandle::new(pass, self.res.generation))
    }

    /// Get the last pass consuming a texture node, as of the last compile
    pub fn texture_last_consumer(&self, texture: TextureHandle) -> Option<PassHandle> {
        let index = contract(self.check_texture(texture));
        self.res.textures[index as usize]
            .last
            .map(|pass| PassHandle::new(pass, self.res.generation))
    }

    /// Get the pass that produces a buffer node
    pub fn buffer_producer(&self, buffer: BufferHandle) -> Option<PassHandle> {
        let index = contract(self.check_buffer(buffer));
        self.res.buffers[index as usize]
            .first
            .map(|pass| PassHandle::new(pass, self.res.generation))
    }

    /// Get the last pass consuming a buffer node, as of the last compile
    pub fn buffer_last_consumer(&self, buffer: BufferHandle) -> Option<PassHandle> {
        let index = contract(self.check_buffer(buffer));
        self.res.buffers[index as usize]
            .last
            .map(|pass| PassHandle::new(pass, self.res.generation))
    }

    /// Get the number of declared passes
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Get the number of texture nodes, including renamed versions
    pub fn texture_count(&self) -> usize {
        self.res.textures.len()
    }

    /// Get the number of buffer nodes, including renamed versions
    pub fn buffer_count(&self) -> usize {
        self.res.buffers.len()
    }

    /// Get the counters computed by the last compile
    pub fn stats(&self) -> GraphStats {
        self.stats
    }
}
