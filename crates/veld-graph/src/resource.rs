//! Resource nodes
//!
//! Textures and buffers share one record shape; a record is one logical
//! version of a resource, not one GPU object. Write-renaming appends a new
//! record for every mutation of a resource the mutating pass did not
//! create, so several records may point at the same payload (the opaque
//! client object and its descriptor).

use bitflags::bitflags;

use crate::backend::GraphBackend;
use crate::GraphError;
use crate::handle::{BufferHandle, TextureHandle, UsageFlags};

bitflags! {
    /// Flag bits shared by pass and resource records
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RecordFlags: u32 {
        /// Backed by a client-owned GPU object; never created or destroyed here
        const IMPORTED = 0x0001;
        /// Created by the graph; create/destroy hooks bracket its lifetime
        const TRANSIENT = 0x0002;
        /// Output is externally observed; the pass is never culled
        const HAS_SIDE_EFFECTS = 0x8000;
    }
}

/// Which resource arena a node lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Texture,
    Buffer,
}

/// One logical version of a texture or buffer
#[derive(Debug, Clone)]
pub(crate) struct ResourceRecord {
    /// Symbolic name, shared by every version of the resource
    pub name: String,
    /// Producing pass index
    pub first: Option<u32>,
    /// Last consuming pass index, assigned during compile
    pub last: Option<u32>,
    pub flags: RecordFlags,
    pub ref_count: u32,
    /// Index into the per-kind payload arena
    pub payload: u32,
}

pub(crate) struct TexturePayload<B: GraphBackend> {
    pub object: B::Texture,
    pub desc: B::TextureDesc,
}

pub(crate) struct BufferPayload<B: GraphBackend> {
    pub object: B::Buffer,
    pub desc: B::BufferDesc,
}

/// Resource arenas plus the accessor surface pass bodies see.
///
/// Everything is append-only within one build session: indices handed out
/// earlier stay stable, and teardown releases the arenas in bulk.
pub struct GraphResources<B: GraphBackend> {
    pub(crate) textures: Vec<ResourceRecord>,
    pub(crate) buffers: Vec<ResourceRecord>,
    pub(crate) texture_payloads: Vec<TexturePayload<B>>,
    pub(crate) buffer_payloads: Vec<BufferPayload<B>>,
    /// Per-slot usage words, indexed like the record arenas
    pub(crate) texture_flags: Vec<UsageFlags>,
    pub(crate) buffer_flags: Vec<UsageFlags>,
    /// Build-session tag; bumped on reset so old handles stop resolving
    pub(crate) generation: u32,
}

impl<B: GraphBackend> GraphResources<B> {
    pub(crate) fn with_capacity(resource_capacity: usize) -> Self {
        Self {
            textures: Vec::with_capacity(resource_capacity),
            buffers: Vec::with_capacity(resource_capacity),
            texture_payloads: Vec::with_capacity(resource_capacity),
            buffer_payloads: Vec::with_capacity(resource_capacity),
            texture_flags: Vec::with_capacity(resource_capacity),
            buffer_flags: Vec::with_capacity(resource_capacity),
            generation: 0,
        }
    }

    /// Check a texture handle against the arena bounds and session tag
    pub fn is_valid_texture(&self, handle: TextureHandle) -> bool {
        (handle.index() as usize) < self.textures.len() && handle.generation() == self.generation
    }

    /// Check a buffer handle against the arena bounds and session tag
    pub fn is_valid_buffer(&self, handle: BufferHandle) -> bool {
        (handle.index() as usize) < self.buffers.len() && handle.generation() == self.generation
    }

    /// Get the GPU object behind a texture handle
    pub fn texture(&self, handle: TextureHandle) -> &B::Texture {
        let record = self.texture_record(handle);
        &self.texture_payloads[record.payload as usize].object
    }

    /// Get the descriptor behind a texture handle
    pub fn texture_desc(&self, handle: TextureHandle) -> &B::TextureDesc {
        let record = self.texture_record(handle);
        &self.texture_payloads[record.payload as usize].desc
    }

    /// Get the usage word stored for a texture slot
    pub fn texture_flags(&self, handle: TextureHandle) -> UsageFlags {
        self.texture_record(handle);
        self.texture_flags[handle.index() as usize]
    }

    /// Get the GPU object behind a buffer handle
    pub fn buffer(&self, handle: BufferHandle) -> &B::Buffer {
        let record = self.buffer_record(handle);
        &self.buffer_payloads[record.payload as usize].object
    }

    /// Get the descriptor behind a buffer handle
    pub fn buffer_desc(&self, handle: BufferHandle) -> &B::BufferDesc {
        let record = self.buffer_record(handle);
        &self.buffer_payloads[record.payload as usize].desc
    }

    /// Get the usage word stored for a buffer slot
    pub fn buffer_flags(&self, handle: BufferHandle) -> UsageFlags {
        self.buffer_record(handle);
        self.buffer_flags[handle.index() as usize]
    }

    fn texture_record(&self, handle: TextureHandle) -> &ResourceRecord {
        if !self.is_valid_texture(handle) {
            let err = GraphError::InvalidTextureHandle {
                index: handle.index(),
                generation: handle.generation(),
            };
            panic!("frame graph contract violation: {err}");
        }
        &self.textures[handle.index() as usize]
    }

    fn buffer_record(&self, handle: BufferHandle) -> &ResourceRecord {
        if !self.is_valid_buffer(handle) {
            let err = GraphError::InvalidBufferHandle {
                index: handle.index(),
                generation: handle.generation(),
            };
            panic!("frame graph contract violation: {err}");
        }
        &self.buffers[handle.index() as usize]
    }

    pub(crate) fn records(&self, kind: ResourceKind) -> &Vec<ResourceRecord> {
        match kind {
            ResourceKind::Texture => &self.textures,
            ResourceKind::Buffer => &self.buffers,
        }
    }

    pub(crate) fn records_mut(&mut self, kind: ResourceKind) -> &mut Vec<ResourceRecord> {
        match kind {
            ResourceKind::Texture => &mut self.textures,
            ResourceKind::Buffer => &mut self.buffers,
        }
    }

    pub(crate) fn slot_flags_mut(&mut self, kind: ResourceKind) -> &mut Vec<UsageFlags> {
        match kind {
            ResourceKind::Texture => &mut self.texture_flags,
            ResourceKind::Buffer => &mut self.buffer_flags,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.textures.clear();
        self.buffers.clear();
        self.texture_payloads.clear();
        self.buffer_payloads.clear();
        self.texture_flags.clear();
        self.buffer_flags.clear();
        self.generation += 1;
    }
}
