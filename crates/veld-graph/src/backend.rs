//! Backend seam
//!
//! The graph core never interprets GPU objects. Everything the client
//! renders with is an associated type of [`GraphBackend`], and every GPU
//! operation happens inside one of eight client hooks stored on the graph.

use crate::resource::GraphResources;
use crate::{GraphError, GraphResult};
use crate::handle::UsageFlags;

/// Uninterpreted client types threaded through the graph.
///
/// Implementations are typically zero-sized tag types; the associated
/// types carry the actual backend objects (API handles, descriptor
/// structs, a command recording context).
pub trait GraphBackend {
    /// GPU texture object, materialized by the create-texture hook
    type Texture;
    /// Texture creation parameters
    type TextureDesc;
    /// GPU buffer object, materialized by the create-buffer hook
    type Buffer;
    /// Buffer creation parameters
    type BufferDesc;
    /// Render context handed to every hook and pass body
    type Context;
}

/// Hook that materializes a transient texture before its producing pass
pub type CreateTextureFn<B> = Box<
    dyn FnMut(
        &mut <B as GraphBackend>::Context,
        &mut <B as GraphBackend>::Texture,
        &<B as GraphBackend>::TextureDesc,
    ),
>;

/// Hook invoked for each non-ignored texture read or write slot
pub type PrepareTextureFn<B> =
    Box<dyn FnMut(&mut <B as GraphBackend>::Context, &<B as GraphBackend>::Texture, UsageFlags)>;

/// Hook that releases a transient texture after its last consumer
pub type DestroyTextureFn<B> =
    Box<dyn FnMut(&mut <B as GraphBackend>::Context, &mut <B as GraphBackend>::Texture)>;

/// Hook that materializes a transient buffer before its producing pass
pub type CreateBufferFn<B> = Box<
    dyn FnMut(
        &mut <B as GraphBackend>::Context,
        &mut <B as GraphBackend>::Buffer,
        &<B as GraphBackend>::BufferDesc,
    ),
>;

/// Hook invoked for each non-ignored buffer read or write slot
pub type PrepareBufferFn<B> =
    Box<dyn FnMut(&mut <B as GraphBackend>::Context, &<B as GraphBackend>::Buffer, UsageFlags)>;

/// Hook that releases a transient buffer after its last consumer
pub type DestroyBufferFn<B> =
    Box<dyn FnMut(&mut <B as GraphBackend>::Context, &mut <B as GraphBackend>::Buffer)>;

/// Per-pass body, run between the pre-write and destroy phases
pub type PassExecuteFn<B> =
    Box<dyn FnMut(&GraphResources<B>, &mut <B as GraphBackend>::Context)>;

/// The eight client hook slots.
///
/// All eight must be set before the graph executes; `require_all` is the
/// single place that enforces it.
pub(crate) struct GraphHooks<B: GraphBackend> {
    pub create_texture: Option<CreateTextureFn<B>>,
    pub preread_texture: Option<PrepareTextureFn<B>>,
    pub prewrite_texture: Option<PrepareTextureFn<B>>,
    pub destroy_texture: Option<DestroyTextureFn<B>>,
    pub create_buffer: Option<CreateBufferFn<B>>,
    pub preread_buffer: Option<PrepareBufferFn<B>>,
    pub prewrite_buffer: Option<PrepareBufferFn<B>>,
    pub destroy_buffer: Option<DestroyBufferFn<B>>,
}

impl<B: GraphBackend> Default for GraphHooks<B> {
    fn default() -> Self {
        Self {
            create_texture: None,
            preread_texture: None,
            prewrite_texture: None,
            destroy_texture: None,
            create_buffer: None,
            preread_buffer: None,
            prewrite_buffer: None,
            destroy_buffer: None,
        }
    }
}

/// Mutable borrows of all eight hooks, proving they are set.
pub(crate) struct ActiveHooks<'a, B: GraphBackend> {
    pub create_texture: &'a mut CreateTextureFn<B>,
    pub preread_texture: &'a mut PrepareTextureFn<B>,
    pub prewrite_texture: &'a mut PrepareTextureFn<B>,
    pub destroy_texture: &'a mut DestroyTextureFn<B>,
    pub create_buffer: &'a mut CreateBufferFn<B>,
    pub preread_buffer: &'a mut PrepareBufferFn<B>,
    pub prewrite_buffer: &'a mut PrepareBufferFn<B>,
    pub destroy_buffer: &'a mut DestroyBufferFn<B>,
}

impl<B: GraphBackend> GraphHooks<B> {
    pub fn require_all(&mut self) -> GraphResult<ActiveHooks<'_, B>> {
        Ok(ActiveHooks {
            create_texture: self
                .create_texture
                .as_mut()
                .ok_or(GraphError::MissingHook("create_texture"))?,
            preread_texture: self
                .preread_texture
                .as_mut()
                .ok_or(GraphError::MissingHook("preread_texture"))?,
            prewrite_texture: self
                .prewrite_texture
                .as_mut()
                .ok_or(GraphError::MissingHook("prewrite_texture"))?,
            destroy_texture: self
                .destroy_texture
                .as_mut()
                .ok_or(GraphError::MissingHook("destroy_texture"))?,
            create_buffer: self
                .create_buffer
                .as_mut()
                .ok_or(GraphError::MissingHook("create_buffer"))?,
            preread_buffer: self
                .preread_buffer
                .as_mut()
                .ok_or(GraphError::MissingHook("preread_buffer"))?,
            prewrite_buffer: self
                .prewrite_buffer
                .as_mut()
                .ok_or(GraphError::MissingHook("prewrite_buffer"))?,
            destroy_buffer: self
                .destroy_buffer
                .as_mut()
                .ok_or(GraphError::MissingHook("destroy_buffer"))?,
        })
    }
}
