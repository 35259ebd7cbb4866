//! Pass records
//!
//! Declarations of one pass land in six flat index arrays (texture/buffer
//! crossed with create/read/write); the pass record keeps one `[begin, end)`
//! range per array. All declarations of a pass happen between open and
//! close, so its ranges are contiguous and, once the pass is closed, never
//! change again.

use crate::backend::{GraphBackend, PassExecuteFn};
use crate::resource::{RecordFlags, ResourceKind};

/// Declaration phase within a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create,
    Read,
    Write,
}

/// Half-open range over one phase index array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct PhaseRange {
    pub begin: u32,
    pub end: u32,
}

impl PhaseRange {
    /// An empty range starting at the current end of the index array
    pub fn start_at(at: u32) -> Self {
        Self { begin: at, end: at }
    }

    /// Extend the range by the one entry just appended to the array
    pub fn extend(&mut self) {
        self.end += 1;
    }

    pub fn len(&self) -> u32 {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Positions covered by this range, as array indices
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.begin as usize..self.end as usize
    }
}

/// The six flat index arrays the phase ranges point into
#[derive(Debug, Default)]
pub(crate) struct PhaseLists {
    pub texture_create: Vec<u32>,
    pub texture_read: Vec<u32>,
    pub texture_write: Vec<u32>,
    pub buffer_create: Vec<u32>,
    pub buffer_read: Vec<u32>,
    pub buffer_write: Vec<u32>,
}

impl PhaseLists {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            texture_create: Vec::with_capacity(capacity),
            texture_read: Vec::with_capacity(capacity),
            texture_write: Vec::with_capacity(capacity),
            buffer_create: Vec::with_capacity(capacity),
            buffer_read: Vec::with_capacity(capacity),
            buffer_write: Vec::with_capacity(capacity),
        }
    }

    pub fn list(&self, kind: ResourceKind, phase: Phase) -> &Vec<u32> {
        match (kind, phase) {
            (ResourceKind::Texture, Phase::Create) => &self.texture_create,
            (ResourceKind::Texture, Phase::Read) => &self.texture_read,
            (ResourceKind::Texture, Phase::Write) => &self.texture_write,
            (ResourceKind::Buffer, Phase::Create) => &self.buffer_create,
            (ResourceKind::Buffer, Phase::Read) => &self.buffer_read,
            (ResourceKind::Buffer, Phase::Write) => &self.buffer_write,
        }
    }

    pub fn list_mut(&mut self, kind: ResourceKind, phase: Phase) -> &mut Vec<u32> {
        match (kind, phase) {
            (ResourceKind::Texture, Phase::Create) => &mut self.texture_create,
            (ResourceKind::Texture, Phase::Read) => &mut self.texture_read,
            (ResourceKind::Texture, Phase::Write) => &mut self.texture_write,
            (ResourceKind::Buffer, Phase::Create) => &mut self.buffer_create,
            (ResourceKind::Buffer, Phase::Read) => &mut self.buffer_read,
            (ResourceKind::Buffer, Phase::Write) => &mut self.buffer_write,
        }
    }

    pub fn clear(&mut self) {
        self.texture_create.clear();
        self.texture_read.clear();
        self.texture_write.clear();
        self.buffer_create.clear();
        self.buffer_read.clear();
        self.buffer_write.clear();
    }
}

/// One declared pass
pub(crate) struct PassRecord<B: GraphBackend> {
    pub name: String,
    pub execute: PassExecuteFn<B>,
    pub flags: RecordFlags,
    /// Graph output marker; final passes and their outputs are never culled
    pub is_final: bool,
    pub ref_count: u32,
    pub texture_create: PhaseRange,
    pub texture_read: PhaseRange,
    pub texture_write: PhaseRange,
    pub buffer_create: PhaseRange,
    pub buffer_read: PhaseRange,
    pub buffer_write: PhaseRange,
}

impl<B: GraphBackend> PassRecord<B> {
    pub fn range(&self, kind: ResourceKind, phase: Phase) -> PhaseRange {
        match (kind, phase) {
            (ResourceKind::Texture, Phase::Create) => self.texture_create,
            (ResourceKind::Texture, Phase::Read) => self.texture_read,
            (ResourceKind::Texture, Phase::Write) => self.texture_write,
            (ResourceKind::Buffer, Phase::Create) => self.buffer_create,
            (ResourceKind::Buffer, Phase::Read) => self.buffer_read,
            (ResourceKind::Buffer, Phase::Write) => self.buffer_write,
        }
    }

    pub fn range_mut(&mut self, kind: ResourceKind, phase: Phase) -> &mut PhaseRange {
        match (kind, phase) {
            (ResourceKind::Texture, Phase::Create) => &mut self.texture_create,
            (ResourceKind::Texture, Phase::Read) => &mut self.texture_read,
            (ResourceKind::Texture, Phase::Write) => &mut self.texture_write,
            (ResourceKind::Buffer, Phase::Create) => &mut self.buffer_create,
            (ResourceKind::Buffer, Phase::Read) => &mut self.buffer_read,
            (ResourceKind::Buffer, Phase::Write) => &mut self.buffer_write,
        }
    }

    /// Whether this pass is retained by the compile and execute phases
    pub fn survives(&self) -> bool {
        self.ref_count > 0 || self.flags.contains(RecordFlags::HAS_SIDE_EFFECTS) || self.is_final
    }
}

/// Linear membership scan of one pass range
pub(crate) fn pass_contains(list: &[u32], range: PhaseRange, index: u32) -> bool {
    list[range.indices()].contains(&index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_range() {
        let mut range = PhaseRange::start_at(4);
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);

        range.extend();
        range.extend();
        assert_eq!(range.len(), 2);
        assert_eq!(range.indices(), 4..6);
    }

    #[test]
    fn test_pass_contains() {
        let list = vec![7, 3, 9, 3, 5];
        let range = PhaseRange { begin: 1, end: 4 };

        assert!(pass_contains(&list, range, 3));
        assert!(pass_contains(&list, range, 9));
        // Outside the range even though present in the array
        assert!(!pass_contains(&list, range, 5));
        assert!(!pass_contains(&list, range, 7));
    }
}
