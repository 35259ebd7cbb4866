//! Graphviz export
//!
//! Renders the declared graph as a dot file for offline inspection:
//! passes as boxes, resource versions as ellipses, and one edge per
//! declaration. Most useful after compile, when culled passes and
//! unreachable versions come out dashed.

use std::io::{self, Write};

use smallvec::SmallVec;

use crate::backend::GraphBackend;
use crate::graph::FrameGraph;
use crate::resource::ResourceKind;

fn node_name(kind: ResourceKind, index: u32) -> String {
    match kind {
        ResourceKind::Texture => format!("tex_{index}"),
        ResourceKind::Buffer => format!("buf_{index}"),
    }
}

impl<B: GraphBackend> FrameGraph<B> {
    /// Write the graph in Graphviz dot form.
    ///
    /// Reads flow into a pass, writes flow out of it, and creates are drawn
    /// dotted. Node indices are stable across the build session, so two
    /// dumps of the same graph diff cleanly.
    pub fn write_graphviz<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "digraph frame_graph {{")?;
        writeln!(w, "  rankdir=LR;")?;
        writeln!(w, "  node [fontsize=10];")?;

        for (i, pass) in self.passes.iter().enumerate() {
            let style = if pass.survives() { "solid" } else { "dashed" };
            writeln!(
                w,
                "  pass_{i} [shape=box, style={style}, label=\"{}\"];",
                pass.name
            )?;
        }
        for (i, record) in self.res.textures.iter().enumerate() {
            let style = if record.last.is_some() { "solid" } else { "dashed" };
            writeln!(
                w,
                "  tex_{i} [shape=ellipse, style={style}, label=\"{} #{i}\"];",
                record.name
            )?;
        }
        for (i, record) in self.res.buffers.iter().enumerate() {
            let style = if record.last.is_some() { "solid" } else { "dashed" };
            writeln!(
                w,
                "  buf_{i} [shape=ellipse, style={style}, label=\"{} #{i}\"];",
                record.name
            )?;
        }

        for (i, pass) in self.passes.iter().enumerate() {
            let mut created: SmallVec<[(ResourceKind, u32); 8]> = SmallVec::new();
            let mut read: SmallVec<[(ResourceKind, u32); 8]> = SmallVec::new();
            let mut written: SmallVec<[(ResourceKind, u32); 8]> = SmallVec::new();

            for pos in pass.texture_create.indices() {
                created.push((ResourceKind::Texture, self.lists.texture_create[pos]));
            }
            for pos in pass.buffer_create.indices() {
                created.push((ResourceKind::Buffer, self.lists.buffer_create[pos]));
            }
            for pos in pass.texture_read.indices() {
                read.push((ResourceKind::Texture, self.lists.texture_read[pos]));
            }
            for pos in pass.buffer_read.indices() {
                read.push((ResourceKind::Buffer, self.lists.buffer_read[pos]));
            }
            for pos in pass.texture_write.indices() {
                written.push((ResourceKind::Texture, self.lists.texture_write[pos]));
            }
            for pos in pass.buffer_write.indices() {
                written.push((ResourceKind::Buffer, self.lists.buffer_write[pos]));
            }

            for (kind, index) in created {
                writeln!(w, "  pass_{i} -> {} [style=dotted];", node_name(kind, index))?;
            }
            for (kind, index) in read {
                writeln!(w, "  {} -> pass_{i};", node_name(kind, index))?;
            }
            for (kind, index) in written {
                writeln!(w, "  pass_{i} -> {};", node_name(kind, index))?;
            }
        }

        writeln!(w, "}}")
    }
}
