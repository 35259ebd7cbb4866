//! Execute
//!
//! Walks the passes in declaration order, skipping culled ones, and drives
//! the client hooks around each surviving pass body in a fixed sequence:
//! create the pass's transient resources, announce every tagged read and
//! write slot, run the body, then release the transients whose last
//! consumer just ran. Resources exist before barriers are recorded,
//! barriers precede the body, and nothing is destroyed while a later pass
//! still needs it.

use crate::backend::GraphBackend;
use crate::graph::FrameGraph;
use crate::resource::RecordFlags;
use crate::{GraphError, contract};

impl<B: GraphBackend> FrameGraph<B> {
    /// Run the surviving passes against the client's render context.
    ///
    /// All eight hooks must be set and every pass must be closed. The graph
    /// itself is not mutated; only client state changes, through the hooks
    /// and pass bodies.
    pub fn execute(&mut self, ctx: &mut B::Context) {
        if let Some(open) = self.current {
            let err = GraphError::PassStillOpen(self.passes[open].name.clone());
            panic!("frame graph contract violation: {err}");
        }

        let Self {
            res,
            passes,
            lists,
            hooks,
            ..
        } = self;
        let mut active = contract(hooks.require_all());

        for i in 0..passes.len() {
            if !passes[i].survives() {
                log::trace!("skipping culled pass '{}'", passes[i].name);
                continue;
            }
            log::trace!("executing pass '{}'", passes[i].name);

            let pass_index = i as u32;
            let tex_create = passes[i].texture_create;
            let tex_read = passes[i].texture_read;
            let tex_write = passes[i].texture_write;
            let buf_create = passes[i].buffer_create;
            let buf_read = passes[i].buffer_read;
            let buf_write = passes[i].buffer_write;

            // Materialize the transients this pass creates, in declaration
            // order. Imported resources never appear in a create range.
            for pos in tex_create.indices() {
                let record = &res.textures[lists.texture_create[pos] as usize];
                if record.flags.contains(RecordFlags::TRANSIENT) {
                    let payload = &mut res.texture_payloads[record.payload as usize];
                    (active.create_texture)(ctx, &mut payload.object, &payload.desc);
                }
            }
            for pos in buf_create.indices() {
                let record = &res.buffers[lists.buffer_create[pos] as usize];
                if record.flags.contains(RecordFlags::TRANSIENT) {
                    let payload = &mut res.buffer_payloads[record.payload as usize];
                    (active.create_buffer)(ctx, &mut payload.object, &payload.desc);
                }
            }

            // Announce tagged slots so the client can insert barriers and
            // build descriptor state; reads first, then writes
            for pos in tex_read.indices() {
                let index = lists.texture_read[pos] as usize;
                let flags = res.texture_flags[index];
                if !flags.is_ignored() {
                    let record = &res.textures[index];
                    let payload = &res.texture_payloads[record.payload as usize];
                    (active.preread_texture)(ctx, &payload.object, flags);
                }
            }
            for pos in buf_read.indices() {
                let index = lists.buffer_read[pos] as usize;
                let flags = res.buffer_flags[index];
                if !flags.is_ignored() {
                    let record = &res.buffers[index];
                    let payload = &res.buffer_payloads[record.payload as usize];
                    (active.preread_buffer)(ctx, &payload.object, flags);
                }
            }
            for pos in tex_write.indices() {
                let index = lists.texture_write[pos] as usize;
                let flags = res.texture_flags[index];
                if !flags.is_ignored() {
                    let record = &res.textures[index];
                    let payload = &res.texture_payloads[record.payload as usize];
                    (active.prewrite_texture)(ctx, &payload.object, flags);
                }
            }
            for pos in buf_write.indices() {
                let index = lists.buffer_write[pos] as usize;
                let flags = res.buffer_flags[index];
                if !flags.is_ignored() {
                    let record = &res.buffers[index];
                    let payload = &res.buffer_payloads[record.payload as usize];
                    (active.prewrite_buffer)(ctx, &payload.object, flags);
                }
            }

            // Pass body
            let body = &mut passes[i].execute;
            body(res, ctx);

            // Release transients whose last consumer just ran
            for index in 0..res.textures.len() {
                let record = &res.textures[index];
                if record.last == Some(pass_index)
                    && record.flags.contains(RecordFlags::TRANSIENT)
                {
                    let payload = &mut res.texture_payloads[record.payload as usize];
                    (active.destroy_texture)(ctx, &mut payload.object);
                }
            }
            for index in 0..res.buffers.len() {
                let record = &res.buffers[index];
                if record.last == Some(pass_index)
                    && record.flags.contains(RecordFlags::TRANSIENT)
                {
                    let payload = &mut res.buffer_payloads[record.payload as usize];
                    (active.destroy_buffer)(ctx, &mut payload.object);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::UsageFlags;
    use crate::resource::GraphResources;
    use veld_core::ScratchAllocator;

    struct TestBackend;

    impl GraphBackend for TestBackend {
        type Texture = &'static str;
        type TextureDesc = ();
        type Buffer = &'static str;
        type BufferDesc = ();
        type Context = Vec<String>;
    }

    fn noop(_: &GraphResources<TestBackend>, _: &mut Vec<String>) {}

    fn graph_with_hooks() -> FrameGraph<TestBackend> {
        let mut fg = FrameGraph::new(64, 8).unwrap();
        fg.set_create_texture(|trace: &mut Vec<String>, tex: &mut &'static str, _: &()| {
            trace.push(format!("create_tex:{tex}"))
        });
        fg.set_preread_texture(|trace: &mut Vec<String>, tex: &&'static str, flags| {
            trace.push(format!("preread_tex:{tex}:{}", flags.0))
        });
        fg.set_prewrite_texture(|trace: &mut Vec<String>, tex: &&'static str, flags| {
            trace.push(format!("prewrite_tex:{tex}:{}", flags.0))
        });
        fg.set_destroy_texture(|trace: &mut Vec<String>, tex: &mut &'static str| {
            trace.push(format!("destroy_tex:{tex}"))
        });
        fg.set_create_buffer(|trace: &mut Vec<String>, buf: &mut &'static str, _: &()| {
            trace.push(format!("create_buf:{buf}"))
        });
        fg.set_preread_buffer(|trace: &mut Vec<String>, buf: &&'static str, flags| {
            trace.push(format!("preread_buf:{buf}:{}", flags.0))
        });
        fg.set_prewrite_buffer(|trace: &mut Vec<String>, buf: &&'static str, flags| {
            trace.push(format!("prewrite_buf:{buf}:{}", flags.0))
        });
        fg.set_destroy_buffer(|trace: &mut Vec<String>, buf: &mut &'static str| {
            trace.push(format!("destroy_buf:{buf}"))
        });
        fg
    }

    #[test]
    #[should_panic(expected = "hook is not set")]
    fn test_execute_requires_all_hooks() {
        let mut fg: FrameGraph<TestBackend> = FrameGraph::new(8, 2).unwrap();
        fg.set_create_texture(|_: &mut Vec<String>, _: &mut &'static str, _: &()| {});
        let mut trace = Vec::new();
        fg.execute(&mut trace);
    }

    #[test]
    fn test_empty_graph_executes_nothing() {
        let scratch = ScratchAllocator::new(1024);
        let mut fg = graph_with_hooks();
        fg.compile(&scratch);

        let mut trace = Vec::new();
        fg.execute(&mut trace);
        assert!(trace.is_empty());
    }

    #[test]
    fn test_culled_pass_body_never_runs() {
        let scratch = ScratchAllocator::new(1024);
        let mut fg = graph_with_hooks();

        fg.open_pass("orphan", |_, trace| trace.push("exec:orphan".into()));
        let t = fg.create_texture("t", "t", ());
        fg.write_texture(t, UsageFlags::IGNORED);
        fg.close_pass();

        fg.compile(&scratch);

        let mut trace = Vec::new();
        fg.execute(&mut trace);
        assert!(trace.is_empty());
    }

    #[test]
    fn test_final_pass_hook_sequence() {
        let scratch = ScratchAllocator::new(1024);
        let mut fg = graph_with_hooks();

        fg.open_final_pass("present", |_, trace| trace.push("exec:present".into()));
        let t = fg.create_texture("t", "t", ());
        fg.write_texture(t, UsageFlags::IGNORED);
        fg.close_pass();

        fg.compile(&scratch);

        let mut trace = Vec::new();
        fg.execute(&mut trace);
        assert_eq!(trace, vec!["create_tex:t", "exec:present", "destroy_tex:t"]);
    }

    #[test]
    fn test_tagged_write_slot_fires_prewrite() {
        let scratch = ScratchAllocator::new(1024);
        let mut fg = graph_with_hooks();

        fg.open_final_pass("present", |_, trace| trace.push("exec:present".into()));
        let t = fg.create_texture("t", "t", ());
        fg.write_texture(t, UsageFlags(5));
        fg.close_pass();

        fg.compile(&scratch);

        let mut trace = Vec::new();
        fg.execute(&mut trace);
        assert_eq!(
            trace,
            vec![
                "create_tex:t",
                "prewrite_tex:t:5",
                "exec:present",
                "destroy_tex:t",
            ]
        );
    }

    #[test]
    fn test_tagged_read_slot_fires_preread() {
        let scratch = ScratchAllocator::new(1024);
        let mut fg = graph_with_hooks();

        fg.open_final_pass("a", |_, trace| trace.push("exec:a".into()));
        let t = fg.create_texture("t", "t", ());
        fg.close_pass();

        fg.open_final_pass("b", |_, trace| trace.push("exec:b".into()));
        fg.read_texture(t, UsageFlags(9));
        fg.close_pass();

        fg.compile(&scratch);

        let mut trace = Vec::new();
        fg.execute(&mut trace);
        assert_eq!(
            trace,
            vec![
                "create_tex:t",
                "exec:a",
                "preread_tex:t:9",
                "exec:b",
                "destroy_tex:t",
            ]
        );
    }
}
