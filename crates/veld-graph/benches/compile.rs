//! Compile-phase benchmarks over the two asymptotic graph shapes:
//! a long chain of renamed writes, and a wide fan of dead readers.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use veld_core::ScratchAllocator;
use veld_graph::{FrameGraph, GraphBackend, GraphResources, UsageFlags};

struct BenchBackend;

impl GraphBackend for BenchBackend {
    type Texture = u32;
    type TextureDesc = ();
    type Buffer = u32;
    type BufferDesc = ();
    type Context = ();
}

fn noop(_: &GraphResources<BenchBackend>, _: &mut ()) {}

/// Every pass rewrites the previous pass's output, ending in a final pass.
fn build_chain(length: u32) -> FrameGraph<BenchBackend> {
    let mut fg = FrameGraph::new(length * 4 + 4, length + 2).unwrap();

    fg.open_pass("source", noop);
    let mut t = fg.create_texture("t", 0, ());
    fg.write_texture(t, UsageFlags::IGNORED);
    fg.close_pass();

    for i in 1..length {
        if i == length - 1 {
            fg.open_final_pass(format!("stage_{i}"), noop);
        } else {
            fg.open_pass(format!("stage_{i}"), noop);
        }
        t = fg.write_texture(t, UsageFlags::IGNORED);
        fg.close_pass();
    }
    fg
}

/// One producer feeding `width` readers whose outputs nothing consumes, so
/// the whole fan unwinds during culling.
fn build_dead_fan(width: u32) -> FrameGraph<BenchBackend> {
    let mut fg = FrameGraph::new(width * 4 + 4, width + 2).unwrap();

    let mut sources = Vec::with_capacity(width as usize);
    fg.open_pass("producer", noop);
    for i in 0..width {
        let t = fg.create_texture(format!("src_{i}"), i, ());
        fg.write_texture(t, UsageFlags::IGNORED);
        sources.push(t);
    }
    fg.close_pass();

    for (i, &src) in sources.iter().enumerate() {
        fg.open_pass(format!("reader_{i}"), noop);
        fg.read_texture(src, UsageFlags::IGNORED);
        let out = fg.create_texture(format!("out_{i}"), i as u32, ());
        fg.write_texture(out, UsageFlags::IGNORED);
        fg.close_pass();
    }
    fg
}

fn bench_compile(c: &mut Criterion) {
    let scratch = ScratchAllocator::new(1024 * 1024);

    let mut chain = build_chain(256);
    c.bench_function("compile/chain_256", |b| {
        b.iter(|| {
            chain.compile(&scratch);
            black_box(chain.stats())
        })
    });

    let mut fan = build_dead_fan(256);
    c.bench_function("compile/dead_fan_256", |b| {
        b.iter(|| {
            fan.compile(&scratch);
            black_box(fan.stats())
        })
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
