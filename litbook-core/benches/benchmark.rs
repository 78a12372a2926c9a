use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tempfile::TempDir;

use litbook_core::{Cache, embed_output, extract_expr};

/// A chapter with `blocks` fenced blocks and as many inline expressions.
fn chapter(blocks: usize) -> String {
    let mut text = String::from("# Chapter\n\n");
    for i in 0..blocks {
        text.push_str(&format!(
            "Paragraph {i} mentions `lit values[{i}] * 2` in passing.\n\n```lit\nlet v{i} = range({i})\nsum(v{i})\n```\n\n"
        ));
    }
    text
}

fn bench_extract(c: &mut Criterion) {
    let text = chapter(200);
    c.bench_function("extract 400 expressions", |b| {
        b.iter(|| extract_expr(black_box(&text)).unwrap())
    });
}

fn bench_embed(c: &mut Criterion) {
    let text = chapter(200);
    let dir = TempDir::new().unwrap();
    let cache = Cache::new(dir.path());
    for expr in extract_expr(&text).unwrap() {
        cache.write(&expr.expr, "\n42\n").unwrap();
    }
    c.bench_function("embed 400 cached outputs", |b| {
        b.iter(|| embed_output(black_box(&text), &cache).unwrap())
    });
}

criterion_group!(benches, bench_extract, bench_embed);
criterion_main!(benches);
