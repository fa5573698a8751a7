use collab_core::{Assoc, ChangeSet, History, PositionMapper, Rope, Transaction};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 64);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog (collab-core benchmark line)\n"
        ));
    }
    // Remove the final '\n' to avoid creating an extra trailing empty line.
    out.pop();
    out
}

fn bench_rope_build(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("rope_build/50k_lines", |b| {
        b.iter(|| {
            let rope = Rope::from_text(black_box(&text));
            black_box(rope.len_chars());
        })
    });
}

fn bench_insert_middle(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("insert_middle/100_edits", |b| {
        b.iter_batched(
            || Rope::from_text(&text),
            |mut rope| {
                let mut pos = rope.len_chars() / 2;
                for _ in 0..100 {
                    rope = rope.insert(pos, "x").unwrap();
                    pos += 1;
                }
                black_box(rope.len_chars());
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_line_lookup(c: &mut Criterion) {
    let rope = Rope::from_text(&large_text(50_000));
    c.bench_function("line_lookup/1000_lines", |b| {
        b.iter(|| {
            for line in (0..50_000).step_by(50) {
                black_box(rope.line_to_char(black_box(line)).unwrap());
            }
        })
    });
}

fn bench_utf16_conversion(c: &mut Criterion) {
    let rope = Rope::from_text(&large_text(10_000));
    let len = rope.len_chars();
    c.bench_function("char_to_utf16/1000_lookups", |b| {
        b.iter(|| {
            for i in (0..len).step_by(len / 1000) {
                black_box(rope.char_to_utf16(black_box(i)).unwrap());
            }
        })
    });
}

fn bench_apply_change(c: &mut Criterion) {
    let rope = Rope::from_text(&large_text(10_000));
    let len = rope.len_utf16();
    let change = ChangeSet::builder(len)
        .retain(len / 3)
        .delete(100)
        .insert("replacement text goes here")
        .retain(len - len / 3 - 100)
        .build()
        .unwrap();
    c.bench_function("apply_change/10k_lines", |b| {
        b.iter(|| {
            black_box(change.apply(black_box(&rope)).unwrap());
        })
    });
}

fn bench_transform(c: &mut Criterion) {
    let len = 100_000usize;
    let mut a = ChangeSet::builder(len);
    let mut b = ChangeSet::builder(len);
    for _ in 0..(len / 1000) {
        a = a.retain(990).delete(10).insert("aaaa");
        b = b.retain(500).insert("bb").retain(500);
    }
    let a = a.build().unwrap();
    let b = b.build().unwrap();
    c.bench_function("transform/100_ops", |bench| {
        bench.iter(|| {
            black_box(black_box(&a).transform(black_box(&b)).unwrap());
        })
    });
}

fn bench_content_hash(c: &mut Criterion) {
    let rope = Rope::from_text(&large_text(50_000));
    c.bench_function("hash64/50k_lines", |b| {
        b.iter(|| {
            black_box(black_box(&rope).hash64());
        })
    });
}

fn bench_batch_mapping(c: &mut Criterion) {
    let len = 100_000usize;
    let mut builder = ChangeSet::builder(len);
    for _ in 0..(len / 1000) {
        builder = builder.retain(990).delete(10).insert("yyyy");
    }
    let change = builder.build().unwrap();
    let positions: Vec<(usize, Assoc)> = (0..len).step_by(37).map(|p| (p, Assoc::Before)).collect();
    c.bench_function("batch_mapping/2700_cursors", |b| {
        b.iter(|| {
            let mapper = PositionMapper::new(&change);
            black_box(mapper.map(black_box(&positions)));
        })
    });
}

fn bench_history_commit_undo(c: &mut Criterion) {
    let text = large_text(1_000);
    c.bench_function("history/100_commits_and_undos", |b| {
        b.iter_batched(
            || (Rope::from_text(&text), History::new()),
            |(mut doc, history)| {
                for i in 0..100 {
                    let len = doc.len_utf16();
                    let change = ChangeSet::builder(len)
                        .retain(i)
                        .insert("z")
                        .retain(len - i)
                        .build()
                        .unwrap();
                    let next = change.apply(&doc).unwrap();
                    history.commit(Transaction::new(change), &doc).unwrap();
                    doc = next;
                }
                while let Some(t) = history.undo() {
                    doc = t.apply(&doc).unwrap();
                }
                black_box(doc.len_chars());
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_rope_build,
    bench_insert_middle,
    bench_line_lookup,
    bench_utf16_conversion,
    bench_apply_change,
    bench_transform,
    bench_content_hash,
    bench_batch_mapping,
    bench_history_commit_undo,
);
criterion_main!(benches);
