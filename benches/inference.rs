use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use csv_pgload::{
    executor::ScriptExecutor,
    import,
    ingest::{self, IngestOptions},
    stream,
};
use tempfile::TempDir;

fn generate_orders(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("orders.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(file, "id,ordered_on,amount,status").expect("header");
    for i in 0..rows {
        let status = match i % 3 {
            0 => "shipped",
            1 => "pending",
            _ => "processing",
        };
        let day = (i % 28) + 1;
        let month = (i % 12) + 1;
        writeln!(file, "{i},{day}/{month}/2024,{}.{:02},{status}", i % 500, i % 100)
            .expect("row");
    }
    (temp_dir, csv_path)
}

fn bench_pipeline(c: &mut Criterion) {
    let (temp_dir, csv_path) = generate_orders(20_000);
    let options = IngestOptions {
        skips_dir: Some(temp_dir.path().join("skips")),
        ..IngestOptions::default()
    };

    let mut group = c.benchmark_group("pipeline");

    group.bench_function("read_and_infer", |b| {
        b.iter(|| ingest::load_table(&csv_path, &options).expect("load table"));
    });

    group.bench_function("generate_statements", |b| {
        b.iter_batched(
            || import::prepare(&csv_path, &options).expect("prepare").table,
            |table| stream::collect(table).expect("collect"),
            BatchSize::LargeInput,
        );
    });

    group.bench_function("render_script", |b| {
        b.iter(|| {
            let mut executor = ScriptExecutor::new(Vec::new());
            import::import_file(&csv_path, &options, &mut executor).expect("import");
            executor.into_inner().len()
        });
    });

    group.finish();
    drop(temp_dir);
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
