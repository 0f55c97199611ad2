use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

fn bench_scan_fixture(c: &mut Criterion) {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("two-attachments.eml");

    c.bench_function("scan_two_attachments", |b| {
        b.iter(|| {
            let scanner = maildetach::parser::scanner::AttachmentScanner::default();
            let mut count = 0u64;
            scanner
                .scan_file(&fixture_path, &mut |_record| {
                    count += 1;
                    Ok(())
                })
                .unwrap();
            count
        })
    });
}

fn bench_header_state(c: &mut Criterion) {
    let lines: Vec<String> = (0..1000)
        .map(|i| format!("X-Custom-Header-{i}: some value that is not interesting"))
        .collect();

    c.bench_function("advance_header_state", |b| {
        b.iter(|| {
            lines
                .iter()
                .fold(maildetach::parser::headers::HeaderState::default(), |s, l| {
                    s.advance(l)
                })
        })
    });
}

criterion_group!(benches, bench_scan_fixture, bench_header_state);
criterion_main!(benches);
