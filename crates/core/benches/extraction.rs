use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pagedoc_core::{
    Document, ExtractOptions, ExtractionPipeline, IngestionPayload, PackParser, SourceKind, StructuralExtractor, Trace,
};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{}", name)).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for name in ["thin.html", "article.html", "hn_thread.html"] {
        let html = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), &html, |b, html| {
            b.iter(|| Document::parse(black_box(html)))
        });
    }

    group.finish();
}

fn bench_structural(c: &mut Criterion) {
    let hn_pack = PackParser::parse_file("../../patterns/news.ycombinator.com.txt").unwrap();
    let hn = Document::parse(&fixture("hn_thread.html"));
    let generic = Document::parse(&fixture("generic_thread.html"));

    let mut group = c.benchmark_group("structural");

    group.bench_function("pack_flat_thread", |b| {
        b.iter(|| StructuralExtractor::new(Some(&hn_pack)).extract(black_box(&hn), &mut Trace::new()))
    });

    group.bench_function("generic_thread", |b| {
        b.iter(|| StructuralExtractor::new(None).extract(black_box(&generic), &mut Trace::new()))
    });

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let pipeline = ExtractionPipeline::new();
    let options = ExtractOptions::default();

    let html = IngestionPayload::new(SourceKind::File, "article.html", fixture("article.html"));
    let json = IngestionPayload::new(SourceKind::Url, "https://www.reddit.com/r/t/.json", fixture("reddit_post.json"))
        .with_mime_type("application/json");

    let mut group = c.benchmark_group("pipeline");

    group.bench_function("html_article", |b| {
        b.iter(|| pipeline.process(black_box(&html), None, &options, &mut Trace::new()))
    });

    group.bench_function("reddit_json", |b| {
        b.iter(|| pipeline.process(black_box(&json), None, &options, &mut Trace::new()))
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_structural, bench_pipeline);
criterion_main!(benches);
