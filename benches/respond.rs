use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sealpir::pir::{plan_with, ClientSession, PlanConfig, ServerSession};

fn config(poly_degree: usize) -> PlanConfig {
    PlanConfig {
        poly_degree: Some(poly_degree),
        plaintext_bits: Some(12),
        dimension_count: Some(2),
        ..PlanConfig::default()
    }
}

fn answer_benchmark(c: &mut Criterion) {
    let item_bytes = 288;
    let mut group = c.benchmark_group("answer");
    group.sample_size(10);

    for num_items in [1024u64, 4096, 16384] {
        let params = plan_with(num_items, item_bytes, &config(2048)).unwrap();
        let database: Vec<u8> = (0..num_items as usize * item_bytes)
            .map(|i| (i % 251) as u8)
            .collect();

        let mut server = ServerSession::new(params.clone()).unwrap();
        server.load_database(&database).unwrap();
        let mut client = ClientSession::from_seed(params, 1, [1u8; 32]).unwrap();
        server.register_keys(&client.galois_keys().unwrap()).unwrap();
        let (_state, query) = client.build_query(num_items / 2).unwrap();

        group.bench_with_input(
            BenchmarkId::new("d2_n2048", format!("{}_items", num_items)),
            &num_items,
            |b, _| {
                b.iter(|| server.answer(&query).unwrap());
            },
        );
    }

    group.finish();
}

fn query_benchmark(c: &mut Criterion) {
    let params = plan_with(4096, 288, &config(2048)).unwrap();
    let mut client = ClientSession::from_seed(params, 1, [2u8; 32]).unwrap();

    c.bench_function("build_query_4096_items", |b| {
        b.iter(|| client.build_query(1234).unwrap());
    });
}

criterion_group!(benches, answer_benchmark, query_benchmark);
criterion_main!(benches);
