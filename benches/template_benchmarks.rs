use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use graph_template::{
    props, Direction, Evaluators, GraphOperations, GraphTemplate, Node, Params, PropertyValue, TraversalDescription,
};

fn people(template: &GraphTemplate, size: usize) -> Vec<Node> {
    let mut nodes = Vec::with_capacity(size);
    for i in 0..size {
        let node = template
            .create_node(&props! {"name" => format!("Person{}", i), "age" => (i % 100) as i64})
            .unwrap();
        nodes.push(node);
    }
    nodes
}

/// Benchmark node creation through implicit transactions
fn bench_create_node(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_node");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let template = GraphTemplate::in_memory();
                criterion::black_box(people(&template, size));
            });
        });
    }
    group.finish();
}

/// Benchmark exact and query lookups on a legacy index
fn bench_index_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_lookup");

    for size in [100, 1000, 10_000].iter() {
        let template = GraphTemplate::in_memory();
        for node in people(&template, *size) {
            let name = node.get_property("name").cloned().unwrap();
            template.index(Some("people"), node, "name", name).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("exact", size), size, |b, _| {
            b.iter(|| {
                let found = template.lookup::<Node, _>("people", "name", "Person42").unwrap();
                criterion::black_box(found.as_vec());
            });
        });
        group.bench_with_input(BenchmarkId::new("wildcard", size), size, |b, _| {
            b.iter(|| {
                let found = template.lookup_query::<Node>("people", "name:Person4*").unwrap();
                criterion::black_box(found.as_vec());
            });
        });
    }
    group.finish();
}

/// Benchmark breadth-first traversal over a chain
fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");

    for size in [100, 1000].iter() {
        let template = GraphTemplate::in_memory();
        let nodes = people(&template, *size);
        for pair in nodes.windows(2) {
            template.create_relationship(&pair[0], &pair[1], "NEXT", &[]).unwrap();
        }
        let description = TraversalDescription::new()
            .breadth_first()
            .relationships("NEXT", Direction::Outgoing)
            .evaluator(Evaluators::to_depth(10));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let paths = template.traverse(&nodes[0], &description).unwrap();
                criterion::black_box(paths.count());
            });
        });
    }
    group.finish();
}

/// Benchmark parse-cached Cypher execution
fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for size in [100, 1000].iter() {
        let template = GraphTemplate::in_memory();
        people(&template, *size);
        let mut params = Params::new();
        params.insert("min".to_string(), PropertyValue::Integer(50));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let rows = template
                    .query_with_params("MATCH (n) WHERE n.age >= $min RETURN n.name, n.age ORDER BY n.age LIMIT 10", &params)
                    .unwrap();
                criterion::black_box(rows.as_vec());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_create_node, bench_index_lookup, bench_traversal, bench_query);
criterion_main!(benches);
