use avrojson_core::binary::{write_long, Reader};
use avrojson_core::{Codec, CodecConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const PERSON_SCHEMA: &str = r#"{
    "type": "record",
    "name": "person",
    "fields": [
        {"name": "id", "type": "long"},
        {"name": "first-name", "type": "string"},
        {"name": "score", "type": "double"},
        {"name": "suit", "type": {"type": "enum", "name": "suit", "symbols": ["SPADES", "HEARTS"]}},
        {"name": "tags", "type": {"type": "map", "values": "int"}},
        {"name": "avatar", "type": "bytes"}
    ]
}"#;

fn generate_people(rows: usize) -> String {
    let people: Vec<String> = (0..rows)
        .map(|i| {
            format!(
                r#"{{"id":{},"first-name":"person-{}","score":{}.5,"suit":"{}","tags":{{"a":{},"b":{}}},"avatar":"SEVMTE8="}}"#,
                i * 7919,
                i,
                i % 100,
                if i % 2 == 0 { "SPADES" } else { "HEARTS" },
                i,
                -(i as i64)
            )
        })
        .collect();
    format!("[{}]", people.join(","))
}

fn array_codec() -> Codec {
    let schema = format!(r#"{{"type": "array", "items": {}}}"#, PERSON_SCHEMA);
    Codec::new(&schema).unwrap()
}

fn bench_varint(c: &mut Criterion) {
    let values: Vec<i64> = (0..10_000).map(|i| (i * i * 31) - 5_000_000).collect();
    let mut encoded = Vec::new();
    for v in &values {
        write_long(&mut encoded, *v).unwrap();
    }

    let mut group = c.benchmark_group("varint");
    group.throughput(Throughput::Elements(values.len() as u64));

    group.bench_function("write_long", |b| {
        let mut out = Vec::with_capacity(encoded.len());
        b.iter(|| {
            out.clear();
            for v in &values {
                write_long(&mut out, black_box(*v)).unwrap();
            }
            black_box(out.len())
        })
    });

    group.bench_function("read_long", |b| {
        b.iter(|| {
            let mut reader = Reader::new(black_box(&encoded));
            let mut sum = 0i64;
            while !reader.is_empty() {
                sum = sum.wrapping_add(reader.read_long().unwrap());
            }
            sum
        })
    });

    group.finish();
}

fn bench_records(c: &mut Criterion) {
    let codec = array_codec();
    let mut group = c.benchmark_group("records");

    for rows in [10, 1_000, 10_000].iter() {
        let json = generate_people(*rows);
        let binary = codec.encode(json.as_bytes()).unwrap();
        group.throughput(Throughput::Elements(*rows as u64));

        group.bench_with_input(BenchmarkId::new("encode", rows), &json, |b, json| {
            b.iter(|| codec.encode(black_box(json.as_bytes())).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("decode", rows), &binary, |b, binary| {
            b.iter(|| codec.decode(black_box(binary)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("decode_value", rows), &binary, |b, binary| {
            b.iter(|| codec.decode_value(black_box(binary)).unwrap())
        });
    }

    group.finish();
}

fn bench_block_sizes(c: &mut Criterion) {
    let json = generate_people(1_000);
    let mut group = c.benchmark_group("block_sizes");

    for block_items in [None, Some(1), Some(100)].iter() {
        for sized_blocks in [false, true] {
            let codec = array_codec().with_config(CodecConfig {
                block_items: *block_items,
                sized_blocks,
                ..CodecConfig::default()
            });
            let label = format!("{:?}/sized={}", block_items, sized_blocks);
            group.bench_with_input(BenchmarkId::new("encode", &label), &json, |b, json| {
                b.iter(|| codec.encode(black_box(json.as_bytes())).unwrap())
            });
        }
    }

    group.finish();
}

fn bench_schema_parse(c: &mut Criterion) {
    c.bench_function("parse_person_schema", |b| {
        b.iter(|| Codec::new(black_box(PERSON_SCHEMA)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_varint,
    bench_records,
    bench_block_sizes,
    bench_schema_parse
);

criterion_main!(benches);
