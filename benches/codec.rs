//! Benchmark: compile vs serialize vs deserialize for a framed message with a
//! repeated segment, nested optionals and a checksum. The compiled template is
//! reused across iterations for the serialize/deserialize runs, as a service
//! holding a template per record type would.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wiretext::{compile, Codec, MapRecord, RecordSpec, Value};

const TEMPLATE: &str =
    "<STX>~frame-(\\([{keys}\\:]{values}\\):<CR><LF>)\\\\[\\!{tag}[\\[{extra}\\]]\\!]<ETX>:blk~!blk!";

fn record(elements: usize) -> MapRecord {
    let keys: Vec<Value> = (0..elements).map(|i| Value::text(format!("key{}", i))).collect();
    let values: Vec<Value> = (0..elements).map(|i| Value::text(format!("value-{}", i))).collect();
    MapRecord::new(RecordSpec::new("Frame").template(TEMPLATE))
        .with("keys", keys)
        .with("values", values)
        .with("tag", "NEW")
        .with("extra", "42")
}

fn bench_codec(c: &mut Criterion) {
    let codec = Codec::new();
    let template = compile(TEMPLATE).expect("compile template");
    let mut small = record(3);
    let mut large = record(200);
    let small_wire = codec.serialize_with(&template, &mut small).expect("serialize");
    let large_wire = codec.serialize_with(&template, &mut large).expect("serialize");
    eprintln!(
        "codec: {} bytes (3 elements), {} bytes (200 elements)",
        small_wire.len(),
        large_wire.len()
    );

    c.bench_function("compile_frame_template", |b| {
        b.iter(|| compile(black_box(TEMPLATE)).expect("compile"))
    });

    c.bench_function("serialize_frame_3", |b| {
        b.iter(|| codec.serialize_with(&template, black_box(&mut small)).expect("serialize"))
    });

    c.bench_function("serialize_frame_200", |b| {
        b.iter(|| codec.serialize_with(&template, black_box(&mut large)).expect("serialize"))
    });

    c.bench_function("deserialize_frame_3", |b| {
        b.iter(|| {
            let mut parsed = MapRecord::new(RecordSpec::new("Frame"));
            codec
                .deserialize_with(&template, &mut parsed, black_box(&small_wire))
                .expect("deserialize");
            parsed
        })
    });

    c.bench_function("deserialize_frame_200", |b| {
        b.iter(|| {
            let mut parsed = MapRecord::new(RecordSpec::new("Frame"));
            codec
                .deserialize_with(&template, &mut parsed, black_box(&large_wire))
                .expect("deserialize");
            parsed
        })
    });

    c.bench_function("serialize_compile_each_time", |b| {
        b.iter(|| codec.serialize(black_box(&mut small)).expect("serialize"))
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
