//! Criterion benchmarks for the request validation hot path.

use std::collections::HashMap;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use intel_unit::domain::ReportId;
use intel_unit::domain::validation::{validate_list_query, validate_new_report, validate_patch};

fn bench_create_payload(c: &mut Criterion) {
    let valid = json!({
        "fieldCode": "AX-12",
        "location": "Berlin Sector 4",
        "threatLevel": 5,
        "description": "Unusual convoy movement observed near checkpoint"
    });
    let invalid = json!({ "fieldCode": "ax", "threatLevel": 9, "extra": true });

    c.bench_function("validate_new_report_valid", |b| {
        b.iter(|| validate_new_report(black_box(&valid)));
    });
    c.bench_function("validate_new_report_invalid", |b| {
        b.iter(|| validate_new_report(black_box(&invalid)));
    });
}

fn bench_patch_and_query(c: &mut Criterion) {
    let patch = json!({ "location": "Berlin Sector 5", "confirmed": true });
    let query: HashMap<String, String> = [
        ("threatLevel", "4"),
        ("confirmed", "false"),
        ("limit", "25"),
        ("skip", "50"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    c.bench_function("validate_patch", |b| {
        b.iter(|| validate_patch(black_box(&patch)));
    });
    c.bench_function("validate_list_query", |b| {
        b.iter(|| validate_list_query(black_box(&query)));
    });
}

fn bench_report_id(c: &mut Criterion) {
    c.bench_function("report_id_parse", |b| {
        b.iter(|| ReportId::parse(black_box("507F1F77BCF86CD799439011")));
    });
}

criterion_group!(benches, bench_create_payload, bench_patch_and_query, bench_report_id);
criterion_main!(benches);
