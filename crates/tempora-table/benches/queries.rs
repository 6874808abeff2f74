//! Range-query benchmarks over a populated candle table.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;
use tempora_table::{Connection, Datum, DbConfig, Row, Table};

const FIRST_TS: i64 = 1_626_814_980;
const COUNT: usize = 10_000;
const LAST_TS: i64 = FIRST_TS + 60 * (COUNT as i64 - 1);

fn candle(ts: i64) -> Row {
    let mut row = Row::new();
    row.insert("ts".to_string(), Datum::Number(ts as f64));
    row.insert("open".to_string(), Datum::Number(29_834.95));
    row.insert("high".to_string(), Datum::Number(29_841.14));
    row.insert("low".to_string(), Datum::Number(29_834.94));
    row.insert("close".to_string(), Datum::Number(29_841.14));
    row.insert("vol".to_string(), Datum::Number(1.108_220_020_382_135_7));
    row.insert("amt".to_string(), Datum::Number(33_064.184_525_45));
    row
}

fn populated_table() -> (TempDir, Connection, Table) {
    let dir = tempfile::tempdir().unwrap();
    let conn = Connection::open(
        dir.path().join("bench.tempora"),
        DbConfig::with_store_count(4),
    )
    .unwrap();
    let table = conn.open_table("candles_1m", "ts");
    let rows: Vec<Row> = (0..COUNT)
        .map(|i| candle(FIRST_TS + 60 * i as i64))
        .collect();
    table.put(&rows).unwrap();
    (dir, conn, table)
}

fn bench_queries(c: &mut Criterion) {
    let (_dir, _conn, table) = populated_table();
    let mid_ts = FIRST_TS + 60 * (COUNT as i64 / 2);

    c.bench_function("get_since/100", |b| {
        b.iter(|| table.get_since(black_box(mid_ts), 100).unwrap())
    });

    c.bench_function("get_until/100", |b| {
        b.iter(|| table.get_until(black_box(mid_ts), 100).unwrap())
    });

    c.bench_function("get_until_last/100", |b| {
        b.iter(|| table.get_until_last(black_box(100)).unwrap())
    });

    c.bench_function("get_between/500", |b| {
        b.iter(|| {
            table
                .get_between(black_box(mid_ts), black_box(LAST_TS), 500)
                .unwrap()
        })
    });
}

fn bench_put(c: &mut Criterion) {
    let (_dir, _conn, table) = populated_table();
    let batch: Vec<Row> = (0..500)
        .map(|i| candle(FIRST_TS + 60 * i as i64))
        .collect();

    // Overwrites the same 500 keys every iteration: constant-size work.
    c.bench_function("put/500", |b| b.iter(|| table.put(black_box(&batch)).unwrap()));
}

criterion_group!(benches, bench_queries, bench_put);
criterion_main!(benches);
