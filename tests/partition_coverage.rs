//! Partition Coverage Tests
//!
//! Every matching row is returned exactly once across all partitions:
//! - Bucket layout covers the whole row id domain
//! - Grid of partition counts and batch sizes over a small dataset
//! - Rows sitting exactly on bucket boundaries
//! - Filters and projections survive the bucket rewrite

use std::collections::BTreeSet;
use std::sync::Arc;

use aeroscan::config::{
    ReadOptions, CLIENT_URI, READ_BATCH_SIZE, READ_NUM_PARTITIONS, READ_PLAN,
};
use aeroscan::emitter::FieldValue;
use aeroscan::executor::PartitionReader;
use aeroscan::memory::MemoryDatabase;
use aeroscan::planner::{BindParams, LogicalPlan, PlanAnalyzer, Predicate};
use aeroscan::scan::Scan;
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn authors(rows: usize, seed: u64) -> Arc<MemoryDatabase> {
    let db = MemoryDatabase::with_seed(seed);
    db.insert_many(
        "Medical",
        "Authors",
        (1..=rows)
            .map(|i| json!({ "id": i, "name": format!("author-{}", i), "even": i % 2 == 0 }))
            .collect(),
    );
    Arc::new(db)
}

fn options(plan: &LogicalPlan, partitions: usize, batch: usize) -> ReadOptions {
    ReadOptions::new()
        .with(CLIENT_URI, "admin:admin@localhost:8000")
        .with(READ_PLAN, serde_json::to_string(plan).unwrap())
        .with(READ_NUM_PARTITIONS, partitions.to_string())
        .with(READ_BATCH_SIZE, batch.to_string())
}

/// Runs every partition sequentially and returns the raw row values
fn read_all(db: &Arc<MemoryDatabase>, plan: &LogicalPlan, partitions: usize, batch: usize) -> Vec<Value> {
    let scan = Scan::new(&options(plan, partitions, batch), db.clone(), db.clone()).unwrap();
    let batch = scan.to_batch();

    let mut values = Vec::new();
    for partition in batch.plan_input_partitions() {
        let mut reader = batch.create_reader(&partition).unwrap();
        for row in reader.read_all().unwrap() {
            match row.get("value") {
                Some(FieldValue::String(raw)) => values.push(serde_json::from_str(raw).unwrap()),
                other => panic!("unexpected passthrough column {:?}", other),
            }
        }
    }
    values
}

fn ids(values: &[Value]) -> Vec<u64> {
    let mut ids: Vec<u64> = values.iter().map(|v| v["id"].as_u64().unwrap()).collect();
    ids.sort_unstable();
    ids
}

// =============================================================================
// Layout Tests
// =============================================================================

/// Buckets start at 0, end at u64::MAX and follow each other without gaps.
#[test]
fn test_layout_spans_domain() {
    let plan = LogicalPlan::from_view("Medical", "Authors");
    for (partitions, batch) in [(1, 1), (3, 7), (16, 16), (5, 1)] {
        let analysis = PlanAnalyzer::new().analyze_plan(&plan, partitions, batch).unwrap();
        assert_eq!(analysis.partitions().len(), partitions);
        assert!(analysis.partitions().iter().all(|p| p.len() == batch));

        let buckets: Vec<_> = analysis.all_buckets().collect();
        assert_eq!(buckets.len(), partitions * batch);
        assert_eq!(buckets[0].lower_bound(), 0);
        assert_eq!(buckets[buckets.len() - 1].upper_bound(), u64::MAX);
        for pair in buckets.windows(2) {
            assert_eq!(pair[1].lower_bound(), pair[0].upper_bound() + 1);
        }
    }
}

// =============================================================================
// Coverage Tests
// =============================================================================

/// 2 partitions of 2 buckets over 15 rows return all 15 exactly once.
#[test]
fn test_two_by_two_returns_fifteen_rows() {
    let db = authors(15, 42);
    let plan = LogicalPlan::from_view("Medical", "Authors");

    let values = read_all(&db, &plan, 2, 2);
    assert_eq!(values.len(), 15);
    assert_eq!(ids(&values), (1..=15).collect::<Vec<u64>>());
}

/// Every combination of (1|2|16) partitions and (1|2|16) buckets covers the
/// dataset, including layouts with more buckets than rows.
#[test]
fn test_grid_coverage() {
    let db = authors(15, 7);
    let plan = LogicalPlan::from_view("Medical", "Authors");
    let expected: Vec<u64> = (1..=15).collect();

    for partitions in [1, 2, 16] {
        for batch in [1, 2, 16] {
            let values = read_all(&db, &plan, partitions, batch);
            assert_eq!(
                ids(&values),
                expected,
                "partitions={} batch={}",
                partitions,
                batch
            );
        }
    }
}

/// Rows whose ids sit on bucket edges land in exactly one bucket.
#[test]
fn test_boundary_row_ids() {
    let db = Arc::new(MemoryDatabase::with_seed(1));
    let plan = LogicalPlan::from_view("Medical", "Authors");
    let analysis = PlanAnalyzer::new().analyze_plan(&plan, 2, 2).unwrap();

    let mut edges = BTreeSet::new();
    for bucket in analysis.all_buckets() {
        edges.insert(bucket.lower_bound());
        edges.insert(bucket.upper_bound());
    }
    for (i, row_id) in edges.iter().enumerate() {
        db.insert_with_id("Medical", "Authors", *row_id, json!({ "id": i }))
            .unwrap();
    }

    let values = read_all(&db, &plan, 2, 2);
    assert_eq!(values.len(), edges.len());
    assert_eq!(ids(&values), (0..edges.len() as u64).collect::<Vec<u64>>());
}

/// The union of bucket results equals the unpartitioned result for a
/// filtered, projected plan.
#[test]
fn test_filtered_plan_matches_unpartitioned_result() {
    let db = authors(40, 99);
    let plan = LogicalPlan::from_view("Medical", "Authors")
        .filter(Predicate::eq("even", json!(true)))
        .filter(Predicate::gt("id", json!(10)))
        .select(["id", "name"]);

    let unpartitioned = db
        .query(&plan, &BindParams::default(), db.current_snapshot())
        .unwrap();
    let partitioned = read_all(&db, &plan, 4, 3);

    assert_eq!(ids(&partitioned), ids(&unpartitioned));
    assert_eq!(partitioned.len(), 15);
    assert!(partitioned.iter().all(|v| v.get("even").is_none()));
}

/// An empty view yields zero rows without failing any partition.
#[test]
fn test_empty_view() {
    let db = Arc::new(MemoryDatabase::with_seed(5));
    db.create_view("Medical", "Authors");
    let plan = LogicalPlan::from_view("Medical", "Authors");

    assert!(read_all(&db, &plan, 3, 2).is_empty());
}
