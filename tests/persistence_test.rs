#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;
use common::*;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: seed the catalog and order three pens
    let mut first = seed(5, 2);
    first.push(cod_order(Some(ORDER_1), 3));
    let script1 = write_script(&first).unwrap();

    let output1 = Command::new(cargo_bin!("campus-market"))
        .arg(script1.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains(&format!("product,{PENS},Pens,2,,AVAILABLE")));

    // 2. Second run against the same DB: cancel the order and rent a tent
    let script2 = write_script(&[
        serde_json::json!({
            "op": "cancel_order",
            "caller": caller(ADMIN, "ADMIN"),
            "order_id": ORDER_1,
        }),
        checkout(PRIYA, Some(RENTAL_1), 2),
    ])
    .unwrap();

    let output2 = Command::new(cargo_bin!("campus-market"))
        .arg(script2.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // Stock recovered from the first run and restored by the cancellation
    assert!(stdout2.contains(&format!("product,{PENS},Pens,5,,AVAILABLE")));
    assert!(stdout2.contains(&format!("listing,{TENT},Tent,1,2,LIVE")));
}
