use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::process::Command;

mod common;
use common::*;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut commands = seed(5, 1);
    commands.push(cod_order(Some(ORDER_1), 5));
    commands.push(cod_order(None, 1));
    commands.push(checkout(PRIYA, Some(RENTAL_1), 3));
    commands.push(checkout(IRA, None, 1));
    let script = write_script(&commands)?;

    let mut cmd = Command::new(cargo_bin!("campus-market"));
    cmd.arg(script.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "kind,id,name,available,capacity,status",
        ))
        // Stock 5, first order took all of it
        .stdout(predicate::str::contains(format!(
            "product,{PENS},Pens,0,,AVAILABLE"
        )))
        // One unit, rented by the first checkout
        .stdout(predicate::str::contains(format!(
            "listing,{TENT},Tent,0,1,LIVE"
        )))
        .stderr(predicate::str::contains(
            "Error processing command create_order: Insufficient stock for 'Pens'",
        ))
        .stderr(predicate::str::contains("Error processing command checkout_rental"));

    Ok(())
}

#[test]
fn test_cli_logs_failed_commands_at_debug() -> Result<(), Box<dyn std::error::Error>> {
    let mut commands = seed(1, 1);
    commands.push(cod_order(None, 2));
    let script = write_script(&commands)?;

    let mut cmd = Command::new(cargo_bin!("campus-market"));
    cmd.arg(script.path()).env("RUST_LOG", "debug");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("command failed"))
        .stderr(predicate::str::contains("InsufficientStock"))
        .stderr(predicate::str::contains("Error processing command create_order"));

    cmd.env("RUST_LOG", "info")
        .assert()
        .success()
        .stderr(predicate::str::contains("command failed").not());

    Ok(())
}

#[test]
fn test_cli_cancel_restores_stock() -> Result<(), Box<dyn std::error::Error>> {
    let mut commands = seed(5, 2);
    commands.push(cod_order(Some(ORDER_1), 3));
    commands.push(json!({
        "op": "cancel_order",
        "caller": caller(PRIYA, "CUSTOMER"),
        "order_id": ORDER_1,
    }));
    commands.push(checkout(PRIYA, Some(RENTAL_1), 2));
    commands.push(json!({
        "op": "cancel_rental",
        "caller": caller(SAM, "CUSTOMER"),
        "rental_id": RENTAL_1,
    }));
    let script = write_script(&commands)?;

    Command::new(cargo_bin!("campus-market"))
        .arg(script.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "product,{PENS},Pens,5,,AVAILABLE"
        )))
        .stdout(predicate::str::contains(format!(
            "listing,{TENT},Tent,2,2,LIVE"
        )))
        .stderr(predicate::str::contains("Error processing").not());

    Ok(())
}

#[test]
fn test_cli_malformed_lines_do_not_stop_replay() -> Result<(), Box<dyn std::error::Error>> {
    let mut commands = seed(4, 1);
    commands.insert(4, json!({ "op": "launch_rocket" }));
    commands.push(json!({
        "op": "transition_order",
        "caller": caller(ADMIN, "ADMIN"),
        "order_id": ORDER_1,
        "updates": [{ "field": "user_id", "value": PRIYA }],
    }));
    commands.push(cod_order(None, 1));
    let script = write_script(&commands)?;

    Command::new(cargo_bin!("campus-market"))
        .arg(script.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading command").count(2))
        .stdout(predicate::str::contains(format!(
            "product,{PENS},Pens,3,,AVAILABLE"
        )));

    Ok(())
}

#[test]
fn test_cli_missing_input_fails() {
    Command::new(cargo_bin!("campus-market"))
        .arg("does/not/exist.jsonl")
        .assert()
        .failure();
}
