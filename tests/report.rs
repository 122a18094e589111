//! E2E tests for the report, validate and transactions commands

use std::process::Command;

fn run(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Fixture math: two buys (1.0 @ $101 incl. fee, 1.0 @ $202 incl. fee), one
/// sale of 1.5 netting $445 (basis 101 + 0.5*202 = 202, gain 243, long-term),
/// one transfer-out of 0.25 at the $64,000 close (loss 16,000).
#[test]
fn report_table_output() {
    let output = run(&[
        "report",
        "-t",
        "tests/data/transactions.csv",
        "-p",
        "tests/data/btc_historical.csv",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("REALIZED GAINS (BTC)"));
    assert!(stdout.contains("Date Acquired"));
    assert!(stdout.contains("Long-term"));
    assert!(stdout.contains("Disposals: 2"));
    assert!(stdout.contains("-$15757.00"));
    // Half a unit is still in the ledger after the two disposals
    assert!(stdout.contains("Unconsumed lots: 1"));
}

#[test]
fn report_csv_output() {
    let output = run(&[
        "report",
        "-t",
        "tests/data/transactions.csv",
        "-p",
        "tests/data/btc_historical.csv",
        "--csv",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("date_acquired"));
    assert!(stdout.contains("gain_loss_usd"));
    assert!(stdout.contains("Long-term"));
    assert!(stdout.contains("16000.00"));
    assert!(stdout.contains("243.00"));
}

#[test]
fn report_json_output() {
    let output = run(&[
        "report",
        "-t",
        "tests/data/transactions.csv",
        "-p",
        "tests/data/btc_historical.csv",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"disposal_count\": 2"));
    assert!(stdout.contains("\"total_gain\": \"-15757.00\""));
    assert!(stdout.contains("\"holding_period\""));
}

#[test]
fn validate_clean_input() {
    let output = run(&[
        "validate",
        "-t",
        "tests/data/transactions.csv",
        "-p",
        "tests/data/btc_historical.csv",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No issues found"));
}

/// The oversold fixture disposes more than was ever acquired, sends on a date
/// with no close price, and contains a zero-quantity row.
#[test]
fn validate_flags_issues() {
    let output = run(&[
        "validate",
        "-t",
        "tests/data/oversold.csv",
        "-p",
        "tests/data/btc_historical.csv",
    ]);
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("InsufficientLots"));
    assert!(stdout.contains("MissingPrice"));
    assert!(stdout.contains("MalformedRecord"));
}

#[test]
fn validate_json_output() {
    let output = run(&[
        "validate",
        "-t",
        "tests/data/oversold.csv",
        "-p",
        "tests/data/btc_historical.csv",
        "--json",
    ]);
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"issue_count\""));
    assert!(stdout.contains("\"InsufficientLots\""));
}

#[test]
fn transactions_listing() {
    let output = run(&["transactions", "tests/data/transactions.csv"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Purchase"));
    assert!(stdout.contains("Sale"));
    assert!(stdout.contains("Transfer-out"));
    assert!(stdout.contains("bc1qexampledest"));
}

#[test]
fn transactions_filter_by_kind() {
    let output = run(&[
        "transactions",
        "tests/data/transactions.csv",
        "--kind",
        "sale",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sale"));
    assert!(!stdout.contains("Purchase"));
}

#[test]
fn transactions_csv_output() {
    let output = run(&["transactions", "tests/data/transactions.csv", "--csv"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("row_num"));
    assert!(stdout.contains("kind"));
}
