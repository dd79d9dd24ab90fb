/// corrections - optimistic versions, reversals, waivers and reprints
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use school_fee_ledger::{
    AcademicYear, FeeCategory, FeeLedger, Frequency, InMemoryDirectory, LedgerConfig,
    LedgerError, Money, NewFeeStructure, PaymentMethod, PaymentRequest, SafeTimeProvider,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    println!("=== corrections example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let directory = Arc::new(InMemoryDirectory::new());
    let class_id = directory.add_class("Grade 10", Some("C"));
    let student_id = directory.add_student("Chen Wei", "09", class_id);

    let config = LedgerConfig::standard().with_receipt_prefix("SCH");
    let ledger = FeeLedger::new(config, directory.clone())?;
    let year = AcademicYear::starting("2024-25", 2024, 4)?;

    let exam = ledger.add_fee_type("Board exam", "EXM", FeeCategory::Exam, false)?;
    let structure = ledger.add_structure(NewFeeStructure::new(
        class_id,
        exam.id,
        "2024-25",
        Money::from_major(3_000),
        Frequency::OneTime,
    ))?;
    let fee = ledger.assign(structure.id, student_id, &year, &time)?;

    // two clerks work from the same screen
    let seen = fee.version;
    let cheque = ledger.record_payment(
        PaymentRequest::new(fee.id, Money::from_major(3_000), PaymentMethod::Cheque)
            .with_transaction_id("CHQ-004512")
            .expecting_version(seen),
        &time,
    )?;
    println!("clerk 1: {} -> {}", cheque.receipt.receipt_number, cheque.student_fee.status);

    match ledger.record_payment(
        PaymentRequest::new(fee.id, Money::from_major(3_000), PaymentMethod::Cash).expecting_version(seen),
        &time,
    ) {
        Err(LedgerError::Conflict { current_due, .. }) => {
            println!("clerk 2: stale screen, amount now due {}", current_due)
        }
        other => println!("clerk 2: unexpected {:?}", other.map(|o| o.receipt.receipt_number)),
    }

    // the cheque bounces a week later
    controller.advance(Duration::days(7));
    let reversal = ledger.reverse_payment(&cheque.receipt.receipt_number, "cheque returned unpaid", &time)?;
    println!(
        "reversed by {}: due {} ({})",
        reversal.receipt.receipt_number, reversal.student_fee.due_amount, reversal.student_fee.status
    );

    // the family qualifies for a fee waiver instead
    let waived = ledger.waive(fee.id, "bursary committee decision", &time)?;
    println!("waived: {} ({})", waived.due_amount, waived.status);

    // reprints are unaffected by later directory edits
    directory.rename_student(student_id, "Chen Wei Lim");
    let reprint = ledger.reprint_receipt(&cheque.receipt.receipt_number)?;
    println!("reprint still reads: {} / {}", reprint.student_name, reprint.class_name);

    for event in ledger.take_events() {
        println!("{:?}", event);
    }

    Ok(())
}
