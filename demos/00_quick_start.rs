/// quick start - one fee, one payment, one receipt
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use school_fee_ledger::{
    AcademicYear, FeeCategory, FeeLedger, Frequency, InMemoryDirectory, LedgerConfig, Money,
    NewFeeStructure, PaymentMethod, PaymentRequest, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap()
    ));

    // directory owned by the wider school system
    let directory = Arc::new(InMemoryDirectory::new());
    let class_id = directory.add_class("Grade 5", Some("A"));
    let student_id = directory.add_student("Asha Rao", "17", class_id);

    let ledger = FeeLedger::new(LedgerConfig::standard(), directory.clone())?;
    let year = AcademicYear::starting("2024-25", 2024, 4)?;

    // an admission fee paid once
    let admission = ledger.add_fee_type("Admission", "ADM", FeeCategory::Admission, false)?;
    let structure = ledger.add_structure(NewFeeStructure::new(
        class_id,
        admission.id,
        "2024-25",
        Money::from_major(5_000),
        Frequency::OneTime,
    ))?;

    let fee = ledger.assign(structure.id, student_id, &year, &time)?;
    println!("assigned {} due {} ({})", fee.total_amount, fee.due_date, fee.status);

    // pay part of it
    let outcome = ledger.record_payment(
        PaymentRequest::new(fee.id, Money::from_major(2_000), PaymentMethod::Upi)
            .with_transaction_id("UPI-88231"),
        &time,
    )?;
    println!(
        "receipt {}: paid {}, balance {} ({})",
        outcome.receipt.receipt_number,
        outcome.receipt.amount,
        outcome.receipt.balance_due,
        outcome.receipt.status_after
    );

    println!("{}", outcome.receipt.to_json_pretty()?);

    Ok(())
}
