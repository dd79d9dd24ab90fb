/// class assignment - batch assignment and class-level reporting
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use school_fee_ledger::{
    AcademicYear, DuesFilter, FeeCategory, FeeLedger, Frequency, InMemoryDirectory, LedgerConfig,
    Money, NewFeeStructure, PaymentMethod, PaymentRequest, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    println!("=== class assignment example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()
    ));

    let directory = Arc::new(InMemoryDirectory::new());
    let class_id = directory.add_class("Grade 3", Some("B"));
    let students: Vec<_> = (1..=30)
        .map(|n| directory.add_student(format!("Student {:02}", n), format!("{:02}", n), class_id))
        .collect();

    let ledger = FeeLedger::new(LedgerConfig::standard(), directory.clone())?;
    let year = AcademicYear::starting("2024-25", 2024, 4)?;

    let transport = ledger.add_fee_type("Transport", "BUS", FeeCategory::Transport, true)?;
    let structure = ledger.add_structure(NewFeeStructure::new(
        class_id,
        transport.id,
        "2024-25",
        Money::from_major(6_000),
        Frequency::Quarterly,
    ))?;

    // a few students were set up by hand earlier
    for student in &students[..5] {
        ledger.assign(structure.id, *student, &year, &time)?;
    }

    let batch = ledger.assign_to_class(class_id, structure.id, &year, &time)?;
    println!(
        "assigned {}, skipped {}, failed {}",
        batch.assigned_count(),
        batch.skipped_count(),
        batch.failed_count()
    );

    // a handful pay the first quarter
    for fee in batch.fees().take(12) {
        ledger.record_payment(
            PaymentRequest::new(fee.id, Money::from_major(1_500), PaymentMethod::Cash),
            &time,
        )?;
    }

    let report = ledger.list_dues("2024-25", &DuesFilter::for_class(class_id));
    println!(
        "\n{} fees: total {}, paid {}, due {}",
        report.summary.count, report.summary.total, report.summary.paid, report.summary.due
    );

    let summary = ledger.class_summary(class_id, "2024-25");
    println!(
        "statuses: {} pending, {} partial, {} paid",
        summary.statuses.pending, summary.statuses.partial, summary.statuses.paid
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
