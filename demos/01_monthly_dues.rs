/// monthly dues - oldest-first allocation, discounts and overdue months
use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use school_fee_ledger::{
    AcademicYear, FeeCategory, FeeLedger, FeeStatus, Frequency, InMemoryDirectory, LedgerConfig,
    Money, MonthlyFilter, NewFeeStructure, PaymentMethod, PaymentRequest, SafeTimeProvider,
    StudentFeeView, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    println!("=== monthly dues example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let directory = Arc::new(InMemoryDirectory::new());
    let class_id = directory.add_class("Grade 8", None);
    let student_id = directory.add_student("Ben Okafor", "04", class_id);

    let ledger = FeeLedger::new(LedgerConfig::standard(), directory.clone())?;
    let year = AcademicYear::starting("2024-25", 2024, 4)?;

    let tuition = ledger.add_fee_type("Tuition", "TUI", FeeCategory::Tuition, true)?;
    let structure = ledger.add_structure(
        NewFeeStructure::new(class_id, tuition.id, "2024-25", Money::from_major(10_000), Frequency::Monthly)
            .with_description("grade 8 tuition"),
    )?;
    let fee = ledger.assign(structure.id, student_id, &year, &time)?;

    // 10000 over 12 months leaves the odd paise on march
    let view = ledger.student_fee_view(fee.id)?;
    for installment in &view.installments {
        println!("{}  {:>8}  due {}", installment.period, installment.amount, installment.due_date);
    }

    // one and a half months, with a sibling discount
    controller.advance(Duration::days(5));
    ledger.record_payment(
        PaymentRequest::new(fee.id, Money::from_major(1_000), PaymentMethod::Cash)
            .with_discount(Money::from_major(250), "sibling discount"),
        &time,
    )?;

    // nothing more until july
    let as_of = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    for entry in ledger.overdue(as_of) {
        println!(
            "overdue {:?}: {} outstanding, {} days",
            entry.period.map(|p| p.to_string()),
            entry.outstanding,
            entry.days_overdue
        );
    }

    let marked = ledger.recompute_overdue(as_of)?;
    println!("\npersisted overdue on {} installments", marked);

    let overdue_rows = ledger.monthly_view(
        2024,
        &MonthlyFilter {
            status: Some(FeeStatus::Overdue),
            ..MonthlyFilter::default()
        },
    );
    println!("overdue months in 2024: {}", overdue_rows.len());

    controller.advance(Duration::days(90));
    let outcome = ledger.record_payment(
        PaymentRequest::new(fee.id, Money::from_major(2_000), PaymentMethod::BankTransfer),
        &time,
    )?;
    for line in &outcome.receipt.lines {
        println!("applied {} to {}", line.total_applied(), line.period);
    }

    let json = StudentFeeView::from_account(&ledger.account(fee.id)?).to_json_pretty()?;
    println!("\n{}", json);

    Ok(())
}
