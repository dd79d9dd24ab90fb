pub mod assignment;
pub mod calendar;
pub mod catalog;
pub mod config;
pub mod decimal;
pub mod directory;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod payments;
pub mod receipts;
pub mod reporting;
pub mod serialization;
pub mod state;
pub mod types;

// re-export key types
pub use assignment::{BatchAssignment, InstallmentSchedule};
pub use calendar::AcademicYear;
pub use catalog::{FeeCatalog, FeeStructure, FeeType, NewFeeStructure};
pub use config::{LedgerConfig, ReceiptConfig, ScheduleConfig};
pub use decimal::Money;
pub use directory::{ClassRecord, InMemoryDirectory, StudentDirectory, StudentRecord};
pub use errors::{ErrorKind, LedgerError, Result};
pub use events::{Event, EventStore};
pub use ledger::FeeLedger;
pub use payments::{Payment, PaymentOutcome, PaymentRequest};
pub use receipts::{Receipt, ReceiptContext};
pub use reporting::{
    ClassSummary, DuesFilter, DuesReport, DuesSummary, MonthlyFilter, MonthlyRow, OverdueEntry,
    StudentStatement,
};
pub use serialization::StudentFeeView;
pub use state::{FeeAccount, MonthlyDue, StudentFee};
pub use types::{
    ClassId, DueAllocation, FeeCategory, FeeStatus, FeeStructureId, FeeTypeId, Frequency,
    PaymentId, PaymentMethod, PeriodKey, RemainderPolicy, StudentFeeId, StudentId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
