use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    ClassId, DueAllocation, FeeStatus, FeeStructureId, FeeTypeId, Frequency, PeriodKey,
    StudentFeeId, StudentId,
};

/// all events emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // catalog events
    FeeTypeRegistered {
        fee_type_id: FeeTypeId,
        code: String,
    },
    StructureCreated {
        structure_id: FeeStructureId,
        class_id: ClassId,
        fee_type_id: FeeTypeId,
        academic_year: String,
        amount: Money,
        frequency: Frequency,
    },
    StructureActivationChanged {
        structure_id: FeeStructureId,
        is_active: bool,
    },
    StructureDeleted {
        structure_id: FeeStructureId,
    },

    // assignment events
    FeeAssigned {
        student_fee_id: StudentFeeId,
        student_id: StudentId,
        structure_id: FeeStructureId,
        total_amount: Money,
        due_date: NaiveDate,
        installments: usize,
        timestamp: DateTime<Utc>,
    },

    // ledger events
    PaymentRecorded {
        student_fee_id: StudentFeeId,
        receipt_number: String,
        amount: Money,
        discount: Money,
        allocations: Vec<DueAllocation>,
        timestamp: DateTime<Utc>,
    },
    PaymentReversed {
        student_fee_id: StudentFeeId,
        receipt_number: String,
        reverses: String,
        amount: Money,
        discount: Money,
        timestamp: DateTime<Utc>,
    },
    ReceiptIssued {
        receipt_number: String,
        student_fee_id: StudentFeeId,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        student_fee_id: StudentFeeId,
        old_status: FeeStatus,
        new_status: FeeStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    FeeWaived {
        student_fee_id: StudentFeeId,
        waived_due: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    OverdueMarked {
        student_fee_id: StudentFeeId,
        period: Option<PeriodKey>,
        due_date: NaiveDate,
        as_of: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
