use std::sync::Arc;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;

use crate::assignment::{AssignmentEngine, BatchAssignment};
use crate::calendar::AcademicYear;
use crate::catalog::{FeeCatalog, FeeStructure, FeeType, NewFeeStructure};
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::directory::StudentDirectory;
use crate::errors::Result;
use crate::events::Event;
use crate::payments::{Payment, PaymentLedger, PaymentOutcome, PaymentRequest};
use crate::receipts::Receipt;
use crate::reporting::{
    self, ClassSummary, DuesFilter, DuesReport, MonthlyFilter, MonthlyRow, OverdueEntry,
    StudentStatement,
};
use crate::serialization::StudentFeeView;
use crate::state::{FeeAccount, LedgerStore, StudentFee};
use crate::types::{
    ClassId, FeeCategory, FeeStructureId, FeeTypeId, StudentFeeId, StudentId,
};

/// school fee ledger: catalog, student fees, payments, receipts and reports
pub struct FeeLedger {
    config: LedgerConfig,
    catalog: FeeCatalog,
    directory: Arc<dyn StudentDirectory>,
    store: LedgerStore,
}

impl FeeLedger {
    /// create an empty ledger
    pub fn new(config: LedgerConfig, directory: Arc<dyn StudentDirectory>) -> Result<Self> {
        config.validate()?;
        let store = LedgerStore::new(config.receipt.start_sequence);
        Ok(Self {
            config,
            catalog: FeeCatalog::new(),
            directory,
            store,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &FeeCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    fn assignments(&self) -> AssignmentEngine<'_> {
        AssignmentEngine::new(&self.store, &self.catalog, self.directory.as_ref(), &self.config)
    }

    fn payments(&self) -> PaymentLedger<'_> {
        PaymentLedger::new(&self.store, &self.catalog, self.directory.as_ref(), &self.config)
    }

    // catalog

    pub fn add_fee_type(
        &self,
        name: impl Into<String>,
        code: impl Into<String>,
        category: FeeCategory,
        is_recurring: bool,
    ) -> Result<FeeType> {
        let fee_type = self.catalog.add_fee_type(name, code, category, is_recurring)?;
        self.store.emit(Event::FeeTypeRegistered {
            fee_type_id: fee_type.id,
            code: fee_type.code.clone(),
        });
        Ok(fee_type)
    }

    pub fn update_fee_type(
        &self,
        id: FeeTypeId,
        name: impl Into<String>,
        category: FeeCategory,
        is_recurring: bool,
    ) -> Result<FeeType> {
        self.catalog.update_fee_type(id, name, category, is_recurring)
    }

    pub fn add_structure(&self, input: NewFeeStructure) -> Result<FeeStructure> {
        let structure = self.catalog.add_structure(input)?;
        self.store.emit(Event::StructureCreated {
            structure_id: structure.id,
            class_id: structure.class_id,
            fee_type_id: structure.fee_type_id,
            academic_year: structure.academic_year.clone(),
            amount: structure.amount,
            frequency: structure.frequency,
        });
        Ok(structure)
    }

    pub fn set_structure_active(&self, id: FeeStructureId, is_active: bool) -> Result<FeeStructure> {
        let structure = self.catalog.set_structure_active(id, is_active)?;
        self.store.emit(Event::StructureActivationChanged {
            structure_id: id,
            is_active,
        });
        Ok(structure)
    }

    /// existing student fees keep the amount they were assigned with
    pub fn update_structure_amount(&self, id: FeeStructureId, amount: Money) -> Result<FeeStructure> {
        self.catalog.update_structure_amount(id, amount)
    }

    pub fn delete_structure(&self, id: FeeStructureId) -> Result<FeeStructure> {
        let structure = self.catalog.delete_structure(id)?;
        self.store.emit(Event::StructureDeleted { structure_id: id });
        Ok(structure)
    }

    // assignment

    pub fn assign(
        &self,
        structure_id: FeeStructureId,
        student_id: StudentId,
        year: &AcademicYear,
        time: &SafeTimeProvider,
    ) -> Result<StudentFee> {
        self.assignments().assign(structure_id, student_id, year, time)
    }

    pub fn assign_to_class(
        &self,
        class_id: ClassId,
        structure_id: FeeStructureId,
        year: &AcademicYear,
        time: &SafeTimeProvider,
    ) -> Result<BatchAssignment> {
        self.assignments().assign_to_class(class_id, structure_id, year, time)
    }

    // payments

    pub fn record_payment(&self, request: PaymentRequest, time: &SafeTimeProvider) -> Result<PaymentOutcome> {
        self.payments().record(request, time)
    }

    pub fn reverse_payment(
        &self,
        receipt_number: &str,
        reason: &str,
        time: &SafeTimeProvider,
    ) -> Result<PaymentOutcome> {
        self.payments().reverse(receipt_number, reason, time)
    }

    pub fn waive(&self, student_fee_id: StudentFeeId, reason: &str, time: &SafeTimeProvider) -> Result<StudentFee> {
        self.payments().waive(student_fee_id, reason, time)
    }

    pub fn recompute_overdue(&self, as_of: NaiveDate) -> Result<usize> {
        self.payments().recompute_overdue(as_of)
    }

    // reads

    pub fn student_fee(&self, id: StudentFeeId) -> Result<StudentFee> {
        self.store.student_fee(id)
    }

    pub fn account(&self, id: StudentFeeId) -> Result<FeeAccount> {
        self.store.account(id)
    }

    pub fn student_fee_view(&self, id: StudentFeeId) -> Result<StudentFeeView> {
        self.store.account(id).map(|a| StudentFeeView::from_account(&a))
    }

    pub fn payments_for(&self, id: StudentFeeId) -> Vec<Payment> {
        self.store.payments_for(id)
    }

    pub fn reprint_receipt(&self, receipt_number: &str) -> Result<Receipt> {
        self.store.receipts().reprint(receipt_number)
    }

    pub fn receipts_for(&self, id: StudentFeeId) -> Vec<Receipt> {
        self.store.receipts().for_student_fee(id)
    }

    pub fn list_dues(&self, academic_year: &str, filter: &DuesFilter) -> DuesReport {
        reporting::list_dues(&self.store.accounts_snapshot(), academic_year, filter)
    }

    pub fn overdue(&self, as_of: NaiveDate) -> Vec<OverdueEntry> {
        reporting::overdue_entries(&self.store.accounts_snapshot(), as_of)
    }

    pub fn monthly_view(&self, year: i32, filter: &MonthlyFilter) -> Vec<MonthlyRow> {
        reporting::monthly_view(&self.store.accounts_snapshot(), year, filter)
    }

    pub fn student_statement(&self, student_id: StudentId, academic_year: &str) -> StudentStatement {
        reporting::student_statement(
            &self.store.accounts_snapshot(),
            |id| self.store.payments_for(id),
            student_id,
            academic_year,
        )
    }

    pub fn class_summary(&self, class_id: ClassId, academic_year: &str) -> ClassSummary {
        reporting::class_summary(&self.store.accounts_snapshot(), class_id, academic_year)
    }

    /// drain events recorded since the last call
    pub fn take_events(&self) -> Vec<Event> {
        self.store.take_events()
    }
}
