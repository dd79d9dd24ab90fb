pub mod schedule;

use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::calendar::AcademicYear;
use crate::catalog::{FeeCatalog, FeeStructure};
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::directory::StudentDirectory;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::state::{FeeAccount, LedgerStore, StudentFee};
use crate::types::{ClassId, FeeStatus, FeeStructureId, StudentId};

pub use schedule::{InstallmentSchedule, ScheduledInstallment};

/// result of assigning one structure to a whole class
#[derive(Debug, Clone, Default)]
pub struct BatchAssignment {
    pub assigned: Vec<StudentFee>,
    /// students who already had this structure
    pub skipped: Vec<StudentFee>,
    pub failed: Vec<(StudentId, LedgerError)>,
}

impl BatchAssignment {
    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// every student fee of the class for this structure, new or existing
    pub fn fees(&self) -> impl Iterator<Item = &StudentFee> {
        self.assigned.iter().chain(self.skipped.iter())
    }
}

/// turns fee structures into student fees
pub struct AssignmentEngine<'a> {
    store: &'a LedgerStore,
    catalog: &'a FeeCatalog,
    directory: &'a dyn StudentDirectory,
    config: &'a LedgerConfig,
}

impl<'a> AssignmentEngine<'a> {
    pub fn new(
        store: &'a LedgerStore,
        catalog: &'a FeeCatalog,
        directory: &'a dyn StudentDirectory,
        config: &'a LedgerConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            directory,
            config,
        }
    }

    /// assign a structure to one student; an existing pair is returned unchanged
    #[instrument(skip_all, fields(structure_id = %structure_id, student_id = %student_id))]
    pub fn assign(
        &self,
        structure_id: FeeStructureId,
        student_id: StudentId,
        year: &AcademicYear,
        time: &SafeTimeProvider,
    ) -> Result<StudentFee> {
        let structure = self.catalog.structure(structure_id)?;
        check_structure(&structure, year)?;
        self.assign_student(&structure, student_id, year, time)
            .map(|(fee, _)| fee)
    }

    /// assign a structure to every enrolled student of a class.
    ///
    /// structure problems fail the call before any student is touched;
    /// per-student failures are collected and never undo other assignments.
    #[instrument(skip_all, fields(class_id = %class_id, structure_id = %structure_id))]
    pub fn assign_to_class(
        &self,
        class_id: ClassId,
        structure_id: FeeStructureId,
        year: &AcademicYear,
        time: &SafeTimeProvider,
    ) -> Result<BatchAssignment> {
        let structure = self.catalog.structure(structure_id)?;
        if structure.class_id != class_id {
            return Err(LedgerError::StructureClassMismatch {
                structure_id,
                class_id,
            });
        }
        check_structure(&structure, year)?;

        let mut batch = BatchAssignment::default();
        for student in self.directory.enrolled_students(class_id) {
            match self.assign_student(&structure, student.id, year, time) {
                Ok((fee, true)) => batch.assigned.push(fee),
                Ok((fee, false)) => batch.skipped.push(fee),
                Err(e) => {
                    warn!(student_id = %student.id, error = %e, "student assignment failed");
                    batch.failed.push((student.id, e));
                }
            }
        }

        info!(
            assigned = batch.assigned_count(),
            skipped = batch.skipped_count(),
            failed = batch.failed_count(),
            "class assignment finished"
        );
        Ok(batch)
    }

    fn assign_student(
        &self,
        structure: &FeeStructure,
        student_id: StudentId,
        year: &AcademicYear,
        time: &SafeTimeProvider,
    ) -> Result<(StudentFee, bool)> {
        let student = self
            .directory
            .student(student_id)
            .ok_or_else(|| LedgerError::not_found("student", student_id))?;
        if student.class_id != structure.class_id {
            return Err(LedgerError::StudentNotInClass {
                student_id,
                class_id: structure.class_id,
            });
        }

        if let Some(existing) = self.store.find_assignment(student_id, structure.id) {
            debug!(student_fee_id = %existing, "already assigned");
            return Ok((self.store.student_fee(existing)?, false));
        }

        let fee_type = self.catalog.fee_type(structure.fee_type_id)?;
        let schedule = InstallmentSchedule::generate(
            structure.amount,
            structure.frequency,
            fee_type.is_recurring,
            year,
            &self.config.schedule,
        )?;

        let now = time.now();
        let id = Uuid::new_v4();
        let account = FeeAccount {
            fee: StudentFee {
                id,
                student_id,
                structure_id: structure.id,
                fee_type_id: structure.fee_type_id,
                class_id: structure.class_id,
                academic_year: structure.academic_year.clone(),
                total_amount: structure.amount,
                paid_amount: Money::ZERO,
                discount_amount: Money::ZERO,
                due_amount: structure.amount,
                status: FeeStatus::Pending,
                due_date: schedule.due_date,
                last_payment_date: None,
                assigned_at: now,
                waiver_reason: None,
                version: 0,
            },
            dues: schedule.to_dues(id),
        };

        // the catalog count moves only when this call wins the pair
        let (account, created) = self.store.publish_account(account, || {
            self.catalog.record_assignment(structure, fee_type.is_recurring)
        })?;

        if created {
            self.store.emit(Event::FeeAssigned {
                student_fee_id: account.fee.id,
                student_id,
                structure_id: structure.id,
                total_amount: account.fee.total_amount,
                due_date: account.fee.due_date,
                installments: account.dues.len(),
                timestamp: now,
            });
            info!(
                student_fee_id = %account.fee.id,
                total = %account.fee.total_amount,
                installments = account.dues.len(),
                "fee assigned"
            );
        } else {
            debug!(student_fee_id = %account.fee.id, "lost assignment race, returning existing fee");
        }
        Ok((account.fee, created))
    }
}

fn check_structure(structure: &FeeStructure, year: &AcademicYear) -> Result<()> {
    if !structure.is_active {
        return Err(LedgerError::InactiveStructure { id: structure.id });
    }
    if structure.academic_year != year.label {
        return Err(LedgerError::AcademicYearMismatch {
            expected: structure.academic_year.clone(),
            provided: year.label.clone(),
        });
    }
    Ok(())
}
