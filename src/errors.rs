use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ClassId, FeeStructureId, FeeTypeId, StudentFeeId, StudentId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount {
        amount: Money,
        reason: String,
    },

    #[error("discount of {discount} requires a reason")]
    DiscountReasonRequired {
        discount: Money,
    },

    #[error("payment exceeds amount due: due {due}, requested {requested}")]
    Overpayment {
        due: Money,
        requested: Money,
    },

    #[error("fee structure {id} is not active")]
    InactiveStructure {
        id: FeeStructureId,
    },

    #[error("student {student_id} is not enrolled in class {class_id}")]
    StudentNotInClass {
        student_id: StudentId,
        class_id: ClassId,
    },

    #[error("fee structure {structure_id} does not belong to class {class_id}")]
    StructureClassMismatch {
        structure_id: FeeStructureId,
        class_id: ClassId,
    },

    #[error("academic year mismatch: structure belongs to {expected}, request used {provided}")]
    AcademicYearMismatch {
        expected: String,
        provided: String,
    },

    #[error("an active structure already exists for class {class_id}, fee type {fee_type_id}, year {academic_year}")]
    DuplicateStructure {
        class_id: ClassId,
        fee_type_id: FeeTypeId,
        academic_year: String,
    },

    #[error("fee type code already registered: {code}")]
    DuplicateFeeTypeCode {
        code: String,
    },

    #[error("fee structure {id} changed while a student was being assigned")]
    StructureChanged {
        id: FeeStructureId,
    },

    #[error("fee structure {id} has {assigned} assigned students")]
    StructureInUse {
        id: FeeStructureId,
        assigned: usize,
    },

    #[error("fee type {id} is referenced by a structure with assigned students")]
    FeeTypeInUse {
        id: FeeTypeId,
    },

    #[error("student fee {id} has been waived")]
    FeeWaived {
        id: StudentFeeId,
    },

    #[error("payment {receipt_number} has already been reversed by {reversed_by}")]
    AlreadyReversed {
        receipt_number: String,
        reversed_by: String,
    },

    #[error("payment {receipt_number} is itself a reversal")]
    ReversalNotReversible {
        receipt_number: String,
    },

    #[error("missing required field: {field}")]
    MissingField {
        field: &'static str,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("student fee {student_fee_id} changed concurrently: expected version {expected}, found {actual}, amount now due {current_due}")]
    Conflict {
        student_fee_id: StudentFeeId,
        expected: u64,
        actual: u64,
        current_due: Money,
    },

    #[error("ledger consistency violation: {message}")]
    Consistency {
        message: String,
    },
}

/// coarse error classes exposed to the api layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// bad input, rejected before any mutation
    Validation,
    /// unknown identifier
    NotFound,
    /// lost a race against another writer; refetch and retry
    Conflict,
    /// invariant broken, a bug rather than bad input
    Consistency,
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        LedgerError::Consistency {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::Conflict { .. } | LedgerError::StructureChanged { .. } => ErrorKind::Conflict,
            LedgerError::Consistency { .. } => ErrorKind::Consistency,
            _ => ErrorKind::Validation,
        }
    }

    /// safe to retry unchanged after refetching current state
    pub fn is_retriable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_classification() {
        let err = LedgerError::Overpayment {
            due: Money::from_major(100),
            requested: Money::from_major(150),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retriable());

        let err = LedgerError::not_found("student fee", Uuid::nil());
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("student fee not found"));

        let err = LedgerError::Conflict {
            student_fee_id: Uuid::nil(),
            expected: 1,
            actual: 2,
            current_due: Money::from_major(10),
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.is_retriable());

        assert_eq!(LedgerError::consistency("negative due").kind(), ErrorKind::Consistency);
    }

    #[test]
    fn test_error_messages() {
        let err = LedgerError::DiscountReasonRequired {
            discount: Money::from_major(500),
        };
        assert_eq!(err.to_string(), "discount of 500.00 requires a reason");
    }
}
