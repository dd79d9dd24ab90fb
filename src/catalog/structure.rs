use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{ClassId, FeeStructureId, FeeTypeId, Frequency};

/// what one class owes for one fee type in one academic year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStructure {
    pub id: FeeStructureId,
    pub class_id: ClassId,
    pub fee_type_id: FeeTypeId,
    pub academic_year: String,
    /// total billed per student over the year
    pub amount: Money,
    pub frequency: Frequency,
    pub is_active: bool,
    pub description: Option<String>,
    pub assigned_students: usize,
}

/// input for creating a fee structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeeStructure {
    pub class_id: ClassId,
    pub fee_type_id: FeeTypeId,
    pub academic_year: String,
    pub amount: Money,
    pub frequency: Frequency,
    pub description: Option<String>,
}

impl NewFeeStructure {
    pub fn new(
        class_id: ClassId,
        fee_type_id: FeeTypeId,
        academic_year: impl Into<String>,
        amount: Money,
        frequency: Frequency,
    ) -> Self {
        Self {
            class_id,
            fee_type_id,
            academic_year: academic_year.into(),
            amount,
            frequency,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_structure_amount(self.amount)?;
        if self.academic_year.trim().is_empty() {
            return Err(LedgerError::MissingField {
                field: "fee_structure.academic_year",
            });
        }
        Ok(())
    }

    pub(crate) fn into_structure(self) -> FeeStructure {
        FeeStructure {
            id: Uuid::new_v4(),
            class_id: self.class_id,
            fee_type_id: self.fee_type_id,
            academic_year: self.academic_year.trim().to_string(),
            amount: self.amount,
            frequency: self.frequency,
            is_active: true,
            description: self.description,
            assigned_students: 0,
        }
    }
}

impl FeeStructure {
    /// same (class, fee type, academic year) slot
    pub fn occupies_slot(&self, class_id: ClassId, fee_type_id: FeeTypeId, academic_year: &str) -> bool {
        self.class_id == class_id
            && self.fee_type_id == fee_type_id
            && self.academic_year == academic_year
    }

    pub fn has_assignments(&self) -> bool {
        self.assigned_students > 0
    }
}

pub(crate) fn validate_structure_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount {
            amount,
            reason: "structure amount must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_structure_validation() {
        let ok = NewFeeStructure::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "2024-25",
            Money::from_major(12_000),
            Frequency::Monthly,
        );
        assert!(ok.validate().is_ok());

        let zero = NewFeeStructure {
            amount: Money::ZERO,
            ..ok.clone()
        };
        assert!(matches!(zero.validate(), Err(LedgerError::InvalidAmount { .. })));

        let no_year = NewFeeStructure {
            academic_year: "".to_string(),
            ..ok
        };
        assert!(matches!(no_year.validate(), Err(LedgerError::MissingField { .. })));
    }
}
