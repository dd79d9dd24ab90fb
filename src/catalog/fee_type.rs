use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::types::{FeeCategory, FeeTypeId};

/// kind of charge a school levies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeType {
    pub id: FeeTypeId,
    pub name: String,
    /// short unique code, stored upper-case
    pub code: String,
    pub category: FeeCategory,
    pub is_recurring: bool,
}

impl FeeType {
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        category: FeeCategory,
        is_recurring: bool,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        let code = code.into().trim().to_uppercase();

        if name.is_empty() {
            return Err(LedgerError::MissingField { field: "fee_type.name" });
        }
        if code.is_empty() {
            return Err(LedgerError::MissingField { field: "fee_type.code" });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            code,
            category,
            is_recurring,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_type_normalisation() {
        let fee_type = FeeType::new(" Tuition Fee ", "tui", FeeCategory::Tuition, true).unwrap();
        assert_eq!(fee_type.name, "Tuition Fee");
        assert_eq!(fee_type.code, "TUI");
    }

    #[test]
    fn test_fee_type_requires_name_and_code() {
        assert!(matches!(
            FeeType::new("", "TUI", FeeCategory::Tuition, true),
            Err(LedgerError::MissingField { field: "fee_type.name" })
        ));
        assert!(matches!(
            FeeType::new("Tuition", " ", FeeCategory::Tuition, true),
            Err(LedgerError::MissingField { field: "fee_type.code" })
        ));
    }
}
