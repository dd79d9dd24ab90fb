pub mod fee_type;
pub mod structure;

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::state::{read_guard, write_guard};
use crate::types::{ClassId, FeeCategory, FeeStructureId, FeeTypeId};

pub use fee_type::FeeType;
pub use structure::{FeeStructure, NewFeeStructure};

#[derive(Debug, Default)]
struct CatalogInner {
    fee_types: HashMap<FeeTypeId, FeeType>,
    structures: HashMap<FeeStructureId, FeeStructure>,
}

impl CatalogInner {
    fn structure_mut(&mut self, id: FeeStructureId) -> Result<&mut FeeStructure> {
        self.structures
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("fee structure", id))
    }

    fn active_slot_taken(
        &self,
        class_id: ClassId,
        fee_type_id: FeeTypeId,
        academic_year: &str,
        except: Option<FeeStructureId>,
    ) -> bool {
        self.structures.values().any(|s| {
            s.is_active
                && Some(s.id) != except
                && s.occupies_slot(class_id, fee_type_id, academic_year)
        })
    }
}

/// fee types and per-class fee structures
#[derive(Debug, Default)]
pub struct FeeCatalog {
    inner: RwLock<CatalogInner>,
}

impl FeeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// register a fee type, codes are unique
    pub fn add_fee_type(
        &self,
        name: impl Into<String>,
        code: impl Into<String>,
        category: FeeCategory,
        is_recurring: bool,
    ) -> Result<FeeType> {
        let fee_type = FeeType::new(name, code, category, is_recurring)?;
        let mut inner = write_guard(&self.inner);

        if inner.fee_types.values().any(|t| t.code == fee_type.code) {
            return Err(LedgerError::DuplicateFeeTypeCode {
                code: fee_type.code,
            });
        }

        inner.fee_types.insert(fee_type.id, fee_type.clone());
        debug!(fee_type_id = %fee_type.id, code = %fee_type.code, "fee type registered");
        Ok(fee_type)
    }

    /// edit a fee type not yet referenced by any structure with assigned students
    pub fn update_fee_type(
        &self,
        id: FeeTypeId,
        name: impl Into<String>,
        category: FeeCategory,
        is_recurring: bool,
    ) -> Result<FeeType> {
        let mut inner = write_guard(&self.inner);

        let in_use = inner
            .structures
            .values()
            .any(|s| s.fee_type_id == id && s.has_assignments());
        if in_use {
            return Err(LedgerError::FeeTypeInUse { id });
        }

        let fee_type = inner
            .fee_types
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("fee type", id))?;

        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::MissingField { field: "fee_type.name" });
        }
        fee_type.name = name;
        fee_type.category = category;
        fee_type.is_recurring = is_recurring;
        Ok(fee_type.clone())
    }

    pub fn fee_type(&self, id: FeeTypeId) -> Result<FeeType> {
        read_guard(&self.inner)
            .fee_types
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("fee type", id))
    }

    pub fn fee_types(&self) -> Vec<FeeType> {
        let mut types: Vec<FeeType> = read_guard(&self.inner).fee_types.values().cloned().collect();
        types.sort_by(|a, b| a.code.cmp(&b.code));
        types
    }

    /// create an active structure; the (class, fee type, year) slot must be free
    pub fn add_structure(&self, input: NewFeeStructure) -> Result<FeeStructure> {
        input.validate()?;
        let mut inner = write_guard(&self.inner);

        if !inner.fee_types.contains_key(&input.fee_type_id) {
            return Err(LedgerError::not_found("fee type", input.fee_type_id));
        }

        let structure = input.into_structure();
        if inner.active_slot_taken(
            structure.class_id,
            structure.fee_type_id,
            &structure.academic_year,
            None,
        ) {
            return Err(LedgerError::DuplicateStructure {
                class_id: structure.class_id,
                fee_type_id: structure.fee_type_id,
                academic_year: structure.academic_year,
            });
        }

        inner.structures.insert(structure.id, structure.clone());
        debug!(structure_id = %structure.id, amount = %structure.amount, "fee structure created");
        Ok(structure)
    }

    pub fn structure(&self, id: FeeStructureId) -> Result<FeeStructure> {
        read_guard(&self.inner)
            .structures
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("fee structure", id))
    }

    /// structures of a class in a year, active or not
    pub fn structures_for_class(&self, class_id: ClassId, academic_year: &str) -> Vec<FeeStructure> {
        let mut structures: Vec<FeeStructure> = read_guard(&self.inner)
            .structures
            .values()
            .filter(|s| s.class_id == class_id && s.academic_year == academic_year)
            .cloned()
            .collect();
        structures.sort_by(|a, b| a.fee_type_id.cmp(&b.fee_type_id).then(a.id.cmp(&b.id)));
        structures
    }

    /// toggle the active flag, the only edit allowed once students are assigned
    pub fn set_structure_active(&self, id: FeeStructureId, is_active: bool) -> Result<FeeStructure> {
        let mut inner = write_guard(&self.inner);
        let current = inner
            .structures
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("fee structure", id))?;

        if is_active
            && !current.is_active
            && inner.active_slot_taken(
                current.class_id,
                current.fee_type_id,
                &current.academic_year,
                Some(id),
            )
        {
            return Err(LedgerError::DuplicateStructure {
                class_id: current.class_id,
                fee_type_id: current.fee_type_id,
                academic_year: current.academic_year,
            });
        }

        let structure = inner.structure_mut(id)?;
        structure.is_active = is_active;
        Ok(structure.clone())
    }

    /// change the billed amount while nobody is assigned
    pub fn update_structure_amount(&self, id: FeeStructureId, amount: Money) -> Result<FeeStructure> {
        structure::validate_structure_amount(amount)?;
        let mut inner = write_guard(&self.inner);
        let structure = inner.structure_mut(id)?;

        if structure.has_assignments() {
            return Err(LedgerError::StructureInUse {
                id,
                assigned: structure.assigned_students,
            });
        }

        structure.amount = amount;
        Ok(structure.clone())
    }

    /// remove a structure nobody is assigned to
    pub fn delete_structure(&self, id: FeeStructureId) -> Result<FeeStructure> {
        let mut inner = write_guard(&self.inner);
        let assigned = inner.structure_mut(id)?.assigned_students;

        if assigned > 0 {
            return Err(LedgerError::StructureInUse { id, assigned });
        }

        inner
            .structures
            .remove(&id)
            .ok_or_else(|| LedgerError::not_found("fee structure", id))
    }

    /// count a new assignment built from `expected`, refusing if the structure
    /// or its fee type moved since it was read
    pub(crate) fn record_assignment(&self, expected: &FeeStructure, is_recurring: bool) -> Result<()> {
        let mut inner = write_guard(&self.inner);
        let recurring_now = inner
            .fee_types
            .get(&expected.fee_type_id)
            .map(|t| t.is_recurring);
        let structure = inner.structure_mut(expected.id)?;

        if !structure.is_active {
            return Err(LedgerError::InactiveStructure { id: expected.id });
        }
        if structure.amount != expected.amount
            || structure.frequency != expected.frequency
            || recurring_now != Some(is_recurring)
        {
            return Err(LedgerError::StructureChanged { id: expected.id });
        }

        structure.assigned_students += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frequency;
    use uuid::Uuid;

    fn catalog_with_tuition() -> (FeeCatalog, FeeType) {
        let catalog = FeeCatalog::new();
        let tuition = catalog
            .add_fee_type("Tuition", "TUI", FeeCategory::Tuition, true)
            .unwrap();
        (catalog, tuition)
    }

    fn tuition_structure(class_id: ClassId, fee_type_id: FeeTypeId) -> NewFeeStructure {
        NewFeeStructure::new(
            class_id,
            fee_type_id,
            "2024-25",
            Money::from_major(12_000),
            Frequency::Monthly,
        )
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let (catalog, _) = catalog_with_tuition();
        let err = catalog
            .add_fee_type("Tuition again", "tui", FeeCategory::Tuition, true)
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateFeeTypeCode { .. }));
    }

    #[test]
    fn test_active_slot_uniqueness() {
        let (catalog, tuition) = catalog_with_tuition();
        let class_id = Uuid::new_v4();

        let first = catalog.add_structure(tuition_structure(class_id, tuition.id)).unwrap();
        let err = catalog
            .add_structure(tuition_structure(class_id, tuition.id))
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateStructure { .. }));

        // an inactive structure frees the slot
        catalog.set_structure_active(first.id, false).unwrap();
        let second = catalog.add_structure(tuition_structure(class_id, tuition.id)).unwrap();

        // and cannot be re-activated while the replacement is active
        let err = catalog.set_structure_active(first.id, true).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateStructure { .. }));

        // other years and classes are independent
        let next_year = NewFeeStructure {
            academic_year: "2025-26".to_string(),
            ..tuition_structure(class_id, tuition.id)
        };
        assert!(catalog.add_structure(next_year).is_ok());
        assert!(catalog.add_structure(tuition_structure(Uuid::new_v4(), tuition.id)).is_ok());

        assert_eq!(catalog.structures_for_class(class_id, "2024-25").len(), 2);
        assert!(catalog.structure(second.id).unwrap().is_active);
    }

    #[test]
    fn test_structure_requires_known_fee_type() {
        let catalog = FeeCatalog::new();
        let err = catalog
            .add_structure(tuition_structure(Uuid::new_v4(), Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "fee type", .. }));
    }

    #[test]
    fn test_assigned_structure_is_locked() {
        let (catalog, tuition) = catalog_with_tuition();
        let structure = catalog
            .add_structure(tuition_structure(Uuid::new_v4(), tuition.id))
            .unwrap();

        // free edits before assignment
        let updated = catalog
            .update_structure_amount(structure.id, Money::from_major(10_000))
            .unwrap();
        assert_eq!(updated.amount, Money::from_major(10_000));

        catalog.record_assignment(&updated, true).unwrap();

        assert!(matches!(
            catalog.update_structure_amount(structure.id, Money::from_major(9_000)),
            Err(LedgerError::StructureInUse { assigned: 1, .. })
        ));
        assert!(matches!(
            catalog.delete_structure(structure.id),
            Err(LedgerError::StructureInUse { .. })
        ));
        assert!(matches!(
            catalog.update_fee_type(tuition.id, "Renamed", FeeCategory::Tuition, true),
            Err(LedgerError::FeeTypeInUse { .. })
        ));

        // the active flag is still mutable
        assert!(!catalog.set_structure_active(structure.id, false).unwrap().is_active);
    }

    #[test]
    fn test_stale_structure_not_counted() {
        let (catalog, tuition) = catalog_with_tuition();
        let structure = catalog
            .add_structure(tuition_structure(Uuid::new_v4(), tuition.id))
            .unwrap();

        catalog
            .update_structure_amount(structure.id, Money::from_major(99_999))
            .unwrap();
        assert!(matches!(
            catalog.record_assignment(&structure, true),
            Err(LedgerError::StructureChanged { .. })
        ));
        assert!(matches!(
            catalog.record_assignment(&catalog.structure(structure.id).unwrap(), false),
            Err(LedgerError::StructureChanged { .. })
        ));

        let current = catalog.set_structure_active(structure.id, false).unwrap();
        assert!(matches!(
            catalog.record_assignment(&current, true),
            Err(LedgerError::InactiveStructure { .. })
        ));
        assert_eq!(catalog.structure(structure.id).unwrap().assigned_students, 0);
    }

    #[test]
    fn test_unassigned_structure_deletable() {
        let (catalog, tuition) = catalog_with_tuition();
        let structure = catalog
            .add_structure(tuition_structure(Uuid::new_v4(), tuition.id))
            .unwrap();

        catalog.delete_structure(structure.id).unwrap();
        assert!(matches!(
            catalog.structure(structure.id),
            Err(LedgerError::NotFound { .. })
        ));

        let renamed = catalog
            .update_fee_type(tuition.id, "Tuition (revised)", FeeCategory::Tuition, false)
            .unwrap();
        assert_eq!(renamed.name, "Tuition (revised)");
        assert!(!renamed.is_recurring);
    }
}
