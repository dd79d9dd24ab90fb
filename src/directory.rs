// port to the external student and class directory.
//
// the ledger only reads membership and display labels; directory crud
// lives elsewhere.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::types::{ClassId, StudentId};

/// student as seen by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: StudentId,
    pub name: String,
    pub roll_number: String,
    pub class_id: ClassId,
}

/// class as seen by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: ClassId,
    pub name: String,
    pub section: Option<String>,
}

impl ClassRecord {
    /// "Grade 5 - A" style label used on receipts
    pub fn display_name(&self) -> String {
        match &self.section {
            Some(section) => format!("{} - {}", self.name, section),
            None => self.name.clone(),
        }
    }
}

/// read-only view of the directory
pub trait StudentDirectory: Send + Sync {
    fn student(&self, id: StudentId) -> Option<StudentRecord>;

    fn class(&self, id: ClassId) -> Option<ClassRecord>;

    /// currently enrolled students of a class
    fn enrolled_students(&self, class_id: ClassId) -> Vec<StudentRecord>;
}

/// in-process directory for embedding and tests
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    classes: DashMap<ClassId, ClassRecord>,
    students: DashMap<StudentId, StudentRecord>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&self, name: impl Into<String>, section: Option<&str>) -> ClassId {
        let id = uuid::Uuid::new_v4();
        self.classes.insert(
            id,
            ClassRecord {
                id,
                name: name.into(),
                section: section.map(str::to_string),
            },
        );
        id
    }

    pub fn add_student(
        &self,
        name: impl Into<String>,
        roll_number: impl Into<String>,
        class_id: ClassId,
    ) -> StudentId {
        let id = uuid::Uuid::new_v4();
        self.students.insert(
            id,
            StudentRecord {
                id,
                name: name.into(),
                roll_number: roll_number.into(),
                class_id,
            },
        );
        id
    }

    /// returns false when the student is unknown
    pub fn rename_student(&self, id: StudentId, name: impl Into<String>) -> bool {
        match self.students.get_mut(&id) {
            Some(mut student) => {
                student.name = name.into();
                true
            }
            None => false,
        }
    }

    /// returns false when the student is unknown
    pub fn move_student(&self, id: StudentId, class_id: ClassId) -> bool {
        match self.students.get_mut(&id) {
            Some(mut student) => {
                student.class_id = class_id;
                true
            }
            None => false,
        }
    }

    pub fn remove_student(&self, id: StudentId) -> Option<StudentRecord> {
        self.students.remove(&id).map(|(_, student)| student)
    }
}

impl StudentDirectory for InMemoryDirectory {
    fn student(&self, id: StudentId) -> Option<StudentRecord> {
        self.students.get(&id).map(|s| s.value().clone())
    }

    fn class(&self, id: ClassId) -> Option<ClassRecord> {
        self.classes.get(&id).map(|c| c.value().clone())
    }

    fn enrolled_students(&self, class_id: ClassId) -> Vec<StudentRecord> {
        let mut students: Vec<StudentRecord> = self
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .map(|s| s.value().clone())
            .collect();
        students.sort_by(|a, b| a.roll_number.cmp(&b.roll_number).then(a.id.cmp(&b.id)));
        students
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_queries() {
        let directory = InMemoryDirectory::new();
        let five = directory.add_class("Grade 5", Some("A"));
        let six = directory.add_class("Grade 6", None);

        let asha = directory.add_student("Asha", "02", five);
        let ben = directory.add_student("Ben", "01", five);
        directory.add_student("Chen", "01", six);

        let enrolled = directory.enrolled_students(five);
        assert_eq!(enrolled.len(), 2);
        assert_eq!(enrolled[0].id, ben);
        assert_eq!(directory.student(asha).unwrap().class_id, five);

        assert!(directory.move_student(asha, six));
        assert_eq!(directory.enrolled_students(five).len(), 1);
        assert_eq!(directory.class(five).unwrap().display_name(), "Grade 5 - A");
    }
}
