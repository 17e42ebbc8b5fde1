use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, GrantCommit, GrantReceipt, NewApplication, RecordStore, StoreError};
use crate::awards::domain::{
    AcademicRecord, AcademicRecordUpdate, ApplicationId, ApplicationStatus, AwardId, AwardRecord,
    Department, DepartmentId, IncomeRecord, StipendApplication, Student, StudentId,
};

/// Rows owned by one department. Every mutation happens under this partition's mutex.
#[derive(Debug)]
struct Partition {
    department: Department,
    students: BTreeMap<StudentId, Student>,
    records: HashMap<StudentId, AcademicRecord>,
    awards: Vec<AwardRecord>,
    applications: BTreeMap<ApplicationId, StipendApplication>,
    income: HashMap<StudentId, IncomeRecord>,
}

impl Partition {
    fn new(department: Department) -> Self {
        Self {
            department,
            students: BTreeMap::new(),
            records: HashMap::new(),
            awards: Vec::new(),
            applications: BTreeMap::new(),
            income: HashMap::new(),
        }
    }
}

/// Record store held in process memory, partitioned by department.
///
/// Grants and submissions in different departments never contend; within one
/// department the partition mutex serializes check-then-write sequences.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    partitions: RwLock<HashMap<DepartmentId, Arc<Mutex<Partition>>>>,
    student_index: RwLock<HashMap<StudentId, DepartmentId>>,
    application_index: RwLock<HashMap<ApplicationId, DepartmentId>>,
    award_sequence: AtomicU64,
    application_sequence: AtomicU64,
}

fn poisoned(what: &str) -> StoreError {
    StoreError::Unavailable(format!("{what} lock poisoned"))
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Result<Self, SeedError> {
        let store = Self::new();
        for department in seed.departments {
            store.add_department(department)?;
        }
        for entry in seed.students {
            store.add_student(entry.student, entry.academic_record)?;
        }
        Ok(store)
    }

    /// Register a department, replacing any existing row with the same id.
    pub fn add_department(&self, department: Department) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write().map_err(|_| poisoned("partition map"))?;
        partitions.insert(department.id, Arc::new(Mutex::new(Partition::new(department))));
        Ok(())
    }

    /// Enroll a student; a missing academic record defaults to a first-semester sheet.
    ///
    /// Re-adding a student replaces their row, but only within the same department.
    pub fn add_student(
        &self,
        student: Student,
        record: Option<AcademicRecord>,
    ) -> Result<(), StoreError> {
        let partition = self.partition(student.dept_id)?;
        let mut guard = lock(&partition)?;
        let id = student.student_id;
        let mut index = self
            .student_index
            .write()
            .map_err(|_| poisoned("student index"))?;
        if let Some(enrolled) = index.get(&id).copied() {
            if enrolled != student.dept_id {
                return Err(StoreError::EnrolledElsewhere(enrolled));
            }
        }

        let mut record = record.unwrap_or_else(|| AcademicRecord::freshman(id));
        record.student_id = id;
        index.insert(id, student.dept_id);
        guard.records.insert(id, record);
        guard.students.insert(id, student);
        Ok(())
    }

    fn partition(&self, dept_id: DepartmentId) -> Result<Arc<Mutex<Partition>>, StoreError> {
        self.partitions
            .read()
            .map_err(|_| poisoned("partition map"))?
            .get(&dept_id)
            .cloned()
            .ok_or(StoreError::NotFound(Entity::Department))
    }

    fn partition_for_student(
        &self,
        id: StudentId,
    ) -> Result<Option<Arc<Mutex<Partition>>>, StoreError> {
        let dept_id = self
            .student_index
            .read()
            .map_err(|_| poisoned("student index"))?
            .get(&id)
            .copied();
        dept_id.map(|dept_id| self.partition(dept_id)).transpose()
    }

    fn partition_for_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<Arc<Mutex<Partition>>>, StoreError> {
        let dept_id = self
            .application_index
            .read()
            .map_err(|_| poisoned("application index"))?
            .get(&id)
            .copied();
        dept_id.map(|dept_id| self.partition(dept_id)).transpose()
    }

    fn read_student<T>(
        &self,
        id: StudentId,
        read: impl FnOnce(&Partition) -> T,
    ) -> Result<Option<T>, StoreError> {
        match self.partition_for_student(id)? {
            Some(partition) => {
                let guard = lock(&partition)?;
                Ok(Some(read(&guard)))
            }
            None => Ok(None),
        }
    }
}

fn lock(partition: &Mutex<Partition>) -> Result<MutexGuard<'_, Partition>, StoreError> {
    partition.lock().map_err(|_| poisoned("department partition"))
}

impl RecordStore for InMemoryRecordStore {
    fn department(&self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        match self.partition(id) {
            Ok(partition) => {
                let guard = lock(&partition)?;
                Ok(Some(guard.department.clone()))
            }
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(other) => Err(other),
        }
    }

    fn student(&self, id: StudentId) -> Result<Option<Student>, StoreError> {
        Ok(self
            .read_student(id, |partition| partition.students.get(&id).cloned())?
            .flatten())
    }

    fn roster(&self, dept_id: DepartmentId) -> Result<Vec<Student>, StoreError> {
        let partition = self.partition(dept_id)?;
        let guard = lock(&partition)?;
        Ok(guard.students.values().cloned().collect())
    }

    fn academic_record(&self, id: StudentId) -> Result<Option<AcademicRecord>, StoreError> {
        Ok(self
            .read_student(id, |partition| partition.records.get(&id).cloned())?
            .flatten())
    }

    fn awards_for_student(&self, id: StudentId) -> Result<Vec<AwardRecord>, StoreError> {
        Ok(self
            .read_student(id, |partition| {
                partition
                    .awards
                    .iter()
                    .filter(|award| award.student_id == id)
                    .cloned()
                    .collect()
            })?
            .unwrap_or_default())
    }

    fn awards_for_department(
        &self,
        dept_id: DepartmentId,
    ) -> Result<Vec<AwardRecord>, StoreError> {
        let partition = self.partition(dept_id)?;
        let guard = lock(&partition)?;
        Ok(guard.awards.clone())
    }

    fn application(&self, id: ApplicationId) -> Result<Option<StipendApplication>, StoreError> {
        match self.partition_for_application(id)? {
            Some(partition) => {
                let guard = lock(&partition)?;
                Ok(guard.applications.get(&id).cloned())
            }
            None => Ok(None),
        }
    }

    fn applications_for_student(
        &self,
        id: StudentId,
    ) -> Result<Vec<StipendApplication>, StoreError> {
        Ok(self
            .read_student(id, |partition| {
                partition
                    .applications
                    .values()
                    .filter(|application| application.student_id == id)
                    .cloned()
                    .collect()
            })?
            .unwrap_or_default())
    }

    fn applications_for_department(
        &self,
        dept_id: DepartmentId,
    ) -> Result<Vec<StipendApplication>, StoreError> {
        let partition = self.partition(dept_id)?;
        let guard = lock(&partition)?;
        Ok(guard.applications.values().cloned().collect())
    }

    fn income_record(&self, id: StudentId) -> Result<Option<IncomeRecord>, StoreError> {
        Ok(self
            .read_student(id, |partition| partition.income.get(&id).cloned())?
            .flatten())
    }

    fn commit_grant(&self, grant: GrantCommit) -> Result<GrantReceipt, StoreError> {
        let partition = self.partition(grant.dept_id)?;
        let mut guard = lock(&partition)?;

        if !guard.students.contains_key(&grant.student_id) {
            return Err(StoreError::NotFound(Entity::Student));
        }
        if guard
            .awards
            .iter()
            .any(|award| award.student_id == grant.student_id && award.semester == grant.semester)
        {
            return Err(StoreError::DuplicateAward);
        }
        if let Some(application_id) = grant.application {
            let application = guard
                .applications
                .get(&application_id)
                .ok_or(StoreError::NotFound(Entity::Application))?;
            if application.status != ApplicationStatus::Pending
                || application.student_id != grant.student_id
            {
                return Err(StoreError::ApplicationNotPending);
            }
        }
        let available = guard.department.budget;
        let remaining = available
            .checked_sub(grant.amount)
            .ok_or(StoreError::InsufficientBudget { available })?;

        let award = AwardRecord {
            id: AwardId(self.award_sequence.fetch_add(1, Ordering::Relaxed) + 1),
            student_id: grant.student_id,
            dept_id: grant.dept_id,
            student_name: grant.student_name,
            tier: grant.tier,
            amount: grant.amount,
            semester: grant.semester,
            awarded_at: grant.awarded_at,
        };

        guard.department.budget = remaining;
        guard.awards.push(award.clone());
        if let Some(application_id) = grant.application {
            if let Some(application) = guard.applications.get_mut(&application_id) {
                application.status = ApplicationStatus::Approved;
                application.updated_at = grant.awarded_at;
            }
        }

        Ok(GrantReceipt {
            award,
            remaining_budget: remaining,
        })
    }

    fn commit_submission(
        &self,
        income: IncomeRecord,
        application: NewApplication,
    ) -> Result<StipendApplication, StoreError> {
        let partition = self.partition(application.dept_id)?;
        let mut guard = lock(&partition)?;

        if !guard.students.contains_key(&application.student_id) {
            return Err(StoreError::NotFound(Entity::Student));
        }
        if guard.applications.values().any(|existing| {
            existing.student_id == application.student_id
                && existing.status == ApplicationStatus::Pending
        }) {
            return Err(StoreError::PendingApplicationExists);
        }

        let mut index = self
            .application_index
            .write()
            .map_err(|_| poisoned("application index"))?;
        let id = ApplicationId(self.application_sequence.fetch_add(1, Ordering::Relaxed) + 1);
        let stored = StipendApplication {
            id,
            student_id: application.student_id,
            dept_id: application.dept_id,
            tier: application.tier,
            semester: application.semester,
            status: ApplicationStatus::Pending,
            created_at: application.created_at,
            updated_at: application.created_at,
        };

        index.insert(id, application.dept_id);
        guard.income.insert(income.student_id, income);
        guard.applications.insert(id, stored.clone());
        Ok(stored)
    }

    fn commit_record_update(
        &self,
        id: StudentId,
        update: &AcademicRecordUpdate,
    ) -> Result<AcademicRecord, StoreError> {
        let partition = self
            .partition_for_student(id)?
            .ok_or(StoreError::NotFound(Entity::Student))?;
        let mut guard = lock(&partition)?;
        let mut record = guard
            .records
            .get(&id)
            .cloned()
            .unwrap_or_else(|| AcademicRecord::freshman(id));
        record
            .apply_update(update)
            .map_err(|err| StoreError::InvalidRecord(err.to_string()))?;
        guard.records.insert(id, record.clone());
        Ok(record)
    }

    fn commit_rejection(
        &self,
        id: ApplicationId,
        at: DateTime<Utc>,
    ) -> Result<StipendApplication, StoreError> {
        let partition = self
            .partition_for_application(id)?
            .ok_or(StoreError::NotFound(Entity::Application))?;
        let mut guard = lock(&partition)?;
        let application = guard
            .applications
            .get_mut(&id)
            .ok_or(StoreError::NotFound(Entity::Application))?;
        if application.status != ApplicationStatus::Pending {
            return Err(StoreError::ApplicationNotPending);
        }
        application.status = ApplicationStatus::Rejected;
        application.updated_at = at;
        Ok(application.clone())
    }
}

/// JSON document used to bootstrap the in-memory store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub students: Vec<SeedStudent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedStudent {
    #[serde(flatten)]
    pub student: Student,
    #[serde(default)]
    pub academic_record: Option<AcademicRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("seed document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SeedData {
    pub fn from_json(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awards::domain::{AwardTier, Semester};
    use chrono::Utc;

    fn store_with_student(budget: u64) -> InMemoryRecordStore {
        let store = InMemoryRecordStore::new();
        store
            .add_department(Department {
                id: DepartmentId(1),
                name: "Computer Science".to_string(),
                faculty: "Science & Technology".to_string(),
                budget,
            })
            .expect("department");
        store
            .add_student(
                Student {
                    student_id: StudentId(10),
                    reg_no: 2110,
                    dept_id: DepartmentId(1),
                    name: "Nadia Rahman".to_string(),
                    session: "2021-22".to_string(),
                    email: "nadia@example.edu".to_string(),
                },
                None,
            )
            .expect("student");
        store
    }

    fn grant(amount: u64) -> GrantCommit {
        GrantCommit {
            student_id: StudentId(10),
            dept_id: DepartmentId(1),
            student_name: "Nadia Rahman".to_string(),
            tier: AwardTier::BupScholarship,
            amount,
            semester: Semester::new(1).unwrap(),
            application: None,
            awarded_at: Utc::now(),
        }
    }

    #[test]
    fn commit_grant_debits_budget_once_per_semester() {
        let store = store_with_student(10_000);
        let receipt = store.commit_grant(grant(9_000)).expect("first grant");
        assert_eq!(receipt.remaining_budget, 1_000);
        assert_eq!(receipt.award.id, AwardId(1));

        assert_eq!(store.commit_grant(grant(9_000)), Err(StoreError::DuplicateAward));
        let department = store.department(DepartmentId(1)).unwrap().unwrap();
        assert_eq!(department.budget, 1_000);
        assert_eq!(store.awards_for_student(StudentId(10)).unwrap().len(), 1);
    }

    #[test]
    fn commit_grant_leaves_state_untouched_when_budget_short() {
        let store = store_with_student(5_000);
        assert_eq!(
            store.commit_grant(grant(9_000)),
            Err(StoreError::InsufficientBudget { available: 5_000 })
        );
        assert_eq!(store.department(DepartmentId(1)).unwrap().unwrap().budget, 5_000);
        assert!(store.awards_for_department(DepartmentId(1)).unwrap().is_empty());
    }

    #[test]
    fn unknown_ids_read_as_absent() {
        let store = store_with_student(0);
        assert_eq!(store.department(DepartmentId(99)).unwrap(), None);
        assert_eq!(store.student(StudentId(99)).unwrap(), None);
        assert_eq!(store.application(ApplicationId(1)).unwrap(), None);
        assert!(matches!(
            store.roster(DepartmentId(99)),
            Err(StoreError::NotFound(Entity::Department))
        ));
    }

    #[test]
    fn seed_document_populates_partitions() {
        let raw = r#"{
            "departments": [
                {"id": 3, "name": "EEE", "faculty": "Engineering", "budget": 40000}
            ],
            "students": [
                {
                    "student_id": 7, "reg_no": 307, "dept_id": 3, "name": "Tanvir",
                    "session": "2022-23", "email": "tanvir@example.edu",
                    "academic_record": {
                        "student_id": 7, "current_semester": 2,
                        "semester_gpas": [3.91, null, null, null, null, null, null, null]
                    }
                }
            ]
        }"#;
        let store = InMemoryRecordStore::from_seed(SeedData::from_json(raw).unwrap()).unwrap();
        let record = store.academic_record(StudentId(7)).unwrap().unwrap();
        assert_eq!(record.last_semester_gpa(), Some(3.91));
        assert_eq!(store.roster(DepartmentId(3)).unwrap().len(), 1);
    }

    #[test]
    fn seed_rejects_invalid_grade_sheet() {
        let raw = r#"{
            "students": [
                {
                    "student_id": 7, "reg_no": 307, "dept_id": 3, "name": "Tanvir",
                    "session": "2022-23", "email": "tanvir@example.edu",
                    "academic_record": {"student_id": 7, "current_semester": 12}
                }
            ]
        }"#;
        assert!(matches!(SeedData::from_json(raw), Err(SeedError::Parse(_))));
    }

    #[test]
    fn student_cannot_move_between_departments() {
        let store = store_with_student(10_000);
        store
            .add_department(Department {
                id: DepartmentId(2),
                name: "Physics".to_string(),
                faculty: "Science".to_string(),
                budget: 10_000,
            })
            .expect("department");
        let moved = Student {
            dept_id: DepartmentId(2),
            ..store.student(StudentId(10)).unwrap().unwrap()
        };

        assert_eq!(
            store.add_student(moved, None),
            Err(StoreError::EnrolledElsewhere(DepartmentId(1)))
        );
        assert_eq!(store.roster(DepartmentId(1)).unwrap().len(), 1);
        assert!(store.roster(DepartmentId(2)).unwrap().is_empty());
        assert_eq!(
            store.student(StudentId(10)).unwrap().unwrap().dept_id,
            DepartmentId(1)
        );
    }

    #[test]
    fn re_enrolling_in_the_same_department_replaces_the_row() {
        let store = store_with_student(10_000);
        let renamed = Student {
            name: "Nadia R.".to_string(),
            ..store.student(StudentId(10)).unwrap().unwrap()
        };
        store.add_student(renamed, None).expect("same department");

        let roster = store.roster(DepartmentId(1)).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].name, "Nadia R.");
    }

    #[test]
    fn record_update_is_applied_under_the_partition_lock() {
        let store = store_with_student(0);
        let update = AcademicRecordUpdate {
            current_semester: Some(3),
            semester_gpas: vec![(1, 3.6), (2, 3.8)],
        };
        let record = store
            .commit_record_update(StudentId(10), &update)
            .expect("valid update");
        assert_eq!(record.current_semester(), 3);
        assert_eq!(store.academic_record(StudentId(10)).unwrap(), Some(record));

        let rejected = AcademicRecordUpdate {
            current_semester: Some(4),
            semester_gpas: vec![(3, 4.5)],
        };
        assert!(matches!(
            store.commit_record_update(StudentId(10), &rejected),
            Err(StoreError::InvalidRecord(_))
        ));
        assert_eq!(
            store.academic_record(StudentId(10)).unwrap().unwrap().current_semester(),
            3
        );
        assert_eq!(
            store.commit_record_update(StudentId(99), &update),
            Err(StoreError::NotFound(Entity::Student))
        );
    }

    #[test]
    fn concurrent_record_updates_are_not_lost() {
        let store = Arc::new(store_with_student(0));
        let handles: Vec<_> = (1..=2u8)
            .map(|semester| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let update = AcademicRecordUpdate {
                        current_semester: Some(3),
                        semester_gpas: vec![(semester, 3.5)],
                    };
                    store.commit_record_update(StudentId(10), &update)
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread").expect("update");
        }

        let record = store.academic_record(StudentId(10)).unwrap().unwrap();
        assert_eq!(record.gpa_for(Semester::new(1).unwrap()), Some(3.5));
        assert_eq!(record.gpa_for(Semester::new(2).unwrap()), Some(3.5));
    }
}
