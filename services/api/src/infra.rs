use metrics_exporter_prometheus::PrometheusHandle;
use scholarship_ledger::awards::{InMemoryRecordStore, SeedData};
use scholarship_ledger::error::AppError;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Sample faculty used when no seed file is configured.
pub(crate) const DEMO_SEED: &str = r#"{
  "departments": [
    {
      "id": 1, "name": "Computer Science & Engineering",
      "faculty": "Science & Technology", "budget": 60000
    },
    {
      "id": 2, "name": "Electrical & Electronic Engineering",
      "faculty": "Science & Technology", "budget": 40000
    }
  ],
  "students": [
    {
      "student_id": 1001, "reg_no": 2120101, "dept_id": 1, "name": "Farhana Akter",
      "session": "2021-22", "email": "farhana.akter@students.example.edu",
      "academic_record": {
        "student_id": 1001, "current_semester": 4,
        "semester_gpas": [3.82, 3.88, 3.94, null, null, null, null, null]
      }
    },
    {
      "student_id": 1002, "reg_no": 2120102, "dept_id": 1, "name": "Rakib Hasan",
      "session": "2021-22", "email": "rakib.hasan@students.example.edu",
      "academic_record": {
        "student_id": 1002, "current_semester": 4,
        "semester_gpas": [3.71, 3.79, 3.84, null, null, null, null, null]
      }
    },
    {
      "student_id": 1003, "reg_no": 2120103, "dept_id": 1, "name": "Mehjabin Chowdhury",
      "session": "2021-22", "email": "mehjabin.chowdhury@students.example.edu",
      "academic_record": {
        "student_id": 1003, "current_semester": 4,
        "semester_gpas": [3.55, 3.68, 3.77, null, null, null, null, null]
      }
    },
    {
      "student_id": 1004, "reg_no": 2220104, "dept_id": 1, "name": "Imran Kabir",
      "session": "2022-23", "email": "imran.kabir@students.example.edu",
      "academic_record": {
        "student_id": 1004, "current_semester": 2,
        "semester_gpas": [3.58, null, null, null, null, null, null, null]
      }
    },
    {
      "student_id": 1005, "reg_no": 2320105, "dept_id": 1, "name": "Sumaiya Islam",
      "session": "2023-24", "email": "sumaiya.islam@students.example.edu"
    },
    {
      "student_id": 2001, "reg_no": 2120201, "dept_id": 2, "name": "Tahmid Rahman",
      "session": "2021-22", "email": "tahmid.rahman@students.example.edu",
      "academic_record": {
        "student_id": 2001, "current_semester": 3,
        "semester_gpas": [3.66, 3.91, null, null, null, null, null, null]
      }
    }
  ]
}"#;

/// Build the record store from a seed file, or from the bundled sample faculty.
pub(crate) fn load_store(seed_file: Option<&Path>) -> Result<InMemoryRecordStore, AppError> {
    let seed = match seed_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let seed = SeedData::from_json(&raw)?;
            info!(
                path = %path.display(),
                departments = seed.departments.len(),
                students = seed.students.len(),
                "loaded seed file"
            );
            seed
        }
        None => SeedData::from_json(DEMO_SEED)?,
    };
    Ok(InMemoryRecordStore::from_seed(seed)?)
}
