//! Doctor/patient reference-data provider
//!
//! In production this would be a directory service; here the collaborator is
//! an interface with an in-memory fixture implementation used by the CLI and
//! tests.

use crate::models::{Doctor, PatientProfile};
use uuid::Uuid;

pub trait ReferenceDirectory: Send + Sync {
    fn doctor(&self, id: Uuid) -> Option<Doctor>;

    fn patient(&self, id: Uuid) -> Option<PatientProfile>;

    fn all_doctors(&self) -> Vec<Doctor>;
}

/// Static in-memory directory.
pub struct FixtureDirectory {
    doctors: Vec<Doctor>,
    patients: Vec<PatientProfile>,
}

impl FixtureDirectory {
    pub fn new(doctors: Vec<Doctor>, patients: Vec<PatientProfile>) -> Self {
        Self { doctors, patients }
    }
}

impl ReferenceDirectory for FixtureDirectory {
    fn doctor(&self, id: Uuid) -> Option<Doctor> {
        self.doctors.iter().find(|d| d.id == id).cloned()
    }

    fn patient(&self, id: Uuid) -> Option<PatientProfile> {
        self.patients.iter().find(|p| p.id == id).cloned()
    }

    fn all_doctors(&self) -> Vec<Doctor> {
        self.doctors.clone()
    }
}
