//! Static reference data standing in for the doctor/patient directory.

use booking_engine::{Doctor, FixtureDirectory, InsuranceClass, PatientProfile};
use uuid::Uuid;

fn doctor(
    id: u128,
    name: &str,
    specialty: &str,
    city: &str,
    distance_km: f64,
    rating: f32,
    languages: &[&str],
    offers_video: bool,
    accepts_public_insurance: bool,
) -> Doctor {
    Doctor {
        id: Uuid::from_u128(id),
        name: name.to_string(),
        specialty: specialty.to_string(),
        city: city.to_string(),
        distance_km,
        rating,
        languages: languages.iter().map(|l| l.to_string()).collect(),
        offers_video,
        accepts_public_insurance,
    }
}

pub fn directory() -> FixtureDirectory {
    let doctors = vec![
        doctor(0x01, "Dr. Lena Petersen", "Cardiology", "Berlin", 1.2, 4.8, &["de", "en"], true, true),
        doctor(0x02, "Dr. Samuel Okafor", "Cardiology", "Berlin", 4.5, 4.6, &["en"], false, false),
        doctor(0x03, "Dr. Ida Lindqvist", "Dermatology", "Berlin", 2.8, 4.3, &["en", "sv"], true, true),
        doctor(0x04, "Dr. Mats Berger", "General Medicine", "Potsdam", 0.9, 4.1, &["de", "en"], false, true),
        doctor(0x05, "Dr. Aylin Kaya", "Gynecology", "Berlin", 6.3, 4.9, &["de", "tr"], true, true),
        doctor(0x06, "Dr. Jonas Weiss", "Orthopedics", "Potsdam", 8.7, 3.9, &["de"], false, true),
        doctor(0x07, "Dr. Sofia Marques", "Psychiatry", "Berlin", 3.4, 4.7, &["en", "pt"], true, false),
    ];

    let patients = vec![
        PatientProfile {
            id: Uuid::from_u128(0x101),
            display_name: "Alex Example".to_string(),
            insurance: InsuranceClass::Public,
        },
        PatientProfile {
            id: Uuid::from_u128(0x102),
            display_name: "Pat Private".to_string(),
            insurance: InsuranceClass::Private,
        },
    ];

    FixtureDirectory::new(doctors, patients)
}

pub fn public_patient() -> PatientProfile {
    PatientProfile {
        id: Uuid::from_u128(0x101),
        display_name: "Alex Example".to_string(),
        insurance: InsuranceClass::Public,
    }
}

pub fn private_patient() -> PatientProfile {
    PatientProfile {
        id: Uuid::from_u128(0x102),
        display_name: "Pat Private".to_string(),
        insurance: InsuranceClass::Private,
    }
}
