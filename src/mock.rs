// src/mock.rs
//
// Synthetic records for local development (`seed`) and for the fallback view
// shown when the store is unreachable. Output depends only on the seed.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::domain::change::{
    ChangeComment, ChangeItem, ChangeRequest, ChangeType, ItemStatus, Priority, RecordType,
    RequestStatus,
};
use crate::domain::profile::{
    CoordinatorProfileData, HostFamilyProfileData, Profile, ProfileData, Relationship,
    StudentProfileData, User, UserRole,
};
use crate::domain::sevis::{BatchStatus, ParticipantResult, SevisBatch, SevisBatchParticipant};

const FIRST_NAMES: &[&str] = &[
    "Ana", "Lukas", "Mei", "Tomás", "Aiko", "Jonas", "Sofia", "Mateo", "Ingrid", "Kwame", "Leila",
    "Pavel",
];
const LAST_NAMES: &[&str] = &[
    "Schmidt", "Tanaka", "Rossi", "Nguyen", "García", "Kowalski", "Andersen", "Okafor", "Silva",
    "Haddad",
];
const COUNTRIES: &[&str] = &["Germany", "Japan", "Italy", "Vietnam", "Spain", "Poland", "Brazil"];
const PLACES: &[(&str, &str, &str)] = &[
    ("Madison", "WI", "53703"),
    ("Boise", "ID", "83702"),
    ("Dayton", "OH", "45402"),
    ("Eugene", "OR", "97401"),
    ("Fargo", "ND", "58102"),
    ("Tulsa", "OK", "74103"),
];
const STREETS: &[&str] = &["Oak St", "Maple Ave", "Lakeview Dr", "Pine Rd", "Elm Ct"];
const REGIONS: &[&str] = &["Midwest", "Pacific Northwest", "Great Plains", "Mountain West"];
const FIELDS: &[(&str, bool)] = &[
    ("data.address", true),
    ("data.school", true),
    ("data.programEndDate", true),
    ("data.phone", false),
    ("data.emergencyContact", false),
    ("name", false),
];

pub const FALLBACK_SEED: u64 = 0x5EF1_5FA1_1BAC;

/// How many of each record to generate.
#[derive(Debug, Clone, Copy)]
pub struct MockSizes {
    pub students: usize,
    pub host_families: usize,
    pub coordinators: usize,
    pub requests: usize,
}

impl Default for MockSizes {
    fn default() -> Self {
        MockSizes {
            students: 40,
            host_families: 20,
            coordinators: 6,
            requests: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub users: Vec<User>,
    pub profiles: Vec<Profile>,
    pub relationships: Vec<Relationship>,
    pub requests: Vec<ChangeRequest>,
    pub batches: Vec<SevisBatch>,
    pub participants: Vec<SevisBatchParticipant>,
}

pub struct MockGenerator {
    rng: StdRng,
    epoch: DateTime<Utc>,
}

impl MockGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            // fixed so output never depends on the wall clock
            epoch: Utc.with_ymd_and_hms(2024, 8, 1, 9, 0, 0).single().unwrap_or_default(),
        }
    }

    fn pick<'a>(&mut self, from: &'a [&'a str]) -> &'a str {
        from.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn person_name(&mut self) -> (String, String) {
        (
            self.pick(FIRST_NAMES).to_string(),
            self.pick(LAST_NAMES).to_string(),
        )
    }

    fn address(&mut self) -> (String, String, String) {
        let (city, state, zip) = *PLACES.choose(&mut self.rng).unwrap_or(&PLACES[0]);
        let number = self.rng.gen_range(100..9999);
        let street = self.pick(STREETS);
        (
            format!("{number} {street}, {city}, {state} {zip}"),
            city.to_string(),
            state.to_string(),
        )
    }

    pub fn dataset(&mut self, sizes: MockSizes) -> Dataset {
        let mut ds = Dataset::default();

        for n in 0..sizes.coordinators {
            let (first, last) = self.person_name();
            let (address, city, state) = self.address();
            let id = format!("lc-{n:04}");
            // some coordinators deliberately have no region anywhere
            let region = match n % 3 {
                0 => Some(self.pick(REGIONS).to_string()),
                1 => None,
                _ => Some(String::new()),
            };
            let data = CoordinatorProfileData {
                region: region.clone().filter(|_| n % 2 == 0),
                state: (n % 4 == 1).then(|| state.clone()),
                city: Some(city),
                address: (n % 5 != 4).then_some(address),
                status: None,
                training_started: Some(n % 4 != 3),
                training_completed: Some(n % 3 != 2),
                ..Default::default()
            };
            ds.users.push(User {
                id: id.clone(),
                email: format!("{}.{}@exchange.test", first.to_lowercase(), last.to_lowercase()),
                name: format!("{first} {last}"),
                role: UserRole::Coordinator,
                metadata: json!({ "region": region.filter(|_| n % 2 == 1).unwrap_or_default() }),
            });
            ds.profiles.push(Profile {
                id: format!("{id}-profile"),
                user_id: id,
                data: ProfileData::Coordinator(data),
            });
        }

        for n in 0..sizes.host_families {
            let (_, last) = self.person_name();
            let (address, city, state) = self.address();
            let id = format!("hf-{n:04}");
            ds.users.push(User {
                id: id.clone(),
                email: format!("{}.family{n}@exchange.test", last.to_lowercase()),
                name: format!("The {last} Family"),
                role: UserRole::HostFamily,
                metadata: json!({}),
            });
            ds.profiles.push(Profile {
                id: format!("{id}-profile"),
                user_id: id.clone(),
                data: ProfileData::HostFamily(HostFamilyProfileData {
                    family_name: last,
                    address: Some(address),
                    city: Some(city),
                    state: Some(state),
                    phone: Some(format!("555-{:04}", self.rng.gen_range(0..10_000))),
                    bedrooms: Some(self.rng.gen_range(1..5)),
                    ..Default::default()
                }),
            });
            if sizes.coordinators > 0 {
                let coordinator = format!("lc-{:04}-profile", n % sizes.coordinators);
                ds.relationships.push(Relationship {
                    id: format!("rel-ch-{n:04}"),
                    from_id: coordinator,
                    to_id: format!("{id}-profile"),
                    kind: "coordinator_host".to_string(),
                    payload: None,
                });
            }
        }

        for n in 0..sizes.students {
            let (first, last) = self.person_name();
            let (address, _, _) = self.address();
            let id = format!("stu-{n:04}");
            let start = self.epoch - Duration::days(self.rng.gen_range(0..120));
            ds.users.push(User {
                id: id.clone(),
                email: format!("{}.{}{n}@student.test", first.to_lowercase(), last.to_lowercase()),
                name: format!("{first} {last}"),
                role: UserRole::Student,
                metadata: json!({}),
            });
            ds.profiles.push(Profile {
                id: format!("{id}-profile"),
                user_id: id.clone(),
                data: ProfileData::Student(StudentProfileData {
                    first_name: first,
                    last_name: last,
                    birth_date: Some(format!(
                        "{}-{:02}-{:02}",
                        self.rng.gen_range(2006..2010),
                        self.rng.gen_range(1..13),
                        self.rng.gen_range(1..29)
                    )),
                    country: Some(self.pick(COUNTRIES).to_string()),
                    program: Some(if n % 2 == 0 { "academic_year" } else { "semester" }.to_string()),
                    sevis_id: (n % 5 != 0).then(|| format!("N{:010}", self.rng.gen_range(0..10_000_000_000u64))),
                    school: Some(format!("{} High School", self.pick(STREETS).split(' ').next().unwrap_or("Central"))),
                    address: Some(address),
                    application_status: Some(
                        if start < self.epoch - Duration::days(60) { "approved" } else { "submitted" }.to_string(),
                    ),
                    ..Default::default()
                }),
            });
            if sizes.host_families > 0 {
                ds.relationships.push(Relationship {
                    id: format!("rel-hs-{n:04}"),
                    from_id: format!("hf-{:04}-profile", n % sizes.host_families),
                    to_id: format!("{id}-profile"),
                    kind: "host_student".to_string(),
                    payload: Some(json!({ "placementStart": start.date_naive().to_string() })),
                });
            }
        }

        for n in 0..sizes.requests {
            let req = self.change_request(n, &ds.users);
            if let Some(req) = req {
                ds.requests.push(req);
            }
        }

        self.batches(&mut ds);
        ds
    }

    fn change_request(&mut self, n: usize, users: &[User]) -> Option<ChangeRequest> {
        let target = users.choose(&mut self.rng)?;
        let record_type = match target.role {
            UserRole::Student => RecordType::Student,
            UserRole::HostFamily => RecordType::HostFamily,
            _ => RecordType::Coordinator,
        };
        let request_id = format!("cr-{n:04}");
        let request_date = self.epoch - Duration::hours(self.rng.gen_range(0..24 * 45));
        let count = self.rng.gen_range(1..4);

        let mut items = Vec::with_capacity(count);
        for k in 0..count {
            let (field, sevis) = *FIELDS.choose(&mut self.rng).unwrap_or(&FIELDS[0]);
            let status = match self.rng.gen_range(0..10) {
                0..=4 => ItemStatus::Pending,
                5..=8 => ItemStatus::Approved,
                _ => ItemStatus::Rejected,
            };
            let decided = status != ItemStatus::Pending;
            let item_id = format!("{request_id}-i{k}");
            let (previous, new) = self.values_for(field);
            let comments = if self.rng.gen_bool(0.3) {
                vec![ChangeComment {
                    id: format!("{item_id}-c0"),
                    item_id: item_id.clone(),
                    author: "sevis.officer@exchange.test".to_string(),
                    body: "Confirmed with the host family by phone.".to_string(),
                    is_internal: self.rng.gen_bool(0.7),
                    created_at: request_date + Duration::hours(2),
                }]
            } else {
                Vec::new()
            };
            items.push(ChangeItem {
                id: item_id,
                request_id: request_id.clone(),
                field_path: field.to_string(),
                previous_value: previous,
                new_value: new,
                change_type: if k == 0 && n % 7 == 0 { ChangeType::Create } else { ChangeType::Update },
                is_sevis_related: sevis && record_type == RecordType::Student,
                status,
                approved_by: decided.then(|| "sevis.officer@exchange.test".to_string()),
                approved_at: decided.then(|| request_date + Duration::hours(6)),
                rejection_reason: (status == ItemStatus::Rejected)
                    .then(|| "Supporting document missing".to_string()),
                sevis_batch_id: None,
                comments,
            });
        }

        let mut req = ChangeRequest {
            id: request_id,
            record_type,
            record_id: target.id.clone(),
            requested_by: format!("lc-{:04}", n % 6),
            request_date,
            status: RequestStatus::Pending,
            priority: match n % 5 {
                0 => Priority::High,
                1 => Priority::Low,
                4 if n % 3 == 0 => Priority::Urgent,
                _ => Priority::Normal,
            },
            items,
        };
        req.refresh_status();
        Some(req)
    }

    fn values_for(&mut self, field: &str) -> (serde_json::Value, serde_json::Value) {
        match field {
            "data.address" => {
                let (a, _, _) = self.address();
                let (b, _, _) = self.address();
                (json!(a), json!(b))
            }
            "data.programEndDate" => (json!("2025-06-15"), json!("2025-12-20")),
            "data.phone" => (
                json!(format!("555-{:04}", self.rng.gen_range(0..10_000))),
                json!(format!("555-{:04}", self.rng.gen_range(0..10_000))),
            ),
            "name" => {
                let (first, last) = self.person_name();
                (json!(format!("{first} {last}")), json!(format!("{first} {last}-{}", self.pick(LAST_NAMES))))
            }
            "data.emergencyContact" => (serde_json::Value::Null, json!({"name": "Guardian", "phone": "555-0100"})),
            _ => (json!("Central High School"), json!("Lakeview High School")),
        }
    }

    // One finished batch claiming roughly half of the ready items.
    fn batches(&mut self, ds: &mut Dataset) {
        let batch_id = "sb-0001".to_string();
        let mut participants = Vec::new();
        for req in ds.requests.iter_mut() {
            for item in req.items.iter_mut().filter(|i| i.is_sevis_ready()) {
                if !self.rng.gen_bool(0.5) {
                    continue;
                }
                item.sevis_batch_id = Some(batch_id.clone());
                let ok = self.rng.gen_bool(0.85);
                participants.push(SevisBatchParticipant {
                    id: format!("{batch_id}-p{:03}", participants.len()),
                    batch_id: batch_id.clone(),
                    item_id: item.id.clone(),
                    student_id: req.record_id.clone(),
                    result: if ok { ParticipantResult::Success } else { ParticipantResult::Failed },
                    message: (!ok).then(|| "S1003: address does not validate".to_string()),
                });
            }
        }
        if participants.is_empty() {
            return;
        }
        let ok = participants
            .iter()
            .filter(|p| p.result == ParticipantResult::Success)
            .count() as i64;
        ds.batches.push(SevisBatch {
            id: batch_id,
            name: "August registration updates".to_string(),
            created_at: self.epoch - Duration::days(3),
            submitted_at: Some(self.epoch - Duration::days(2)),
            status: BatchStatus::Completed,
            total_records: participants.len() as i64,
            successful_records: ok,
            failed_records: participants.len() as i64 - ok,
        });
        ds.participants = participants;
    }
}

/// The fixed dataset rendered whenever the store cannot be read.
pub fn fallback_dataset() -> Dataset {
    MockGenerator::new(FALLBACK_SEED).dataset(MockSizes {
        students: 12,
        host_families: 6,
        coordinators: 5,
        requests: 10,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_deterministic() {
        assert_eq!(fallback_dataset(), fallback_dataset());
        assert!(!fallback_dataset().requests.is_empty());
    }

    #[test]
    fn relationships_point_at_generated_profiles() {
        let ds = MockGenerator::new(7).dataset(MockSizes::default());
        let ids: std::collections::HashSet<&str> =
            ds.profiles.iter().map(|p| p.id.as_str()).collect();
        for rel in &ds.relationships {
            assert!(ids.contains(rel.from_id.as_str()), "{}", rel.from_id);
            assert!(ids.contains(rel.to_id.as_str()), "{}", rel.to_id);
        }
    }

    #[test]
    fn generated_requests_have_consistent_status() {
        let ds = MockGenerator::new(11).dataset(MockSizes::default());
        for req in &ds.requests {
            assert_eq!(
                req.status,
                crate::domain::change::derive_request_status(&req.items)
            );
        }
        for p in &ds.participants {
            assert_eq!(p.batch_id, "sb-0001");
        }
    }
}
