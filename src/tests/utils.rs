use crate::db::connection::{init_db, Database};
use crate::db::{change_queue, transact, StoreClients, Upsert};
use crate::domain::change::{
    ChangeItem, ChangeRequest, ChangeType, ItemStatus, Priority, RecordType, RequestStatus,
};
use crate::domain::profile::{Profile, ProfileData, Relationship, User, UserRole};
use crate::domain::sevis::SevisBatch;
use crate::sevis_gateway::{RecordOutcome, SevisError, SevisGateway, SevisRecord};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Mutex;
use crate::router::AppContext;
use astra::{Body, Response};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

/// Initialize a fresh test DB using the production schema
pub fn init_test_db() -> Database {
    let path = std::env::temp_dir().join(format!(
        "exchange_admin_test_{}_{}_{}.sqlite",
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos(),
        NEXT_DB.fetch_add(1, Ordering::SeqCst),
    ));
    let db = Database::new(path.to_string_lossy());

    init_db(&db, "sql/schema.sql")
        .unwrap_or_else(|e| panic!("Database initialization failed: {e}"));

    db
}

pub fn seed(clients: &StoreClients, ops: Vec<Upsert>) {
    transact(clients.admin.as_ref().unwrap(), &ops).expect("seed failed");
}

pub fn context(clients: StoreClients) -> AppContext {
    AppContext {
        clients,
        gateway: None,
        config: crate::config::Config::for_tests(),
    }
}

pub fn body_string(resp: &mut Response) -> String {
    let mut bytes = Vec::new();
    resp.body_mut().reader().read_to_end(&mut bytes).unwrap();
    String::from_utf8(bytes).unwrap()
}

pub fn form_body(pairs: &[(&str, &str)]) -> Body {
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    Body::from(encoded)
}

fn user(id: &str, name: &str, role: UserRole, metadata: Value) -> Upsert {
    Upsert::User(User {
        id: id.to_string(),
        email: format!("{id}@exchange.test"),
        name: name.to_string(),
        role,
        metadata,
    })
}

fn profile(user_id: &str, role: UserRole, data: Value) -> Upsert {
    Upsert::Profile(Profile {
        id: format!("{user_id}-profile"),
        user_id: user_id.to_string(),
        data: ProfileData::decode(role, data).unwrap(),
    })
}

fn relationship(id: &str, from: &str, to: &str, kind: &str) -> Upsert {
    Upsert::Relationship(Relationship {
        id: id.to_string(),
        from_id: format!("{from}-profile"),
        to_id: format!("{to}-profile"),
        kind: kind.to_string(),
        payload: None,
    })
}

pub fn change_item(id: &str, path: &str, status: ItemStatus, sevis: bool, new_value: Value) -> ChangeItem {
    let decided = status != ItemStatus::Pending;
    ChangeItem {
        id: id.to_string(),
        request_id: String::new(),
        field_path: path.to_string(),
        previous_value: Value::Null,
        new_value,
        change_type: ChangeType::Update,
        is_sevis_related: sevis,
        status,
        approved_by: decided.then(|| "reviewer".to_string()),
        approved_at: decided.then(|| Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()),
        rejection_reason: (status == ItemStatus::Rejected).then(|| "not verified".to_string()),
        sevis_batch_id: None,
        comments: Vec::new(),
    }
}

fn change_request(id: &str, record_type: RecordType, record_id: &str, day: (i32, u32, u32), items: Vec<ChangeItem>) -> Upsert {
    let mut req = ChangeRequest {
        id: id.to_string(),
        record_type,
        record_id: record_id.to_string(),
        requested_by: "coordinator@exchange.test".to_string(),
        request_date: Utc.with_ymd_and_hms(day.0, day.1, day.2, 12, 0, 0).unwrap(),
        status: RequestStatus::Pending,
        priority: Priority::Normal,
        items: items
            .into_iter()
            .map(|mut i| {
                i.request_id = id.to_string();
                i
            })
            .collect(),
    };
    req.refresh_status();
    Upsert::ChangeRequest(req)
}

/// Small hand-written program:
/// - student `stu-1` placed with host family `hf-1`
/// - coordinators `lc-1` (region from address, active), `lc-2` (nothing known),
///   `lc-3` (region and status from account metadata)
/// - `cr-1`: two pending items on stu-1, one SEVIS-related
/// - `cr-2`: one approved SEVIS item on stu-1, ready for a batch
/// - `cr-3`: one rejected item on hf-1
pub fn fixture() -> Vec<Upsert> {
    use ItemStatus::*;
    vec![
        user("stu-1", "Mei Tanaka", UserRole::Student, json!({})),
        profile(
            "stu-1",
            UserRole::Student,
            json!({
                "firstName": "Mei",
                "lastName": "Tanaka",
                "address": "1 Old Rd, Madison, WI 53703",
                "school": "Madison East",
                "sevisId": "N0000001"
            }),
        ),
        user("hf-1", "The Rossi Family", UserRole::HostFamily, json!({})),
        profile("hf-1", UserRole::HostFamily, json!({ "familyName": "Rossi", "bedrooms": 3 })),
        user("lc-1", "Ana Silva", UserRole::Coordinator, json!({})),
        profile(
            "lc-1",
            UserRole::Coordinator,
            json!({ "address": "123 Oak St, Madison, WI 53703", "trainingCompleted": true }),
        ),
        user("lc-2", "Jonas Berg", UserRole::Coordinator, json!({})),
        profile("lc-2", UserRole::Coordinator, json!({})),
        user(
            "lc-3",
            "Leila Haddad",
            UserRole::Coordinator,
            json!({ "region": "Midwest", "status": "training" }),
        ),
        relationship("rel-1", "lc-1", "hf-1", "coordinator_host"),
        relationship("rel-2", "hf-1", "stu-1", "host_student"),
        change_request(
            "cr-1",
            RecordType::Student,
            "stu-1",
            (2024, 3, 1),
            vec![
                change_item("cr-1-a", "data.address", Pending, true, json!("9 New St, Madison, WI 53703")),
                change_item("cr-1-b", "data.phone", Pending, false, json!("555-0101")),
            ],
        ),
        change_request(
            "cr-2",
            RecordType::Student,
            "stu-1",
            (2024, 2, 1),
            vec![change_item("cr-2-a", "data.school", Approved, true, json!("Madison West"))],
        ),
        change_request(
            "cr-3",
            RecordType::HostFamily,
            "hf-1",
            (2024, 1, 15),
            vec![change_item("cr-3-a", "data.bedrooms", Rejected, false, json!(4))],
        ),
    ]
}

pub fn fixture_clients() -> StoreClients {
    let clients = StoreClients::full(init_test_db());
    seed(&clients, fixture());
    clients
}

pub fn load_request(clients: &StoreClients, id: &str) -> ChangeRequest {
    clients
        .reader()
        .unwrap()
        .with_conn(|c| change_queue::load_change_request(c, id))
        .unwrap()
        .expect("request exists")
}

/// Records every submission and answers from a script.
#[derive(Default)]
pub struct FakeGateway {
    /// Participants reported as failed.
    pub reject: Vec<String>,
    /// Leave every participant out of the response.
    pub silent: bool,
    /// Fail the whole call.
    pub down: bool,
    /// How long each call takes.
    pub delay: Duration,
    pub sent: Mutex<Vec<SevisRecord>>,
}

impl SevisGateway for FakeGateway {
    fn submit(&self, _batch: &SevisBatch, records: &[SevisRecord]) -> Result<Vec<RecordOutcome>, SevisError> {
        std::thread::sleep(self.delay);
        if self.down {
            return Err(SevisError::RequestFailed("connection refused".to_string()));
        }
        self.sent.lock().unwrap().extend_from_slice(records);
        if self.silent {
            return Ok(Vec::new());
        }
        Ok(records
            .iter()
            .map(|r| {
                let rejected = self.reject.contains(&r.participant_id);
                RecordOutcome {
                    participant_id: r.participant_id.clone(),
                    success: !rejected,
                    message: rejected.then(|| "invalid address".to_string()),
                }
            })
            .collect())
    }
}
