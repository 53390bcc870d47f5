#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Months, NaiveDate};
use fleetdesk_backend::{DataBackendRef, InMemoryBackend};
use fleetdesk_security::{PermissionResolver, Profile, Role, RolePolicyEngine, SecurityContext};
use inventory::domain::Service;
use inventory::{InventoryConfig, InventoryModule};
use serde_json::json;
use uuid::Uuid;

pub const C1_LICENSES: [(&str, usize); 4] = [
    ("active", 10),
    ("expired", 5),
    ("about_to_expire", 5),
    ("cancelled", 5),
];
pub const C2_LICENSES: usize = 7;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub struct Fixture {
    pub backend: Arc<InMemoryBackend>,
    pub module: InventoryModule,
    pub c1: Uuid,
    pub c2: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(InventoryConfig::default())
    }

    pub fn with_config(config: InventoryConfig) -> Self {
        Self::build(InMemoryBackend::new(), config)
    }

    pub fn build(backend: InMemoryBackend, config: InventoryConfig) -> Self {
        let backend = Arc::new(backend);
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        seed(&backend, c1, c2);

        let data: DataBackendRef = backend.clone();
        let resolver = Arc::new(PermissionResolver::new(Arc::new(RolePolicyEngine::default())));
        let service = Service::new(Arc::clone(&data), resolver, config).with_today(today);
        let module = InventoryModule::with_service(service, data);
        Self {
            backend,
            module,
            c1,
            c2,
        }
    }

    pub fn client_user(&self, client_id: Uuid) -> SecurityContext {
        context(Profile::new(Uuid::new_v4(), Role::Client).with_client(client_id))
    }
}

pub fn admin() -> SecurityContext {
    context(Profile::new(Uuid::new_v4(), Role::Admin))
}

pub fn technician() -> SecurityContext {
    context(Profile::new(Uuid::new_v4(), Role::Technician))
}

pub fn context(profile: Profile) -> SecurityContext {
    SecurityContext::builder().profile(profile).build()
}

fn seed(backend: &InMemoryBackend, c1: Uuid, c2: Uuid) {
    backend.seed(
        "clients",
        [
            json!({"id": c1, "name": "Acme Corp", "email": "it@acme.test"}),
            json!({"id": c2, "name": "Globex", "email": "ops@globex.test"}),
        ],
    );

    let mut licenses = Vec::new();
    let mut n = 0u32;
    for (status, count) in C1_LICENSES {
        for _ in 0..count {
            let expiry = today().checked_add_months(Months::new(n % 8)).unwrap();
            licenses.push(json!({
                "id": Uuid::new_v4(),
                "name": format!("Office seat {n:02}"),
                "client_id": c1,
                "status": status,
                "expiry_date": expiry,
            }));
            n += 1;
        }
    }
    for i in 0..C2_LICENSES {
        licenses.push(json!({
            "id": Uuid::new_v4(),
            "name": format!("Globex CAD {i}"),
            "client_id": c2,
            "status": "active",
            "expiry_date": "2027-01-31",
        }));
    }
    backend.seed("licenses", licenses);

    backend.seed(
        "equipment",
        [
            json!({"id": Uuid::new_v4(), "name": "ws-01", "type": "pc", "status": "active", "client_id": c1, "end_of_life_date": "2028-01-01"}),
            json!({"id": Uuid::new_v4(), "name": "ws-02", "type": "pc", "status": "active", "client_id": c1, "end_of_life_date": "2027-01-01"}),
            json!({"id": Uuid::new_v4(), "name": "ws-03", "type": "pc", "status": "soon_obsolete", "client_id": c1, "end_of_life_date": "2026-12-01"}),
            json!({"id": Uuid::new_v4(), "name": "edge-rt", "type": "router", "status": "in_maintenance", "client_id": c1}),
            json!({"id": Uuid::new_v4(), "name": "db-01", "type": "server", "status": "retired", "client_id": c2, "end_of_life_date": "2025-06-30"}),
            json!({"id": Uuid::new_v4(), "name": "db-02", "type": "server", "status": "active", "client_id": c2, "end_of_life_date": "2029-06-30"}),
        ],
    );
}
