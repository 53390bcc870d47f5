//! Seed data for `--mock`.

use chrono::{Months, NaiveDate};
use fleetdesk_backend::InMemoryBackend;
use fleetdesk_security::{Profile, Role};
use serde_json::json;
use uuid::Uuid;

pub const PASSWORD: &str = "fleetdesk-demo";
pub const ADMIN_EMAIL: &str = "admin@fleetdesk.test";
pub const TECHNICIAN_EMAIL: &str = "tech@fleetdesk.test";
pub const CLIENT_EMAIL: &str = "it@northwind.test";

const CLIENTS: [(&str, &str); 3] = [
    ("Northwind Traders", "it@northwind.test"),
    ("Contoso Ltd", "helpdesk@contoso.test"),
    ("Fabrikam Inc", "ops@fabrikam.test"),
];

const LICENSES: [(&str, &str); 6] = [
    ("Office 365 Business", "active"),
    ("Antivirus Endpoint", "about_to_expire"),
    ("Backup Suite", "active"),
    ("CAD Workstation", "expired"),
    ("VPN Gateway", "active"),
    ("Legacy ERP", "cancelled"),
];

const EQUIPMENT: [(&str, &str, &str, Option<u32>); 5] = [
    ("ws", "pc", "active", Some(30)),
    ("srv", "server", "active", Some(48)),
    ("rt", "router", "in_maintenance", None),
    ("sw", "switch", "soon_obsolete", Some(2)),
    ("prn", "printer", "obsolete", Some(0)),
];

/// In-memory backend with three clients, their licenses and equipment, and
/// one account per role (all sharing [`PASSWORD`]).
pub fn backend(today: NaiveDate) -> InMemoryBackend {
    let backend = InMemoryBackend::new();
    let ids: Vec<Uuid> = CLIENTS.iter().map(|_| Uuid::new_v4()).collect();

    backend.seed(
        "clients",
        CLIENTS
            .iter()
            .zip(&ids)
            .map(|((name, email), id)| json!({"id": id, "name": name, "email": email})),
    );

    let mut licenses = Vec::new();
    let mut equipment = Vec::new();
    for (n, (client_id, (client, _))) in (0u32..).zip(ids.iter().zip(CLIENTS)) {
        for (i, (name, status)) in (0u32..).zip(LICENSES) {
            let expiry = today.checked_add_months(Months::new((n * 2 + i) % 9));
            licenses.push(json!({
                "id": Uuid::new_v4(),
                "name": name,
                "client_id": client_id,
                "status": status,
                "seats": 5 + i * 5,
                "expiry_date": expiry,
            }));
        }
        let prefix = client.chars().next().unwrap_or('x').to_ascii_lowercase();
        for (kind, kind_type, status, eol_months) in EQUIPMENT {
            let end_of_life = eol_months.and_then(|m| today.checked_add_months(Months::new(m)));
            equipment.push(json!({
                "id": Uuid::new_v4(),
                "name": format!("{prefix}-{kind}-{:02}", n + 1),
                "type": kind_type,
                "status": status,
                "client_id": client_id,
                "end_of_life_date": end_of_life,
            }));
        }
    }
    backend.seed("licenses", licenses);
    backend.seed("equipment", equipment);

    backend.add_user(
        ADMIN_EMAIL,
        PASSWORD,
        &Profile::new(Uuid::new_v4(), Role::Admin).with_email(ADMIN_EMAIL),
    );
    backend.add_user(
        TECHNICIAN_EMAIL,
        PASSWORD,
        &Profile::new(Uuid::new_v4(), Role::Technician).with_email(TECHNICIAN_EMAIL),
    );
    if let Some(northwind) = ids.first() {
        backend.add_user(
            CLIENT_EMAIL,
            PASSWORD,
            &Profile::new(Uuid::new_v4(), Role::Client)
                .with_client(*northwind)
                .with_email(CLIENT_EMAIL),
        );
    }
    backend
}
