//! In-process backend with the same observable semantics as the hosted one.
//!
//! Used by tests and by the CLI's `--mock` mode. Besides implementing
//! [`DataBackend`] and [`AuthBackend`] it records how it was used (select call
//! count, listener count, password reset requests) and can be told to fail.

mod eval;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fleetdesk_query::{CountMode, SelectQuery};
use fleetdesk_security::{Profile, Role, SecurityContext};
use fleetdesk_utils::SecretString;
use parking_lot::{Mutex, RwLock};
use serde_json::{Value as Json, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{AuthBackend, AuthUser, Session, SignUpRequest};
use crate::data::{DataBackend, Row, SelectResult};
use crate::error::BackendError;
use crate::realtime::{ChangeEvent, ChangeHub, ChangeKind, ChangeSubscription};

pub const PROFILES_TABLE: &str = "profiles";

/// Read view over a base table.
#[derive(Debug, Clone)]
struct ViewDef {
    table: String,
    /// Fill `client_name` from the `clients` table by `client_id`.
    join_client_name: bool,
}

struct MemoryUser {
    id: Uuid,
    email: String,
    password: SecretString,
}

pub struct InMemoryBackend {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    views: HashMap<String, ViewDef>,
    users: RwLock<HashMap<String, MemoryUser>>,
    sessions: RwLock<HashMap<String, Uuid>>,
    hub: ChangeHub,
    select_calls: AtomicUsize,
    scripted_failures: Mutex<VecDeque<BackendError>>,
    failing_views: RwLock<HashMap<String, BackendError>>,
    reset_requests: Mutex<Vec<String>>,
    latency: Option<Duration>,
    require_confirmation: bool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Backend with the console's read views preconfigured:
    /// `licenses_with_client` and `equipment_with_client` join the client name.
    #[must_use]
    pub fn new() -> Self {
        let mut backend = Self {
            tables: RwLock::new(HashMap::new()),
            views: HashMap::new(),
            users: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            hub: ChangeHub::new(),
            select_calls: AtomicUsize::new(0),
            scripted_failures: Mutex::new(VecDeque::new()),
            failing_views: RwLock::new(HashMap::new()),
            reset_requests: Mutex::new(Vec::new()),
            latency: None,
            require_confirmation: false,
        };
        backend.add_view("licenses_with_client", "licenses", true);
        backend.add_view("equipment_with_client", "equipment", true);
        backend
    }

    fn add_view(&mut self, view: &str, table: &str, join_client_name: bool) {
        self.views.insert(
            view.to_owned(),
            ViewDef {
                table: table.to_owned(),
                join_client_name,
            },
        );
    }

    #[must_use]
    pub fn with_view(mut self, view: &str, table: &str, join_client_name: bool) -> Self {
        self.add_view(view, table, join_client_name);
        self
    }

    /// Delay every select by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make `sign_up` return no session, as when email confirmation is on.
    #[must_use]
    pub fn require_email_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    /// Append JSON objects to a table. Non-object values are skipped.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Json>) {
        let mut tables = self.tables.write();
        let target = tables.entry(table.to_owned()).or_default();
        for value in rows {
            match value {
                Json::Object(row) => target.push(row),
                other => warn!(table, value = %other, "skipping non-object seed row"),
            }
        }
    }

    /// Register an account and its profile row.
    pub fn add_user(&self, email: &str, password: &str, profile: &Profile) {
        self.users.write().insert(
            email.to_owned(),
            MemoryUser {
                id: profile.id,
                email: email.to_owned(),
                password: SecretString::new(password),
            },
        );
        self.seed(PROFILES_TABLE, [profile_row(profile, email)]);
    }

    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    /// Number of `select` calls received so far, including failed ones.
    #[must_use]
    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Fail the next select with `err`; queued failures are consumed in order.
    pub fn fail_next_select(&self, err: BackendError) {
        self.scripted_failures.lock().push_back(err);
    }

    /// Fail every select against `view` until cleared.
    pub fn fail_view(&self, view: &str, err: BackendError) {
        self.failing_views.write().insert(view.to_owned(), err);
    }

    pub fn clear_failures(&self) {
        self.scripted_failures.lock().clear();
        self.failing_views.write().clear();
    }

    #[must_use]
    pub fn listener_count(&self, table: &str) -> usize {
        self.hub.listener_count(table)
    }

    #[must_use]
    pub fn reset_requests(&self) -> Vec<String> {
        self.reset_requests.lock().clone()
    }

    /// Publish a change as if another client had written to `table`.
    pub fn emit_change(&self, table: &str, kind: ChangeKind, id: Option<Uuid>) {
        self.hub.publish(ChangeEvent {
            table: table.to_owned(),
            kind,
            id,
        });
    }

    fn view_rows(&self, view: &str) -> Vec<Row> {
        let def = self.views.get(view).cloned().unwrap_or_else(|| ViewDef {
            table: view.to_owned(),
            join_client_name: false,
        });
        let tables = self.tables.read();
        let mut rows = tables.get(&def.table).cloned().unwrap_or_default();
        if def.join_client_name {
            let clients = tables.get("clients").map(Vec::as_slice).unwrap_or_default();
            for row in &mut rows {
                let name = row
                    .get("client_id")
                    .and_then(|id| clients.iter().find(|c| c.get("id") == Some(id)))
                    .and_then(|c| c.get("name"))
                    .cloned()
                    .unwrap_or(Json::Null);
                row.insert("client_name".to_owned(), name);
            }
        }
        rows
    }

    fn issue_session(&self, user: &MemoryUser) -> Session {
        let token = Uuid::new_v4().to_string();
        self.sessions.write().insert(token.clone(), user.id);
        Session {
            access_token: SecretString::new(token),
            refresh_token: Some(SecretString::new(Uuid::new_v4().to_string())),
            expires_in: Some(3600),
            user: AuthUser {
                id: user.id,
                email: Some(user.email.clone()),
            },
        }
    }
}

fn profile_row(profile: &Profile, email: &str) -> Json {
    json!({
        "id": profile.id,
        "role": profile.role,
        "client_id": profile.client_id,
        "email": profile.email.clone().unwrap_or_else(|| email.to_owned()),
        "full_name": profile.full_name,
    })
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Json::as_str)
}

#[async_trait]
impl DataBackend for InMemoryBackend {
    async fn select(
        &self,
        _ctx: &SecurityContext,
        view: &str,
        query: &SelectQuery,
    ) -> Result<SelectResult, BackendError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = self.scripted_failures.lock().pop_front() {
            return Err(err);
        }
        if let Some(err) = self.failing_views.read().get(view).cloned() {
            return Err(err);
        }

        let mut rows: Vec<Row> = self
            .view_rows(view)
            .into_iter()
            .filter(|row| eval::matches_all(row, &query.filters))
            .collect();
        eval::sort_rows(&mut rows, &query.order);

        let total_count = match query.count {
            CountMode::Exact => Some(rows.len() as u64),
            CountMode::None => None,
        };

        let rows: Vec<Row> = match query.range {
            Some(range) => rows
                .into_iter()
                .skip(usize::try_from(range.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(range.limit).unwrap_or(usize::MAX))
                .collect(),
            None => rows,
        };

        let rows = match &query.select {
            Some(fields) => rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .filter(|(k, _)| fields.iter().any(|f| f == k))
                        .collect()
                })
                .collect(),
            None => rows,
        };

        debug!(view, returned = rows.len(), ?total_count, "in-memory select");
        Ok(SelectResult { rows, total_count })
    }

    async fn insert(
        &self,
        _ctx: &SecurityContext,
        table: &str,
        mut row: Row,
    ) -> Result<Row, BackendError> {
        let id = match row.get("id").and_then(Json::as_str) {
            Some(id) => Uuid::parse_str(id).map_err(|e| BackendError::Status {
                status: 400,
                message: format!("invalid input syntax for type uuid: {e}"),
            })?,
            None => {
                let id = Uuid::new_v4();
                row.insert("id".to_owned(), json!(id));
                id
            }
        };
        row.entry("created_at")
            .or_insert_with(|| json!(chrono::Utc::now().to_rfc3339()));

        {
            let mut tables = self.tables.write();
            let rows = tables.entry(table.to_owned()).or_default();
            if rows.iter().any(|r| row_id(r) == Some(id.to_string().as_str())) {
                return Err(BackendError::Status {
                    status: 409,
                    message: format!("duplicate key value violates unique constraint \"{table}_pkey\""),
                });
            }
            rows.push(row.clone());
        }

        self.hub.publish(ChangeEvent {
            table: table.to_owned(),
            kind: ChangeKind::Insert,
            id: Some(id),
        });
        Ok(row)
    }

    async fn delete(
        &self,
        _ctx: &SecurityContext,
        table: &str,
        id: Uuid,
    ) -> Result<(), BackendError> {
        let key = id.to_string();
        let removed = {
            let mut tables = self.tables.write();
            let rows = tables.entry(table.to_owned()).or_default();
            let before = rows.len();
            rows.retain(|r| row_id(r) != Some(key.as_str()));
            before != rows.len()
        };
        if !removed {
            return Err(BackendError::NotFound(format!("{table} {id}")));
        }
        self.hub.publish(ChangeEvent {
            table: table.to_owned(),
            kind: ChangeKind::Delete,
            id: Some(id),
        });
        Ok(())
    }

    fn subscribe(&self, table: &str) -> ChangeSubscription {
        self.hub.subscribe(table)
    }
}

#[async_trait]
impl AuthBackend for InMemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, BackendError> {
        let users = self.users.read();
        match users.get(email) {
            Some(user) if user.password == *password => Ok(self.issue_session(user)),
            _ => Err(BackendError::Auth("Invalid login credentials".to_owned())),
        }
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, BackendError> {
        if self.users.read().contains_key(&request.email) {
            return Err(BackendError::Status {
                status: 422,
                message: "User already registered".to_owned(),
            });
        }
        let mut profile = Profile::new(Uuid::new_v4(), request.role.unwrap_or(Role::Client));
        profile.client_id = request.client_id;
        profile.full_name.clone_from(&request.full_name);
        profile.email = Some(request.email.clone());
        self.add_user(&request.email, request.password.expose(), &profile);

        if self.require_confirmation {
            return Ok(None);
        }
        let users = self.users.read();
        Ok(users.get(&request.email).map(|u| self.issue_session(u)))
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError> {
        match self.sessions.write().remove(access_token.expose()) {
            Some(_) => Ok(()),
            None => Err(BackendError::Auth("Session not found".to_owned())),
        }
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), BackendError> {
        // Unknown addresses succeed too; the hosted API does not reveal them.
        self.reset_requests.lock().push(email.to_owned());
        Ok(())
    }

    async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, BackendError> {
        let user_id = self
            .sessions
            .read()
            .get(access_token.expose())
            .copied()
            .ok_or_else(|| BackendError::Auth("invalid JWT: session not found".to_owned()))?;
        let users = self.users.read();
        users
            .values()
            .find(|u| u.id == user_id)
            .map(|u| AuthUser {
                id: u.id,
                email: Some(u.email.clone()),
            })
            .ok_or_else(|| BackendError::Auth("User not found".to_owned()))
    }

    async fn fetch_profile(&self, session: &Session) -> Result<Profile, BackendError> {
        let key = session.user.id.to_string();
        let row = self
            .rows(PROFILES_TABLE)
            .into_iter()
            .find(|r| row_id(r) == Some(key.as_str()))
            .ok_or_else(|| BackendError::NotFound(format!("profile {key}")))?;
        Ok(serde_json::from_value(Json::Object(row))?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use fleetdesk_query::{OrderBy, OrderKey, RowRange};
    use fleetdesk_query::ast::{CompareOperator, Expr, Value};

    fn ctx() -> SecurityContext {
        SecurityContext::anonymous()
    }

    fn seeded() -> (InMemoryBackend, Uuid) {
        let backend = InMemoryBackend::new();
        let c1 = Uuid::new_v4();
        backend.seed("clients", [json!({"id": c1, "name": "Acme"})]);
        backend.seed(
            "licenses",
            (0..5).map(|i| json!({"id": Uuid::new_v4(), "name": format!("L{i}"), "client_id": c1, "status": "active"})),
        );
        backend.seed("licenses", [json!({"id": Uuid::new_v4(), "name": "orphan", "client_id": null, "status": "expired"})]);
        (backend, c1)
    }

    #[tokio::test]
    async fn view_joins_client_name_and_counts() {
        let (backend, c1) = seeded();
        let query = SelectQuery::new()
            .with_filter(Expr::Compare("client_id".into(), CompareOperator::Eq, Value::Uuid(c1)))
            .with_order(OrderBy::empty().then(OrderKey::asc("name")))
            .with_range(RowRange { offset: 2, limit: 2 })
            .with_count(CountMode::Exact);
        let result = backend.select(&ctx(), "licenses_with_client", &query).await.unwrap();
        assert_eq!(result.total_count, Some(5));
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0]["name"], json!("L2"));
        assert_eq!(result.rows[0]["client_name"], json!("Acme"));
        assert_eq!(backend.select_calls(), 1);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let (backend, _) = seeded();
        backend.fail_next_select(BackendError::Transport("reset".into()));
        let q = SelectQuery::new();
        assert!(backend.select(&ctx(), "clients", &q).await.is_err());
        assert!(backend.select(&ctx(), "clients", &q).await.is_ok());
        assert_eq!(backend.select_calls(), 2);
    }

    #[tokio::test]
    async fn insert_and_delete_publish_changes() {
        let backend = InMemoryBackend::new();
        let mut sub = backend.subscribe("clients");
        let row = json!({"name": "Globex"}).as_object().unwrap().clone();
        let stored = backend.insert(&ctx(), "clients", row).await.unwrap();
        let id = Uuid::parse_str(stored["id"].as_str().unwrap()).unwrap();
        assert!(stored.contains_key("created_at"));
        assert_eq!(sub.recv().await.unwrap().kind, ChangeKind::Insert);

        backend.delete(&ctx(), "clients", id).await.unwrap();
        assert_eq!(sub.recv().await.unwrap().id, Some(id));
        assert!(matches!(
            backend.delete(&ctx(), "clients", id).await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn sign_in_and_profile_roundtrip() {
        let backend = InMemoryBackend::new();
        let profile = Profile::new(Uuid::new_v4(), Role::Technician);
        backend.add_user("tech@example.com", "pw", &profile);

        let bad = backend
            .sign_in_with_password("tech@example.com", &SecretString::new("nope"))
            .await;
        assert!(matches!(bad, Err(BackendError::Auth(_))));

        let session = backend
            .sign_in_with_password("tech@example.com", &SecretString::new("pw"))
            .await
            .unwrap();
        let user = backend.get_user(&session.access_token).await.unwrap();
        assert_eq!(user.id, profile.id);
        let loaded = backend.fetch_profile(&session).await.unwrap();
        assert_eq!(loaded.role, Role::Technician);
        assert_eq!(loaded.email.as_deref(), Some("tech@example.com"));

        backend.sign_out(&session.access_token).await.unwrap();
        assert!(backend.get_user(&session.access_token).await.is_err());
    }

    #[tokio::test]
    async fn sign_up_with_confirmation_returns_no_session() {
        let backend = InMemoryBackend::new().require_email_confirmation();
        let out = backend
            .sign_up(&SignUpRequest::new("new@example.com", "pw").role(Role::Client))
            .await
            .unwrap();
        assert!(out.is_none());
        assert_eq!(backend.rows(PROFILES_TABLE).len(), 1);
        let again = backend.sign_up(&SignUpRequest::new("new@example.com", "pw")).await;
        assert!(matches!(again, Err(BackendError::Status { status: 422, .. })));
    }
}
