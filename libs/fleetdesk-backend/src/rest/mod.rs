//! Hosted backend over HTTP: PostgREST for data, GoTrue for authentication.
//!
//! Realtime notifications are produced locally for the mutations this client
//! performs; a websocket feed from the server is not part of this crate.

mod postgrest;
mod transport;

use async_trait::async_trait;
use bytes::Bytes;
use fleetdesk_query::{CountMode, SelectQuery};
use fleetdesk_security::{Profile, SecurityContext};
use fleetdesk_utils::SecretString;
use http::{HeaderValue, Method, Request, header};
use http_body_util::Full;
use serde_json::{Value as Json, json};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::auth::{AuthBackend, AuthUser, Session, SignUpRequest};
use crate::config::BackendConfig;
use crate::data::{DataBackend, Row, SelectResult};
use crate::error::BackendError;
use crate::realtime::{ChangeEvent, ChangeHub, ChangeKind, ChangeSubscription};

use transport::{HttpTransport, RawResponse};

const REST_PATH: &str = "rest/v1/";
const AUTH_PATH: &str = "auth/v1/";
const PROFILES: &str = "profiles";

pub struct RestBackend {
    base: Url,
    anon_key: SecretString,
    transport: HttpTransport,
    hub: ChangeHub,
}

impl RestBackend {
    /// # Errors
    /// `BackendError::Config` for an unparsable URL, a plain-HTTP URL without
    /// `allow_insecure_http`, or a TLS setup failure.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut base = Url::parse(&config.url)
            .map_err(|e| BackendError::Config(format!("invalid backend url '{}': {e}", config.url)))?;
        match base.scheme() {
            "https" => {}
            "http" if config.allow_insecure_http => {}
            scheme => {
                return Err(BackendError::Config(format!(
                    "URL scheme '{scheme}' not allowed; use https or enable allow_insecure_http"
                )));
            }
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            anon_key: config.anon_key.clone(),
            transport: HttpTransport::new(config.allow_insecure_http, config.request_timeout)?,
            hub: ChangeHub::new(),
        })
    }

    fn url(&self, prefix: &str, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(prefix)
            .and_then(|u| u.join(path))
            .map_err(|e| BackendError::Config(format!("invalid endpoint '{path}': {e}")))
    }

    fn request(
        &self,
        method: Method,
        url: &Url,
        bearer: Option<&SecretString>,
    ) -> Result<http::request::Builder, BackendError> {
        let token = bearer.unwrap_or(&self.anon_key);
        let apikey = HeaderValue::from_str(self.anon_key.expose())
            .map_err(|_| BackendError::Config("anon key is not a valid header value".to_owned()))?;
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| BackendError::Auth("access token is not a valid header value".to_owned()))?;
        authorization.set_sensitive(true);

        Ok(Request::builder()
            .method(method)
            .uri(url.as_str())
            .header("apikey", apikey)
            .header(header::AUTHORIZATION, authorization)
            .header(header::ACCEPT, "application/json"))
    }

    async fn execute(
        &self,
        builder: http::request::Builder,
        body: Option<&Json>,
    ) -> Result<RawResponse, BackendError> {
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(serde_json::to_vec(json)?))),
            None => builder.body(Full::new(Bytes::new())),
        }
        .map_err(|e| BackendError::Config(format!("failed to build request: {e}")))?;
        self.transport.send(request).await
    }

    async fn auth_post(
        &self,
        path: &str,
        bearer: Option<&SecretString>,
        body: &Json,
    ) -> Result<RawResponse, BackendError> {
        let url = self.url(AUTH_PATH, path)?;
        let response = self
            .execute(self.request(Method::POST, &url, bearer)?, Some(body))
            .await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(response.into_auth_error())
        }
    }

    fn publish(&self, table: &str, kind: ChangeKind, id: Option<Uuid>) {
        self.hub.publish(ChangeEvent {
            table: table.to_owned(),
            kind,
            id,
        });
    }
}

fn decode_rows(response: &RawResponse) -> Result<Vec<Row>, BackendError> {
    let rows: Vec<Json> = response.json()?;
    rows.into_iter()
        .map(|v| match v {
            Json::Object(row) => Ok(row),
            other => Err(BackendError::Decode(format!("expected a JSON object row, got {other}"))),
        })
        .collect()
}

#[async_trait]
impl DataBackend for RestBackend {
    #[instrument(skip(self, ctx, query))]
    async fn select(
        &self,
        ctx: &SecurityContext,
        view: &str,
        query: &SelectQuery,
    ) -> Result<SelectResult, BackendError> {
        let mut url = self.url(REST_PATH, view)?;
        url.query_pairs_mut().extend_pairs(postgrest::query_pairs(query));

        let mut builder = self.request(Method::GET, &url, ctx.access_token())?;
        if query.count == CountMode::Exact {
            builder = builder.header("Prefer", "count=exact");
        }

        let response = self.execute(builder, None).await?;
        if !response.is_success() {
            return Err(response.into_data_error());
        }

        let total_count = match query.count {
            CountMode::Exact => response
                .headers
                .get(header::CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(postgrest::parse_content_range),
            CountMode::None => None,
        };
        let rows = decode_rows(&response)?;
        debug!(returned = rows.len(), ?total_count, "select completed");
        Ok(SelectResult { rows, total_count })
    }

    #[instrument(skip(self, ctx, row))]
    async fn insert(
        &self,
        ctx: &SecurityContext,
        table: &str,
        row: Row,
    ) -> Result<Row, BackendError> {
        let url = self.url(REST_PATH, table)?;
        let builder = self
            .request(Method::POST, &url, ctx.access_token())?
            .header("Prefer", "return=representation");
        let response = self.execute(builder, Some(&Json::Object(row))).await?;
        if !response.is_success() {
            return Err(response.into_data_error());
        }
        let stored = decode_rows(&response)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no row".to_owned()))?;
        let id = stored
            .get("id")
            .and_then(Json::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());
        self.publish(table, ChangeKind::Insert, id);
        Ok(stored)
    }

    #[instrument(skip(self, ctx))]
    async fn delete(
        &self,
        ctx: &SecurityContext,
        table: &str,
        id: Uuid,
    ) -> Result<(), BackendError> {
        let mut url = self.url(REST_PATH, table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        let builder = self
            .request(Method::DELETE, &url, ctx.access_token())?
            .header("Prefer", "return=representation");
        let response = self.execute(builder, None).await?;
        if !response.is_success() {
            return Err(response.into_data_error());
        }
        if decode_rows(&response)?.is_empty() {
            return Err(BackendError::NotFound(format!("{table} {id}")));
        }
        self.publish(table, ChangeKind::Delete, Some(id));
        Ok(())
    }

    fn subscribe(&self, table: &str) -> ChangeSubscription {
        self.hub.subscribe(table)
    }
}

#[async_trait]
impl AuthBackend for RestBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, BackendError> {
        let body = json!({ "email": email, "password": password.expose() });
        self.auth_post("token?grant_type=password", None, &body)
            .await?
            .json()
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, BackendError> {
        let body = json!({
            "email": request.email,
            "password": request.password.expose(),
            "data": {
                "full_name": request.full_name,
                "role": request.role,
                "client_id": request.client_id,
            }
        });
        let response: Json = self.auth_post("signup", None, &body).await?.json()?;
        // Without auto-confirm the endpoint returns the bare user.
        if response.get("access_token").is_some() {
            Ok(Some(serde_json::from_value(response)?))
        } else {
            Ok(None)
        }
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError> {
        self.auth_post("logout", Some(access_token), &json!({}))
            .await
            .map(|_| ())
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), BackendError> {
        self.auth_post("recover", None, &json!({ "email": email }))
            .await
            .map(|_| ())
    }

    async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, BackendError> {
        let url = self.url(AUTH_PATH, "user")?;
        let response = self
            .execute(self.request(Method::GET, &url, Some(access_token))?, None)
            .await?;
        if !response.is_success() {
            return Err(response.into_auth_error());
        }
        response.json()
    }

    async fn fetch_profile(&self, session: &Session) -> Result<Profile, BackendError> {
        let mut url = self.url(REST_PATH, PROFILES)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("id", &format!("eq.{}", session.user.id))
            .append_pair("limit", "1");
        let response = self
            .execute(
                self.request(Method::GET, &url, Some(&session.access_token))?,
                None,
            )
            .await?;
        if !response.is_success() {
            return Err(response.into_data_error());
        }
        let row = decode_rows(&response)?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("profile {}", session.user.id)))?;
        Ok(serde_json::from_value(Json::Object(row))?)
    }
}
