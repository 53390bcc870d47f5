//! Command handlers. Every command prints one JSON document on stdout.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use fleetdesk_auth::SessionProvider;
use fleetdesk_backend::{AuthBackendRef, DataBackendRef, RestBackend};
use fleetdesk_query::PageRequest;
use fleetdesk_security::{PermissionResolver, RolePolicyEngine, SecurityContext};
use fleetdesk_utils::SecretString;
use inventory::InventoryModule;
use inventory_sdk::{ClientFilter, EquipmentFilter, LicenseFilter};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::demo;

#[derive(Subcommand, Debug, Clone)]
pub enum Listing {
    /// One page of records
    List(ListArgs),
    /// Aggregated counts over every matching record
    Stats(ListArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Case-insensitive name search
    #[arg(long)]
    pub search: Option<String>,

    /// Status filter; unknown values are ignored
    #[arg(long)]
    pub status: Option<String>,

    /// Equipment type filter; unknown values are ignored
    #[arg(long = "type")]
    pub equipment_type: Option<String>,

    /// Restrict to one client
    #[arg(long)]
    pub client: Option<Uuid>,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: u64,

    /// Page size
    #[arg(long, default_value_t = 10)]
    pub limit: u64,
}

impl ListArgs {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    fn client_filter(&self) -> ClientFilter {
        ClientFilter {
            search: self.search.clone(),
        }
    }

    fn license_filter(&self) -> LicenseFilter {
        LicenseFilter {
            search: self.search.clone(),
            status: self.status.clone(),
            client_id: self.client,
        }
    }

    fn equipment_filter(&self) -> EquipmentFilter {
        EquipmentFilter {
            search: self.search.clone(),
            status: self.status.clone(),
            equipment_type: self.equipment_type.clone(),
            client_id: self.client,
        }
    }
}

/// Login details from `--email`/`--password` or the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct Credentials {
    #[arg(long, global = true, env = "FLEETDESK_EMAIL")]
    pub email: Option<String>,

    #[arg(long, global = true, env = "FLEETDESK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Backends, session and inventory wired for one invocation.
pub struct Console {
    sessions: SessionProvider,
    inventory: InventoryModule,
    mock: bool,
    _gc: DropGuard,
}

impl Console {
    /// Must run inside a tokio runtime: it starts the cache gc task.
    ///
    /// # Errors
    /// Fails when the backend client cannot be built from `config`.
    pub fn connect(config: &AppConfig, mock: bool) -> Result<Self> {
        let (data, auth) = if mock {
            info!("mock mode: using the in-memory backend with demo data");
            let backend = Arc::new(demo::backend(chrono::Local::now().date_naive()));
            let data: DataBackendRef = backend.clone();
            let auth: AuthBackendRef = backend;
            (data, auth)
        } else {
            let backend = RestBackend::new(&config.backend)
                .context("failed to build the backend client")?;
            let backend = Arc::new(backend);
            let data: DataBackendRef = backend.clone();
            let auth: AuthBackendRef = backend;
            (data, auth)
        };

        let resolver = Arc::new(PermissionResolver::new(Arc::new(RolePolicyEngine::default())));
        let inventory = InventoryModule::new(data, resolver, config.inventory.clone());
        let gc = CancellationToken::new();
        // Detached; the guard stops it when the console goes away.
        drop(inventory.start_gc(gc.clone()));
        Ok(Self {
            sessions: SessionProvider::new(auth),
            inventory,
            mock,
            _gc: gc.drop_guard(),
        })
    }

    /// Sign in with the given credentials. In mock mode missing credentials
    /// fall back to the demo administrator; otherwise the caller stays
    /// anonymous and sees no data.
    ///
    /// # Errors
    /// Rejected credentials or only one of email and password.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<SecurityContext> {
        let (email, password) = match (&credentials.email, &credentials.password) {
            (Some(email), Some(password)) => (email.clone(), SecretString::new(password.as_str())),
            (None, None) if self.mock => (
                demo::ADMIN_EMAIL.to_owned(),
                SecretString::new(demo::PASSWORD),
            ),
            (None, None) => {
                warn!("no credentials given; continuing unauthenticated");
                return Ok(SecurityContext::anonymous());
            }
            _ => bail!("both --email and --password are required to sign in"),
        };

        let signed_in = self
            .sessions
            .login(&email, &password)
            .await
            .context("sign-in failed")?;
        Ok(signed_in.security_context())
    }

    /// # Errors
    /// Sign-in failures; anonymous callers are rejected.
    pub async fn whoami(&self, credentials: &Credentials) -> Result<()> {
        let ctx = self.sign_in(credentials).await?;
        let Some(profile) = ctx.profile() else {
            bail!("not signed in: set FLEETDESK_EMAIL and FLEETDESK_PASSWORD");
        };
        let capabilities = self.inventory.service().resolver().resolve(&ctx);
        print_json(&json!({
            "profile": profile,
            "capabilities": &*capabilities,
        }))
    }

    /// # Errors
    /// Query failures reported by the inventory client.
    pub async fn clients(&self, ctx: &SecurityContext, listing: &Listing) -> Result<()> {
        let client = self.inventory.client();
        match listing {
            Listing::List(args) => print_json(
                &client
                    .list_clients(ctx, &args.client_filter(), args.page_request())
                    .await?,
            ),
            Listing::Stats(_) => print_json(&client.client_stats(ctx).await?),
        }
    }

    /// # Errors
    /// Query failures reported by the inventory client.
    pub async fn licenses(&self, ctx: &SecurityContext, listing: &Listing) -> Result<()> {
        let client = self.inventory.client();
        match listing {
            Listing::List(args) => print_json(
                &client
                    .list_licenses(ctx, &args.license_filter(), args.page_request())
                    .await?,
            ),
            Listing::Stats(args) => {
                print_json(&client.license_stats(ctx, &args.license_filter()).await?)
            }
        }
    }

    /// # Errors
    /// Query failures reported by the inventory client.
    pub async fn equipment(&self, ctx: &SecurityContext, listing: &Listing) -> Result<()> {
        let client = self.inventory.client();
        match listing {
            Listing::List(args) => print_json(
                &client
                    .list_equipment(ctx, &args.equipment_filter(), args.page_request())
                    .await?,
            ),
            Listing::Stats(args) => {
                print_json(&client.equipment_stats(ctx, &args.equipment_filter()).await?)
            }
        }
    }

    /// # Errors
    /// Authentication failures; failing sections only degrade the result.
    pub async fn dashboard(&self, ctx: &SecurityContext) -> Result<()> {
        let dashboard = self.inventory.client().dashboard(ctx).await?;
        if dashboard.is_degraded() {
            warn!(sections = ?dashboard.degraded, "dashboard is incomplete");
        }
        print_json(&dashboard)
    }

    /// # Errors
    /// Invalid email or backend failure.
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        self.sessions.reset_password(email).await?;
        print_json(&json!({ "status": "sent", "email": email }))
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
