use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tracing::{info, warn};

use pelagos_core::store::BOOTSTRAP_ADMIN_USERNAME;
use pelagos_core::{AppConfig, FerryAgent, FerryStore, PelagosError, UpdateScheduler};

mod auth;
mod dto;
mod error;
mod handlers;
mod pages;
mod security;

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub(crate) struct WebState {
    pub(crate) store: FerryStore,
    pub(crate) agent: Arc<FerryAgent>,
    scheduler: Arc<Mutex<UpdateScheduler>>,
    pub(crate) session_ttl_secs: u64,
}

impl WebState {
    fn new(store: FerryStore, config: &AppConfig) -> pelagos_core::Result<Self> {
        let agent = FerryAgent::new(store.clone(), config)?;
        let scheduler = UpdateScheduler::new(store.clone(), config.update.clone());
        Ok(Self {
            store,
            agent: Arc::new(agent),
            scheduler: Arc::new(Mutex::new(scheduler)),
            session_ttl_secs: config.auth.session_ttl_secs,
        })
    }

    /// The scheduler sits behind one lock so config changes can swap it out
    /// while actions and status reads stay consistent.
    pub(crate) fn scheduler(&self) -> pelagos_core::Result<MutexGuard<'_, UpdateScheduler>> {
        self.scheduler
            .lock()
            .map_err(|_| PelagosError::mutex_poisoned("update scheduler"))
    }

    pub(crate) fn update_dir(&self) -> pelagos_core::Result<PathBuf> {
        Ok(self.scheduler()?.config().update_dir.clone())
    }
}

/// Start the ferry search web server and block until shutdown.
///
/// # Errors
/// Returns an error when the bootstrap admin cannot be ensured, the runtime
/// cannot be created, the socket cannot be bound, or the server exits with a
/// runtime failure.
pub fn serve_web(store: FerryStore, config: &AppConfig, bind_addr: &str) -> Result<()> {
    if config.auth.bootstrap_admin && store.ensure_bootstrap_admin()? {
        warn!(
            username = BOOTSTRAP_ADMIN_USERNAME,
            "created bootstrap admin account; change the stock password immediately"
        );
    }
    let purged = store.purge_expired_sessions()?;
    if purged > 0 {
        info!(purged, "dropped expired login sessions");
    }

    let state = WebState::new(store, config).context("failed to initialize web state")?;
    {
        let scheduler = state.scheduler()?;
        if let Err(err) = scheduler.start() {
            warn!(error = %err, "scheduled updates not started");
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build web runtime")?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("failed to bind web server at {bind_addr}"))?;
        println!("ferry search listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app_router(state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .context("web server failed")
    })
}

pub(crate) fn app_router(state: WebState) -> Router {
    let admin_api = Router::new()
        .route("/api/database-status", get(handlers::database_status))
        .route("/api/update-data", post(handlers::update_data))
        .route("/api/admin/files", get(handlers::list_update_files))
        .route(
            "/api/admin/files/{name}",
            delete(handlers::delete_update_file),
        )
        .route("/api/admin/upload", post(handlers::upload_update_file))
        .route(
            "/api/admin/scheduler",
            get(handlers::scheduler_status).post(handlers::scheduler_control),
        )
        .route(
            "/api/admin/scheduler/config",
            post(handlers::update_scheduler_config),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_page))
        .route("/admin", get(handlers::admin_page))
        .route("/assets/app.css", get(handlers::app_css))
        .route("/assets/chat.js", get(handlers::chat_js))
        .route("/assets/login.js", get(handlers::login_js))
        .route("/assets/admin.js", get(handlers::admin_js))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route("/api/chat", post(handlers::chat))
        .route("/api/get-ports", get(handlers::get_ports))
        .merge(admin_api)
        .layer(middleware::from_fn(security::security_headers_middleware))
        .with_state(state)
}
