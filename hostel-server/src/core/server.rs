//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::time::Duration;

use anyhow::Context;
use tower_http::timeout::TimeoutLayer;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result, ServerError, ServerState};
use crate::message::run_event_logger;
use crate::routes::build_app;
use crate::services::run_overdue_task;

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        self.config.validate().map_err(ServerError::Config)?;

        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await?,
        };

        crate::api::health::mark_started();
        let tasks = self.start_background_tasks(&state);

        let app = build_app(&state)
            .layer(TimeoutLayer::new(Duration::from_millis(
                self.config.request_timeout_ms,
            )))
            .with_state(state.clone());

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("🏠 Hostel Server listening on http://{}", addr);
        tracing::info!("  Environment  : {}", self.config.environment);
        tracing::info!("  Timezone     : {}", self.config.timezone);
        tracing::info!("  Database     : {}", self.config.database_url);

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;

        tasks.shutdown().await;
        Ok(())
    }

    /// 事件日志监听 + 逾期巡检 (interval 为 0 时不启动)
    fn start_background_tasks(&self, state: &ServerState) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let token = tasks.shutdown_token();
        tasks.spawn(
            "event_logger",
            TaskKind::Listener,
            run_event_logger(state.bus.subscribe(), token),
        );

        let interval = self.config.overdue_check_interval_secs;
        if interval > 0 {
            let token = tasks.shutdown_token();
            let state = state.clone();
            tasks.spawn("overdue_check", TaskKind::Periodic, async move {
                run_overdue_task(state, Duration::from_secs(interval), token).await;
            });
        } else {
            tracing::info!("Overdue check task disabled");
        }

        tasks.log_summary();
        tasks
    }
}
