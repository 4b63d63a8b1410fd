use crate::{app::AppContext, config::Config, http::RouteModule, middleware::MakeRequestUuid};
use axum::{Router, extract::DefaultBodyLimit};
use std::time::Duration;
use tokio::signal;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Main application structure for floodgate
pub struct App {
    router: Router<AppContext>,
    config: Config,
    context: AppContext,
}

impl App {
    /// Creates a new App with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new App with the provided configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            router: Router::new(),
            config,
            context: AppContext::new(),
        }
    }

    /// Builder pattern for constructing an App
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Register a route module with the application
    ///
    /// The module's router inherits the AppContext state from the parent
    /// router; handlers access it via `State<AppContext>`.
    pub fn register_module<M: RouteModule>(mut self, module: M) -> Self {
        let module_router = module.routes();
        if let Some(prefix) = module.prefix() {
            self.router = self.router.nest(prefix, module_router);
        } else {
            self.router = self.router.merge(module_router);
        }
        self
    }

    /// Set the application context
    pub fn with_context(mut self, context: AppContext) -> Self {
        self.context = context;
        // Add health routes to the existing router
        use crate::health;
        use axum::routing::get;
        let health_routes =
            Router::<AppContext>::new().route("/health", get(health::health_handler));
        self.router = self.router.merge(health_routes);
        self
    }

    /// Get the router for testing purposes
    ///
    /// Returns the router with AppContext state and middleware applied, for
    /// in-process testing without binding a socket.
    pub fn into_test_router(self) -> Router {
        let app = self.with_middleware();
        app.router.with_state(app.context)
    }

    /// Apply middleware stack and prepare for serving
    fn with_middleware(mut self) -> Self {
        let mut router = self.router;

        // Middleware order (from outer to inner):
        // 1. Body size limit - reject large bodies early
        router = router.layer(DefaultBodyLimit::max(self.config.server.max_body_size));

        // 2. Request ID - add request IDs for tracing
        router = router
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id());

        // 3. Trace layer - HTTP tracing
        router = router.layer(TraceLayer::new_for_http());

        self.router = router;
        self
    }

    /// Start the application server
    pub async fn serve(self) -> Result<(), std::io::Error> {
        let addr = self
            .config
            .server
            .addr()
            .expect("Invalid server address in config");

        let app = self.with_middleware();

        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("Server starting on http://{}", addr);
        tracing::info!("Health check available at http://{}/health", addr);

        // Optional retry sweep, stopped together with the server
        let sweeper = if app.config.webhooks.retry_sweep_enabled {
            let interval = Duration::from_secs(app.config.webhooks.retry_sweep_interval_seconds);
            tracing::info!(
                interval_seconds = app.config.webhooks.retry_sweep_interval_seconds,
                "Retry sweep enabled"
            );
            Some(app.context.processor.start_retry_sweeper(interval))
        } else {
            None
        };

        let shutdown = async move {
            shutdown_signal().await;
            if let Some(sweeper) = sweeper {
                sweeper.shutdown().await;
            }
        };

        let final_router = app.router.with_state(app.context);

        axum::serve(listener, final_router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for App with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppBuilder {
    config: Config,
    context: AppContext,
    modules: Vec<Router<AppContext>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            context: AppContext::new(),
            modules: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_context(mut self, context: AppContext) -> Self {
        self.context = context;
        self
    }

    pub fn register_module<M: RouteModule>(mut self, module: M) -> Self {
        self.modules.push(module.routes());
        self
    }

    pub fn build(self) -> App {
        let mut app = App::with_config(self.config).with_context(self.context);

        for module_router in self.modules {
            app.router = app.router.merge(module_router);
        }

        app
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give connections a grace period to close
    tokio::time::sleep(Duration::from_secs(1)).await;
    tracing::info!("Shutdown complete");
}
