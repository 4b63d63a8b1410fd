use crate::app::AppContext;
use axum::Router;

/// Trait for composable route modules
///
/// Implement this trait to create modular, reusable route groups. Each
/// module registers its own routes and is composed into the main
/// application.
///
/// # Example
///
/// ```ignore
/// struct WebhookModule;
///
/// impl RouteModule for WebhookModule {
///     fn routes(&self) -> Router<AppContext> {
///         Router::new()
///             .route("/webhooks", post(receive_webhook))
///             .route("/webhooks/logs", get(list_event_logs))
///     }
/// }
/// ```
pub trait RouteModule {
    /// Returns a router with all routes for this module
    ///
    /// The router should NOT have state applied - state is applied by the
    /// App when serving. Handlers should use `State<AppContext>` to access
    /// the application context.
    fn routes(&self) -> Router<AppContext>
    where
        Self: Sized;

    /// Optional: specify a path prefix for all routes in this module
    fn prefix(&self) -> Option<&str> {
        None
    }
}
