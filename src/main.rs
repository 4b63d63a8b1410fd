use std::sync::Arc;

use floodgate::webhooks::{EventDispatcher, HttpEventDispatcher, TracingDispatcher, WebhookModule};
use floodgate::{App, AppContext, ConfigBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    floodgate::init_tracing();

    let config = ConfigBuilder::new().from_env().build()?;

    let dispatcher: Arc<dyn EventDispatcher> = match &config.webhooks.notify_url {
        Some(url) => {
            tracing::info!(url = %url, "Forwarding webhook events downstream");
            Arc::new(HttpEventDispatcher::new(url)?)
        }
        None => {
            tracing::info!("No notify URL configured, webhook deliveries will be logged only");
            Arc::new(TracingDispatcher)
        }
    };

    let context = AppContext::builder()
        .with_webhook_config(config.webhooks.clone())
        .with_dispatcher(dispatcher)
        .build();

    App::with_config(config)
        .with_context(context)
        .register_module(WebhookModule)
        .serve()
        .await?;

    Ok(())
}
