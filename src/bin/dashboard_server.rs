use std::sync::Arc;

use brvm_dashboard::{
    dashboard_config_from_env, dashboard_router, init_logging, log_app_bind, log_app_start,
    log_gateway_selected, logging_config_from_env, DashboardConfig, GatewayClient,
    InMemorySource, MarketDataSource,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let config = dashboard_config_from_env()?;

    if config.use_demo {
        log_gateway_selected("demo", &config);
        serve(&config, InMemorySource::demo()).await
    } else {
        let client = GatewayClient::from_config(&config)?;
        log_gateway_selected("gateway", &config);
        serve(&config, client).await
    }
}

async fn serve<S: MarketDataSource>(
    config: &DashboardConfig,
    source: S,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = dashboard_router(Arc::new(source));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
