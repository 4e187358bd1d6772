//! BRVM market dashboard.
//!
//! - gateway client with bounded retries and a per-endpoint TTL cache
//! - server-rendered home, screener and detail pages
//! - JSON passthrough API for the same data

mod cache;
mod chart;
mod config;
mod dashboard;
mod gateway;
mod model;
mod observability;
mod pages;
mod retry;
mod signal;
mod source;

pub use cache::{CacheMode, CacheSettings, CacheTtls, ResponseCache};
pub use chart::{chart_points, render_price_chart, ChartPoint};
pub use config::{
    dashboard_config_from_env, ConfigError, DashboardConfig, DEFAULT_API_URL, DEFAULT_BIND_ADDR,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use dashboard::{dashboard_router, ApiError, PageQuery};
pub use gateway::{GatewayClient, GatewayClientBuilder, GatewayError, ScreenerScope};
pub use model::{
    display_or_na, Analysis, Company, PricePoint, Scalar, ScreenerRow, TechnicalAnalysis,
    NOT_AVAILABLE,
};
pub use observability::{
    init_logging, log_app_bind, log_app_start, log_gateway_selected, logging_config_from_env,
    LogFormat, LoggingConfig, LoggingInitError,
};
pub use pages::{
    escape_html, markdown_to_html, render_detail_page, render_home_page, render_screener_page,
    render_screener_table, screener_cell_values, CompanySelector, DetailView, HomeView,
    ScreenerView, SCREENER_HEADERS,
};
pub use retry::{Backoff, RetryPolicy};
pub use signal::Signal;
pub use source::{demo_snapshot, InMemorySource, MarketDataSource, MarketSnapshot};
