//! HTTP routes for the dashboard pages and the JSON API.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::cache::CacheMode;
use crate::config::parse_bool;
use crate::gateway::{GatewayError, ScreenerScope};
use crate::pages::{
    render_detail_page, render_home_page, render_screener_page, CompanySelector, DetailView,
    HomeView, ScreenerView,
};
use crate::source::MarketDataSource;

/// Query string shared by every page and API route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub symbol: Option<String>,
    pub refresh: Option<String>,
}

impl PageQuery {
    pub fn cache_mode(&self) -> CacheMode {
        match self.refresh.as_deref().and_then(parse_bool) {
            Some(true) => CacheMode::Refresh,
            _ => CacheMode::Use,
        }
    }

    fn requested_symbol(&self) -> Option<&str> {
        self.symbol
            .as_deref()
            .map(str::trim)
            .filter(|symbol| !symbol.is_empty())
    }

    fn screener_scope(&self) -> ScreenerScope {
        match self.requested_symbol() {
            Some(symbol) => ScreenerScope::Symbol(symbol.to_string()),
            None => ScreenerScope::All,
        }
    }
}

struct AppState<S> {
    source: Arc<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

pub fn dashboard_router<S: MarketDataSource>(source: Arc<S>) -> Router {
    Router::new()
        .route("/", get(get_home::<S>))
        .route("/screener", get(get_screener::<S>))
        .route("/analysis", get(get_detail_by_query::<S>))
        .route("/analysis/{symbol}", get(get_detail_by_path::<S>))
        .route("/api/companies", get(get_api_companies::<S>))
        .route("/api/analysis/{symbol}", get(get_api_analysis::<S>))
        .route("/api/screener", get(get_api_screener::<S>))
        .route("/api/cache/clear", post(post_cache_clear::<S>))
        .route("/healthz", get(get_healthz))
        .with_state(AppState { source })
}

async fn load_selector<S: MarketDataSource>(
    source: &S,
    mode: CacheMode,
) -> Result<CompanySelector, String> {
    source
        .companies(mode)
        .await
        .map(|companies| CompanySelector::new(&companies))
        .map_err(|err| err.to_string())
}

async fn get_home<S: MarketDataSource>(
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let mode = query.cache_mode();
    info!(
        event = "http.page.request",
        page = "home",
        symbol = query.requested_symbol().unwrap_or(""),
        refresh = matches!(mode, CacheMode::Refresh)
    );

    let companies = load_selector(state.source.as_ref(), mode).await;
    let selected = companies.as_ref().ok().and_then(|selector| {
        selector
            .resolve(query.requested_symbol())
            .map(|company| company.symbol.clone())
    });
    let analysis = match &selected {
        Some(symbol) => Some(
            state
                .source
                .analysis(symbol, mode)
                .await
                .map_err(|err| err.to_string()),
        ),
        None => None,
    };

    Html(render_home_page(&HomeView {
        companies,
        selected,
        analysis,
    }))
}

async fn get_screener<S: MarketDataSource>(
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let mode = query.cache_mode();
    let scope = query.screener_scope();
    info!(
        event = "http.page.request",
        page = "screener",
        symbol = query.requested_symbol().unwrap_or(""),
        refresh = matches!(mode, CacheMode::Refresh)
    );

    let rows = state
        .source
        .screener(&scope, mode)
        .await
        .map_err(|err| err.to_string());
    let symbol = match scope {
        ScreenerScope::Symbol(symbol) => Some(symbol),
        ScreenerScope::All => None,
    };

    Html(render_screener_page(&ScreenerView { rows, symbol }))
}

async fn get_detail_by_query<S: MarketDataSource>(
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let requested = query.requested_symbol().map(str::to_string);
    render_detail(&state, requested, query.cache_mode()).await
}

async fn get_detail_by_path<S: MarketDataSource>(
    State(state): State<AppState<S>>,
    Path(symbol): Path<String>,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let symbol = symbol.trim();
    let requested = (!symbol.is_empty()).then(|| symbol.to_string());
    render_detail(&state, requested, query.cache_mode()).await
}

async fn render_detail<S: MarketDataSource>(
    state: &AppState<S>,
    requested: Option<String>,
    mode: CacheMode,
) -> Html<String> {
    info!(
        event = "http.page.request",
        page = "analysis",
        symbol = requested.as_deref().unwrap_or(""),
        refresh = matches!(mode, CacheMode::Refresh)
    );

    let companies = load_selector(state.source.as_ref(), mode).await;
    // An explicit symbol is fetched even when the company list omits it.
    let symbol = match &companies {
        Ok(selector) if !selector.is_empty() => requested.or_else(|| {
            selector
                .resolve(None)
                .map(|company| company.symbol.clone())
        }),
        _ => None,
    };
    let analysis = match &symbol {
        Some(symbol) => Some(
            state
                .source
                .analysis(symbol, mode)
                .await
                .map_err(|err| err.to_string()),
        ),
        None => None,
    };

    Html(render_detail_page(&DetailView {
        companies,
        symbol,
        analysis,
    }))
}

/// JSON error body for the `/api` routes.
pub struct ApiError(pub GatewayError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            GatewayError::EmptySymbol => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn get_api_companies<S: MarketDataSource>(
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    info!(event = "http.api.request", route = "/api/companies");
    let companies = state.source.companies(query.cache_mode()).await?;
    Ok(Json(companies))
}

async fn get_api_analysis<S: MarketDataSource>(
    State(state): State<AppState<S>>,
    Path(symbol): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        event = "http.api.request",
        route = "/api/analysis/{symbol}",
        symbol = symbol.as_str()
    );
    let analysis = state.source.analysis(&symbol, query.cache_mode()).await?;
    Ok(Json(analysis))
}

async fn get_api_screener<S: MarketDataSource>(
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        event = "http.api.request",
        route = "/api/screener",
        symbol = query.requested_symbol().unwrap_or("")
    );
    let rows = state
        .source
        .screener(&query.screener_scope(), query.cache_mode())
        .await?;
    Ok(Json(rows))
}

async fn post_cache_clear<S: MarketDataSource>(State(state): State<AppState<S>>) -> StatusCode {
    info!(event = "http.api.request", route = "/api/cache/clear");
    state.source.clear_cache().await;
    StatusCode::NO_CONTENT
}

async fn get_healthz() -> &'static str {
    "ok"
}
