use std::io;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use brvm_dashboard::{
    dashboard_router, log_app_bind, log_app_start, log_gateway_selected, CacheMode,
    DashboardConfig, GatewayClient, InMemorySource, LoggingConfig, RetryPolicy,
};
use httpmock::{Method::GET, MockServer};
use tower::util::ServiceExt;
use tracing::dispatcher::with_default;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    fn output_string(&self) -> String {
        let bytes = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        String::from_utf8_lossy(&bytes).to_string()
    }
}

struct SharedWriterGuard {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SharedWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs(max_level: Level, f: impl FnOnce()) -> String {
    let writer = SharedWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_max_level(max_level)
        .with_writer(writer.clone())
        .finish();
    let dispatch = tracing::Dispatch::new(subscriber);

    with_default(&dispatch, f);
    writer.output_string()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("single-thread runtime should build")
        .block_on(future)
}

#[test]
fn server_lifecycle_helpers_emit_baseline_events() {
    let logs = capture_logs(Level::INFO, || {
        log_app_start(&LoggingConfig::default());
        log_gateway_selected("gateway", &DashboardConfig::default());
        log_app_bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8501));
    });

    assert!(logs.contains("\"event\":\"app.start\""));
    assert!(logs.contains("\"event\":\"gateway.selected\""));
    assert!(logs.contains("\"event\":\"app.bind\""));
    assert!(logs.contains("brvm-api-gateway.onrender.com"));
}

#[test]
fn failed_attempts_emit_retry_and_exhausted_events() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/companies/");
        then.status(502);
    });

    let logs = capture_logs(Level::INFO, || {
        block_on(async {
            let client = GatewayClient::builder()
                .base_url(server.base_url())
                .retry_policy(RetryPolicy::fixed(2, Duration::from_millis(1)))
                .build()
                .expect("client should build");

            let err = client
                .companies(CacheMode::Use)
                .await
                .expect_err("502 should exhaust retries");
            assert!(err.to_string().contains("2 attempts"));
        });
    });

    assert_eq!(logs.matches("\"event\":\"gateway.retry\"").count(), 1);
    assert!(logs.contains("\"event\":\"gateway.exhausted\""));
    assert!(logs.contains("\"attempts\":2"));
}

#[test]
fn cache_hits_are_logged_at_debug() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/companies/");
        then.status(200).body("[]");
    });

    let logs = capture_logs(Level::DEBUG, || {
        block_on(async {
            let client = GatewayClient::builder()
                .base_url(server.base_url())
                .build()
                .expect("client should build");
            client.companies(CacheMode::Use).await.expect("first fetch");
            client.companies(CacheMode::Use).await.expect("cached fetch");
        });
    });

    assert_eq!(logs.matches("\"event\":\"gateway.request.ok\"").count(), 1);
    assert!(logs.contains("\"event\":\"gateway.cache.hit\""));
}

#[test]
fn routes_emit_page_and_api_events() {
    let logs = capture_logs(Level::INFO, || {
        block_on(async {
            let app = dashboard_router(Arc::new(InMemorySource::demo()));

            for uri in ["/screener", "/api/companies"] {
                let response = app
                    .clone()
                    .oneshot(
                        Request::builder()
                            .uri(uri)
                            .body(Body::empty())
                            .expect("request should build"),
                    )
                    .await
                    .expect("request should succeed");
                assert_eq!(response.status(), StatusCode::OK);
            }
        });
    });

    assert!(logs.contains("\"event\":\"http.page.request\""));
    assert!(logs.contains("\"page\":\"screener\""));
    assert!(logs.contains("\"event\":\"http.api.request\""));
}
