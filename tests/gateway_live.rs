#![cfg(feature = "live-gateway-tests")]

use std::time::Duration;

use brvm_dashboard::{CacheMode, GatewayClient, RetryPolicy, ScreenerScope, DEFAULT_API_URL};

fn live_client() -> GatewayClient {
    let base_url = std::env::var("BRVM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    // The hosted gateway cold-starts slowly.
    GatewayClient::builder()
        .base_url(base_url)
        .timeout(Duration::from_secs(60))
        .retry_policy(RetryPolicy::fixed(4, Duration::from_secs(10)))
        .build()
        .expect("live client should build")
}

#[tokio::test]
async fn live_gateway_serves_companies_analysis_and_screener() {
    let client = live_client();

    let companies = client
        .companies(CacheMode::Bypass)
        .await
        .expect("company list should load");
    assert!(!companies.is_empty(), "gateway returned no companies");

    let first = companies
        .iter()
        .map(|company| company.symbol.clone())
        .min()
        .expect("at least one symbol");

    let analysis = client
        .analysis(&first, CacheMode::Bypass)
        .await
        .expect("analysis should load");
    println!(
        "{first}: {} on {}",
        analysis.last_price_display(),
        analysis.last_trade_date_display()
    );

    let rows = client
        .screener(&ScreenerScope::All, CacheMode::Bypass)
        .await
        .expect("screener should load");
    assert!(!rows.is_empty(), "gateway returned an empty screener");
}
