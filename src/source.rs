//! Market data sources the dashboard can render from.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use chrono::{Days, NaiveDate};

use crate::cache::CacheMode;
use crate::gateway::{GatewayError, ScreenerScope};
use crate::model::{Analysis, Company, PricePoint, Scalar, ScreenerRow, TechnicalAnalysis};

pub trait MarketDataSource: Send + Sync + 'static {
    fn companies(
        &self,
        mode: CacheMode,
    ) -> impl Future<Output = Result<Vec<Company>, GatewayError>> + Send;

    fn analysis(
        &self,
        symbol: &str,
        mode: CacheMode,
    ) -> impl Future<Output = Result<Analysis, GatewayError>> + Send;

    fn screener(
        &self,
        scope: &ScreenerScope,
        mode: CacheMode,
    ) -> impl Future<Output = Result<Vec<ScreenerRow>, GatewayError>> + Send;

    fn clear_cache(&self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    pub companies: Vec<Company>,
    pub analyses: HashMap<String, Analysis>,
    pub screener: Vec<ScreenerRow>,
}

/// In-memory source used for demo mode and tests. `offline` makes every call fail.
#[derive(Clone, Default)]
pub struct InMemorySource {
    inner: Arc<RwLock<InMemoryState>>,
}

#[derive(Default)]
struct InMemoryState {
    snapshot: MarketSnapshot,
    offline: bool,
}

impl InMemorySource {
    pub fn new(snapshot: MarketSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(InMemoryState {
                snapshot,
                offline: false,
            })),
        }
    }

    pub fn demo() -> Self {
        Self::new(demo_snapshot())
    }

    pub fn replace_snapshot(&self, snapshot: MarketSnapshot) {
        let mut guard = self
            .inner
            .write()
            .expect("in-memory source lock should not be poisoned");
        guard.snapshot = snapshot;
    }

    pub fn set_offline(&self, offline: bool) {
        let mut guard = self
            .inner
            .write()
            .expect("in-memory source lock should not be poisoned");
        guard.offline = offline;
    }

    fn read<T>(
        &self,
        path: &str,
        f: impl FnOnce(&MarketSnapshot) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let guard = self
            .inner
            .read()
            .expect("in-memory source lock should not be poisoned");
        if guard.offline {
            return Err(GatewayError::Transport {
                url: format!("memory://{path}"),
                message: "source is offline".to_string(),
            });
        }
        f(&guard.snapshot)
    }
}

impl MarketDataSource for InMemorySource {
    async fn companies(&self, _mode: CacheMode) -> Result<Vec<Company>, GatewayError> {
        self.read("companies/", |snapshot| Ok(snapshot.companies.clone()))
    }

    async fn analysis(&self, symbol: &str, _mode: CacheMode) -> Result<Analysis, GatewayError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(GatewayError::EmptySymbol);
        }
        let path = format!("analysis/{symbol}");
        self.read(&path, |snapshot| {
            snapshot
                .analyses
                .get(symbol)
                .cloned()
                .ok_or_else(|| GatewayError::Status {
                    url: format!("memory://{path}"),
                    status: 404,
                })
        })
    }

    async fn screener(
        &self,
        scope: &ScreenerScope,
        _mode: CacheMode,
    ) -> Result<Vec<ScreenerRow>, GatewayError> {
        self.read("screener/", |snapshot| {
            Ok(match scope {
                ScreenerScope::All => snapshot.screener.clone(),
                ScreenerScope::Symbol(symbol) => snapshot
                    .screener
                    .iter()
                    .filter(|row| row.symbol == *symbol)
                    .cloned()
                    .collect(),
            })
        })
    }

    async fn clear_cache(&self) {}
}

struct DemoCompany {
    symbol: &'static str,
    name: &'static str,
    base_price: f64,
    step: f64,
    signals: [&'static str; 5],
    fundamental: &'static str,
}

const DEMO_COMPANIES: [DemoCompany; 5] = [
    DemoCompany {
        symbol: "SNTS",
        name: "SONATEL",
        base_price: 25_000.0,
        step: 35.0,
        signals: ["Achat", "Neutre", "Achat", "Neutre", "Achat"],
        fundamental: "**Résultat net** en hausse, dividende stable.\n\nLeader des télécoms en Afrique de l'Ouest.",
    },
    DemoCompany {
        symbol: "ORAC",
        name: "ORANGE COTE D'IVOIRE",
        base_price: 14_500.0,
        step: -20.0,
        signals: ["Vente", "Neutre", "Vente", "Neutre", "Vente"],
        fundamental: "Marges sous pression sur le segment mobile.",
    },
    DemoCompany {
        symbol: "SGBC",
        name: "SOCIETE GENERALE COTE D'IVOIRE",
        base_price: 18_000.0,
        step: 15.0,
        signals: ["Achat", "Achat", "Neutre", "Neutre", "Achat"],
        fundamental: "Produit net bancaire en progression régulière.",
    },
    DemoCompany {
        symbol: "ETIT",
        name: "ECOBANK TRANSNATIONAL INCORPORATED",
        base_price: 18.0,
        step: 0.05,
        signals: ["Neutre", "Neutre", "Neutre", "Vente", "Neutre"],
        fundamental: "",
    },
    DemoCompany {
        symbol: "PALC",
        name: "PALM COTE D'IVOIRE",
        base_price: 7_800.0,
        step: -12.0,
        signals: ["Vente", "Vente", "Neutre", "Vente", "Vente"],
        fundamental: "Exposition aux cours mondiaux de l'huile de palme.",
    },
];

const DEMO_HISTORY_DAYS: u64 = 50;

pub fn demo_snapshot() -> MarketSnapshot {
    let last_date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap_or_default();
    let mut snapshot = MarketSnapshot::default();

    for demo in &DEMO_COMPANIES {
        let history = demo_history(demo, last_date);
        let last_price = history
            .last()
            .and_then(|point| point.price.clone());
        let technical = TechnicalAnalysis {
            moving_average_signal: Some(demo.signals[0].to_string()),
            bollinger_bands_signal: Some(demo.signals[1].to_string()),
            macd_signal: Some(demo.signals[2].to_string()),
            rsi_signal: Some(demo.signals[3].to_string()),
            stochastic_signal: Some(demo.signals[4].to_string()),
            ..TechnicalAnalysis::default()
        };

        snapshot.companies.push(Company::new(demo.symbol, demo.name));
        snapshot.screener.push(ScreenerRow {
            symbol: demo.symbol.to_string(),
            company_name: Some(demo.name.to_string()),
            last_price: last_price.clone(),
            signals: technical.clone(),
        });
        snapshot.analyses.insert(
            demo.symbol.to_string(),
            Analysis {
                symbol: Some(demo.symbol.to_string()),
                company_name: Some(demo.name.to_string()),
                last_trade_date: Some(last_date.format("%Y-%m-%d").to_string()),
                last_price,
                technical_analysis: Some(technical),
                fundamental_analysis: Some(demo.fundamental.to_string()),
                price_history: history,
            },
        );
    }

    snapshot
}

fn demo_history(demo: &DemoCompany, last_date: NaiveDate) -> Vec<PricePoint> {
    (0..DEMO_HISTORY_DAYS)
        .rev()
        .filter_map(|days_back| {
            let date = last_date.checked_sub_days(Days::new(days_back))?;
            let t = (DEMO_HISTORY_DAYS - days_back) as f64;
            let wobble = (t * 0.7).sin() * demo.step.abs() * 3.0;
            let price = demo.base_price + demo.step * t + wobble;
            Some(PricePoint {
                date: Some(date.format("%Y-%m-%d").to_string()),
                price: Some(Scalar::Number((price * 100.0).round() / 100.0)),
            })
        })
        .collect()
}
