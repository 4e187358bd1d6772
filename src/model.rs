//! Gateway payload shapes and the display defaults applied to missing fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub const NOT_AVAILABLE: &str = "N/A";

/// A value the gateway may send either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(value) => Some(*value),
            Scalar::Text(raw) => raw.trim().replace(' ', "").replace(',', ".").parse().ok(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(value) => write!(f, "{value}"),
            Scalar::Text(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Company {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: Some(name.into()),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.symbol)
    }

    /// Selector label, e.g. `SONATEL (SNTS)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.display_name(), self.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub price: Option<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    #[serde(default)]
    pub moving_average_signal: Option<String>,
    /// Older gateway builds name the moving-average verdict `mm_decision`.
    #[serde(default)]
    pub mm_decision: Option<String>,
    #[serde(default)]
    pub bollinger_bands_signal: Option<String>,
    #[serde(default)]
    pub macd_signal: Option<String>,
    #[serde(default)]
    pub rsi_signal: Option<String>,
    #[serde(default)]
    pub stochastic_signal: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TechnicalAnalysis {
    pub fn moving_average(&self) -> Option<&str> {
        self.moving_average_signal
            .as_deref()
            .or(self.mm_decision.as_deref())
    }

    /// Labelled indicator verdicts in display order.
    pub fn signals(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("Moyennes Mobiles", self.moving_average()),
            ("Bandes de Bollinger", self.bollinger_bands_signal.as_deref()),
            ("MACD", self.macd_signal.as_deref()),
            ("RSI", self.rsi_signal.as_deref()),
            ("Stochastique", self.stochastic_signal.as_deref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.signals().iter().all(|(_, value)| value.is_none()) && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub last_trade_date: Option<String>,
    #[serde(default)]
    pub last_price: Option<Scalar>,
    #[serde(default)]
    pub technical_analysis: Option<TechnicalAnalysis>,
    #[serde(default)]
    pub fundamental_analysis: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price_history: Vec<PricePoint>,
}

impl Analysis {
    pub fn company_name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.company_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(fallback)
    }

    pub fn last_trade_date_display(&self) -> String {
        display_or_na(self.last_trade_date.as_deref())
    }

    /// Price metric value, e.g. `15000 FCFA` or `N/A FCFA`.
    pub fn last_price_display(&self) -> String {
        let price = self
            .last_price
            .as_ref()
            .map(Scalar::to_string)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        format!("{price} FCFA")
    }

    /// Technical summary, `None` when absent or empty.
    pub fn technical(&self) -> Option<&TechnicalAnalysis> {
        self.technical_analysis
            .as_ref()
            .filter(|technical| !technical.is_empty())
    }

    /// Fundamental commentary, `None` when absent or blank.
    pub fn fundamental(&self) -> Option<&str> {
        self.fundamental_analysis
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenerRow {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub last_price: Option<Scalar>,
    #[serde(flatten)]
    pub signals: TechnicalAnalysis,
}

/// Screener responses: a list for the whole market, sometimes a bare object for one symbol.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ScreenerPayload {
    Rows(Vec<ScreenerRow>),
    Row(Box<ScreenerRow>),
}

impl ScreenerPayload {
    /// Rows without a symbol are dropped.
    pub(crate) fn into_rows(self) -> Vec<ScreenerRow> {
        let rows = match self {
            ScreenerPayload::Rows(rows) => rows,
            ScreenerPayload::Row(row) => vec![*row],
        };
        rows.into_iter()
            .filter(|row| !row.symbol.trim().is_empty())
            .collect()
    }
}

pub fn display_or_na(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_tolerates_missing_and_null_fields() {
        let analysis: Analysis =
            serde_json::from_str(r#"{"company_name":"SONATEL","price_history":null}"#).unwrap();

        assert_eq!(analysis.company_name_or("SNTS"), "SONATEL");
        assert_eq!(analysis.last_trade_date_display(), "N/A");
        assert_eq!(analysis.last_price_display(), "N/A FCFA");
        assert!(analysis.technical().is_none());
        assert!(analysis.fundamental().is_none());
        assert!(analysis.price_history.is_empty());
    }

    #[test]
    fn price_accepts_numbers_and_strings() {
        let numeric: Analysis = serde_json::from_str(r#"{"last_price":15000}"#).unwrap();
        let decimal: Analysis = serde_json::from_str(r#"{"last_price":1234.5}"#).unwrap();
        let text: Analysis = serde_json::from_str(r#"{"last_price":"15 000"}"#).unwrap();

        assert_eq!(numeric.last_price_display(), "15000 FCFA");
        assert_eq!(decimal.last_price_display(), "1234.5 FCFA");
        assert_eq!(text.last_price_display(), "15 000 FCFA");
        assert_eq!(text.last_price.unwrap().as_f64(), Some(15000.0));
    }

    #[test]
    fn moving_average_reads_either_key() {
        let new_key: TechnicalAnalysis =
            serde_json::from_str(r#"{"moving_average_signal":"Achat"}"#).unwrap();
        let old_key: TechnicalAnalysis =
            serde_json::from_str(r#"{"mm_decision":"Vente"}"#).unwrap();

        assert_eq!(new_key.moving_average(), Some("Achat"));
        assert_eq!(old_key.moving_average(), Some("Vente"));
    }

    #[test]
    fn empty_technical_object_counts_as_missing() {
        let analysis: Analysis = serde_json::from_str(r#"{"technical_analysis":{}}"#).unwrap();
        assert!(analysis.technical().is_none());

        let blank: Analysis = serde_json::from_str(r#"{"fundamental_analysis":"  "}"#).unwrap();
        assert!(blank.fundamental().is_none());
    }

    #[test]
    fn unknown_indicator_keys_are_kept() {
        let technical: TechnicalAnalysis =
            serde_json::from_str(r#"{"rsi_signal":"Neutre","adx_signal":"Tendance forte"}"#)
                .unwrap();
        assert_eq!(technical.rsi_signal.as_deref(), Some("Neutre"));
        assert_eq!(
            technical.extra.get("adx_signal"),
            Some(&serde_json::Value::String("Tendance forte".to_string()))
        );
    }

    #[test]
    fn company_label_falls_back_to_symbol() {
        let named = Company::new("SNTS", "SONATEL");
        let unnamed: Company = serde_json::from_str(r#"{"symbol":"ORAC"}"#).unwrap();

        assert_eq!(named.label(), "SONATEL (SNTS)");
        assert_eq!(unnamed.label(), "ORAC (ORAC)");
    }

    #[test]
    fn screener_payload_accepts_list_or_single_object() {
        let list: ScreenerPayload = serde_json::from_str(
            r#"[{"symbol":"SNTS","company_name":"SONATEL","last_price":15000,"rsi_signal":"Achat"}]"#,
        )
        .unwrap();
        let single: ScreenerPayload =
            serde_json::from_str(r#"{"symbol":"ORAC","macd_signal":"Vente"}"#).unwrap();

        let rows = list.into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].signals.rsi_signal.as_deref(), Some("Achat"));

        let rows = single.into_rows();
        assert_eq!(rows[0].symbol, "ORAC");
        assert_eq!(rows[0].signals.macd_signal.as_deref(), Some("Vente"));
    }

    #[test]
    fn screener_rows_without_symbol_are_dropped() {
        let detail: ScreenerPayload =
            serde_json::from_str(r#"{"detail":"Not Found"}"#).unwrap();
        assert!(detail.into_rows().is_empty());

        let mixed: ScreenerPayload =
            serde_json::from_str(r#"[{"symbol":"SNTS"},{"symbol":"  ","rsi_signal":"Achat"},{}]"#)
                .unwrap();
        let rows = mixed.into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "SNTS");
    }
}
