//! Signal classification for screener and summary cell coloring.

use serde::Serialize;

const BUY_MARKERS: [&str; 4] = ["achat", "buy", "hauss", "bullish"];
const SELL_MARKERS: [&str; 4] = ["vente", "sell", "baiss", "bearish"];
const NEUTRAL_MARKERS: [&str; 4] = ["neutre", "neutral", "attente", "hold"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
    Unknown,
}

impl Signal {
    pub fn classify(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return Signal::Unknown;
        };
        let lowered = text.to_lowercase();
        let contains_any = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));

        if contains_any(&BUY_MARKERS) {
            Signal::Buy
        } else if contains_any(&SELL_MARKERS) {
            Signal::Sell
        } else if contains_any(&NEUTRAL_MARKERS) {
            Signal::Neutral
        } else {
            Signal::Unknown
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Signal::Buy => "signal-buy",
            Signal::Sell => "signal-sell",
            Signal::Neutral => "signal-neutral",
            Signal::Unknown => "signal-unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn french_and_english_markers_are_recognized() {
        assert_eq!(Signal::classify(Some("Signal d'Achat")), Signal::Buy);
        assert_eq!(Signal::classify(Some("STRONG BUY")), Signal::Buy);
        assert_eq!(Signal::classify(Some("Vente")), Signal::Sell);
        assert_eq!(Signal::classify(Some("Tendance baissière")), Signal::Sell);
        assert_eq!(Signal::classify(Some("Neutre")), Signal::Neutral);
        assert_eq!(Signal::classify(Some("En attente")), Signal::Neutral);
    }

    #[test]
    fn absent_or_unmatched_text_is_unknown() {
        assert_eq!(Signal::classify(None), Signal::Unknown);
        assert_eq!(Signal::classify(Some("N/A")), Signal::Unknown);
        assert_eq!(Signal::classify(Some("")), Signal::Unknown);
    }

    #[test]
    fn buy_takes_precedence_when_both_markers_appear() {
        assert_eq!(
            Signal::classify(Some("Achat après la vente")),
            Signal::Buy
        );
    }

    #[test]
    fn css_classes_are_distinct() {
        assert_eq!(Signal::Buy.css_class(), "signal-buy");
        assert_eq!(Signal::Sell.css_class(), "signal-sell");
        assert_eq!(Signal::Neutral.css_class(), "signal-neutral");
        assert_eq!(Signal::Unknown.css_class(), "signal-unknown");
    }
}
