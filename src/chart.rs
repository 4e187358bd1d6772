//! Inline SVG line chart for a company's closing-price history.

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::model::PricePoint;
use crate::pages::escape_html;

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 320.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 44.0;
const MARGIN_BOTTOM: f64 = 36.0;
const Y_TICKS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Usable points sorted by date. Unparseable dates and non-numeric prices are dropped.
pub fn chart_points(history: &[PricePoint]) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = history
        .iter()
        .filter_map(|point| {
            let date = parse_date(point.date.as_deref()?)?;
            let price = point.price.as_ref()?.as_f64()?;
            price.is_finite().then_some(ChartPoint { date, price })
        })
        .collect();
    points.sort_by_key(|point| point.date);
    points
}

pub fn render_price_chart(history: &[PricePoint], title: &str) -> Option<String> {
    let points = chart_points(history);
    let first = points.first()?;
    let last = points.last()?;

    let (mut min, mut max) = points
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.price), hi.max(p.price)));
    if (max - min).abs() < f64::EPSILON {
        let pad = if min.abs() > 1.0 { min.abs() * 0.01 } else { 1.0 };
        min -= pad;
        max += pad;
    }

    let first_day = first.date;
    let span_days = (last.date - first_day).num_days().max(1) as f64;
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let x_of = |date: NaiveDate| {
        if points.len() == 1 {
            MARGIN_LEFT + plot_w / 2.0
        } else {
            MARGIN_LEFT + (date - first_day).num_days() as f64 / span_days * plot_w
        }
    };
    let y_of = |price: f64| MARGIN_TOP + (max - price) / (max - min) * plot_h;

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg class=\"price-chart\" viewBox=\"0 0 {WIDTH} {HEIGHT}\" role=\"img\" aria-label=\"{}\">",
        escape_html(title)
    );
    let _ = write!(
        svg,
        "<text class=\"chart-title\" x=\"{}\" y=\"24\" text-anchor=\"middle\">{}</text>",
        WIDTH / 2.0,
        escape_html(title)
    );

    for tick in 0..=Y_TICKS {
        let value = min + (max - min) * tick as f64 / Y_TICKS as f64;
        let y = y_of(value);
        let _ = write!(
            svg,
            "<line class=\"grid\" x1=\"{MARGIN_LEFT}\" y1=\"{y:.1}\" x2=\"{}\" y2=\"{y:.1}\"/>\
             <text class=\"tick\" x=\"{}\" y=\"{:.1}\" text-anchor=\"end\">{}</text>",
            WIDTH - MARGIN_RIGHT,
            MARGIN_LEFT - 8.0,
            y + 4.0,
            format_tick(value)
        );
    }

    let _ = write!(
        svg,
        "<text class=\"axis-label\" x=\"14\" y=\"{:.1}\" transform=\"rotate(-90 14 {:.1})\" text-anchor=\"middle\">Cours (FCFA)</text>",
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0
    );

    let baseline = HEIGHT - MARGIN_BOTTOM + 20.0;
    let _ = write!(
        svg,
        "<text class=\"tick\" x=\"{MARGIN_LEFT}\" y=\"{baseline}\" text-anchor=\"start\">{}</text>",
        first.date.format("%d/%m/%Y")
    );
    if points.len() > 1 {
        let _ = write!(
            svg,
            "<text class=\"tick\" x=\"{}\" y=\"{baseline}\" text-anchor=\"end\">{}</text>",
            WIDTH - MARGIN_RIGHT,
            last.date.format("%d/%m/%Y")
        );
    }

    let coords: Vec<String> = points
        .iter()
        .map(|p| format!("{:.1},{:.1}", x_of(p.date), y_of(p.price)))
        .collect();
    let _ = write!(
        svg,
        "<polyline class=\"line\" fill=\"none\" points=\"{}\"/>",
        coords.join(" ")
    );
    for p in &points {
        let _ = write!(
            svg,
            "<circle class=\"dot\" cx=\"{:.1}\" cy=\"{:.1}\" r=\"2.5\"><title>{} : {} FCFA</title></circle>",
            x_of(p.date),
            y_of(p.price),
            p.date.format("%d/%m/%Y"),
            format_tick(p.price)
        );
    }

    svg.push_str("</svg>");
    Some(svg)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

fn format_tick(value: f64) -> String {
    if value.abs() >= 100.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
