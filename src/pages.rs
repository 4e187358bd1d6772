//! Server-side HTML rendering for the dashboard pages.

use chrono::Utc;
use pulldown_cmark::{html, CowStr, Event, Parser, Tag};
use url::form_urlencoded;

use crate::chart::render_price_chart;
use crate::model::{display_or_na, Analysis, Company, ScreenerRow, TechnicalAnalysis, NOT_AVAILABLE};
use crate::signal::Signal;

pub const SCREENER_HEADERS: [&str; 8] = [
    "Symbole",
    "Société",
    "Dernier Cours (FCFA)",
    "Moyennes Mobiles",
    "Bandes de Bollinger",
    "MACD",
    "RSI",
    "Stochastique",
];

/// Columns whose cells are colored by [`Signal`].
pub const SCREENER_SIGNAL_COLUMNS: std::ops::Range<usize> = 3..8;

pub const FOOTER_NOTE: &str = "Cette application est alimentée par l'API BRVM Analysis Gateway. Les données sont fournies à titre indicatif.";
pub const COMPANIES_UNAVAILABLE: &str = "Impossible de charger la liste des sociétés depuis l'API. Le service est peut-être en cours de démarrage. Veuillez rafraîchir la page dans 30 secondes.";
pub const NO_HISTORY: &str = "Aucun historique de prix disponible pour générer le graphique.";
pub const NO_TECHNICAL: &str = "Aucune donnée d'analyse technique disponible.";
pub const ANALYSIS_UNAVAILABLE: &str = "Impossible de charger l'analyse pour cette société.";
pub const NO_FUNDAMENTAL: &str = "Aucune analyse fondamentale disponible.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Info,
    Warning,
    Error,
}

impl AlertKind {
    fn css_class(self) -> &'static str {
        match self {
            AlertKind::Info => "alert-info",
            AlertKind::Warning => "alert-warning",
            AlertKind::Error => "alert-error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPage {
    Home,
    Screener,
    Detail,
}

/// Company options sorted by symbol, one entry per symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanySelector {
    options: Vec<Company>,
}

impl CompanySelector {
    pub fn new(companies: &[Company]) -> Self {
        let mut options: Vec<Company> = companies
            .iter()
            .filter(|company| !company.symbol.trim().is_empty())
            .cloned()
            .collect();
        options.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        options.dedup_by(|a, b| a.symbol == b.symbol);
        Self { options }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn options(&self) -> &[Company] {
        &self.options
    }

    pub fn get(&self, symbol: &str) -> Option<&Company> {
        self.options.iter().find(|company| company.symbol == symbol)
    }

    /// The requested company when listed, otherwise the first option.
    pub fn resolve(&self, requested: Option<&str>) -> Option<&Company> {
        requested
            .map(str::trim)
            .and_then(|symbol| self.get(symbol))
            .or_else(|| self.options.first())
    }
}

#[derive(Debug, Clone)]
pub struct HomeView {
    pub companies: Result<CompanySelector, String>,
    pub selected: Option<String>,
    pub analysis: Option<Result<Analysis, String>>,
}

#[derive(Debug, Clone)]
pub struct DetailView {
    pub companies: Result<CompanySelector, String>,
    pub symbol: Option<String>,
    pub analysis: Option<Result<Analysis, String>>,
}

#[derive(Debug, Clone)]
pub struct ScreenerView {
    pub rows: Result<Vec<ScreenerRow>, String>,
    pub symbol: Option<String>,
}

pub fn render_home_page(view: &HomeView) -> String {
    let mut body = String::new();
    body.push_str("<h1>📊 Tableau de Bord d'Analyse - Marché BRVM</h1>\n");
    body.push_str("<p class=\"lead\">Bienvenue sur votre tableau de bord personnel pour l'analyse des sociétés de la Bourse Régionale des Valeurs Mobilières.</p>\n");

    match &view.companies {
        Ok(selector) if !selector.is_empty() => {
            body.push_str(&render_selector(
                selector,
                view.selected.as_deref(),
                "/",
                "Choisissez une société à analyser :",
            ));

            if let (Some(symbol), Some(analysis)) = (&view.selected, &view.analysis) {
                body.push_str("<hr>\n");
                match analysis {
                    Ok(analysis) => body.push_str(&render_home_analysis(symbol, analysis)),
                    Err(message) => body.push_str(&alert(
                        AlertKind::Error,
                        &format!("Impossible de récupérer l'analyse pour {symbol} : {message}"),
                    )),
                }
            }
        }
        Ok(_) => body.push_str(&alert(AlertKind::Warning, COMPANIES_UNAVAILABLE)),
        Err(message) => {
            body.push_str(&alert(
                AlertKind::Error,
                &format!("Erreur de connexion à l'API pour charger les sociétés : {message}"),
            ));
            body.push_str(&alert(AlertKind::Warning, COMPANIES_UNAVAILABLE));
        }
    }

    body.push_str("<hr>\n");
    body.push_str(&alert(AlertKind::Info, FOOTER_NOTE));

    layout("Tableau de Bord BRVM", NavPage::Home, None, &body)
}

fn render_home_analysis(symbol: &str, analysis: &Analysis) -> String {
    let name = analysis.company_name_or(symbol);
    let mut out = String::new();
    out.push_str(&format!("<h2>Analyse pour {}</h2>\n", escape_html(name)));
    out.push_str(&format!(
        "<p class=\"caption\">Dernières données disponibles du {}</p>\n",
        escape_html(&analysis.last_trade_date_display())
    ));
    out.push_str(&metric(
        "Dernier Cours de Clôture",
        &analysis.last_price_display(),
    ));
    out.push_str(&render_chart_block(
        analysis,
        &format!("Historique du Cours de {name} sur 50 jours"),
        true,
    ));
    out.push_str(&columns(
        "Synthèse Technique",
        &render_technical(analysis.technical()),
        "Synthèse Fondamentale",
        &render_fundamental(analysis.fundamental(), NO_FUNDAMENTAL),
    ));
    out
}

pub fn render_detail_page(view: &DetailView) -> String {
    let mut body = String::new();
    body.push_str("<h1>🔎 Analyse Détaillée par Société</h1>\n");
    let mut sidebar = None;

    match &view.companies {
        Ok(selector) if !selector.is_empty() => {
            sidebar = Some(render_selector(
                selector,
                view.symbol.as_deref(),
                "/analysis",
                "Choisissez une société :",
            ));

            if let (Some(symbol), Some(analysis)) = (&view.symbol, &view.analysis) {
                match analysis {
                    Ok(analysis) => body.push_str(&render_detail_analysis(symbol, analysis)),
                    Err(message) => {
                        body.push_str(&alert(AlertKind::Error, ANALYSIS_UNAVAILABLE));
                        body.push_str(&format!(
                            "<p class=\"caption\">Détail : {}</p>\n",
                            escape_html(message)
                        ));
                    }
                }
            }
        }
        _ => body.push_str(&alert(
            AlertKind::Warning,
            "Impossible de charger la liste des sociétés.",
        )),
    }

    layout(
        "Analyse Détaillée BRVM",
        NavPage::Detail,
        sidebar.as_deref(),
        &body,
    )
}

fn render_detail_analysis(symbol: &str, analysis: &Analysis) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<h2>{} ({})</h2>\n",
        escape_html(analysis.company_name_or(NOT_AVAILABLE)),
        escape_html(symbol)
    ));
    out.push_str(&format!(
        "<p class=\"caption\">Données au {}</p>\n",
        escape_html(&analysis.last_trade_date_display())
    ));
    out.push_str(&metric("Dernier Cours", &analysis.last_price_display()));
    out.push_str(&render_chart_block(
        analysis,
        "Historique du Cours (50 jours)",
        false,
    ));
    let technical = match analysis.technical() {
        Some(technical) => render_technical(Some(technical)),
        None => alert(AlertKind::Info, "Pas de données techniques."),
    };
    out.push_str(&columns(
        "Synthèse Technique",
        &technical,
        "Synthèse Fondamentale (IA)",
        &render_fundamental(analysis.fundamental(), "Pas d'analyse fondamentale."),
    ));
    out
}

pub fn render_screener_page(view: &ScreenerView) -> String {
    let mut body = String::new();
    body.push_str("<h1>📈 Screener de Marché</h1>\n");
    body.push_str("<p class=\"lead\">Vue d'ensemble des signaux techniques, une ligne par société cotée.</p>\n");

    if let Some(symbol) = &view.symbol {
        body.push_str(&format!(
            "<p class=\"caption\">Filtré sur {} · <a href=\"/screener\">tout afficher</a></p>\n",
            escape_html(symbol)
        ));
    }

    match &view.rows {
        Ok(rows) if rows.is_empty() => body.push_str(&alert(
            AlertKind::Info,
            "Aucune donnée de screener disponible.",
        )),
        Ok(rows) => body.push_str(&render_screener_table(rows)),
        Err(message) => {
            body.push_str(&alert(
                AlertKind::Error,
                &format!("Erreur de connexion à l'API pour charger le screener : {message}"),
            ));
            body.push_str(&alert(
                AlertKind::Warning,
                "Impossible de charger les données du screener depuis l'API.",
            ));
        }
    }

    layout("Screener de Marché BRVM", NavPage::Screener, None, &body)
}

pub fn render_screener_table(rows: &[ScreenerRow]) -> String {
    let mut out = String::new();
    out.push_str("<div class=\"table-wrap\"><table id=\"screener-table\">\n<thead><tr>");
    for header in SCREENER_HEADERS {
        out.push_str("<th>");
        out.push_str(&escape_html(header));
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>\n");

    for (idx, row) in rows.iter().enumerate() {
        let values = screener_cell_values(row);
        out.push_str(&format!("<tr data-row=\"{idx}\">"));
        out.push_str(&format!(
            "<td><a href=\"{}\">{}</a></td>",
            escape_html(&detail_link(&row.symbol)),
            escape_html(&values[0])
        ));
        for (col_idx, value) in values.iter().enumerate().skip(1) {
            if SCREENER_SIGNAL_COLUMNS.contains(&col_idx) {
                let signal = Signal::classify(Some(value.as_str()));
                out.push_str(&format!(
                    "<td class=\"signal {}\">{}</td>",
                    signal.css_class(),
                    escape_html(value)
                ));
            } else {
                out.push_str("<td>");
                out.push_str(&escape_html(value));
                out.push_str("</td>");
            }
        }
        out.push_str("</tr>\n");
    }

    out.push_str("</tbody></table></div>\n");
    out.push_str("<div class=\"legend\"><span class=\"signal signal-buy\">Achat</span> <span class=\"signal signal-sell\">Vente</span> <span class=\"signal signal-neutral\">Neutre</span></div>\n");
    out
}

/// Display values in [`SCREENER_HEADERS`] order, `N/A` for missing fields.
pub fn screener_cell_values(row: &ScreenerRow) -> Vec<String> {
    let mut values = vec![
        display_or_na(Some(row.symbol.as_str())),
        display_or_na(row.company_name.as_deref()),
        row.last_price
            .as_ref()
            .map(|price| price.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    ];
    values.extend(
        row.signals
            .signals()
            .iter()
            .map(|(_, value)| display_or_na(*value)),
    );
    values
}

pub fn detail_link(symbol: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(symbol.as_bytes()).collect();
    format!("/analysis?symbol={encoded}")
}

fn render_selector(
    selector: &CompanySelector,
    selected: Option<&str>,
    action: &str,
    label: &str,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<form class=\"selector\" method=\"get\" action=\"{}\"><label for=\"symbol\">{}</label>",
        escape_html(action),
        escape_html(label)
    ));
    out.push_str("<select id=\"symbol\" name=\"symbol\" onchange=\"this.form.submit()\">");
    for company in selector.options() {
        let is_selected = selected == Some(company.symbol.as_str());
        out.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            escape_html(&company.symbol),
            if is_selected { " selected" } else { "" },
            escape_html(&company.label())
        ));
    }
    out.push_str("</select><noscript><button type=\"submit\">Afficher</button></noscript></form>\n");
    out
}

fn render_chart_block(analysis: &Analysis, title: &str, explain_missing: bool) -> String {
    match render_price_chart(&analysis.price_history, title) {
        Some(svg) => format!("<div class=\"chart\">{svg}</div>\n"),
        None if explain_missing => alert(AlertKind::Info, NO_HISTORY),
        None => String::new(),
    }
}

fn render_technical(technical: Option<&TechnicalAnalysis>) -> String {
    let Some(technical) = technical else {
        return alert(AlertKind::Info, NO_TECHNICAL);
    };

    let mut out = String::from("<ul class=\"signals\">");
    for (label, value) in technical.signals() {
        let signal = Signal::classify(value);
        out.push_str(&format!(
            "<li><b>{} :</b> <span class=\"signal {}\">{}</span></li>",
            escape_html(label),
            signal.css_class(),
            escape_html(&display_or_na(value))
        ));
    }
    for (key, value) in &technical.extra {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => NOT_AVAILABLE.to_string(),
            other => other.to_string(),
        };
        out.push_str(&format!(
            "<li><b>{} :</b> <span class=\"signal {}\">{}</span></li>",
            escape_html(&humanize_key(key)),
            Signal::classify(Some(text.as_str())).css_class(),
            escape_html(&text)
        ));
    }
    out.push_str("</ul>\n");
    out
}

fn render_fundamental(text: Option<&str>, fallback: &str) -> String {
    match text {
        Some(markdown) => format!("<div class=\"markdown\">{}</div>\n", markdown_to_html(markdown)),
        None => format!("<p>{}</p>\n", escape_html(fallback)),
    }
}

/// Markdown rendering with raw HTML passed through as text and unsafe link targets dropped.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new(markdown).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        other => other,
    });
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// Keeps http, https, mailto and scheme-less destinations; anything else becomes `#`.
fn safe_destination(dest: CowStr<'_>) -> CowStr<'_> {
    let trimmed = dest.trim_start();
    let scheme_end = trimmed.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    let allowed = match scheme_end {
        Some(idx) if trimmed[idx..].starts_with(':') => {
            let scheme = trimmed[..idx].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto")
        }
        _ => !trimmed.chars().any(char::is_control),
    };
    if allowed {
        dest
    } else {
        CowStr::Borrowed("#")
    }
}

fn humanize_key(key: &str) -> String {
    let spaced = key.trim_end_matches("_signal").replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn metric(label: &str, value: &str) -> String {
    format!(
        "<div class=\"metric\"><div class=\"metric-label\">{}</div><div class=\"metric-value\">{}</div></div>\n",
        escape_html(label),
        escape_html(value)
    )
}

fn columns(left_title: &str, left: &str, right_title: &str, right: &str) -> String {
    format!(
        "<div class=\"columns\"><section><h3>{}</h3>{left}</section><section><h3>{}</h3>{right}</section></div>\n",
        escape_html(left_title),
        escape_html(right_title)
    )
}

pub fn alert(kind: AlertKind, message: &str) -> String {
    format!(
        "<div class=\"alert {}\">{}</div>\n",
        kind.css_class(),
        escape_html(message)
    )
}

fn layout(title: &str, active: NavPage, sidebar: Option<&str>, body: &str) -> String {
    let now_utc = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let nav_class = |page: NavPage| if page == active { "active" } else { "" };

    let mut out = String::new();
    out.push_str("<!DOCTYPE html><html lang=\"fr\"><head><meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    out.push_str("<style>:root{--bg:#f6f7f9;--card:#fff;--ink:#1f2933;--muted:#616e7c;--line:#d9e2ec;--head:#102a43;--buy:#d3f9d8;--buyink:#1b5e20;--sell:#ffe3e3;--sellink:#8a1c1c;--neutral:#fff3bf;--neutralink:#7c5e00}*{box-sizing:border-box}body{margin:0;color:var(--ink);font-family:\"Source Sans Pro\",\"Segoe UI\",sans-serif;background:var(--bg)}nav{display:flex;gap:18px;align-items:center;background:var(--head);padding:12px 24px}nav a{color:#d9e2ec;text-decoration:none;font-weight:600}nav a.active{color:#fff;border-bottom:2px solid #f0b429}nav .generated{margin-left:auto;color:#9fb3c8;font-size:.8rem}.page{display:flex;max-width:1400px;margin:0 auto}aside{width:300px;padding:24px;background:#f0f4f8;border-right:1px solid var(--line)}main{flex:1;padding:24px 32px}h1{font-size:1.8rem;margin:.2em 0 .4em}.lead{color:var(--muted)}.caption{color:var(--muted);font-size:.9rem}.selector label{display:block;margin-bottom:6px;font-weight:600}.selector select{min-width:320px;padding:8px;border-radius:8px;border:1px solid var(--line);font-size:1rem}.metric{margin:16px 0}.metric-label{color:var(--muted);font-size:.9rem}.metric-value{font-size:2rem;font-weight:700}.columns{display:grid;grid-template-columns:1fr 1fr;gap:24px}.columns section{background:var(--card);border:1px solid var(--line);border-radius:12px;padding:16px}.signals{list-style:none;padding:0;margin:0}.signals li{padding:6px 0;border-bottom:1px solid var(--line)}.signal{padding:2px 8px;border-radius:6px}.signal-buy{background:var(--buy);color:var(--buyink)}.signal-sell{background:var(--sell);color:var(--sellink)}.signal-neutral{background:var(--neutral);color:var(--neutralink)}.alert{padding:12px 16px;border-radius:8px;margin:12px 0}.alert-info{background:#e3f2fd;color:#0b4f8a}.alert-warning{background:#fff8e1;color:#7c5e00}.alert-error{background:#ffebee;color:#8a1c1c}.chart{background:var(--card);border:1px solid var(--line);border-radius:12px;padding:8px;margin:16px 0}.price-chart{width:100%;height:auto}.price-chart .line{stroke:#2680c2;stroke-width:2}.price-chart .dot{fill:#2680c2}.price-chart .grid{stroke:#e4e7eb}.price-chart .tick,.price-chart .axis-label{font-size:12px;fill:var(--muted)}.price-chart .chart-title{font-size:16px;font-weight:600;fill:var(--ink)}.table-wrap{overflow:auto;background:var(--card);border:1px solid var(--line);border-radius:12px}table{width:100%;border-collapse:collapse}thead th{position:sticky;top:0;background:var(--head);color:#f0f4f8;font-size:.8rem;text-transform:uppercase;letter-spacing:.04em;padding:10px;text-align:left}tbody td{padding:9px 10px;border-bottom:1px solid var(--line);white-space:nowrap}.legend{padding:10px 0;font-size:.85rem}@media (max-width:760px){.page{flex-direction:column}aside{width:auto}.columns{grid-template-columns:1fr}}</style>\n");
    out.push_str("</head><body>\n");
    out.push_str(&format!(
        "<nav><a class=\"{}\" href=\"/\">Accueil</a><a class=\"{}\" href=\"/screener\">📈 Screener de Marché</a><a class=\"{}\" href=\"/analysis\">🔎 Analyse Détaillée</a><span class=\"generated\">Généré : {}</span></nav>\n",
        nav_class(NavPage::Home),
        nav_class(NavPage::Screener),
        nav_class(NavPage::Detail),
        escape_html(&now_utc)
    ));
    out.push_str("<div class=\"page\">");
    if let Some(sidebar) = sidebar {
        out.push_str("<aside>");
        out.push_str(sidebar);
        out.push_str("</aside>");
    }
    out.push_str("<main>\n");
    out.push_str(body);
    out.push_str("</main></div></body></html>\n");
    out
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
