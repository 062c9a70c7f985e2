use std::fmt::Write as _;

use futdb_core::TradingDate;

use super::HealthData;

const PLOT_WIDTH: f64 = 960.0;
const LABEL_WIDTH: f64 = 90.0;
const ROW_HEIGHT: f64 = 14.0;
const CHART_HEIGHT: f64 = 220.0;
const PAD: f64 = 24.0;

const PRESENT: &str = "#22c55e";
const MISSING: &str = "#fca5a5";
const OPTIONAL_MISSING: &str = "#e4e4e7";

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Render the report. Output depends only on the arguments.
pub fn render_html(data: &HealthData, db_label: &str, generated_at_utc: &str) -> String {
    let mut html = String::with_capacity(64 * 1024);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>futdb canonical health {start} .. {end}</title>
<style>
body {{ font-family: system-ui, sans-serif; margin: 24px; color: #18181b; }}
h1 {{ font-size: 1.3rem; }}
h2 {{ font-size: 1rem; margin-top: 28px; }}
.kpi {{ font-size: 2rem; font-weight: 600; }}
.muted {{ color: #71717a; font-size: 0.8rem; }}
table {{ border-collapse: collapse; font-size: 0.85rem; }}
th, td {{ border-bottom: 1px solid #e4e4e7; padding: 4px 10px; text-align: left; }}
td.num {{ text-align: right; }}
</style>
</head>
<body>
<h1>Canonical series health</h1>
<p class="muted">Database {db} &middot; window {start} .. {end} &middot; generated {generated}</p>
"#,
        start = data.window.start,
        end = data.window.end,
        db = escape_html(db_label),
        generated = escape_html(generated_at_utc),
    );

    let _ = write!(
        html,
        r#"<p><span class="kpi">{:.1}%</span> root-day coverage over {} days and {} roots ({} expected per day)</p>
"#,
        data.overall_coverage_pct,
        data.days.len(),
        data.roots.len(),
        data.expected_roots_per_day,
    );

    write_coverage_table(&mut html, data);
    html.push_str("<h2>Daily presence</h2>\n");
    html.push_str(DAY_AXIS_NOTE);
    write_presence_svg(&mut html, data);
    html.push_str("<h2>Canonical rows per day</h2>\n");
    write_bars_per_day_svg(&mut html, data);
    html.push_str("<h2>History range per root</h2>\n");
    write_range_svg(&mut html, data);
    html.push_str("</body>\n</html>\n");
    html
}

fn write_coverage_table(html: &mut String, data: &HealthData) {
    html.push_str(
        "<h2>Coverage by root</h2>\n<table>\n<thead><tr><th>Root</th><th>Series</th>\
         <th>Optional</th><th>Present</th><th>Missing</th><th>Coverage</th>\
         <th>First</th><th>Last</th></tr></thead>\n<tbody>\n",
    );
    for root in &data.roots {
        let _ = writeln!(
            html,
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{:.1}%</td><td>{}</td><td>{}</td></tr>"#,
            escape_html(&root.root),
            escape_html(&root.contract_series),
            if root.optional { "yes" } else { "no" },
            root.present_days,
            root.missing_days,
            root.coverage_pct,
            display_date(root.first_date),
            display_date(root.last_date),
        );
    }
    html.push_str("</tbody>\n</table>\n");
}

fn display_date(date: Option<TradingDate>) -> String {
    date.map_or_else(|| String::from("-"), |date| date.to_string())
}

fn open_svg(html: &mut String, height: f64) {
    let width = LABEL_WIDTH + PLOT_WIDTH + PAD;
    let _ = write!(
        html,
        r#"<svg width="100%" viewBox="0 0 {width} {height:.0}" xmlns="http://www.w3.org/2000/svg" style="max-width:{width}px">"#
    );
}

/// The day axis only has calendar days, so weekends and holidays without any
/// data are absent rather than drawn as gaps.
const DAY_AXIS_NOTE: &str = "<p class=\"muted\">Columns are trading days from the \
data-derived calendar plus canonical dates not yet synced into it; days with no \
data in any series (weekends, holidays) are not shown.</p>\n";

fn write_presence_svg(html: &mut String, data: &HealthData) {
    if data.days.is_empty() || data.roots.is_empty() {
        html.push_str("<p class=\"muted\">No days or roots to plot.</p>\n");
        return;
    }
    let cell = PLOT_WIDTH / data.days.len() as f64;
    let height = ROW_HEIGHT * data.roots.len() as f64 + PAD;
    open_svg(html, height);

    let mut ordered: Vec<_> = data.roots.iter().collect();
    ordered.sort_by(|a, b| a.root.cmp(&b.root));
    for (row, root) in ordered.iter().enumerate() {
        let y = row as f64 * ROW_HEIGHT;
        let _ = write!(
            html,
            r#"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{}</text>"#,
            LABEL_WIDTH - 6.0,
            y + ROW_HEIGHT - 4.0,
            escape_html(&root.root)
        );
        let missing_fill = if root.optional { OPTIONAL_MISSING } else { MISSING };
        for (column, day) in data.days.iter().enumerate() {
            let fill = if root.present.contains(day) {
                PRESENT
            } else {
                missing_fill
            };
            let _ = write!(
                html,
                r#"<rect x="{:.2}" y="{:.1}" width="{:.2}" height="{:.1}" fill="{fill}"><title>{} {day}</title></rect>"#,
                LABEL_WIDTH + column as f64 * cell,
                y + 1.0,
                cell.max(0.5),
                ROW_HEIGHT - 2.0,
                escape_html(&root.root),
            );
        }
    }
    write_axis_labels(html, data, height - 6.0);
    html.push_str("</svg>\n");
}

fn write_axis_labels(html: &mut String, data: &HealthData, y: f64) {
    if let (Some(first), Some(last)) = (data.days.first(), data.days.last()) {
        let _ = write!(
            html,
            r#"<text x="{LABEL_WIDTH}" y="{y:.1}" font-size="10">{first}</text><text x="{:.1}" y="{y:.1}" font-size="10" text-anchor="end">{last}</text>"#,
            LABEL_WIDTH + PLOT_WIDTH
        );
    }
}

fn write_bars_per_day_svg(html: &mut String, data: &HealthData) {
    if data.days.is_empty() {
        html.push_str("<p class=\"muted\">No days to plot.</p>\n");
        return;
    }
    let counts: Vec<i64> = {
        let lookup: std::collections::BTreeMap<_, _> = data.bars_per_day.iter().copied().collect();
        data.days
            .iter()
            .map(|day| lookup.get(day).copied().unwrap_or(0))
            .collect()
    };
    let expected = data.expected_roots_per_day as f64;
    let peak = counts.iter().copied().max().unwrap_or(0) as f64;
    let y_max = peak.max(expected).max(1.0);
    let plot_height = CHART_HEIGHT - PAD;
    let step = if counts.len() > 1 {
        PLOT_WIDTH / (counts.len() - 1) as f64
    } else {
        0.0
    };
    let y_of = |value: f64| plot_height - value / y_max * (plot_height - 10.0);

    open_svg(html, CHART_HEIGHT);
    let _ = write!(
        html,
        r#"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{y_max:.0}</text><text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">0</text>"#,
        LABEL_WIDTH - 6.0,
        y_of(y_max) + 3.0,
        LABEL_WIDTH - 6.0,
        y_of(0.0) + 3.0,
    );

    let mut path = String::new();
    for (index, count) in counts.iter().enumerate() {
        let x = LABEL_WIDTH + index as f64 * step;
        let y = y_of(*count as f64);
        let command = if index == 0 { 'M' } else { 'L' };
        let _ = write!(path, "{command}{x:.1},{y:.1} ");
    }
    let _ = write!(
        html,
        r##"<path d="{}" fill="none" stroke="#3b82f6" stroke-width="1.5"/>"##,
        path.trim_end()
    );

    let expected_y = y_of(expected);
    let _ = write!(
        html,
        r##"<line x1="{LABEL_WIDTH}" y1="{expected_y:.1}" x2="{:.1}" y2="{expected_y:.1}" stroke="#f97316" stroke-dasharray="4,3"><title>expected roots/day: {}</title></line>"##,
        LABEL_WIDTH + PLOT_WIDTH,
        data.expected_roots_per_day
    );
    write_axis_labels(html, data, CHART_HEIGHT - 6.0);
    html.push_str("</svg>\n");
}

fn write_range_svg(html: &mut String, data: &HealthData) {
    let ranged: Vec<_> = data
        .roots
        .iter()
        .filter_map(|root| Some((root, root.first_date?, root.last_date?)))
        .collect();
    let (Some(min), Some(max)) = (
        ranged.iter().map(|(_, first, _)| *first).min(),
        ranged.iter().map(|(_, _, last)| *last).max(),
    ) else {
        html.push_str("<p class=\"muted\">No history to plot.</p>\n");
        return;
    };
    let span = min.days_until(max).max(1) as f64;
    let x_of = |date: TradingDate| LABEL_WIDTH + min.days_until(date) as f64 / span * PLOT_WIDTH;

    let mut ordered = ranged;
    ordered.sort_by(|a, b| a.0.root.cmp(&b.0.root));
    let height = ROW_HEIGHT * ordered.len() as f64 + PAD;
    open_svg(html, height);
    for (row, (root, first, last)) in ordered.iter().enumerate() {
        let y = row as f64 * ROW_HEIGHT;
        let x = x_of(*first);
        let _ = write!(
            html,
            r##"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{}</text><rect x="{x:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#6366f1"><title>{} {first} .. {last}</title></rect>"##,
            LABEL_WIDTH - 6.0,
            y + ROW_HEIGHT - 4.0,
            escape_html(&root.root),
            y + 2.0,
            (x_of(*last) - x).max(1.0),
            ROW_HEIGHT - 4.0,
            escape_html(&root.root),
        );
    }
    let _ = write!(
        html,
        r#"<text x="{LABEL_WIDTH}" y="{:.1}" font-size="10">{min}</text><text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{max}</text>"#,
        height - 6.0,
        LABEL_WIDTH + PLOT_WIDTH,
        height - 6.0,
    );
    html.push_str("</svg>\n");
}
