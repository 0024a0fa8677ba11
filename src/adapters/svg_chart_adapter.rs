//! SVG chart rendering. One file per chart, `<dir>/<slug>.svg`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Datelike;

use crate::domain::chart::{slug, BarChart, LineChart, ScatterChart};
use crate::domain::error::QuantError;
use crate::ports::chart_port::ChartPort;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 50.0;
const PALETTE: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

pub struct SvgChartAdapter {
    output_dir: PathBuf,
}

impl SvgChartAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write(&self, title: &str, svg: String) -> Result<(), QuantError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.svg", slug(title)));
        fs::write(&path, svg)?;
        tracing::info!(path = %path.display(), "wrote chart");
        Ok(())
    }
}

impl ChartPort for SvgChartAdapter {
    fn scatter(&self, chart: &ScatterChart) -> Result<(), QuantError> {
        self.write(&chart.title, render_scatter(chart))
    }

    fn line(&self, chart: &LineChart) -> Result<(), QuantError> {
        self.write(&chart.title, render_line(chart))
    }

    fn bar(&self, chart: &BarChart) -> Result<(), QuantError> {
        self.write(&chart.title, render_bar(chart))
    }
}

/// Maps a data range onto a pixel span; a flat range maps to the middle.
#[derive(Debug, Clone, Copy)]
struct Axis {
    min: f64,
    max: f64,
    lo: f64,
    hi: f64,
}

impl Axis {
    fn new(values: impl Iterator<Item = f64>, lo: f64, hi: f64) -> Self {
        let (min, max) = values
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), v| (a.min(v), b.max(v)));
        if min > max {
            return Self { min: 0.0, max: 1.0, lo, hi };
        }
        Self { min, max, lo, hi }
    }

    fn including(mut self, v: f64) -> Self {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self
    }

    fn map(&self, v: f64) -> f64 {
        let range = self.max - self.min;
        if range > 0.0 {
            self.lo + (v - self.min) / range * (self.hi - self.lo)
        } else {
            (self.lo + self.hi) / 2.0
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn open_svg(out: &mut String, title: &str, x_label: &str, y_label: &str) {
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">
<rect width="100%" height="100%" fill="white"/>
<text x="{:.1}" y="24" text-anchor="middle" font-size="16">{}</text>
<line x1="{PADDING:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>
<line x1="{PADDING:.1}" y1="{PADDING:.1}" x2="{PADDING:.1}" y2="{:.1}" stroke="black"/>
<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{}</text>
<text x="14" y="{:.1}" text-anchor="middle" font-size="12" transform="rotate(-90 14 {:.1})">{}</text>
"#,
        WIDTH / 2.0,
        escape(title),
        HEIGHT - PADDING,
        WIDTH - PADDING,
        HEIGHT - PADDING,
        HEIGHT - PADDING,
        WIDTH / 2.0,
        HEIGHT - 12.0,
        escape(x_label),
        HEIGHT / 2.0,
        HEIGHT / 2.0,
        escape(y_label),
    );
}

fn y_ticks(out: &mut String, y: &Axis) {
    for v in [y.min, (y.min + y.max) / 2.0, y.max] {
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="10">{:.4}</text>"#,
            PADDING - 4.0,
            y.map(v) + 3.0,
            v
        );
    }
}

pub fn render_scatter(chart: &ScatterChart) -> String {
    let mut x = Axis::new(chart.points.iter().map(|p| p.x), PADDING, WIDTH - PADDING);
    let mut y = Axis::new(chart.points.iter().map(|p| p.y), HEIGHT - PADDING, PADDING);
    if chart.origin_axes {
        x = x.including(0.0);
        y = y.including(0.0);
    }

    let mut out = String::new();
    open_svg(&mut out, &chart.title, &chart.x_label, &chart.y_label);
    y_ticks(&mut out, &y);

    if chart.origin_axes {
        let _ = writeln!(
            out,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="gray" stroke-dasharray="4"/>"#,
            x.lo, y.map(0.0), x.hi, y.map(0.0)
        );
        let _ = writeln!(
            out,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="gray" stroke-dasharray="4"/>"#,
            x.map(0.0), y.lo, x.map(0.0), y.hi
        );
    }

    for p in chart.points.iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
        let (cx, cy) = (x.map(p.x), y.map(p.y));
        let _ = writeln!(out, r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="3" fill="{}"/>"#, PALETTE[0]);
        if let Some(label) = &p.label {
            let _ = writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="11">{}</text>"#,
                cx + 5.0,
                cy - 5.0,
                escape(label)
            );
        }
    }

    if let Some((slope, intercept)) = chart.fit_line {
        let (x0, x1) = (x.min, x.max);
        let _ = writeln!(
            out,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2"/>"#,
            x.map(x0),
            y.map(intercept + slope * x0),
            x.map(x1),
            y.map(intercept + slope * x1),
            PALETTE[3]
        );
    }

    out.push_str("</svg>\n");
    out
}

pub fn render_line(chart: &LineChart) -> String {
    let all = || chart.series.iter().flat_map(|s| s.points.iter());
    let day = |d: &chrono::NaiveDate| d.num_days_from_ce() as f64;
    let x = Axis::new(all().map(|(d, _)| day(d)), PADDING, WIDTH - PADDING - 90.0);
    let y = Axis::new(all().map(|(_, v)| *v), HEIGHT - PADDING, PADDING);

    let mut out = String::new();
    open_svg(&mut out, &chart.title, "Date", &chart.y_label);
    y_ticks(&mut out, &y);

    for (i, series) in chart.series.iter().enumerate() {
        let colour = PALETTE[i % PALETTE.len()];
        let points: Vec<String> = series
            .points
            .iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(d, v)| format!("{:.1},{:.1}", x.map(day(d)), y.map(*v)))
            .collect();
        let _ = writeln!(
            out,
            r#"<polyline fill="none" stroke="{colour}" stroke-width="1.5" points="{}"/>"#,
            points.join(" ")
        );
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" fill="{colour}">{}</text>"#,
            WIDTH - PADDING - 80.0,
            PADDING + 14.0 * i as f64,
            escape(&series.name)
        );
    }

    if let (Some(first), Some(last)) = (
        all().map(|(d, _)| *d).min(),
        all().map(|(d, _)| *d).max(),
    ) {
        let _ = writeln!(
            out,
            r#"<text x="{PADDING:.1}" y="{:.1}" font-size="10">{first}</text>"#,
            HEIGHT - PADDING + 14.0
        );
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="10">{last}</text>"#,
            x.hi,
            HEIGHT - PADDING + 14.0
        );
    }

    out.push_str("</svg>\n");
    out
}

pub fn render_bar(chart: &BarChart) -> String {
    let y = Axis::new(chart.bars.iter().map(|(_, v)| *v), HEIGHT - PADDING, PADDING).including(0.0);
    let slot = (WIDTH - 2.0 * PADDING) / chart.bars.len().max(1) as f64;

    let mut out = String::new();
    open_svg(&mut out, &chart.title, "", &chart.y_label);
    y_ticks(&mut out, &y);

    let zero = y.map(0.0);
    for (i, (label, value)) in chart.bars.iter().enumerate() {
        let top = y.map(*value);
        let left = PADDING + slot * (i as f64 + 0.15);
        let _ = writeln!(
            out,
            r#"<rect x="{left:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
            top.min(zero),
            slot * 0.7,
            (top - zero).abs(),
            PALETTE[i % PALETTE.len()]
        );
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
            PADDING + slot * (i as f64 + 0.5),
            HEIGHT - PADDING + 14.0,
            escape(label)
        );
    }

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::LineSeries;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_line() -> LineChart {
        LineChart {
            title: "Normalized prices".into(),
            y_label: "Price (base 100)".into(),
            series: vec![
                LineSeries {
                    name: "AAPL".into(),
                    points: vec![(date("2024-01-02"), 100.0), (date("2024-01-03"), 101.0)],
                },
                LineSeries {
                    name: "MSFT".into(),
                    points: vec![(date("2024-01-02"), 100.0), (date("2024-01-03"), f64::NAN)],
                },
            ],
        }
    }

    #[test]
    fn scatter_has_points_fit_and_axes() {
        let mut chart = ScatterChart::new("DIS vs ^GSPC", "Market", "Stock")
            .with_points(&[-0.1, 0.0, 0.1], &[-0.05, 0.01, 0.08]);
        chart.fit_line = Some((0.65, 0.01));
        chart.origin_axes = true;

        let svg = render_scatter(&chart);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert_eq!(svg.matches("stroke-dasharray").count(), 2);
        assert!(svg.contains("stroke-width=\"2\""));
        assert!(svg.contains("DIS vs ^GSPC"));
    }

    #[test]
    fn scatter_labels_are_escaped() {
        let chart = ScatterChart::new("t", "x", "y").with_labelled_point("A&B", 0.1, 0.2);
        let svg = render_scatter(&chart);
        assert!(svg.contains("A&amp;B"));
    }

    #[test]
    fn empty_scatter_still_renders() {
        let svg = render_scatter(&ScatterChart::new("empty", "x", "y"));
        assert!(svg.contains("</svg>"));
        assert!(!svg.contains("<circle"));
    }

    #[test]
    fn line_has_one_polyline_per_series_and_skips_gaps() {
        let svg = render_line(&sample_line());
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(!svg.contains("NaN"));
        assert!(svg.contains("2024-01-02"));
    }

    #[test]
    fn bar_draws_negative_bars_below_zero() {
        let chart = BarChart {
            title: "Annual returns".into(),
            y_label: "Return".into(),
            bars: vec![("2016".into(), 0.12), ("2017".into(), -0.04)],
        };
        let svg = render_bar(&chart);
        assert_eq!(svg.matches("<rect").count(), 3); // background + 2 bars
        assert!(svg.contains(">2017<"));
    }

    #[test]
    fn adapter_writes_slugged_file() {
        let dir = TempDir::new().unwrap();
        let adapter = SvgChartAdapter::new(dir.path().join("charts"));
        adapter.line(&sample_line()).unwrap();

        let path = adapter.output_dir().join("normalized-prices.svg");
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("<polyline"));
    }
}
