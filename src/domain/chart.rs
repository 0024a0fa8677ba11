//! Renderer-independent chart descriptions handed to a [`ChartPort`].
//!
//! [`ChartPort`]: crate::ports::chart_port::ChartPort

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<ScatterPoint>,
    /// `(slope, intercept)` of a fitted line drawn over the points.
    pub fit_line: Option<(f64, f64)>,
    /// Draw the x = 0 and y = 0 axes.
    pub origin_axes: bool,
}

impl ScatterChart {
    pub fn new(title: impl Into<String>, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            points: Vec::new(),
            fit_line: None,
            origin_axes: false,
        }
    }

    pub fn with_points(mut self, xs: &[f64], ys: &[f64]) -> Self {
        self.points.extend(xs.iter().zip(ys).map(|(&x, &y)| ScatterPoint {
            x,
            y,
            label: None,
        }));
        self
    }

    pub fn with_labelled_point(mut self, label: impl Into<String>, x: f64, y: f64) -> Self {
        self.points.push(ScatterPoint {
            x,
            y,
            label: Some(label.into()),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub y_label: String,
    pub series: Vec<LineSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub y_label: String,
    pub bars: Vec<(String, f64)>,
}

/// File-name friendly version of a chart title.
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("chart");
    }
    out
}
