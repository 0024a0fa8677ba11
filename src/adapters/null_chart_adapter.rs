//! Chart port that draws nothing.

use crate::domain::chart::{BarChart, LineChart, ScatterChart};
use crate::domain::error::QuantError;
use crate::ports::chart_port::ChartPort;

#[derive(Debug, Default, Clone, Copy)]
pub struct NullChartAdapter;

impl ChartPort for NullChartAdapter {
    fn scatter(&self, chart: &ScatterChart) -> Result<(), QuantError> {
        tracing::debug!(title = %chart.title, "skipping scatter chart");
        Ok(())
    }

    fn line(&self, chart: &LineChart) -> Result<(), QuantError> {
        tracing::debug!(title = %chart.title, "skipping line chart");
        Ok(())
    }

    fn bar(&self, chart: &BarChart) -> Result<(), QuantError> {
        tracing::debug!(title = %chart.title, "skipping bar chart");
        Ok(())
    }
}
