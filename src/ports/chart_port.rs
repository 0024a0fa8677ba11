//! Chart rendering port trait.

use crate::domain::chart::{BarChart, LineChart, ScatterChart};
use crate::domain::error::QuantError;

/// Port for rendering charts. Implementations may draw nothing.
pub trait ChartPort {
    fn scatter(&self, chart: &ScatterChart) -> Result<(), QuantError>;
    fn line(&self, chart: &LineChart) -> Result<(), QuantError>;
    fn bar(&self, chart: &BarChart) -> Result<(), QuantError>;
}
