//! Data access port trait.
//!
//! Implementations are thin wrappers over an upstream store; the domain only
//! sees sorted, de-duplicated series.

use crate::domain::error::NorthflowError;
use crate::domain::series::{DatedSeries, PriceSeries};
use chrono::NaiveDate;
use std::fmt;

/// Column of a cross-border flow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowField {
    #[default]
    NetBuy,
    NetFlow,
}

impl fmt::Display for FlowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowField::NetBuy => write!(f, "net_buy"),
            FlowField::NetFlow => write!(f, "net_flow"),
        }
    }
}

impl std::str::FromStr for FlowField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "net_buy" => Ok(FlowField::NetBuy),
            "net_flow" => Ok(FlowField::NetFlow),
            other => Err(format!("expected net_buy or net_flow, got {other:?}")),
        }
    }
}

pub trait DataPort {
    fn fetch_trade_days(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<NaiveDate>, NorthflowError>;

    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, NorthflowError>;

    fn fetch_flow(
        &self,
        link_id: &str,
        field: FlowField,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DatedSeries<f64>, NorthflowError>;
}
