//! CSV directory data adapter.
//!
//! Layout under the base directory:
//! - `trade_days.csv` with a `trade_date` column
//! - `{code}.csv` with `date,open,close`
//! - `flow_{link_id}.csv` with `date,net_buy,net_flow`

use crate::domain::error::NorthflowError;
use crate::domain::series::{DatedSeries, PriceBar, PriceSeries};
use crate::ports::config_port::DATE_FORMAT;
use crate::ports::data_port::{DataPort, FlowField};
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn calendar_path(&self) -> PathBuf {
        self.base_path.join("trade_days.csv")
    }

    fn price_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    fn flow_path(&self, link_id: &str) -> PathBuf {
        self.base_path.join(format!("flow_{}.csv", link_id))
    }

    fn read_records(path: &Path) -> Result<(StringRecord, Vec<StringRecord>), NorthflowError> {
        let content = fs::read_to_string(path).map_err(|e| NorthflowError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| NorthflowError::Data {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .clone();
        let records = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| NorthflowError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
        debug!(path = %path.display(), rows = records.len(), "csv loaded");
        Ok((headers, records))
    }
}

fn column(headers: &StringRecord, name: &str) -> Result<usize, NorthflowError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| NorthflowError::Data {
            reason: format!("missing {} column", name),
        })
}

fn field<'r>(record: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str, NorthflowError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| NorthflowError::Data {
            reason: format!("missing {} value", name),
        })
}

fn parse_date(record: &StringRecord, idx: usize) -> Result<NaiveDate, NorthflowError> {
    let raw = field(record, idx, "date")?;
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| NorthflowError::Data {
        reason: format!("invalid date {:?}: {}", raw, e),
    })
}

fn parse_number(record: &StringRecord, idx: usize, name: &str) -> Result<f64, NorthflowError> {
    let raw = field(record, idx, name)?;
    let value: f64 = raw.parse().map_err(|e| NorthflowError::Data {
        reason: format!("invalid {} value {:?}: {}", name, raw, e),
    })?;
    if !value.is_finite() {
        return Err(NorthflowError::Data {
            reason: format!("non-finite {} value {:?}", name, raw),
        });
    }
    Ok(value)
}

impl DataPort for CsvAdapter {
    fn fetch_trade_days(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<NaiveDate>, NorthflowError> {
        let (headers, records) = Self::read_records(&self.calendar_path())?;
        let date_col = column(&headers, "trade_date")?;

        let mut days = Vec::with_capacity(records.len());
        for record in &records {
            let date = parse_date(record, date_col)?;
            if date >= start_date && date <= end_date {
                days.push(date);
            }
        }
        days.sort_unstable();
        Ok(days)
    }

    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, NorthflowError> {
        let (headers, records) = Self::read_records(&self.price_path(code))?;
        let date_col = column(&headers, "date")?;
        let open_col = column(&headers, "open")?;
        let close_col = column(&headers, "close")?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let date = parse_date(record, date_col)?;
            if date < start_date || date > end_date {
                continue;
            }
            let bar = PriceBar {
                open: parse_number(record, open_col, "open")?,
                close: parse_number(record, close_col, "close")?,
            };
            rows.push((date, bar));
        }
        DatedSeries::from_rows(rows)
    }

    fn fetch_flow(
        &self,
        link_id: &str,
        flow_field: FlowField,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DatedSeries<f64>, NorthflowError> {
        let (headers, records) = Self::read_records(&self.flow_path(link_id))?;
        let name = flow_field.to_string();
        let date_col = column(&headers, "date")?;
        let value_col = column(&headers, &name)?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let date = parse_date(record, date_col)?;
            if date < start_date || date > end_date {
                continue;
            }
            rows.push((date, parse_number(record, value_col, &name)?));
        }
        DatedSeries::from_rows(rows)
    }
}
