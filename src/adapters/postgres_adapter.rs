//! PostgreSQL data adapter.
//!
//! Reads the `trade_days`, `index_daily` and `moneyflow_hsgt` tables.

use crate::domain::error::NorthflowError;
use crate::domain::series::{DatedSeries, PriceBar, PriceSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, FlowField};
use chrono::NaiveDate;
use postgres::types::ToSql;
use postgres::{Client, NoTls, Row};
use std::cell::RefCell;
use tracing::debug;

pub struct PostgresAdapter {
    client: RefCell<Client>,
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, NorthflowError> {
        let connection_string = config
            .get_string("database", "conninfo")
            .ok_or_else(|| NorthflowError::ConfigMissing {
                section: "database".into(),
                key: "conninfo".into(),
            })?;

        let client =
            Client::connect(&connection_string, NoTls).map_err(|e| NorthflowError::Data {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client: RefCell::new(client),
        })
    }

    fn query(
        &self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, NorthflowError> {
        let rows = self
            .client
            .borrow_mut()
            .query(query, params)
            .map_err(|e| NorthflowError::DataQuery {
                reason: e.to_string(),
            })?;
        debug!(rows = rows.len(), "query complete");
        Ok(rows)
    }
}

impl DataPort for PostgresAdapter {
    fn fetch_trade_days(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<NaiveDate>, NorthflowError> {
        let query = "SELECT trade_date FROM public.trade_days \
                     WHERE trade_date >= $1 AND trade_date <= $2 \
                     ORDER BY trade_date ASC";
        let rows = self.query(query, &[&start_date, &end_date])?;
        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, NorthflowError> {
        let query = "SELECT date, open::double precision, close::double precision \
                     FROM public.index_daily \
                     WHERE code = $1 AND date >= $2 AND date <= $3 \
                     ORDER BY date ASC";
        let rows = self.query(query, &[&code, &start_date, &end_date])?;
        DatedSeries::from_rows(rows.into_iter().map(|row| {
            (
                row.get(0),
                PriceBar {
                    open: row.get(1),
                    close: row.get(2),
                },
            )
        }))
    }

    fn fetch_flow(
        &self,
        link_id: &str,
        field: FlowField,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DatedSeries<f64>, NorthflowError> {
        // column name comes from a closed enum, never from user input
        let query = format!(
            "SELECT date, {field}::double precision FROM public.moneyflow_hsgt \
             WHERE link_id = $1 AND date >= $2 AND date <= $3 AND {field} IS NOT NULL \
             ORDER BY date ASC"
        );
        let rows = self.query(&query, &[&link_id, &start_date, &end_date])?;
        DatedSeries::from_rows(rows.into_iter().map(|row| (row.get(0), row.get(1))))
    }
}
