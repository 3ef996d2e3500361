#![allow(dead_code)]

use chrono::{Datelike, NaiveDate};
use northflow::cli::{DataSource, RunConfig};
use northflow::domain::backtest::BacktestConfig;
use northflow::domain::error::NorthflowError;
use northflow::domain::series::{DatedSeries, PriceBar, PriceField, PriceSeries};
use northflow::ports::data_port::{DataPort, FlowField};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CODE: &str = "000300.XSHG";
pub const FLOW: &str = "310005";

/// Two buy/sell spike pairs on a flat 0, 1, -1 flow. With a 3-observation
/// window and factor 1.5 only the spikes break the band.
pub const SPIKES: [(usize, f64); 4] = [(4, 10.0), (10, -10.0), (16, 10.0), (22, -10.0)];

pub struct MockDataPort {
    pub trade_days: Vec<NaiveDate>,
    pub prices: HashMap<String, Vec<(NaiveDate, PriceBar)>>,
    pub flows: HashMap<String, Vec<(NaiveDate, f64)>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            trade_days: Vec::new(),
            prices: HashMap::new(),
            flows: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_trade_days(mut self, days: Vec<NaiveDate>) -> Self {
        self.trade_days = days;
        self
    }

    pub fn with_prices(mut self, code: &str, rows: Vec<(NaiveDate, PriceBar)>) -> Self {
        self.prices.insert(code.to_string(), rows);
        self
    }

    pub fn with_flow(mut self, link_id: &str, rows: Vec<(NaiveDate, f64)>) -> Self {
        self.flows.insert(link_id.to_string(), rows);
        self
    }

    pub fn with_error(mut self, key: &str, reason: &str) -> Self {
        self.errors.insert(key.to_string(), reason.to_string());
        self
    }

    fn check(&self, key: &str) -> Result<(), NorthflowError> {
        match self.errors.get(key) {
            Some(reason) => Err(NorthflowError::Data {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn within<T: Clone>(rows: &[(NaiveDate, T)], start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, T)> {
    rows.iter()
        .filter(|(d, _)| *d >= start && *d <= end)
        .cloned()
        .collect()
}

impl DataPort for MockDataPort {
    fn fetch_trade_days(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<NaiveDate>, NorthflowError> {
        self.check("trade_days")?;
        Ok(self
            .trade_days
            .iter()
            .copied()
            .filter(|d| *d >= start_date && *d <= end_date)
            .collect())
    }

    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, NorthflowError> {
        self.check(code)?;
        let rows = self.prices.get(code).cloned().unwrap_or_default();
        DatedSeries::from_rows(within(&rows, start_date, end_date))
    }

    fn fetch_flow(
        &self,
        link_id: &str,
        _field: FlowField,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DatedSeries<f64>, NorthflowError> {
        self.check(link_id)?;
        let rows = self.flows.get(link_id).cloned().unwrap_or_default();
        DatedSeries::from_rows(within(&rows, start_date, end_date))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` consecutive weekdays starting Monday 2024-01-01.
pub fn trading_days(n: usize) -> Vec<NaiveDate> {
    date(2024, 1, 1)
        .iter_days()
        .filter(|d| d.weekday().number_from_monday() <= 5)
        .take(n)
        .collect()
}

pub fn spike_flow(days: &[NaiveDate], spikes: &[(usize, f64)]) -> Vec<(NaiveDate, f64)> {
    const BASE: [f64; 3] = [0.0, 1.0, -1.0];
    days.iter()
        .enumerate()
        .map(|(i, &d)| {
            let value = spikes
                .iter()
                .find(|(at, _)| *at == i)
                .map(|(_, v)| *v)
                .unwrap_or(BASE[i % 3]);
            (d, value)
        })
        .collect()
}

/// Open and close both `100 + i` on the i-th day.
pub fn ramp_prices(days: &[NaiveDate]) -> Vec<(NaiveDate, PriceBar)> {
    days.iter()
        .enumerate()
        .map(|(i, &d)| {
            let p = 100.0 + i as f64;
            (d, PriceBar { open: p, close: p })
        })
        .collect()
}

pub fn make_bar(open: f64, close: f64) -> PriceBar {
    PriceBar { open, close }
}

pub fn scenario_port(n: usize) -> MockDataPort {
    let days = trading_days(n);
    MockDataPort::new()
        .with_prices(CODE, ramp_prices(&days))
        .with_flow(FLOW, spike_flow(&days, &SPIKES))
        .with_trade_days(days)
}

pub fn sample_run_config(source: DataSource) -> RunConfig {
    RunConfig {
        source,
        code: CODE.to_string(),
        flow: FLOW.to_string(),
        flow_field: FlowField::NetBuy,
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        backtest: BacktestConfig {
            initial_capital: 1_000_000.0,
            execution_field: PriceField::Open,
        },
        signal_lag: 1,
        trading_days_per_year: 250,
        window: 3,
        band_factor: 1.5,
    }
}

/// Write the scenario as a CSV data directory.
pub fn write_csv_fixture(dir: &Path, n: usize) -> PathBuf {
    let days = trading_days(n);

    let mut calendar = String::from("trade_date\n");
    for d in &days {
        calendar.push_str(&format!("{d}\n"));
    }
    fs::write(dir.join("trade_days.csv"), calendar).unwrap();

    let mut prices = String::from("date,open,close\n");
    for (d, bar) in ramp_prices(&days) {
        prices.push_str(&format!("{d},{},{}\n", bar.open, bar.close));
    }
    fs::write(dir.join(format!("{CODE}.csv")), prices).unwrap();

    let mut flow = String::from("date,net_buy,net_flow\n");
    for (d, v) in spike_flow(&days, &SPIKES) {
        flow.push_str(&format!("{d},{v},{}\n", v * 0.5));
    }
    fs::write(dir.join(format!("flow_{FLOW}.csv")), flow).unwrap();

    dir.to_path_buf()
}

pub fn scenario_ini(data_dir: &Path) -> String {
    format!(
        r#"
[data]
source = csv
dir = {}

[backtest]
code = {CODE}
flow = {FLOW}
flow_field = net_buy
start_date = 2024-01-01
end_date = 2024-12-31
initial_capital = 1000000
execution_price = open
signal_lag = 1

[signal]
window = 3
band_factor = 1.5

[log]
level = warn
"#,
        data_dir.display()
    )
}
