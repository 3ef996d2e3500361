//! Configuration access port trait.

use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    /// `Some(Err(raw))` when the key is present but not a `YYYY-MM-DD` date.
    fn get_date(&self, section: &str, key: &str) -> Option<Result<NaiveDate, String>> {
        self.get_string(section, key).map(|raw| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| raw)
        })
    }
}
