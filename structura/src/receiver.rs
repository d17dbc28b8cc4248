use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::bar::Bar;
use crate::constant::{DataError, Timeframe};

/// bar 数据来源。实现方保证每个 (ticker, timeframe) 的序列按时间严格递增。
pub trait BarSource: Send + Sync {
    fn load_bars(&self, ticker: &str, timeframe: Timeframe) -> Result<Vec<Bar>, DataError>;
}

/// 目录下按 `<TICKER>_<tf>.csv` 组织的 CSV 数据源。
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    root: PathBuf,
}

impl CsvBarSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, ticker: &str, timeframe: Timeframe) -> PathBuf {
        self.root
            .join(format!("{}_{}.csv", ticker.trim().to_ascii_uppercase(), timeframe.as_str()))
    }
}

impl BarSource for CsvBarSource {
    fn load_bars(&self, ticker: &str, timeframe: Timeframe) -> Result<Vec<Bar>, DataError> {
        load_bars_csv(self.path_for(ticker, timeframe))
    }
}

/// 内存数据源，主要用于回放和测试。
#[derive(Debug, Clone, Default)]
pub struct MemoryBarSource {
    bars: HashMap<(String, Timeframe), Vec<Bar>>,
}

impl MemoryBarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: impl Into<String>, timeframe: Timeframe, bars: Vec<Bar>) {
        self.bars
            .insert((ticker.into().to_ascii_uppercase(), timeframe), bars);
    }
}

impl BarSource for MemoryBarSource {
    fn load_bars(&self, ticker: &str, timeframe: Timeframe) -> Result<Vec<Bar>, DataError> {
        let bars = self
            .bars
            .get(&(ticker.to_ascii_uppercase(), timeframe))
            .cloned()
            .unwrap_or_default();
        ensure_ascending(&bars)?;
        Ok(bars)
    }
}

#[derive(Debug, Deserialize)]
struct CsvBarRow {
    #[serde(alias = "timestamp", alias = "date")]
    datetime: String,
    #[serde(alias = "open")]
    open_price: f64,
    #[serde(alias = "high")]
    high_price: f64,
    #[serde(alias = "low")]
    low_price: f64,
    #[serde(alias = "close")]
    close_price: f64,
    #[serde(default)]
    volume: f64,
}

pub fn load_bars_csv(file_path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let mut out = Vec::new();

    for row in reader.deserialize::<CsvBarRow>() {
        let row = row?;
        out.push(Bar {
            datetime: parse_datetime(&row.datetime)?,
            open_price: row.open_price,
            high_price: row.high_price,
            low_price: row.low_price,
            close_price: row.close_price,
            volume: row.volume,
        });
    }

    ensure_ascending(&out)?;
    Ok(out)
}

pub fn write_bars_csv(file_path: impl AsRef<Path>, bars: &[Bar]) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(file_path)?;
    writer.write_record(["datetime", "open", "high", "low", "close", "volume"])?;
    for bar in bars {
        writer.write_record([
            bar.datetime.to_rfc3339(),
            bar.open_price.to_string(),
            bar.high_price.to_string(),
            bar.low_price.to_string(),
            bar.close_price.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn ensure_ascending(bars: &[Bar]) -> Result<(), DataError> {
    for (index, pair) in bars.windows(2).enumerate() {
        if pair[1].datetime <= pair[0].datetime {
            return Err(DataError::NonAscending {
                index: index + 1,
                datetime: pair[1].datetime.to_rfc3339(),
            });
        }
    }
    Ok(())
}

pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, DataError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let patterns = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y%m%d%H%M%S%.f",
    ];

    for pattern in patterns {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
    }

    Err(DataError::InvalidDatetime(value.to_string()))
}
