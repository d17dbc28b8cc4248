//! 结构扫描轨迹。
//!
//! 记录每根 bar 扫描后的状态与全部突破事件，可导出为 polars `DataFrame`
//! 或写为 parquet / json 快照，供回放与审计使用。

use std::fs::{create_dir_all, File};
use std::path::Path;

use chrono::{DateTime, Utc};
use polars::df;
use polars::prelude::{DataFrame, ParquetWriter};
use serde::{Deserialize, Serialize};

use crate::constant::{BreakKind, DataError, Direction};
use crate::structure::StructureResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureStep {
    pub index: usize,
    pub datetime: DateTime<Utc>,
    pub direction: Direction,
    pub active_resistance: Option<f64>,
    pub active_support: Option<f64>,
    pub strong_level: Option<f64>,
    pub weak_level: Option<f64>,
    /// 本根 bar 上最后一次突破（如有）。
    pub break_kind: Option<BreakKind>,
    pub break_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureBreak {
    pub index: usize,
    pub datetime: DateTime<Utc>,
    pub kind: BreakKind,
    /// 突破之后的方向。
    pub direction: Direction,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureTrace {
    pub result: StructureResult,
    pub steps: Vec<StructureStep>,
    pub breaks: Vec<StructureBreak>,
}

impl StructureTrace {
    pub fn last_n_steps(&self, n: usize) -> Vec<StructureStep> {
        let start = self.steps.len().saturating_sub(n);
        self.steps[start..].to_vec()
    }

    pub fn count_breaks(&self, kind: BreakKind) -> usize {
        self.breaks.iter().filter(|x| x.kind == kind).count()
    }

    pub fn dataframe(&self) -> Result<DataFrame, DataError> {
        let index: Vec<u64> = self.steps.iter().map(|x| x.index as u64).collect();
        let datetime: Vec<i64> = self
            .steps
            .iter()
            .map(|x| x.datetime.timestamp_millis())
            .collect();
        let direction: Vec<i32> = self
            .steps
            .iter()
            .map(|x| match x.direction {
                Direction::Bull => 1,
                Direction::Bear => -1,
                Direction::Neutral => 0,
            })
            .collect();
        let active_resistance: Vec<Option<f64>> =
            self.steps.iter().map(|x| x.active_resistance).collect();
        let active_support: Vec<Option<f64>> =
            self.steps.iter().map(|x| x.active_support).collect();
        let strong_level: Vec<Option<f64>> = self.steps.iter().map(|x| x.strong_level).collect();
        let weak_level: Vec<Option<f64>> = self.steps.iter().map(|x| x.weak_level).collect();
        let break_kind: Vec<Option<&str>> = self
            .steps
            .iter()
            .map(|x| x.break_kind.map(BreakKind::as_str))
            .collect();
        let break_price: Vec<Option<f64>> = self.steps.iter().map(|x| x.break_price).collect();

        let frame = df!(
            "index" => index,
            "datetime" => datetime,
            "direction" => direction,
            "active_resistance" => active_resistance,
            "active_support" => active_support,
            "strong_level" => strong_level,
            "weak_level" => weak_level,
            "break_kind" => break_kind,
            "break_price" => break_price
        )?;
        Ok(frame)
    }

    pub fn write_parquet(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }

        let mut file = File::create(path)?;
        let mut frame = self.dataframe()?;
        ParquetWriter::new(&mut file).finish(&mut frame)?;
        Ok(())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
