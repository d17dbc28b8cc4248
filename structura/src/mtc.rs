//! 多周期结构汇总（MTC）。
//!
//! 该模块负责：
//! - 对每个 timeframe 独立运行 分型检测 + 结构扫描，互不共享状态；
//! - 将指定 timeframe 子集的方向归约为一个共振结论（`Confluence`）。

use std::collections::{HashMap, HashSet};

use crate::bar::Bar;
use crate::constant::{Confluence, Const, Direction, Timeframe};
use crate::structure::{StructureResult, StructureTracker};
use crate::trace::StructureTrace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiTimeframeAnalyzer {
    tracker: StructureTracker,
}

impl Default for MultiTimeframeAnalyzer {
    fn default() -> Self {
        Self::new(Const::DEFAULT_FRACTAL_LENGTH)
    }
}

impl MultiTimeframeAnalyzer {
    pub fn new(fractal_length: usize) -> Self {
        Self {
            tracker: StructureTracker::new(fractal_length),
        }
    }

    pub fn tracker(&self) -> &StructureTracker {
        &self.tracker
    }

    pub fn calculate(
        &self,
        timeframe_to_bars: &HashMap<Timeframe, Vec<Bar>>,
    ) -> HashMap<Timeframe, StructureResult> {
        timeframe_to_bars
            .iter()
            .map(|(tf, bars)| (*tf, self.tracker.calculate(bars)))
            .collect()
    }

    pub fn trace(
        &self,
        timeframe_to_bars: &HashMap<Timeframe, Vec<Bar>>,
    ) -> HashMap<Timeframe, StructureTrace> {
        timeframe_to_bars
            .iter()
            .map(|(tf, bars)| (*tf, self.tracker.trace(bars)))
            .collect()
    }
}

pub fn calculate_multi_timeframe(
    timeframe_to_bars: &HashMap<Timeframe, Vec<Bar>>,
) -> HashMap<Timeframe, StructureResult> {
    MultiTimeframeAnalyzer::default().calculate(timeframe_to_bars)
}

/// 未出现在 `results` 中的 timeframe 直接跳过，NEUTRAL 不参与投票。
pub fn get_confluence(
    results: &HashMap<Timeframe, StructureResult>,
    timeframes: &[Timeframe],
) -> Confluence {
    let directions: HashSet<Direction> = timeframes
        .iter()
        .filter_map(|tf| results.get(tf))
        .map(|x| x.direction)
        .filter(|x| !x.is_neutral())
        .collect();

    if directions.is_empty() {
        Confluence::Neutral
    } else if directions.len() == 1 {
        Confluence::Aligned
    } else if directions.contains(&Direction::Bull) && directions.contains(&Direction::Bear) {
        Confluence::Opposing
    } else {
        Confluence::Mixed
    }
}
