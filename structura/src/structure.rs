//! 结构状态机。
//!
//! 单次从左到右扫描 bar 序列，消费分型位图，维护方向、当前阻力/支撑、
//! 延续极值与最近一次突破分类（BOS / ChoCH），最终映射为 `StructureResult`。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bar::{Bar, FractalMarkers};
use crate::constant::{BreakKind, Const, Direction};
use crate::fractal::detect_fractals;
use crate::trace::{StructureBreak, StructureStep, StructureTrace};

/// 单个周期的结构输出。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StructureResult {
    pub direction: Direction,
    /// 失效位：多头下方的支撑 / 空头上方的阻力。
    pub strong_level: Option<f64>,
    /// 当前趋势运行中到达的最远极值。
    pub weak_level: Option<f64>,
    pub last_break: Option<BreakKind>,
    pub last_break_price: Option<f64>,
}

impl StructureResult {
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn is_bull(&self) -> bool {
        self.direction == Direction::Bull
    }

    pub fn is_bear(&self) -> bool {
        self.direction == Direction::Bear
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StructureState {
    pub direction: Direction,
    pub active_resistance: Option<f64>,
    pub active_support: Option<f64>,
    pub resistance_crossed: bool,
    pub support_crossed: bool,
    pub continuation_extreme: Option<f64>,
    pub last_break: Option<BreakKind>,
    pub last_break_price: Option<f64>,
}

/// 单根 bar 上触发的突破，按发生顺序：先阻力后支撑。
pub type BarBreaks = Vec<(BreakKind, Direction, f64)>;

impl StructureState {
    /// 推进一根 bar。步骤顺序固定：先更新分型，再检查突破，最后延伸极值。
    pub fn advance(&mut self, index: usize, bar: &Bar, markers: &FractalMarkers) -> BarBreaks {
        let mut breaks = BarBreaks::new();

        if markers.is_bearish(index) {
            self.active_resistance = Some(bar.high_price);
            self.resistance_crossed = false;
        }
        if markers.is_bullish(index) {
            self.active_support = Some(bar.low_price);
            self.support_crossed = false;
        }

        if let Some(resistance) = self.active_resistance {
            if !self.resistance_crossed && bar.close_price > resistance {
                let kind = self.classify(Direction::Bull);
                self.register_break(kind, resistance, Direction::Bull, bar.high_price);
                self.resistance_crossed = true;
                breaks.push((kind, Direction::Bull, resistance));
            }
        }

        if let Some(support) = self.active_support {
            if !self.support_crossed && bar.close_price < support {
                let kind = self.classify(Direction::Bear);
                self.register_break(kind, support, Direction::Bear, bar.low_price);
                self.support_crossed = true;
                breaks.push((kind, Direction::Bear, support));
            }
        }

        match self.direction {
            Direction::Bull => {
                self.continuation_extreme = Some(
                    self.continuation_extreme
                        .map_or(bar.high_price, |x| x.max(bar.high_price)),
                );
            }
            Direction::Bear => {
                self.continuation_extreme = Some(
                    self.continuation_extreme
                        .map_or(bar.low_price, |x| x.min(bar.low_price)),
                );
            }
            Direction::Neutral => {}
        }

        breaks
    }

    fn classify(&self, new_direction: Direction) -> BreakKind {
        if self.direction == new_direction.opposite() {
            BreakKind::Choch
        } else {
            BreakKind::Bos
        }
    }

    fn register_break(&mut self, kind: BreakKind, price: f64, direction: Direction, extreme: f64) {
        self.last_break = Some(kind);
        self.last_break_price = Some(price);
        self.direction = direction;
        self.continuation_extreme = Some(extreme);
    }

    pub fn strong_level(&self) -> Option<f64> {
        match self.direction {
            Direction::Bull => self.active_support,
            Direction::Bear => self.active_resistance,
            Direction::Neutral => None,
        }
    }

    pub fn weak_level(&self) -> Option<f64> {
        match self.direction {
            Direction::Bull | Direction::Bear => self.continuation_extreme,
            Direction::Neutral => None,
        }
    }

    pub fn to_result(&self) -> StructureResult {
        StructureResult {
            direction: self.direction,
            strong_level: self.strong_level(),
            weak_level: self.weak_level(),
            last_break: self.last_break,
            last_break_price: self.last_break_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureTracker {
    fractal_length: usize,
}

impl Default for StructureTracker {
    fn default() -> Self {
        Self::new(Const::DEFAULT_FRACTAL_LENGTH)
    }
}

impl StructureTracker {
    pub fn new(fractal_length: usize) -> Self {
        Self { fractal_length }
    }

    pub fn fractal_length(&self) -> usize {
        self.fractal_length
    }

    /// 扫描所需的最少 bar 数。
    pub fn min_bars(&self) -> usize {
        self.fractal_length + Const::WARMUP_BARS
    }

    pub fn has_enough_bars(&self, bars: &[Bar]) -> bool {
        bars.len() >= self.min_bars()
    }

    pub fn calculate(&self, bars: &[Bar]) -> StructureResult {
        if !self.has_enough_bars(bars) {
            return StructureResult::neutral();
        }

        let markers = detect_fractals(bars, self.fractal_length);
        self.calculate_with_markers(bars, &markers)
    }

    /// 使用外部给定的分型位图扫描；位图长度不足的部分视为无分型。
    pub fn calculate_with_markers(&self, bars: &[Bar], markers: &FractalMarkers) -> StructureResult {
        if !self.has_enough_bars(bars) {
            return StructureResult::neutral();
        }

        let mut state = StructureState::default();
        for (index, bar) in bars.iter().enumerate() {
            state.advance(index, bar, markers);
        }

        let result = state.to_result();
        debug!(
            bars = bars.len(),
            fractals = markers.count(),
            direction = %result.direction,
            "structure scan done"
        );
        result
    }

    /// 与 `calculate` 同一扫描，额外保留逐 bar 状态与全部突破记录。
    pub fn trace(&self, bars: &[Bar]) -> StructureTrace {
        if !self.has_enough_bars(bars) {
            return StructureTrace::default();
        }

        let markers = detect_fractals(bars, self.fractal_length);
        let mut state = StructureState::default();
        let mut steps = Vec::with_capacity(bars.len());
        let mut breaks = Vec::new();

        for (index, bar) in bars.iter().enumerate() {
            let bar_breaks = state.advance(index, bar, &markers);
            let last_on_bar = bar_breaks.last().copied();
            for (kind, direction, price) in bar_breaks {
                breaks.push(StructureBreak {
                    index,
                    datetime: bar.datetime,
                    kind,
                    direction,
                    price,
                });
            }

            steps.push(StructureStep {
                index,
                datetime: bar.datetime,
                direction: state.direction,
                active_resistance: state.active_resistance,
                active_support: state.active_support,
                strong_level: state.strong_level(),
                weak_level: state.weak_level(),
                break_kind: last_on_bar.map(|(kind, _, _)| kind),
                break_price: last_on_bar.map(|(_, _, price)| price),
            });
        }

        StructureTrace {
            result: state.to_result(),
            steps,
            breaks,
        }
    }
}

pub fn calculate_structure(bars: &[Bar], fractal_length: usize) -> StructureResult {
    StructureTracker::new(fractal_length).calculate(bars)
}
