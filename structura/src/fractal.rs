//! 分型（swing point）检测。
//!
//! - 窗口为以 bar `i` 为中心的 `[i - p, i + p]`，`p = fractal_length / 2`；
//! - 输出按 bar index 的位图，不做按价格回查匹配；
//! - 每根 bar 只与自身窗口比较（含等号），相同价位的双顶/双底两根都会被标记。

use crate::bar::{Bar, FractalMarkers};
use crate::constant::Const;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FractalDetector {
    fractal_length: usize,
}

impl Default for FractalDetector {
    fn default() -> Self {
        Self::new(Const::DEFAULT_FRACTAL_LENGTH)
    }
}

impl FractalDetector {
    pub fn new(fractal_length: usize) -> Self {
        Self { fractal_length }
    }

    pub fn fractal_length(&self) -> usize {
        self.fractal_length
    }

    /// 分型两侧各自需要的 bar 数。
    pub fn half_window(&self) -> usize {
        self.fractal_length / 2
    }

    pub fn detect(&self, bars: &[Bar]) -> FractalMarkers {
        detect_fractals(bars, self.fractal_length)
    }
}

pub fn detect_fractals(bars: &[Bar], fractal_length: usize) -> FractalMarkers {
    let n = bars.len();
    let mut markers = FractalMarkers::empty(n);
    if n < fractal_length {
        return markers;
    }

    let p = fractal_length / 2;
    for i in p..n.saturating_sub(p) {
        markers.bearish[i] = holds_window_extreme(bars, i, p, |bar| bar.high_price, |a, b| a >= b);
        markers.bullish[i] = holds_window_extreme(bars, i, p, |bar| bar.low_price, |a, b| a <= b);
    }
    markers
}

/// `at_least(a, b)` 为 true 表示 `a` 不比 `b` 弱。NaN 比较恒为 false，不会成为分型。
fn holds_window_extreme<V, C>(bars: &[Bar], i: usize, p: usize, value: V, at_least: C) -> bool
where
    V: Fn(&Bar) -> f64,
    C: Fn(f64, f64) -> bool,
{
    let pivot = value(&bars[i]);
    bars[i - p..=i + p]
        .iter()
        .all(|bar| at_least(pivot, value(bar)))
}
