use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constant::FractalType;

/// 由 bar source 提供的一根 OHLCV bar，创建后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub datetime: DateTime<Utc>,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: f64,
}

/// 分型标记：`index` 指向原始 bar 序列中的位置。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fractal {
    pub index: usize,
    pub price: f64,
    pub fractal_type: FractalType,
}

/// 每根 bar 一个位置的分型位图。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FractalMarkers {
    pub bearish: Vec<bool>,
    pub bullish: Vec<bool>,
}

impl FractalMarkers {
    pub fn empty(len: usize) -> Self {
        Self {
            bearish: vec![false; len],
            bullish: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.bearish.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bearish.is_empty()
    }

    pub fn is_bearish(&self, index: usize) -> bool {
        self.bearish.get(index).copied().unwrap_or(false)
    }

    pub fn is_bullish(&self, index: usize) -> bool {
        self.bullish.get(index).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.bearish.iter().filter(|x| **x).count() + self.bullish.iter().filter(|x| **x).count()
    }

    /// 按 index 顺序列出所有分型；同一根 bar 上 High 先于 Low。
    pub fn fractals(&self, bars: &[Bar]) -> Vec<Fractal> {
        let mut out = Vec::new();
        for (index, bar) in bars.iter().enumerate() {
            if self.is_bearish(index) {
                out.push(Fractal {
                    index,
                    price: bar.high_price,
                    fractal_type: FractalType::High,
                });
            }
            if self.is_bullish(index) {
                out.push(Fractal {
                    index,
                    price: bar.low_price,
                    fractal_type: FractalType::Low,
                });
            }
        }
        out
    }
}
