use serde::{Deserialize, Serialize};

use crate::structure::StructureResult;

const NOT_AVAILABLE: &str = "N/A";

/// 现价相对结构位的距离。`pct = (price - level) / price * 100`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceVsLevels {
    pub vs_strong_pct: Option<f64>,
    pub vs_strong_diff: Option<f64>,
    pub vs_strong_desc: String,
    pub vs_weak_pct: Option<f64>,
    pub vs_weak_diff: Option<f64>,
    pub vs_weak_desc: String,
}

impl Default for PriceVsLevels {
    fn default() -> Self {
        Self {
            vs_strong_pct: None,
            vs_strong_diff: None,
            vs_strong_desc: NOT_AVAILABLE.to_string(),
            vs_weak_pct: None,
            vs_weak_diff: None,
            vs_weak_desc: NOT_AVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LevelDistance {
    diff: f64,
    pct: f64,
}

impl LevelDistance {
    fn describe(&self) -> String {
        if self.pct >= 0.0 {
            format!("+{:.1}% above", self.pct)
        } else {
            format!("{:.1}% below", self.pct.abs())
        }
    }
}

fn distance(current_price: f64, level: Option<f64>) -> Option<LevelDistance> {
    let level = level?;
    if current_price <= 0.0 || current_price.is_nan() {
        return None;
    }
    let diff = current_price - level;
    Some(LevelDistance {
        diff,
        pct: diff / current_price * 100.0,
    })
}

pub fn get_price_vs_levels(current_price: f64, result: &StructureResult) -> PriceVsLevels {
    let strong = distance(current_price, result.strong_level);
    let weak = distance(current_price, result.weak_level);

    PriceVsLevels {
        vs_strong_pct: strong.map(|x| x.pct),
        vs_strong_diff: strong.map(|x| x.diff),
        vs_strong_desc: strong
            .map(|x| x.describe())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        vs_weak_pct: weak.map(|x| x.pct),
        vs_weak_diff: weak.map(|x| x.diff),
        vs_weak_desc: weak
            .map(|x| x.describe())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}
