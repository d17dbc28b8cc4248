//! 多标的结构分析引擎。
//!
//! 职责：
//! - 从 `BarSource` 读取各 (ticker, timeframe) 的 bar；
//! - 每个 (ticker, timeframe) 作为独立任务，经 crossbeam channel 分发给工作线程；
//! - 汇总为 `TickerAnalysis`：各周期结构、共振结论与现价相对结构位的距离。

use std::collections::{BTreeMap, HashMap};
use std::thread;

use crossbeam::channel;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::StructureConfig;
use crate::constant::{Confluence, DataError, Timeframe};
use crate::levels::{get_price_vs_levels, PriceVsLevels};
use crate::mtc::{get_confluence, MultiTimeframeAnalyzer};
use crate::receiver::BarSource;
use crate::structure::StructureResult;
use crate::trace::StructureTrace;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerAnalysis {
    pub ticker: String,
    pub current_price: Option<f64>,
    pub results: BTreeMap<Timeframe, StructureResult>,
    pub confluence: Confluence,
    pub price_vs_levels: BTreeMap<Timeframe, PriceVsLevels>,
}

impl TickerAnalysis {
    pub fn result(&self, timeframe: Timeframe) -> Option<&StructureResult> {
        self.results.get(&timeframe)
    }
}

#[derive(Debug, Clone, Copy)]
struct TimeframeOutput {
    result: StructureResult,
    last_close: Option<f64>,
}

pub struct StructureEngine<S: BarSource> {
    source: S,
    config: StructureConfig,
    analyzer: MultiTimeframeAnalyzer,
}

impl<S: BarSource> StructureEngine<S> {
    pub fn new(source: S, config: StructureConfig) -> Result<Self, DataError> {
        config.validate()?;
        let analyzer = MultiTimeframeAnalyzer::new(config.fractal_length);
        Ok(Self {
            source,
            config,
            analyzer,
        })
    }

    pub fn config(&self) -> &StructureConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// 现价取最小周期最后一根 bar 的收盘价。
    pub fn analyze(&self, ticker: &str) -> TickerAnalysis {
        let outputs = self.collect_sequential(ticker);
        self.assemble(ticker, outputs, None)
    }

    pub fn analyze_with_price(&self, ticker: &str, current_price: f64) -> TickerAnalysis {
        let outputs = self.collect_sequential(ticker);
        self.assemble(ticker, outputs, Some(current_price))
    }

    pub fn trace(&self, ticker: &str) -> BTreeMap<Timeframe, StructureTrace> {
        let mut out = BTreeMap::new();
        for &timeframe in &self.config.timeframes {
            match self.source.load_bars(ticker, timeframe) {
                Ok(bars) => {
                    out.insert(timeframe, self.analyzer.tracker().trace(&bars));
                }
                Err(e) => warn!(ticker, timeframe = %timeframe, error = %e, "skip timeframe"),
            }
        }
        out
    }

    /// 每个周期只加载一次，同时给出汇总结果与逐 bar 轨迹。
    pub fn analyze_traced(
        &self,
        ticker: &str,
    ) -> (TickerAnalysis, BTreeMap<Timeframe, StructureTrace>) {
        let mut outputs = HashMap::new();
        let mut traces = BTreeMap::new();
        for &timeframe in &self.config.timeframes {
            match self.source.load_bars(ticker, timeframe) {
                Ok(bars) => {
                    let trace = self.analyzer.tracker().trace(&bars);
                    outputs.insert(
                        timeframe,
                        TimeframeOutput {
                            result: trace.result,
                            last_close: bars.last().map(|x| x.close_price),
                        },
                    );
                    traces.insert(timeframe, trace);
                }
                Err(e) => warn!(ticker, timeframe = %timeframe, error = %e, "skip timeframe"),
            }
        }
        (self.assemble(ticker, outputs, None), traces)
    }

    /// 以 (ticker, timeframe) 为单位并行计算，返回顺序与 `tickers` 一致。
    pub fn analyze_universe<T>(&self, tickers: &[T]) -> Vec<TickerAnalysis>
    where
        T: AsRef<str> + Sync,
    {
        let task_count = tickers.len() * self.config.timeframes.len();
        if task_count == 0 {
            return tickers
                .iter()
                .map(|x| self.assemble(x.as_ref(), HashMap::new(), None))
                .collect();
        }

        let (task_tx, task_rx) = channel::unbounded::<(usize, Timeframe)>();
        let (result_tx, result_rx) = channel::unbounded::<(usize, Timeframe, Option<TimeframeOutput>)>();
        for slot in 0..tickers.len() {
            for &timeframe in &self.config.timeframes {
                // 接收端尚未释放，unbounded 发送不会失败
                let _ = task_tx.send((slot, timeframe));
            }
        }
        drop(task_tx);

        let workers = self.config.workers.clamp(1, task_count);
        thread::scope(|scope| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (slot, timeframe) in task_rx.iter() {
                        let output = self.run_task(tickers[slot].as_ref(), timeframe);
                        if result_tx.send((slot, timeframe, output)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut per_ticker: Vec<HashMap<Timeframe, TimeframeOutput>> =
            vec![HashMap::new(); tickers.len()];
        for (slot, timeframe, output) in result_rx.iter() {
            if let Some(output) = output {
                per_ticker[slot].insert(timeframe, output);
            }
        }

        info!(tickers = tickers.len(), tasks = task_count, workers, "universe scan done");
        tickers
            .iter()
            .zip(per_ticker)
            .map(|(ticker, outputs)| self.assemble(ticker.as_ref(), outputs, None))
            .collect()
    }

    fn collect_sequential(&self, ticker: &str) -> HashMap<Timeframe, TimeframeOutput> {
        self.config
            .timeframes
            .iter()
            .filter_map(|&tf| self.run_task(ticker, tf).map(|x| (tf, x)))
            .collect()
    }

    fn run_task(&self, ticker: &str, timeframe: Timeframe) -> Option<TimeframeOutput> {
        match self.source.load_bars(ticker, timeframe) {
            Ok(bars) => Some(TimeframeOutput {
                result: self.analyzer.tracker().calculate(&bars),
                last_close: bars.last().map(|x| x.close_price),
            }),
            Err(e) => {
                warn!(ticker, timeframe = %timeframe, error = %e, "skip timeframe");
                None
            }
        }
    }

    fn assemble(
        &self,
        ticker: &str,
        outputs: HashMap<Timeframe, TimeframeOutput>,
        price_override: Option<f64>,
    ) -> TickerAnalysis {
        let results: HashMap<Timeframe, StructureResult> =
            outputs.iter().map(|(tf, x)| (*tf, x.result)).collect();
        let confluence = get_confluence(&results, &self.config.confluence_timeframes);

        let ordered: BTreeMap<Timeframe, TimeframeOutput> = outputs.into_iter().collect();
        let current_price =
            price_override.or_else(|| ordered.values().find_map(|x| x.last_close));

        let price_vs_levels = ordered
            .iter()
            .map(|(tf, x)| {
                let levels = current_price
                    .map(|price| get_price_vs_levels(price, &x.result))
                    .unwrap_or_default();
                (*tf, levels)
            })
            .collect();

        TickerAnalysis {
            ticker: ticker.to_string(),
            current_price,
            results: ordered.into_iter().map(|(tf, x)| (tf, x.result)).collect(),
            confluence,
            price_vs_levels,
        }
    }
}
