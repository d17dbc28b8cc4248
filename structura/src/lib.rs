pub mod bar;
pub mod config;
pub mod constant;
pub mod engine;
pub mod fractal;
pub mod levels;
pub mod logging;
pub mod mtc;
pub mod receiver;
pub mod structure;
pub mod trace;

pub use bar::{Bar, Fractal, FractalMarkers};
pub use config::{StructureConfig, StructureConfigPatch};
pub use constant::{BreakKind, Confluence, Const, DataError, Direction, FractalType, Timeframe};
pub use engine::{StructureEngine, TickerAnalysis};
pub use fractal::{detect_fractals, FractalDetector};
pub use levels::{get_price_vs_levels, PriceVsLevels};
pub use logging::{init_logging, init_logging_with_level};
pub use mtc::{calculate_multi_timeframe, get_confluence, MultiTimeframeAnalyzer};
pub use receiver::{
    ensure_ascending, load_bars_csv, parse_datetime, write_bars_csv, BarSource, CsvBarSource,
    MemoryBarSource,
};
pub use structure::{calculate_structure, StructureResult, StructureState, StructureTracker};
pub use trace::{StructureBreak, StructureStep, StructureTrace};
