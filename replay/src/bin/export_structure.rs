use std::fs;
use std::path::PathBuf;

use structura::{init_logging, CsvBarSource, StructureConfig, StructureEngine};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "usage: cargo run -p replay --bin export_structure -- <config.yaml> <out_dir> <ticker> [ticker...]"
        );
        std::process::exit(2);
    }

    init_logging();

    let config = StructureConfig::from_file(&args[1])?;
    let out_dir = PathBuf::from(&args[2]);
    let tickers: Vec<String> = args[3..].iter().map(|x| x.to_ascii_uppercase()).collect();
    fs::create_dir_all(&out_dir)?;

    let source = CsvBarSource::new(config.data_dir.clone());
    let engine = StructureEngine::new(source, config)?;

    for ticker in &tickers {
        let (analysis, traces) = engine.analyze_traced(ticker);
        let path = out_dir.join(format!("{}.json", analysis.ticker));
        let file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, &analysis)?;

        for (timeframe, trace) in traces {
            let name = format!("{}_{}_trace.parquet", analysis.ticker, timeframe.as_str());
            trace.write_parquet(out_dir.join(name))?;
        }

        info!(
            ticker = %analysis.ticker,
            confluence = %analysis.confluence,
            timeframes = analysis.results.len(),
            "exported {}",
            path.display()
        );
    }

    Ok(())
}
