use std::path::PathBuf;

use structura::{
    calculate_structure, detect_fractals, load_bars_csv, Bar, BreakKind, Const, Direction,
    FractalMarkers, StructureTracker, StructureTrace,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: cargo run -q -p replay --bin audit_structure -- <csv_path> [fractal_length]");
        std::process::exit(2);
    }

    let csv_path = PathBuf::from(&args[1]);
    let fractal_length = if args.len() >= 3 {
        args[2].parse::<usize>()?
    } else {
        Const::DEFAULT_FRACTAL_LENGTH
    };
    if fractal_length < Const::MIN_FRACTAL_LENGTH {
        return Err(format!("fractal_length must be >= {}", Const::MIN_FRACTAL_LENGTH).into());
    }

    let bars = load_bars_csv(&csv_path)?;
    let markers = detect_fractals(&bars, fractal_length);
    let trace = StructureTracker::new(fractal_length).trace(&bars);

    let mut violations = Vec::<String>::new();
    audit_fractals(&bars, &markers, fractal_length, &mut violations);
    audit_levels(&trace, &mut violations);
    audit_labels(&trace, &mut violations);

    if trace.result != calculate_structure(&bars, fractal_length) {
        violations.push("RESULT mismatch between trace and calculate".to_string());
    }

    println!(
        "AUDIT summary: bars={} fractal_length={} bearish={} bullish={} bos={} choch={} direction={}",
        bars.len(),
        fractal_length,
        markers.bearish.iter().filter(|x| **x).count(),
        markers.bullish.iter().filter(|x| **x).count(),
        trace.count_breaks(BreakKind::Bos),
        trace.count_breaks(BreakKind::Choch),
        trace.result.direction,
    );

    if violations.is_empty() {
        println!("AUDIT result: PASS (no semantic violations found)");
        return Ok(());
    }

    println!("AUDIT result: FAIL violations={}", violations.len());
    for item in violations.iter().take(30) {
        println!("- {item}");
    }
    if violations.len() > 30 {
        println!("- ... {} more", violations.len() - 30);
    }
    std::process::exit(1);
}

fn audit_fractals(bars: &[Bar], markers: &FractalMarkers, fractal_length: usize, out: &mut Vec<String>) {
    let p = fractal_length / 2;
    let n = bars.len();

    for i in 0..n {
        let marked_high = markers.is_bearish(i);
        let marked_low = markers.is_bullish(i);
        if i < p || i + p >= n || n < fractal_length {
            if marked_high || marked_low {
                out.push(format!("FRACTAL on boundary bar {i}"));
            }
            continue;
        }

        let window = &bars[i - p..=i + p];
        let max_high = window.iter().map(|x| x.high_price).fold(f64::MIN, f64::max);
        let min_low = window.iter().map(|x| x.low_price).fold(f64::MAX, f64::min);
        let holds_high = bars[i].high_price == max_high && window.iter().all(|x| !x.high_price.is_nan());
        let holds_low = bars[i].low_price == min_low && window.iter().all(|x| !x.low_price.is_nan());

        if marked_high != holds_high {
            out.push(format!(
                "FRACTAL high mismatch at {i}: marked={marked_high} window_max={max_high}"
            ));
        }
        if marked_low != holds_low {
            out.push(format!(
                "FRACTAL low mismatch at {i}: marked={marked_low} window_min={min_low}"
            ));
        }
    }
}

fn audit_levels(trace: &StructureTrace, out: &mut Vec<String>) {
    for step in &trace.steps {
        let expected = match step.direction {
            Direction::Bull => step.active_support,
            Direction::Bear => step.active_resistance,
            Direction::Neutral => None,
        };
        if step.strong_level != expected {
            out.push(format!(
                "STRONG level on wrong side at bar {}: dir={} strong={:?}",
                step.index, step.direction, step.strong_level
            ));
        }
    }

    for pair in trace.steps.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if curr.break_kind.is_some() || prev.direction != curr.direction {
            continue;
        }
        let regressed = match curr.direction {
            Direction::Bull => curr.weak_level < prev.weak_level,
            Direction::Bear => curr.weak_level > prev.weak_level,
            Direction::Neutral => false,
        };
        if regressed {
            out.push(format!(
                "WEAK level regressed at bar {}: {:?} -> {:?}",
                curr.index, prev.weak_level, curr.weak_level
            ));
        }
    }
}

fn audit_labels(trace: &StructureTrace, out: &mut Vec<String>) {
    let mut prior = Direction::Neutral;
    for event in &trace.breaks {
        let expected = if !prior.is_neutral() && prior == event.direction.opposite() {
            BreakKind::Choch
        } else {
            BreakKind::Bos
        };
        if event.kind != expected {
            out.push(format!(
                "BREAK label mismatch at bar {}: got {}, expected {}",
                event.index, event.kind, expected
            ));
        }
        prior = event.direction;
    }
}
