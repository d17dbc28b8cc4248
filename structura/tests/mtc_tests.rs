use std::collections::HashMap;

use chrono::{Duration, TimeZone, Utc};

use structura::{
    calculate_multi_timeframe, calculate_structure, get_confluence, get_price_vs_levels, Bar,
    BreakKind, Confluence, Direction, MultiTimeframeAnalyzer, StructureResult, Timeframe,
};

fn zigzag_bars(swings: usize, impulse: f64, pullback: f64) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut bars = Vec::new();
    let mut close = 100.0_f64;
    let mut prev: Option<f64> = None;

    for _ in 0..swings {
        let steps = std::iter::repeat(impulse / 5.0)
            .take(5)
            .chain(std::iter::repeat(-pullback / 3.0).take(3));
        for step in steps {
            close += step;
            let open = prev.unwrap_or(close);
            let idx = bars.len();
            bars.push(Bar {
                datetime: base + Duration::hours(idx as i64),
                open_price: open,
                high_price: open.max(close) + 0.2,
                low_price: open.min(close) - 0.2,
                close_price: close,
                volume: 100.0,
            });
            prev = Some(close);
        }
    }
    bars
}

fn with_direction(direction: Direction) -> StructureResult {
    StructureResult {
        direction,
        ..StructureResult::default()
    }
}

fn results(entries: &[(Timeframe, Direction)]) -> HashMap<Timeframe, StructureResult> {
    entries
        .iter()
        .map(|(tf, d)| (*tf, with_direction(*d)))
        .collect()
}

#[test]
fn confluence_labels_follow_direction_agreement() {
    let all_bull = results(&[
        (Timeframe::D1, Direction::Bull),
        (Timeframe::H4, Direction::Bull),
        (Timeframe::H1, Direction::Bull),
    ]);
    assert_eq!(
        get_confluence(&all_bull, &[Timeframe::D1, Timeframe::H4, Timeframe::H1]),
        Confluence::Aligned
    );

    let split = results(&[(Timeframe::D1, Direction::Bull), (Timeframe::H4, Direction::Bear)]);
    assert_eq!(
        get_confluence(&split, &[Timeframe::D1, Timeframe::H4]),
        Confluence::Opposing
    );

    let flat = results(&[
        (Timeframe::D1, Direction::Neutral),
        (Timeframe::H4, Direction::Neutral),
    ]);
    assert_eq!(
        get_confluence(&flat, &[Timeframe::D1, Timeframe::H4]),
        Confluence::Neutral
    );

    assert_eq!(get_confluence(&all_bull, &[]), Confluence::Neutral);
}

#[test]
fn each_timeframe_is_computed_independently() {
    let mut bars = HashMap::new();
    bars.insert(Timeframe::D1, zigzag_bars(5, 4.0, 2.0));
    bars.insert(Timeframe::H4, zigzag_bars(5, -4.0, -2.0));
    bars.insert(Timeframe::H1, zigzag_bars(1, 4.0, 2.0));

    let out = calculate_multi_timeframe(&bars);
    assert_eq!(out.len(), 3);
    for (tf, series) in &bars {
        assert_eq!(out[tf], calculate_structure(series, 5), "timeframe {tf}");
    }

    assert_eq!(out[&Timeframe::D1].direction, Direction::Bull);
    assert_eq!(out[&Timeframe::H4].direction, Direction::Bear);
    assert_eq!(out[&Timeframe::H1].direction, Direction::Neutral);

    assert_eq!(
        get_confluence(&out, &[Timeframe::D1, Timeframe::H4, Timeframe::H1]),
        Confluence::Opposing
    );
    assert_eq!(
        get_confluence(&out, &[Timeframe::D1, Timeframe::H1]),
        Confluence::Aligned
    );
}

#[test]
fn analyzer_trace_matches_results() {
    let mut bars = HashMap::new();
    bars.insert(Timeframe::H4, zigzag_bars(5, 4.0, 2.0));
    bars.insert(Timeframe::M15, zigzag_bars(6, -4.0, -2.0));

    let analyzer = MultiTimeframeAnalyzer::new(5);
    let results = analyzer.calculate(&bars);
    let traces = analyzer.trace(&bars);

    for tf in [Timeframe::H4, Timeframe::M15] {
        assert_eq!(traces[&tf].result, results[&tf]);
        assert_eq!(results[&tf].last_break, Some(BreakKind::Bos));
    }
}

#[test]
fn zero_price_leaves_every_field_blank() {
    let result = calculate_structure(&zigzag_bars(5, 4.0, 2.0), 5);
    assert!(result.strong_level.is_some() && result.weak_level.is_some());

    let out = get_price_vs_levels(0.0, &result);
    assert_eq!(out.vs_strong_pct, None);
    assert_eq!(out.vs_strong_diff, None);
    assert_eq!(out.vs_strong_desc, "N/A");
    assert_eq!(out.vs_weak_pct, None);
    assert_eq!(out.vs_weak_diff, None);
    assert_eq!(out.vs_weak_desc, "N/A");
}

#[test]
fn price_between_levels_is_above_strong_and_below_weak() {
    let result = calculate_structure(&zigzag_bars(5, 4.0, 2.0), 5);
    let strong = result.strong_level.expect("strong");
    let weak = result.weak_level.expect("weak");
    let mid = (strong + weak) / 2.0;

    let out = get_price_vs_levels(mid, &result);
    assert!(out.vs_strong_pct.unwrap() > 0.0);
    assert!(out.vs_strong_desc.starts_with('+') && out.vs_strong_desc.ends_with("above"));
    assert!(out.vs_weak_pct.unwrap() < 0.0);
    assert!(out.vs_weak_desc.ends_with("below"));
    assert!(!out.vs_weak_desc.starts_with('-'));
}
