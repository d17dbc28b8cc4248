use chrono::{Duration, TimeZone, Utc};

use structura::{
    calculate_structure, detect_fractals, Bar, BreakKind, Direction, StructureTracker,
};

/// 每个 swing：5 根推动 + 3 根回调。
fn zigzag_bars(legs: &[(usize, f64, f64)]) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut bars = Vec::new();
    let mut close = 100.0_f64;
    let mut prev: Option<f64> = None;

    for &(swings, impulse, pullback) in legs {
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
    }
    bars
}

fn bars_from_hl(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    (0..highs.len())
        .map(|i| Bar {
            datetime: base + Duration::days(i as i64),
            open_price: closes[i],
            high_price: highs[i],
            low_price: lows[i],
            close_price: closes[i],
            volume: 10.0,
        })
        .collect()
}

#[test]
fn insufficient_bars_return_neutral_for_any_window() {
    let bars = zigzag_bars(&[(5, 4.0, 2.0)]);
    for fractal_length in [2, 3, 5, 8, 13] {
        let window = &bars[..fractal_length + 4];
        let result = calculate_structure(window, fractal_length);

        assert_eq!(result.direction, Direction::Neutral, "len={fractal_length}");
        assert!(result.strong_level.is_none());
        assert!(result.weak_level.is_none());
        assert!(result.last_break.is_none());
        assert!(result.last_break_price.is_none());
    }
}

#[test]
fn break_above_confirmed_high_turns_bullish() {
    let mut highs = vec![108.0, 107.0, 106.0, 105.0, 104.0, 103.0];
    highs.extend([104.0, 105.0, 106.0, 107.0, 108.0, 109.0, 110.0]);
    highs.extend([109.5, 109.0, 108.5, 108.0, 107.5, 107.0, 106.5]);
    highs.extend((0..10).map(|k| 113.0 + 0.5 * k as f64));

    let mut lows = vec![105.0, 104.0, 103.0, 102.0, 101.0, 100.0];
    lows.extend([100.5, 101.0, 101.5, 102.0, 102.5, 103.0, 103.5]);
    lows.extend([104.0, 104.5, 105.0, 105.5, 105.8, 106.0, 106.2]);
    lows.extend((0..10).map(|k| 106.4 + 0.2 * k as f64));

    let closes = highs
        .iter()
        .zip(&lows)
        .enumerate()
        .map(|(i, (h, l))| if i == 20 { 112.0 } else { (h + l) / 2.0 })
        .collect::<Vec<_>>();
    let bars = bars_from_hl(&highs, &lows, &closes);
    assert_eq!(bars.len(), 30);

    let markers = detect_fractals(&bars, 5);
    assert!(markers.is_bullish(5), "bar 5 should be the swing low");
    assert!(markers.is_bearish(12), "bar 12 should be the swing high");

    let result = calculate_structure(&bars, 5);
    assert_eq!(result.direction, Direction::Bull);
    assert_eq!(result.last_break, Some(BreakKind::Bos));
    assert_eq!(result.last_break_price, Some(110.0));
    assert_eq!(result.strong_level, Some(100.0));
    assert!(result.weak_level.unwrap() >= 112.0);
}

#[test]
fn tied_high_behind_a_taller_bar_still_forms_resistance() {
    let highs: [f64; 12] = [16.0, 13.0, 15.0, 14.0, 15.0, 14.0, 13.0, 13.0, 13.0, 13.0, 16.0, 16.2];
    let lows = (0..highs.len()).map(|i| 10.0 + 0.1 * i as f64).collect::<Vec<_>>();
    let closes = highs
        .iter()
        .enumerate()
        .map(|(i, h)| if i == 10 { 15.5 } else { h.min(14.5) - 0.3 })
        .collect::<Vec<_>>();
    let bars = bars_from_hl(&highs, &lows, &closes);

    let markers = detect_fractals(&bars, 5);
    assert!(!markers.is_bearish(2), "bar 2 sees the taller bar 0");
    assert!(markers.is_bearish(4), "bar 4 holds the max of its own window");

    let result = calculate_structure(&bars, 5);
    assert_eq!(result.direction, Direction::Bull);
    assert_eq!(result.last_break, Some(BreakKind::Bos));
    assert_eq!(result.last_break_price, Some(15.0));
    assert_eq!(result.weak_level, Some(16.2));
}

#[test]
fn rising_series_without_retest_never_turns_bearish() {
    let bars = zigzag_bars(&[(10, 4.0, 1.5)]);
    let trace = StructureTracker::new(5).trace(&bars);

    assert!(trace.steps.iter().all(|x| x.direction != Direction::Bear));
    assert_eq!(trace.result.direction, Direction::Bull);
    assert!(trace.breaks.iter().all(|x| x.kind == BreakKind::Bos));
}

#[test]
fn weak_level_is_monotonic_between_breaks() {
    let bars = zigzag_bars(&[(5, 4.0, 2.0), (5, -4.0, -2.0), (5, 4.0, 2.0)]);
    let trace = StructureTracker::new(5).trace(&bars);
    assert!(trace.breaks.len() > 4, "fixture should break structure repeatedly");

    for pair in trace.steps.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if curr.break_kind.is_some() || prev.direction != curr.direction {
            continue;
        }
        match curr.direction {
            Direction::Bull => assert!(
                curr.weak_level >= prev.weak_level,
                "weak level fell while bullish at bar {}",
                curr.index
            ),
            Direction::Bear => assert!(
                curr.weak_level <= prev.weak_level,
                "weak level rose while bearish at bar {}",
                curr.index
            ),
            Direction::Neutral => {
                assert!(curr.weak_level.is_none() && curr.strong_level.is_none());
            }
        }
    }
}

#[test]
fn strong_level_sits_on_the_opposite_side_of_the_trend() {
    let bars = zigzag_bars(&[(5, 4.0, 2.0), (5, -4.0, -2.0), (5, 4.0, 2.0)]);
    let trace = StructureTracker::new(5).trace(&bars);

    for step in &trace.steps {
        match step.direction {
            Direction::Bull => assert_eq!(step.strong_level, step.active_support),
            Direction::Bear => assert_eq!(step.strong_level, step.active_resistance),
            Direction::Neutral => assert_eq!(step.strong_level, None),
        }
    }
}

#[test]
fn choch_marks_exactly_the_reversals() {
    let bars = zigzag_bars(&[(5, 4.0, 2.0), (5, -4.0, -2.0), (5, 4.0, 2.0)]);
    let trace = StructureTracker::new(5).trace(&bars);

    let mut prior = Direction::Neutral;
    for event in &trace.breaks {
        let reversal = prior == event.direction.opposite() && prior != Direction::Neutral;
        let expected = if reversal { BreakKind::Choch } else { BreakKind::Bos };
        assert_eq!(event.kind, expected, "break at bar {}", event.index);
        prior = event.direction;
    }

    assert!(trace.count_breaks(BreakKind::Choch) >= 2);
    assert!(trace.count_breaks(BreakKind::Bos) >= 2);
    assert_eq!(trace.breaks.first().map(|x| x.kind), Some(BreakKind::Bos));
}

#[test]
fn trace_and_calculate_agree() {
    let tracker = StructureTracker::new(5);
    for legs in [
        vec![(5, 4.0, 2.0)],
        vec![(5, -4.0, -2.0)],
        vec![(5, 4.0, 2.0), (5, -4.0, -2.0), (5, 4.0, 2.0)],
    ] {
        let bars = zigzag_bars(&legs);
        let trace = tracker.trace(&bars);
        assert_eq!(trace.result, tracker.calculate(&bars));
        assert_eq!(trace.steps.len(), bars.len());

        let last = trace.steps.last().expect("steps");
        assert_eq!(last.direction, trace.result.direction);
        assert_eq!(last.strong_level, trace.result.strong_level);
        assert_eq!(last.weak_level, trace.result.weak_level);

        let markers = detect_fractals(&bars, 5);
        assert_eq!(tracker.calculate_with_markers(&bars, &markers), trace.result);
    }
}

#[test]
fn mirrored_legs_produce_mirrored_direction() {
    let up = calculate_structure(&zigzag_bars(&[(5, 4.0, 2.0)]), 5);
    let down = calculate_structure(&zigzag_bars(&[(5, -4.0, -2.0)]), 5);

    assert_eq!(up.direction, Direction::Bull);
    assert_eq!(down.direction, Direction::Bear);
    assert!(up.weak_level > up.strong_level);
    assert!(down.weak_level < down.strong_level);
}
