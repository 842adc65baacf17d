use crate::config::{ChartConfig, StackMode};
use crate::extract::Extraction;
use crate::ir::{Series, SeriesKind};

/// Name of the synthetic series inserted at index 0 in stream mode. It is
/// never legended and never tooltipped.
pub const BASELINE_SERIES: &str = "__baseline__";

/// Apply the configured stack mode to the extracted series in place.
///
/// `None` and `Stack` leave values untouched (cumulative sums are the
/// rendering surface's job); `Expand` rewrites values as fractions of the
/// per-category total; `Stream` inserts the symmetric baseline.
pub fn apply_stack_mode(extraction: &mut Extraction, config: &ChartConfig) {
    match config.stack_mode {
        StackMode::None | StackMode::Stack => {}
        StackMode::Expand => apply_expand(extraction),
        StackMode::Stream => apply_stream(extraction),
    }
}

/// 100% stacking: every non-forecast value becomes its contribution
/// fraction, so per-category fractions sum to 1 when no nulls are present.
fn apply_expand(extraction: &mut Extraction) {
    let totals = extraction.total_stacked_values.clone();
    for series in &mut extraction.series {
        if series.kind.is_forecast() {
            continue;
        }
        for (idx, (_, y)) in series.data.iter_mut().enumerate() {
            if let Some(v) = y {
                let total = totals[idx];
                if total != 0.0 {
                    *v /= total;
                }
            }
        }
    }
}

/// Streamgraph: nulls are coerced to 0 first (an upstream charting-library
/// limitation this engine works around, inherited behavior), then a
/// symmetric baseline is computed and unshifted to the front so the stream
/// appears centered.
fn apply_stream(extraction: &mut Extraction) {
    for series in &mut extraction.series {
        for (_, y) in &mut series.data {
            if y.is_none() {
                *y = Some(0.0);
            }
        }
    }

    let len = extraction.categories.len();
    let mut sums = vec![0.0; len];
    for series in &extraction.series {
        if series.kind.is_forecast() {
            continue;
        }
        for (idx, (_, y)) in series.data.iter().enumerate() {
            sums[idx] += y.unwrap_or(0.0);
        }
    }

    let data = extraction
        .category_values
        .iter()
        .enumerate()
        .map(|(idx, x)| (x.clone(), Some(-sums[idx] / 2.0)))
        .collect();

    extraction.series.insert(
        0,
        Series {
            name: BASELINE_SERIES.to_string(),
            label: BASELINE_SERIES.to_string(),
            kind: SeriesKind::Observation,
            offset: None,
            data,
        },
    );
}

/// Decide, per (series, point), whether an on-chart value label renders.
/// Aligned with `extraction.series`; call after `apply_stack_mode`.
pub fn label_visibility(extraction: &Extraction, config: &ChartConfig) -> Vec<Vec<bool>> {
    let n_series = extraction.series.len();
    let n_cats = extraction.categories.len();

    if !config.show_value {
        return vec![vec![false; n_cats]; n_series];
    }

    if !config.is_stacked() {
        // Unstacked charts label every real data point.
        return extraction
            .series
            .iter()
            .map(|s| s.data.iter().map(|(_, y)| y.is_some()).collect())
            .collect();
    }

    // Stacked: find the largest absolute contributor per category among
    // the labelable series.
    let mut winner: Vec<Option<usize>> = vec![None; n_cats];
    if config.only_total {
        for (s_idx, series) in extraction.series.iter().enumerate() {
            if !labelable(series) {
                continue;
            }
            for (c_idx, (_, y)) in series.data.iter().enumerate() {
                if let Some(v) = y {
                    let beats = match winner[c_idx] {
                        Some(w) => {
                            let current = extraction.series[w].data[c_idx].1.unwrap_or(0.0);
                            v.abs() > current.abs()
                        }
                        None => true,
                    };
                    if beats {
                        winner[c_idx] = Some(s_idx);
                    }
                }
            }
        }
    }

    extraction
        .series
        .iter()
        .enumerate()
        .map(|(s_idx, series)| {
            series
                .data
                .iter()
                .enumerate()
                .map(|(c_idx, (_, y))| {
                    if !labelable(series) || y.is_none() {
                        return false;
                    }
                    if extraction.threshold_indices.contains(&c_idx) {
                        return false;
                    }
                    if config.only_total {
                        winner[c_idx] == Some(s_idx)
                    } else {
                        true
                    }
                })
                .collect()
        })
        .collect()
}

fn labelable(series: &Series) -> bool {
    !series.kind.is_forecast() && series.name != BASELINE_SERIES
}
