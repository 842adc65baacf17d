use serde_json::Value;
use tracing::warn;

use crate::config::{ChartConfig, Orientation, StackMode};
use crate::extract::Extraction;
use crate::ir::{AxisKind, AxisSpec, DataZoomSpec, LegendSpec, SeriesKind, ToolboxSpec};
use crate::stacking::BASELINE_SERIES;

/// A user-supplied bound is either a number or a string parseable as one;
/// anything else resolves to "auto".
pub fn parse_bound(raw: Option<&Value>) -> Option<f64> {
    match raw {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(bound = %s, "unparseable axis bound treated as auto");
                None
            }
        },
        Some(other) => {
            warn!(bound = %other, "non-numeric axis bound treated as auto");
            None
        }
    }
}

/// Largest power of ten strictly below the smallest positive value, used as
/// the inferred lower bound of a logarithmic value axis.
fn log_lower_bound(min_positive: f64) -> f64 {
    let mut floor = 10f64.powf(min_positive.log10().floor());
    if floor >= min_positive {
        floor /= 10.0;
    }
    floor
}

/// Category and value axes, built independently of visual orientation.
/// "x" here always means the category axis; `apply_orientation` swaps the
/// finished specs when the chart is horizontal.
pub fn build_axes(extraction: &Extraction, config: &ChartConfig) -> (AxisSpec, AxisSpec) {
    // 1. Category axis. Bounds only apply when truncation was requested.
    let (x_min, x_max) = if config.truncate_x_axis {
        (
            parse_bound(config.x_axis_bounds.0.as_ref()),
            parse_bound(config.x_axis_bounds.1.as_ref()),
        )
    } else {
        (None, None)
    };
    let x_axis = AxisSpec {
        kind: AxisKind::Category {
            categories: extraction.categories.clone(),
        },
        title: config.x_axis_title.clone(),
        title_margin: config.x_axis_title_margin,
        min: x_min,
        max: x_max,
        log: false,
        percent: false,
    };

    // 2. Value axis bounds: explicit first, then mode defaults.
    let (mut y_min, mut y_max) = if config.truncate_y_axis {
        (
            parse_bound(config.y_axis_bounds.0.as_ref()),
            parse_bound(config.y_axis_bounds.1.as_ref()),
        )
    } else {
        (None, None)
    };
    if config.stack_mode == StackMode::Expand {
        y_min = y_min.or(Some(0.0));
        y_max = y_max.or(Some(1.0));
    }
    if config.log_axis && y_min.is_none() {
        y_min = extraction.min_positive_value.map(log_lower_bound);
    }

    let y_axis = AxisSpec {
        kind: AxisKind::Value,
        title: config.y_axis_title.clone(),
        title_margin: config.y_axis_title_margin,
        min: y_min,
        max: y_max,
        log: config.log_axis,
        percent: config.force_percent_formatter(),
    };

    (x_axis, y_axis)
}

/// Swap the finished axis specs wholesale for horizontal charts. Must run
/// after all bound resolution so the rest of the pipeline never branches
/// on orientation.
pub fn apply_orientation(
    x_axis: AxisSpec,
    y_axis: AxisSpec,
    orientation: Orientation,
) -> (AxisSpec, AxisSpec) {
    match orientation {
        Orientation::Vertical => (x_axis, y_axis),
        Orientation::Horizontal => (y_axis, x_axis),
    }
}

/// Legend entries: observation series labels (derived overlays, forecast
/// bands and the stream baseline excluded), deduplicated in first-seen
/// order, then enabled annotation layer names.
pub fn build_legend(extraction: &Extraction, config: &ChartConfig) -> LegendSpec {
    let mut entries: Vec<String> = Vec::new();
    for series in &extraction.series {
        if series.kind != SeriesKind::Observation
            || series.is_derived()
            || series.name == BASELINE_SERIES
        {
            continue;
        }
        if !entries.contains(&series.label) {
            entries.push(series.label.clone());
        }
    }
    for layer in &config.annotation_layers {
        if layer.show() {
            entries.push(layer.name().to_string());
        }
    }

    LegendSpec {
        show: config.show_legend,
        orientation: config.legend_orientation,
        entries,
    }
}

pub fn build_toolbox(config: &ChartConfig) -> ToolboxSpec {
    ToolboxSpec {
        zoom: config.zoomable,
    }
}

/// The zoom slider starts fully open; the host persists user adjustments.
pub fn build_data_zoom(config: &ChartConfig) -> Option<DataZoomSpec> {
    config.zoomable.then_some(DataZoomSpec {
        start: 0.0,
        end: 100.0,
    })
}
