use std::collections::HashMap;

use anyhow::Result;
use indexmap::IndexMap;
use tracing::debug;

use crate::annotation;
use crate::axes;
use crate::config::{AnnotationDataset, ChartConfig, LineDash};
use crate::data::Row;
use crate::extract;
use crate::forecast;
use crate::ir::{
    HostBinding, LineStyleSpec, RenderSpec, Series, SeriesData, SeriesKind, SeriesSpec,
};
use crate::normalize;
use crate::palette::ColorPalette;
use crate::stacking::{self, BASELINE_SERIES};
use crate::tooltip::TooltipFormatter;

/// Stack group shared by all stackable primary series.
const PRIMARY_STACK: &str = "primary";

const DERIVED_OPACITY: f64 = 0.8;
const FORECAST_BAND_OPACITY: f64 = 0.2;

/// Run the full pipeline: one immutable `(rows, config)` pair in, one
/// fully resolved `RenderSpec` out. Pure apart from diagnostics; repeated
/// invocations with identical inputs produce identical output.
pub fn build_render_spec(
    rows: Vec<Row>,
    datasets: &HashMap<String, AnnotationDataset>,
    config: &ChartConfig,
) -> Result<RenderSpec> {
    // 1. Canonical row order, then series extraction with its aggregates.
    let rows = normalize::normalize_rows(rows, &config.x_axis_column, config.x_axis_time_format.as_deref());
    let mut extraction = extract::extract_series(&rows, config)?;
    debug!(
        series = extraction.series.len(),
        categories = extraction.categories.len(),
        "extraction complete"
    );

    // 2. Offset -> line width fold, before stacking inserts synthetics.
    let offset_widths = forecast::offset_line_widths(&extraction.series);

    // 3. Stacking rewrites values in place; label visibility depends on
    //    the post-stacking shape.
    stacking::apply_stack_mode(&mut extraction, config);
    let labels = stacking::label_visibility(&extraction, config);

    // 4. Colors keyed by display label so a forecast band always shares
    //    its parent observation's color.
    let palette = ColorPalette::by_name(&config.color_scheme);
    let color_keys: Vec<String> = extraction
        .series
        .iter()
        .filter(|s| s.name != BASELINE_SERIES)
        .map(|s| s.label.clone())
        .fold(Vec::new(), |mut keys, label| {
            if !keys.contains(&label) {
                keys.push(label);
            }
            keys
        });
    let colors = palette.assign_colors(&color_keys);

    let mut series: Vec<SeriesSpec> = extraction
        .series
        .iter()
        .zip(labels)
        .map(|(s, show_label)| style_series(s, show_label, &colors, &offset_widths, config))
        .collect();

    // 5. Annotation overlays go after the primary series, in layer order.
    let overlays = annotation::build_annotation_series(
        config,
        datasets,
        &extraction,
        &palette,
        color_keys.len(),
    )?;
    series.extend(overlays);

    // 6. Tooltip state is captured from the post-stacking extraction so
    //    percent-mode values are already fractions.
    let tooltip = TooltipFormatter::build(&extraction, config)?;

    // 7. Axes and legend, orientation applied last.
    let (x_axis, y_axis) = axes::build_axes(&extraction, config);
    let (x_axis, y_axis) = axes::apply_orientation(x_axis, y_axis, config.orientation);
    let legend = axes::build_legend(&extraction, config);

    let selected_values = selected_indices(&series, config);

    Ok(RenderSpec {
        x_axis,
        y_axis,
        legend,
        series,
        tooltip,
        toolbox: axes::build_toolbox(config),
        data_zoom: axes::build_data_zoom(config),
        groupby: config.group_by.clone(),
        label_map: extraction.label_map.clone(),
        selected_values,
        bindings: vec![
            HostBinding::SetDataMask,
            HostBinding::OnContextMenu,
            HostBinding::OnLegendStateChanged,
            HostBinding::OnFocusedSeries,
        ],
    })
}

/// Resolve one extracted series into its final visual form.
fn style_series(
    s: &Series,
    show_label: Vec<bool>,
    colors: &IndexMap<String, String>,
    offset_widths: &IndexMap<String, f64>,
    config: &ChartConfig,
) -> SeriesSpec {
    let is_baseline = s.name == BASELINE_SERIES;

    let color = if is_baseline {
        "transparent".to_string()
    } else {
        colors
            .get(&s.label)
            .cloned()
            .unwrap_or_else(|| colors.first().map(|(_, c)| c.clone()).unwrap_or_default())
    };

    let line_style = match s.kind {
        SeriesKind::ForecastLower | SeriesKind::ForecastUpper => LineStyleSpec {
            width: 0.0,
            dash: LineDash::Solid,
            opacity: FORECAST_BAND_OPACITY,
        },
        SeriesKind::ForecastTrend => LineStyleSpec {
            width: 1.0,
            dash: LineDash::Dashed,
            opacity: 1.0,
        },
        SeriesKind::Observation => match &s.offset {
            Some(offset) => LineStyleSpec {
                width: offset_widths.get(offset).copied().unwrap_or(1.0),
                dash: LineDash::Dashed,
                opacity: DERIVED_OPACITY,
            },
            None => LineStyleSpec {
                width: 1.0,
                dash: LineDash::Solid,
                opacity: if is_baseline { 0.0 } else { 1.0 },
            },
        },
    };

    // Forecast series never join the primary stack group; the bound pair
    // gets its own per-label group so the surface can fill between them.
    let stack = match s.kind {
        SeriesKind::ForecastLower | SeriesKind::ForecastUpper => {
            Some(format!("{}__band", s.label))
        }
        SeriesKind::ForecastTrend => None,
        SeriesKind::Observation => config.is_stacked().then(|| PRIMARY_STACK.to_string()),
    };
    let area = match s.kind {
        SeriesKind::ForecastUpper => true,
        SeriesKind::Observation => config.is_stacked(),
        _ => false,
    };

    SeriesSpec {
        id: s.name.clone(),
        name: s.label.clone(),
        kind: s.kind,
        time_offset: s.offset.clone(),
        data: SeriesData::Points(s.data.clone()),
        color,
        line_style,
        area,
        stack,
        marker_size: if config.show_markers {
            config.marker_size
        } else {
            0.0
        },
        show_label,
    }
}

/// Which series indices the host currently has filter-selected, matched by
/// display label or composite id.
fn selected_indices(series: &[SeriesSpec], config: &ChartConfig) -> Vec<usize> {
    if config.selected_values.is_empty() {
        return Vec::new();
    }
    series
        .iter()
        .enumerate()
        .filter(|(_, s)| {
            config
                .selected_values
                .iter()
                .any(|sel| sel == &s.name || sel == &s.id)
        })
        .map(|(idx, _)| idx)
        .collect()
}
