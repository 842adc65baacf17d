use std::collections::HashMap;

use anyhow::Result;
use tracing::warn;

use crate::config::{
    AnnotationDataset, AnnotationLayer, AnnotationStyle, ChartConfig, EventLayer, FormulaLayer,
    IntervalLayer, TimeseriesLayer,
};
use crate::data::Datum;
use crate::extract::Extraction;
use crate::ir::{BandSpec, LineStyleSpec, MarkerSpec, SeriesData, SeriesKind, SeriesSpec};
use crate::palette::ColorPalette;
use crate::parser::formula;

/// Convert enabled annotation layers into overlay series, appended after
/// the primary series in layer declaration order. Primary series are never
/// mutated; a disabled layer contributes nothing.
pub fn build_annotation_series(
    config: &ChartConfig,
    datasets: &HashMap<String, AnnotationDataset>,
    extraction: &Extraction,
    palette: &ColorPalette,
    color_offset: usize,
) -> Result<Vec<SeriesSpec>> {
    let mut overlays = Vec::new();

    for (layer_idx, layer) in config.annotation_layers.iter().enumerate() {
        if !layer.show() {
            continue;
        }
        let fallback_color = palette.color_at(color_offset + layer_idx).to_string();

        match layer {
            AnnotationLayer::Formula(formula_layer) => {
                overlays.push(formula_series(formula_layer, extraction, &fallback_color)?);
            }
            AnnotationLayer::Interval(interval_layer) => {
                if let Some(dataset) = lookup(datasets, &interval_layer.source, &interval_layer.name)
                {
                    overlays.extend(interval_series(interval_layer, dataset, &fallback_color));
                }
            }
            AnnotationLayer::Event(event_layer) => {
                if let Some(dataset) = lookup(datasets, &event_layer.source, &event_layer.name) {
                    overlays.extend(event_series(event_layer, dataset, &fallback_color));
                }
            }
            AnnotationLayer::Timeseries(ts_layer) => {
                if let Some(dataset) = lookup(datasets, &ts_layer.source, &ts_layer.name) {
                    overlays.extend(timeseries_series(
                        ts_layer,
                        dataset,
                        config.marker_size,
                        &fallback_color,
                    ));
                }
            }
        }
    }

    Ok(overlays)
}

fn lookup<'a>(
    datasets: &'a HashMap<String, AnnotationDataset>,
    source: &str,
    layer_name: &str,
) -> Option<&'a AnnotationDataset> {
    let found = datasets.get(source);
    if found.is_none() {
        warn!(layer = %layer_name, source = %source, "annotation dataset missing, layer skipped");
    }
    found
}

fn style_spec(style: &AnnotationStyle) -> LineStyleSpec {
    LineStyleSpec {
        width: style.width,
        dash: style.style,
        opacity: style.opacity,
    }
}

fn resolve_color(style: &AnnotationStyle, fallback: &str) -> String {
    style.color.clone().unwrap_or_else(|| fallback.to_string())
}

/// Evaluate the layer's expression at every x of the primary data and emit
/// one line series. Numeric categories evaluate at their own value, text
/// categories at their axis index.
fn formula_series(
    layer: &FormulaLayer,
    extraction: &Extraction,
    fallback_color: &str,
) -> Result<SeriesSpec> {
    let expr = formula::parse_formula(&layer.value)?;

    let data: Vec<(Datum, Option<f64>)> = extraction
        .category_values
        .iter()
        .enumerate()
        .map(|(idx, x)| {
            let at = x.as_f64().unwrap_or(idx as f64);
            let y = expr.eval(at);
            (x.clone(), y.is_finite().then_some(y))
        })
        .collect();

    Ok(SeriesSpec {
        id: layer.name.clone(),
        name: layer.name.clone(),
        kind: SeriesKind::Observation,
        time_offset: None,
        data: SeriesData::Points(data),
        color: resolve_color(&layer.style, fallback_color),
        line_style: style_spec(&layer.style),
        stack: None,
        area: false,
        marker_size: 0.0,
        show_label: Vec::new(),
    })
}

/// One area-band series per interval definition in the dataset. Records
/// without an end are not intervals and are skipped.
fn interval_series(
    layer: &IntervalLayer,
    dataset: &AnnotationDataset,
    fallback_color: &str,
) -> Vec<SeriesSpec> {
    dataset
        .records
        .iter()
        .filter_map(|record| record.end.as_ref().map(|end| (record, end)))
        .enumerate()
        .map(|(idx, (record, end))| SeriesSpec {
            id: format!("{}[{}]", layer.name, idx),
            name: record.title.clone().unwrap_or_else(|| layer.name.clone()),
            kind: SeriesKind::Observation,
            time_offset: None,
            data: SeriesData::Bands(vec![BandSpec {
                from: record.start.clone(),
                to: end.clone(),
                title: record.title.clone(),
            }]),
            color: resolve_color(&layer.style, fallback_color),
            line_style: style_spec(&layer.style),
            stack: None,
            area: true,
            marker_size: 0.0,
            show_label: Vec::new(),
        })
        .collect()
}

/// One marker series per event in the dataset.
fn event_series(
    layer: &EventLayer,
    dataset: &AnnotationDataset,
    fallback_color: &str,
) -> Vec<SeriesSpec> {
    dataset
        .records
        .iter()
        .enumerate()
        .map(|(idx, record)| SeriesSpec {
            id: format!("{}[{}]", layer.name, idx),
            name: record.title.clone().unwrap_or_else(|| layer.name.clone()),
            kind: SeriesKind::Observation,
            time_offset: None,
            data: SeriesData::Markers(vec![MarkerSpec {
                x: record.start.clone(),
                title: record.title.clone(),
            }]),
            color: resolve_color(&layer.style, fallback_color),
            line_style: style_spec(&layer.style),
            stack: None,
            area: false,
            marker_size: layer.style.width.max(1.0) * 2.0,
            show_label: Vec::new(),
        })
        .collect()
}

/// One line series per sub-series, re-using the primary marker size.
fn timeseries_series(
    layer: &TimeseriesLayer,
    dataset: &AnnotationDataset,
    marker_size: f64,
    fallback_color: &str,
) -> Vec<SeriesSpec> {
    dataset
        .series
        .iter()
        .map(|sub| SeriesSpec {
            id: format!("{}: {}", layer.name, sub.name),
            name: sub.name.clone(),
            kind: SeriesKind::Observation,
            time_offset: None,
            data: SeriesData::Points(sub.data.clone()),
            color: resolve_color(&layer.style, fallback_color),
            line_style: style_spec(&layer.style),
            stack: None,
            area: false,
            marker_size,
            show_label: Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnnotationRecord, AnnotationSeriesData};
    use indexmap::IndexMap;
    use std::collections::HashSet;

    fn text(s: &str) -> Datum {
        Datum::Text(s.to_string())
    }

    fn extraction_with_categories(n: usize) -> Extraction {
        Extraction {
            series: Vec::new(),
            categories: (0..n).map(|i| format!("c{}", i)).collect(),
            category_values: (0..n).map(|i| text(&format!("c{}", i))).collect(),
            total_stacked_values: vec![0.0; n],
            threshold_indices: HashSet::new(),
            min_positive_value: None,
            label_map: IndexMap::new(),
        }
    }

    fn config_with_layers(layers_json: serde_json::Value) -> ChartConfig {
        serde_json::from_value(serde_json::json!({ "annotationLayers": layers_json })).unwrap()
    }

    #[test]
    fn test_formula_layer_evaluates_per_category() {
        let config = config_with_layers(serde_json::json!([
            {"annotationType": "Formula", "name": "trend", "value": "x * 2 + 1"}
        ]));
        let extraction = extraction_with_categories(3);
        let overlays = build_annotation_series(
            &config,
            &HashMap::new(),
            &extraction,
            &ColorPalette::category10(),
            0,
        )
        .unwrap();

        assert_eq!(overlays.len(), 1);
        match &overlays[0].data {
            SeriesData::Points(points) => {
                // Text categories evaluate at their index.
                assert_eq!(points[0].1, Some(1.0));
                assert_eq!(points[2].1, Some(5.0));
            }
            other => panic!("expected points, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_layer_contributes_nothing() {
        let config = config_with_layers(serde_json::json!([
            {"annotationType": "Formula", "name": "trend", "value": "x", "show": false}
        ]));
        let extraction = extraction_with_categories(2);
        let overlays = build_annotation_series(
            &config,
            &HashMap::new(),
            &extraction,
            &ColorPalette::category10(),
            0,
        )
        .unwrap();
        assert!(overlays.is_empty());
    }

    #[test]
    fn test_interval_and_event_layers() {
        let config = config_with_layers(serde_json::json!([
            {"annotationType": "Interval", "name": "holidays", "source": "aux"},
            {"annotationType": "Event", "name": "releases", "source": "aux"}
        ]));
        let mut datasets = HashMap::new();
        datasets.insert(
            "aux".to_string(),
            AnnotationDataset {
                records: vec![
                    AnnotationRecord {
                        start: text("A"),
                        end: Some(text("B")),
                        title: Some("q1".to_string()),
                    },
                    AnnotationRecord {
                        start: text("C"),
                        end: None,
                        title: None,
                    },
                ],
                series: Vec::new(),
            },
        );
        let extraction = extraction_with_categories(3);
        let overlays = build_annotation_series(
            &config,
            &datasets,
            &extraction,
            &ColorPalette::category10(),
            0,
        )
        .unwrap();

        // One interval (the record with an end) + two event markers.
        assert_eq!(overlays.len(), 3);
        assert!(matches!(overlays[0].data, SeriesData::Bands(_)));
        assert!(matches!(overlays[1].data, SeriesData::Markers(_)));
    }

    #[test]
    fn test_missing_dataset_skips_layer() {
        let config = config_with_layers(serde_json::json!([
            {"annotationType": "Timeseries", "name": "external", "source": "missing"}
        ]));
        let extraction = extraction_with_categories(1);
        let overlays = build_annotation_series(
            &config,
            &HashMap::new(),
            &extraction,
            &ColorPalette::category10(),
            0,
        )
        .unwrap();
        assert!(overlays.is_empty());
    }

    #[test]
    fn test_timeseries_layer_reuses_marker_size() {
        let mut config = config_with_layers(serde_json::json!([
            {"annotationType": "Timeseries", "name": "external", "source": "aux"}
        ]));
        config.marker_size = 9.0;
        let mut datasets = HashMap::new();
        datasets.insert(
            "aux".to_string(),
            AnnotationDataset {
                records: Vec::new(),
                series: vec![AnnotationSeriesData {
                    name: "ref".to_string(),
                    data: vec![(text("A"), Some(1.0))],
                }],
            },
        );
        let extraction = extraction_with_categories(1);
        let overlays = build_annotation_series(
            &config,
            &datasets,
            &extraction,
            &ColorPalette::category10(),
            0,
        )
        .unwrap();
        assert_eq!(overlays[0].marker_size, 9.0);
    }
}
