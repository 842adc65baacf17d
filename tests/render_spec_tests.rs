use std::collections::HashMap;

use serde_json::json;

use chartspec::config::{AnnotationDataset, ChartConfig};
use chartspec::data::rows_from_json;
use chartspec::ir::{AxisKind, RenderSpec, SeriesData};
use chartspec::transform::build_render_spec;

fn build(rows: serde_json::Value, config: serde_json::Value) -> RenderSpec {
    build_with_annotations(rows, config, HashMap::new())
}

fn build_with_annotations(
    rows: serde_json::Value,
    config: serde_json::Value,
    datasets: HashMap<String, AnnotationDataset>,
) -> RenderSpec {
    let rows = rows_from_json(&rows).expect("rows parse");
    let config: ChartConfig = serde_json::from_value(config).expect("config parse");
    build_render_spec(rows, &datasets, &config).expect("pipeline")
}

fn point_values(spec: &RenderSpec, id: &str) -> Vec<Option<f64>> {
    let series = spec
        .series
        .iter()
        .find(|s| s.id == id)
        .unwrap_or_else(|| panic!("series '{}' missing", id));
    match &series.data {
        SeriesData::Points(points) => points.iter().map(|(_, y)| *y).collect(),
        other => panic!("expected points for '{}', got {:?}", id, other),
    }
}

#[test]
fn test_determinism_across_invocations() {
    let rows = json!([
        {"x": "A", "m1": 5, "m2": 1},
        {"x": "B", "m1": 3, "m2": 2},
    ]);
    let config = json!({"metrics": ["m1", "m2"], "stackMode": "stack"});

    let first = serde_json::to_value(build(rows.clone(), config.clone())).unwrap();
    let second = serde_json::to_value(build(rows, config)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_stacking_gap_fill_produces_zero_not_null() {
    let spec = build(
        json!([
            {"x": "A", "m1": 5},
            {"x": "B", "m1": 3, "m2": 2},
        ]),
        json!({"metrics": ["m1", "m2"], "stackMode": "stack"}),
    );
    assert_eq!(point_values(&spec, "m2"), vec![Some(0.0), Some(2.0)]);
}

#[test]
fn test_log_axis_lower_bound() {
    let spec = build(
        json!([
            {"x": "A", "m1": -2, "m2": 0},
            {"x": "B", "m1": 3, "m2": 0.5},
        ]),
        json!({"metrics": ["m1", "m2"], "logAxis": true}),
    );
    let min = spec.y_axis.min.expect("log axis needs a lower bound");
    assert!(min > 0.0);
    assert!(min < 0.5);
    assert!(spec.y_axis.log);
}

#[test]
fn test_month_year_ordering() {
    let spec = build(
        json!([
            {"x": "Mar'24", "m1": 1},
            {"x": "Jan'23", "m1": 2},
            {"x": "Feb'23", "m1": 3},
        ]),
        json!({"metrics": ["m1"], "xAxisTimeFormat": "%b'%y"}),
    );
    match &spec.x_axis.kind {
        AxisKind::Category { categories } => {
            assert_eq!(categories, &["Jan'23", "Feb'23", "Mar'24"]);
        }
        AxisKind::Value => panic!("x axis must be categorical"),
    }
}

#[test]
fn test_forecast_series_excluded_from_legend_but_present() {
    let spec = build(
        json!([
            {"x": "A", "Sales": 5, "Sales__yhat_upper": 6},
        ]),
        json!({"metrics": ["Sales", "Sales__yhat_upper"], "forecastEnabled": true}),
    );
    assert!(spec.series.iter().any(|s| s.id == "Sales__yhat_upper"));
    assert_eq!(spec.legend.entries, vec!["Sales"]);
}

#[test]
fn test_custom_tooltip_zero_suppression() {
    let spec = build(
        json!([
            {"x": "A", "m1": 0, "m2": 15},
        ]),
        json!({
            "metrics": ["m1", "m2"],
            "showCustomTooltip": true,
            "customTooltipTemplate": "{<row1.name>: <row1.value>}, total <total.value>",
        }),
    );
    let content = spec.tooltip.render(0).expect("tooltip renders");
    assert_eq!(content.custom.as_deref(), Some(", total 15"));
}

#[test]
fn test_annotation_toggle_removes_exactly_that_layer() {
    let rows = json!([
        {"x": "A", "m1": 1},
        {"x": "B", "m1": 2},
    ]);
    let config_shown = json!({
        "metrics": ["m1"],
        "annotationLayers": [
            {"annotationType": "Formula", "name": "trend", "value": "x + 1"},
            {"annotationType": "Formula", "name": "cap", "value": "10"},
        ],
    });
    let config_hidden = json!({
        "metrics": ["m1"],
        "annotationLayers": [
            {"annotationType": "Formula", "name": "trend", "value": "x + 1", "show": false},
            {"annotationType": "Formula", "name": "cap", "value": "10"},
        ],
    });

    let shown = build(rows.clone(), config_shown);
    let hidden = build(rows, config_hidden);

    let shown_ids: Vec<&str> = shown.series.iter().map(|s| s.id.as_str()).collect();
    let hidden_ids: Vec<&str> = hidden.series.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(shown_ids, vec!["m1", "trend", "cap"]);
    assert_eq!(hidden_ids, vec!["m1", "cap"]);

    // The surviving series are byte-identical either way.
    let cap_shown = serde_json::to_value(&shown.series[2]).unwrap();
    let cap_hidden = serde_json::to_value(&hidden.series[1]).unwrap();
    assert_eq!(cap_shown, cap_hidden);
}

#[test]
fn test_expand_fractions_sum_to_one() {
    let spec = build(
        json!([
            {"x": "A", "m1": 1, "m2": 3},
            {"x": "B", "m1": 2, "m2": 2},
        ]),
        json!({"metrics": ["m1", "m2"], "stackMode": "expand"}),
    );
    for idx in 0..2 {
        let sum: f64 = ["m1", "m2"]
            .iter()
            .map(|id| point_values(&spec, id)[idx].unwrap())
            .sum();
        assert!((sum - 1.0).abs() < 1e-9, "category {} sums to {}", idx, sum);
    }
    assert_eq!(spec.y_axis.min, Some(0.0));
    assert_eq!(spec.y_axis.max, Some(1.0));
    assert!(spec.y_axis.percent);
}

#[test]
fn test_timeseries_annotation_from_dataset() {
    let mut datasets = HashMap::new();
    datasets.insert(
        "aux".to_string(),
        serde_json::from_value(json!({
            "series": [{"name": "reference", "data": [["A", 1.5], ["B", null]]}]
        }))
        .unwrap(),
    );
    let spec = build_with_annotations(
        json!([{"x": "A", "m1": 1}, {"x": "B", "m1": 2}]),
        json!({
            "metrics": ["m1"],
            "annotationLayers": [
                {"annotationType": "Timeseries", "name": "ext", "source": "aux"}
            ],
        }),
        datasets,
    );
    let overlay = spec.series.iter().find(|s| s.id == "ext: reference");
    assert!(overlay.is_some());
    assert!(spec.legend.entries.contains(&"ext".to_string()));
}

#[test]
fn test_horizontal_orientation_swaps_axes_last() {
    let spec = build(
        json!([{"x": "A", "m1": 1}]),
        json!({
            "metrics": ["m1"],
            "orientation": "horizontal",
            "logAxis": true,
        }),
    );
    // The value axis (now rendered as x) kept its log bound resolution.
    assert!(spec.x_axis.log);
    assert!(matches!(spec.y_axis.kind, AxisKind::Category { .. }));
}

#[test]
fn test_stream_mode_inserts_hidden_baseline() {
    let spec = build(
        json!([
            {"x": "A", "m1": 2, "m2": 4},
        ]),
        json!({"metrics": ["m1", "m2"], "stackMode": "stream"}),
    );
    assert_eq!(spec.series[0].id, "__baseline__");
    assert_eq!(point_values(&spec, "__baseline__"), vec![Some(-3.0)]);
    assert!(!spec.legend.entries.iter().any(|e| e == "__baseline__"));
}
