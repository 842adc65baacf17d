use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use indexmap::IndexMap;
use tracing::warn;

use crate::config::{ChartConfig, SortSeriesType, XAxisSortKey};
use crate::data::{Datum, Row};
use crate::forecast;
use crate::ir::Series;

/// Everything the extractor learns about the rows, consumed by the
/// stacking engine, tooltip composer and axis builder.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub series: Vec<Series>,
    /// Category labels in final axis order.
    pub categories: Vec<String>,
    /// Original x datum per category (text or numeric).
    pub category_values: Vec<Datum>,
    /// Signed sum of all non-forecast series values, per category.
    pub total_stacked_values: Vec<f64>,
    /// Categories whose total falls under the configured threshold;
    /// value labels there are suppressed.
    pub threshold_indices: HashSet<usize>,
    /// Smallest strictly-positive value across all series, for the
    /// logarithmic axis lower bound.
    pub min_positive_value: Option<f64>,
    /// Series name -> contributing columns, echoed to the host.
    pub label_map: IndexMap<String, Vec<String>>,
}

struct SeriesBuilder {
    name: String,
    label: String,
    kind: crate::ir::SeriesKind,
    offset: Option<String>,
    columns: Vec<String>,
    values: HashMap<usize, Option<f64>>,
}

/// Group normalized rows into named series and compute the aggregates the
/// rest of the pipeline needs. Output order is deterministic for identical
/// inputs; no series is dropped.
pub fn extract_series(rows: &[Row], config: &ChartConfig) -> Result<Extraction> {
    if config.metrics.is_empty() {
        bail!("Configuration must name at least one metric");
    }

    let x_col = &config.x_axis_column;
    let mut categories: Vec<String> = Vec::new();
    let mut category_values: Vec<Datum> = Vec::new();
    let mut category_index: HashMap<String, usize> = HashMap::new();
    let mut builders: IndexMap<String, SeriesBuilder> = IndexMap::new();

    // 1. One series per distinct grouping-key combination x metric, data
    //    points taken in row order.
    for row in rows {
        let Some(x) = row.get(x_col) else {
            warn!(column = %x_col, "row without x-axis column skipped");
            continue;
        };
        let x_label = x.label();
        let cat_idx = *category_index.entry(x_label.clone()).or_insert_with(|| {
            categories.push(x_label.clone());
            category_values.push(x.clone());
            categories.len() - 1
        });

        let group_values: Vec<String> = config
            .group_by
            .iter()
            .map(|col| row.get(col).map(|d| d.label()).unwrap_or_default())
            .collect();

        for metric in &config.metrics {
            let name = series_name(&group_values, metric, config);
            let value = row.get(metric).and_then(|d| d.as_f64());

            let builder = builders.entry(name.clone()).or_insert_with(|| {
                let (kind, base) = forecast::classify(&name);
                let offset = forecast::detect_offset(base, &config.time_compare);
                let mut columns = group_values.clone();
                columns.push(metric.clone());
                SeriesBuilder {
                    name: name.clone(),
                    label: base.to_string(),
                    kind,
                    offset,
                    columns,
                    values: HashMap::new(),
                }
            });
            builder.values.insert(cat_idx, value);
        }
    }

    // 2. Gap filling: stacked totals must stay numerically defined, so
    //    absent (series, x) pairs become 0 -- unless forecasting is on,
    //    where gaps stay null and are not drawn.
    let fill_zero = config.is_stacked() && !config.forecast_enabled;

    let mut series: Vec<Series> = builders
        .into_iter()
        .map(|(_, builder)| {
            let data: Vec<(Datum, Option<f64>)> = (0..categories.len())
                .map(|idx| {
                    let y = match builder.values.get(&idx) {
                        Some(value) => *value,
                        None if fill_zero => Some(0.0),
                        None => None,
                    };
                    (category_values[idx].clone(), y)
                })
                .collect();
            Series {
                name: builder.name,
                label: builder.label,
                kind: builder.kind,
                offset: builder.offset,
                data,
            }
        })
        .collect();

    // 3. Sort policy over the series list. Stable sorts keep insertion
    //    order on ties.
    match config.sort_policy.sort_type {
        SortSeriesType::None => {}
        SortSeriesType::Alphabetical => {
            if config.sort_policy.ascending {
                series.sort_by(|a, b| a.label.cmp(&b.label));
            } else {
                series.sort_by(|a, b| b.label.cmp(&a.label));
            }
        }
        SortSeriesType::Value => {
            if config.sort_policy.ascending {
                series.sort_by(|a, b| a.total().total_cmp(&b.total()));
            } else {
                series.sort_by(|a, b| b.total().total_cmp(&a.total()));
            }
        }
    }

    // 4. Per-category totals over non-forecast series and the minimum
    //    strictly-positive value across everything.
    let mut total_stacked_values = vec![0.0; categories.len()];
    let mut min_positive_value: Option<f64> = None;
    for s in &series {
        for (idx, (_, y)) in s.data.iter().enumerate() {
            if let Some(v) = y {
                if !s.kind.is_forecast() {
                    total_stacked_values[idx] += v;
                }
                if *v > 0.0 && min_positive_value.map_or(true, |m| *v < m) {
                    min_positive_value = Some(*v);
                }
            }
        }
    }

    let threshold_indices: HashSet<usize> = if config.percentage_threshold > 0.0 {
        total_stacked_values
            .iter()
            .enumerate()
            .filter(|(_, total)| total.abs() < config.percentage_threshold)
            .map(|(idx, _)| idx)
            .collect()
    } else {
        HashSet::new()
    };

    let mut extraction = Extraction {
        series,
        categories,
        category_values,
        total_stacked_values,
        threshold_indices,
        min_positive_value,
        label_map: IndexMap::new(),
    };

    // Fill the label map now that series order is final.
    rebuild_label_map(&mut extraction, config);

    // 5. Explicit x-axis sort override, honored only when more than one
    //    series is being produced.
    if let Some(x_sort) = config.x_axis_sort {
        if extraction.series.len() > 1 {
            let permutation = category_permutation(&extraction, x_sort.by, x_sort.ascending);
            apply_category_permutation(&mut extraction, &permutation);
        }
    }

    Ok(extraction)
}

fn series_name(group_values: &[String], metric: &str, config: &ChartConfig) -> String {
    if config.group_by.is_empty() {
        metric.to_string()
    } else if config.metrics.len() > 1 {
        format!("{}, {}", group_values.join(", "), metric)
    } else {
        group_values.join(", ")
    }
}

fn rebuild_label_map(extraction: &mut Extraction, config: &ChartConfig) {
    let mut map = IndexMap::new();
    for s in &extraction.series {
        let mut columns = Vec::new();
        if !config.group_by.is_empty() {
            // The name embeds the group values; contributing columns are
            // the groupby columns themselves plus the metric.
            columns.extend(config.group_by.iter().cloned());
        }
        if let Some(metric) = config
            .metrics
            .iter()
            .find(|m| s.name.ends_with(m.as_str()))
        {
            columns.push(metric.clone());
        } else if let Some(first) = config.metrics.first() {
            columns.push(first.clone());
        }
        map.insert(s.name.clone(), columns);
    }
    extraction.label_map = map;
}

fn category_permutation(extraction: &Extraction, by: XAxisSortKey, ascending: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..extraction.categories.len()).collect();
    match by {
        XAxisSortKey::Name => {
            if ascending {
                order.sort_by(|a, b| extraction.categories[*a].cmp(&extraction.categories[*b]));
            } else {
                order.sort_by(|a, b| extraction.categories[*b].cmp(&extraction.categories[*a]));
            }
        }
        XAxisSortKey::Total => {
            if ascending {
                order.sort_by(|a, b| {
                    extraction.total_stacked_values[*a]
                        .total_cmp(&extraction.total_stacked_values[*b])
                });
            } else {
                order.sort_by(|a, b| {
                    extraction.total_stacked_values[*b]
                        .total_cmp(&extraction.total_stacked_values[*a])
                });
            }
        }
    }
    order
}

fn apply_category_permutation(extraction: &mut Extraction, permutation: &[usize]) {
    extraction.categories = permutation
        .iter()
        .map(|&i| extraction.categories[i].clone())
        .collect();
    extraction.category_values = permutation
        .iter()
        .map(|&i| extraction.category_values[i].clone())
        .collect();
    extraction.total_stacked_values = permutation
        .iter()
        .map(|&i| extraction.total_stacked_values[i])
        .collect();

    let inverse: HashMap<usize, usize> = permutation
        .iter()
        .enumerate()
        .map(|(new, &old)| (old, new))
        .collect();
    extraction.threshold_indices = extraction
        .threshold_indices
        .iter()
        .map(|old| inverse[old])
        .collect();

    for s in &mut extraction.series {
        s.data = permutation.iter().map(|&i| s.data[i].clone()).collect();
    }
}
