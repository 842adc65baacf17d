use anyhow::Result;
use tracing::debug;

use crate::config::ChartConfig;
use crate::data::format_number;
use crate::extract::Extraction;
use crate::ir::SeriesKind;
use crate::parser::template::{Template, TemplateContext, TemplateRow};
use crate::stacking::BASELINE_SERIES;

const TOTAL_LABEL: &str = "Total";

/// Snapshot of one series as the tooltip sees it.
#[derive(Debug, Clone)]
struct SeriesSnapshot {
    label: String,
    kind: SeriesKind,
    derived: bool,
    values: Vec<Option<f64>>,
}

/// One rendered tooltip row: `[label, formattedValue]` plus the optional
/// percentage column.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipRow {
    pub label: String,
    pub value: String,
    pub percent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipContent {
    pub title: String,
    pub rows: Vec<TooltipRow>,
    pub custom: Option<String>,
}

/// Resolved per-render tooltip state. Invoked by the rendering surface at
/// hover time with a category index; holds no reference back to the engine.
#[derive(Debug, Clone)]
pub struct TooltipFormatter {
    categories: Vec<String>,
    snapshots: Vec<SeriesSnapshot>,
    totals: Vec<f64>,
    show_default: bool,
    show_custom: bool,
    rich: bool,
    sort_by_metric: bool,
    show_percentage: bool,
    show_total: bool,
    force_percent: bool,
    stacked: bool,
    template: Option<Template>,
}

impl TooltipFormatter {
    pub fn build(extraction: &Extraction, config: &ChartConfig) -> Result<Self> {
        let snapshots = extraction
            .series
            .iter()
            .filter(|s| s.name != BASELINE_SERIES)
            .map(|s| SeriesSnapshot {
                label: s.label.clone(),
                kind: s.kind,
                derived: s.is_derived(),
                values: s.data.iter().map(|(_, y)| *y).collect(),
            })
            .collect();

        let template = match (&config.custom_tooltip_template, config.show_custom_tooltip) {
            (Some(text), true) => Some(crate::parser::template::parse_template(text)?),
            _ => None,
        };

        Ok(Self {
            categories: extraction.categories.clone(),
            snapshots,
            totals: extraction.total_stacked_values.clone(),
            show_default: config.show_default_tooltip,
            show_custom: config.show_custom_tooltip,
            rich: config.rich_tooltip,
            sort_by_metric: config.tooltip_sort_by_metric,
            show_percentage: config.tooltip_show_percentage,
            show_total: config.tooltip_show_total,
            force_percent: config.force_percent_formatter(),
            stacked: config.is_stacked(),
            template,
        })
    }

    /// Render the tooltip for a hovered category. Returns `None` when the
    /// index is out of range or when both modes are disabled -- the latter
    /// is a caller responsibility the engine does not enforce.
    pub fn render(&self, x_index: usize) -> Option<TooltipContent> {
        if x_index >= self.categories.len() {
            debug!(x_index, "tooltip requested for unknown category");
            return None;
        }
        if !self.show_default && !self.show_custom {
            return None;
        }

        let title = self.categories[x_index].clone();
        let rows = if self.show_default {
            self.default_rows(x_index)
        } else {
            Vec::new()
        };
        let custom = if self.show_custom {
            self.custom_text(x_index)
        } else {
            None
        };

        Some(TooltipContent {
            title,
            rows,
            custom,
        })
    }

    /// The default row table: one row per contributing series, sorted by
    /// name or metric value, reversed when stacked so the top of the stack
    /// comes first, plus the optional percentage column and Total row.
    fn default_rows(&self, x_index: usize) -> Vec<TooltipRow> {
        let mut contributing: Vec<(&SeriesSnapshot, f64)> = self
            .snapshots
            .iter()
            .filter_map(|s| s.values[x_index].map(|v| (s, v)))
            .collect();

        if self.sort_by_metric {
            contributing.sort_by(|a, b| b.1.total_cmp(&a.1));
        } else {
            contributing.sort_by(|a, b| a.0.label.cmp(&b.0.label));
        }
        if self.stacked {
            contributing.reverse();
        }

        let multi_series = self.snapshots.len() > 1;
        let with_percent =
            multi_series && self.rich && !self.force_percent && self.show_percentage;
        let total = self.totals.get(x_index).copied().unwrap_or(0.0);

        let mut rows: Vec<TooltipRow> = contributing
            .iter()
            .map(|(snapshot, value)| TooltipRow {
                label: snapshot.label.clone(),
                value: self.format_value(*value),
                percent: (with_percent && total != 0.0 && !snapshot.kind.is_forecast())
                    .then(|| format_percent(*value / total)),
            })
            .collect();

        if self.show_total {
            let (label, value) = self.total_row(x_index);
            rows.push(TooltipRow {
                label,
                value,
                percent: None,
            });
        }

        rows
    }

    /// Synthesized total: sum of observation values at x, nulls skipped.
    fn total_row(&self, x_index: usize) -> (String, String) {
        let sum: f64 = self
            .snapshots
            .iter()
            .filter(|s| s.kind == SeriesKind::Observation && !s.derived)
            .filter_map(|s| s.values[x_index])
            .sum();
        (TOTAL_LABEL.to_string(), self.format_value(sum))
    }

    fn custom_text(&self, x_index: usize) -> Option<String> {
        let template = self.template.as_ref()?;

        // Template row indices are 1-based into the legend's declared
        // series order, not the sorted default-row order.
        let rows: Vec<TemplateRow> = self
            .snapshots
            .iter()
            .filter(|s| s.kind == SeriesKind::Observation && !s.derived)
            .map(|s| {
                let value = s.values[x_index];
                TemplateRow {
                    name: s.label.clone(),
                    value,
                    formatted: value.map(|v| self.format_value(v)).unwrap_or_default(),
                }
            })
            .collect();

        let (total_name, total_formatted) = self.total_row(x_index);
        let ctx = TemplateContext {
            x_value: self.categories[x_index].clone(),
            total_name,
            total_formatted,
            rows,
        };
        Some(template.render(&ctx))
    }

    fn format_value(&self, value: f64) -> String {
        if self.force_percent {
            format_percent(value)
        } else {
            format_number(value)
        }
    }
}

fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackMode;
    use crate::data::Datum;
    use crate::ir::Series;
    use indexmap::IndexMap;
    use std::collections::HashSet;

    fn text(s: &str) -> Datum {
        Datum::Text(s.to_string())
    }

    fn series(label: &str, kind: SeriesKind, values: &[Option<f64>]) -> Series {
        Series {
            name: label.to_string(),
            label: label.to_string(),
            kind,
            offset: None,
            data: values
                .iter()
                .enumerate()
                .map(|(i, v)| (text(&format!("c{}", i)), *v))
                .collect(),
        }
    }

    fn extraction(series_list: Vec<Series>) -> Extraction {
        let n = series_list
            .first()
            .map(|s| s.data.len())
            .unwrap_or_default();
        let mut totals = vec![0.0; n];
        for s in &series_list {
            if !s.kind.is_forecast() {
                for (i, (_, y)) in s.data.iter().enumerate() {
                    totals[i] += y.unwrap_or(0.0);
                }
            }
        }
        Extraction {
            categories: (0..n).map(|i| format!("c{}", i)).collect(),
            category_values: (0..n).map(|i| text(&format!("c{}", i))).collect(),
            total_stacked_values: totals,
            threshold_indices: HashSet::new(),
            min_positive_value: None,
            label_map: IndexMap::new(),
            series: series_list,
        }
    }

    #[test]
    fn test_default_rows_sorted_by_name() {
        let ext = extraction(vec![
            series("beta", SeriesKind::Observation, &[Some(1.0)]),
            series("alpha", SeriesKind::Observation, &[Some(2.0)]),
        ]);
        let formatter = TooltipFormatter::build(&ext, &ChartConfig::default()).unwrap();
        let content = formatter.render(0).unwrap();
        assert_eq!(content.rows[0].label, "alpha");
        assert_eq!(content.rows[1].label, "beta");
    }

    #[test]
    fn test_stacked_reverses_row_order() {
        let ext = extraction(vec![
            series("alpha", SeriesKind::Observation, &[Some(1.0)]),
            series("beta", SeriesKind::Observation, &[Some(2.0)]),
        ]);
        let config = ChartConfig {
            stack_mode: StackMode::Stack,
            ..ChartConfig::default()
        };
        let formatter = TooltipFormatter::build(&ext, &config).unwrap();
        let content = formatter.render(0).unwrap();
        assert_eq!(content.rows[0].label, "beta");
    }

    #[test]
    fn test_total_row_skips_nulls_and_forecast() {
        let ext = extraction(vec![
            series("a", SeriesKind::Observation, &[Some(3.0)]),
            series("b", SeriesKind::Observation, &[None]),
            series("c__yhat", SeriesKind::ForecastTrend, &[Some(100.0)]),
        ]);
        let config = ChartConfig {
            tooltip_show_total: true,
            ..ChartConfig::default()
        };
        let formatter = TooltipFormatter::build(&ext, &config).unwrap();
        let content = formatter.render(0).unwrap();
        let total = content.rows.last().unwrap();
        assert_eq!(total.label, "Total");
        assert_eq!(total.value, "3");
    }

    #[test]
    fn test_percentage_column_gating() {
        let ext = extraction(vec![
            series("a", SeriesKind::Observation, &[Some(1.0)]),
            series("b", SeriesKind::Observation, &[Some(3.0)]),
        ]);
        let mut config = ChartConfig {
            tooltip_show_percentage: true,
            ..ChartConfig::default()
        };
        let formatter = TooltipFormatter::build(&ext, &config).unwrap();
        let content = formatter.render(0).unwrap();
        assert_eq!(content.rows[0].percent.as_deref(), Some("25.0%"));

        // Percent column disappears once percent formatting is forced.
        config.stack_mode = StackMode::Expand;
        let formatter = TooltipFormatter::build(&ext, &config).unwrap();
        let content = formatter.render(0).unwrap();
        assert!(content.rows[0].percent.is_none());
    }

    #[test]
    fn test_both_flags_false_renders_nothing() {
        let ext = extraction(vec![series("a", SeriesKind::Observation, &[Some(1.0)])]);
        let config = ChartConfig {
            show_default_tooltip: false,
            show_custom_tooltip: false,
            ..ChartConfig::default()
        };
        let formatter = TooltipFormatter::build(&ext, &config).unwrap();
        assert!(formatter.render(0).is_none());
    }

    #[test]
    fn test_custom_template_zero_suppression() {
        let ext = extraction(vec![
            series("a", SeriesKind::Observation, &[Some(0.0)]),
            series("b", SeriesKind::Observation, &[Some(5.0)]),
        ]);
        let config = ChartConfig {
            show_custom_tooltip: true,
            tooltip_show_total: false,
            custom_tooltip_template: Some(
                "{<row1.name>: <row1.value>}, total <total.value>".to_string(),
            ),
            ..ChartConfig::default()
        };
        let formatter = TooltipFormatter::build(&ext, &config).unwrap();
        let content = formatter.render(0).unwrap();
        assert_eq!(content.custom.as_deref(), Some(", total 5"));
    }

    #[test]
    fn test_sort_by_metric_descending() {
        let ext = extraction(vec![
            series("small", SeriesKind::Observation, &[Some(1.0)]),
            series("big", SeriesKind::Observation, &[Some(9.0)]),
        ]);
        let config = ChartConfig {
            tooltip_sort_by_metric: true,
            ..ChartConfig::default()
        };
        let formatter = TooltipFormatter::build(&ext, &config).unwrap();
        let content = formatter.render(0).unwrap();
        assert_eq!(content.rows[0].label, "big");
    }
}
