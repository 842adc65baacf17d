use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::Datum;

/// Policy governing how series values at the same category are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum StackMode {
    #[serde(rename = "none")]
    #[default]
    None,
    #[serde(rename = "stack")]
    Stack,
    /// 100% stacking: values become fractions of the per-category total.
    #[serde(rename = "expand")]
    Expand,
    /// Streamgraph: symmetric baseline series inserted at index 0.
    #[serde(rename = "stream")]
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendOrientation {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

/// Percentage-of-total display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionMode {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortSeriesType {
    #[default]
    None,
    Alphabetical,
    Value,
}

/// How the extracted series list is ordered.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortPolicy {
    #[serde(rename = "type")]
    pub sort_type: SortSeriesType,
    pub ascending: bool,
}

impl Default for SortPolicy {
    fn default() -> Self {
        Self {
            sort_type: SortSeriesType::None,
            ascending: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XAxisSortKey {
    #[default]
    Name,
    Total,
}

/// Explicit x-axis category reordering, honored only when more than one
/// series is produced.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XAxisSort {
    pub by: XAxisSortKey,
    pub ascending: bool,
}

impl Default for XAxisSort {
    fn default() -> Self {
        Self {
            by: XAxisSortKey::Name,
            ascending: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineDash {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// Visual style shared by all annotation layer kinds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationStyle {
    pub color: Option<String>,
    pub style: LineDash,
    pub width: f64,
    pub opacity: f64,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: None,
            style: LineDash::Solid,
            width: 1.0,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaLayer {
    pub name: String,
    #[serde(default = "default_true")]
    pub show: bool,
    /// Expression evaluated at each x value of the primary data.
    pub value: String,
    #[serde(flatten)]
    pub style: AnnotationStyle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLayer {
    pub name: String,
    #[serde(default = "default_true")]
    pub show: bool,
    /// Key into the auxiliary annotation datasets.
    pub source: String,
    #[serde(flatten)]
    pub style: AnnotationStyle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalLayer {
    pub name: String,
    #[serde(default = "default_true")]
    pub show: bool,
    pub source: String,
    #[serde(flatten)]
    pub style: AnnotationStyle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesLayer {
    pub name: String,
    #[serde(default = "default_true")]
    pub show: bool,
    pub source: String,
    #[serde(flatten)]
    pub style: AnnotationStyle,
}

/// An independently toggled overlay drawn alongside the primary series.
///
/// The tag is part of the host contract: an unknown `annotationType`
/// fails deserialization rather than being guessed at.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "annotationType")]
pub enum AnnotationLayer {
    Event(EventLayer),
    Interval(IntervalLayer),
    Formula(FormulaLayer),
    Timeseries(TimeseriesLayer),
}

impl AnnotationLayer {
    pub fn name(&self) -> &str {
        match self {
            AnnotationLayer::Event(l) => &l.name,
            AnnotationLayer::Interval(l) => &l.name,
            AnnotationLayer::Formula(l) => &l.name,
            AnnotationLayer::Timeseries(l) => &l.name,
        }
    }

    pub fn show(&self) -> bool {
        match self {
            AnnotationLayer::Event(l) => l.show,
            AnnotationLayer::Interval(l) => l.show,
            AnnotationLayer::Formula(l) => l.show,
            AnnotationLayer::Timeseries(l) => l.show,
        }
    }
}

/// Event/interval records from an auxiliary annotation dataset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub start: Datum,
    #[serde(default)]
    pub end: Option<Datum>,
    #[serde(default)]
    pub title: Option<String>,
}

/// One named sub-series from an auxiliary timeseries dataset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSeriesData {
    pub name: String,
    pub data: Vec<(Datum, Option<f64>)>,
}

/// Auxiliary data backing event/interval/timeseries layers, keyed by the
/// layer's `source` name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationDataset {
    #[serde(default)]
    pub records: Vec<AnnotationRecord>,
    #[serde(default)]
    pub series: Vec<AnnotationSeriesData>,
}

fn default_true() -> bool {
    true
}

fn default_marker_size() -> f64 {
    6.0
}

fn default_color_scheme() -> String {
    "category10".to_string()
}

fn default_x_axis_column() -> String {
    "x".to_string()
}

fn default_title_margin() -> f64 {
    30.0
}

/// The flat configuration record supplied by the host. Missing optional
/// fields mean "feature disabled"; the host validates before handing it over.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartConfig {
    pub group_by: Vec<String>,
    pub metrics: Vec<String>,
    pub stack_mode: StackMode,
    pub color_scheme: String,
    pub x_axis_column: String,
    /// Ordering key format for the category axis (e.g. `%b'%y`).
    pub x_axis_time_format: Option<String>,
    pub sort_policy: SortPolicy,
    pub x_axis_sort: Option<XAxisSort>,

    pub show_legend: bool,
    pub legend_orientation: LegendOrientation,

    pub rich_tooltip: bool,
    pub show_default_tooltip: bool,
    pub show_custom_tooltip: bool,
    pub custom_tooltip_template: Option<String>,
    pub tooltip_sort_by_metric: bool,
    pub tooltip_show_percentage: bool,
    pub tooltip_show_total: bool,

    pub annotation_layers: Vec<AnnotationLayer>,

    pub zoomable: bool,
    pub orientation: Orientation,

    /// Raw user bounds; invalid or empty entries resolve to "auto".
    pub y_axis_bounds: (Option<Value>, Option<Value>),
    pub x_axis_bounds: (Option<Value>, Option<Value>),
    pub truncate_y_axis: bool,
    pub truncate_x_axis: bool,
    pub log_axis: bool,
    pub x_axis_title: Option<String>,
    pub y_axis_title: Option<String>,
    pub x_axis_title_margin: f64,
    pub y_axis_title_margin: f64,

    pub contribution_mode: Option<ContributionMode>,
    pub show_value: bool,
    pub only_total: bool,
    pub percentage_threshold: f64,

    pub forecast_enabled: bool,
    /// Comparison offset labels ("1 week ago", ...). A series whose base
    /// name carries one of these is drawn as a derived overlay.
    pub time_compare: Vec<String>,

    pub marker_size: f64,
    pub show_markers: bool,

    /// Series labels currently filter-selected by the host.
    pub selected_values: Vec<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            group_by: Vec::new(),
            metrics: Vec::new(),
            stack_mode: StackMode::None,
            color_scheme: default_color_scheme(),
            x_axis_column: default_x_axis_column(),
            x_axis_time_format: None,
            sort_policy: SortPolicy::default(),
            x_axis_sort: None,
            show_legend: true,
            legend_orientation: LegendOrientation::Top,
            rich_tooltip: true,
            show_default_tooltip: true,
            show_custom_tooltip: false,
            custom_tooltip_template: None,
            tooltip_sort_by_metric: false,
            tooltip_show_percentage: false,
            tooltip_show_total: false,
            annotation_layers: Vec::new(),
            zoomable: false,
            orientation: Orientation::Vertical,
            y_axis_bounds: (None, None),
            x_axis_bounds: (None, None),
            truncate_y_axis: false,
            truncate_x_axis: false,
            log_axis: false,
            x_axis_title: None,
            y_axis_title: None,
            x_axis_title_margin: default_title_margin(),
            y_axis_title_margin: default_title_margin(),
            contribution_mode: None,
            show_value: false,
            only_total: false,
            percentage_threshold: 0.0,
            forecast_enabled: false,
            time_compare: Vec::new(),
            marker_size: default_marker_size(),
            show_markers: false,
            selected_values: Vec::new(),
        }
    }
}

impl ChartConfig {
    /// Percentage and absolute formatting are mutually exclusive per render.
    pub fn force_percent_formatter(&self) -> bool {
        matches!(self.contribution_mode, Some(ContributionMode::Row))
            || self.stack_mode == StackMode::Expand
    }

    pub fn is_stacked(&self) -> bool {
        self.stack_mode != StackMode::None
    }
}
