use indexmap::IndexMap;
use serde::Serialize;

use crate::config::{LegendOrientation, LineDash};
use crate::data::Datum;
use crate::tooltip::TooltipFormatter;

// =============================================================================
// Pipeline intermediates
// =============================================================================

/// Classification attached to every series at extraction time, replacing
/// re-parsing of name suffixes downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SeriesKind {
    Observation,
    ForecastTrend,
    ForecastLower,
    ForecastUpper,
}

impl SeriesKind {
    pub fn is_forecast(&self) -> bool {
        !matches!(self, SeriesKind::Observation)
    }
}

/// One plotted line/bar/area as extracted from the rows.
///
/// `name` keeps the composite source name (qualifier suffix included) for
/// identity; `label` is the display form with the suffix stripped.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub label: String,
    pub kind: SeriesKind,
    /// Time-comparison tag ("1 week ago", ...) when the series is a
    /// derived overlay.
    pub offset: Option<String>,
    /// (x, y) pairs; x values unique within one series, ordered with the
    /// category axis. `None` y values are gaps, never drawn as zero.
    pub data: Vec<(Datum, Option<f64>)>,
}

impl Series {
    pub fn is_derived(&self) -> bool {
        self.offset.is_some()
    }

    /// Signed sum of the series' own values, nulls skipped.
    pub fn total(&self) -> f64 {
        self.data.iter().filter_map(|(_, y)| *y).sum()
    }
}

// =============================================================================
// RenderSpec: the engine's sole output
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandSpec {
    pub from: Datum,
    pub to: Datum,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    pub x: Datum,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "items")]
pub enum SeriesData {
    Points(Vec<(Datum, Option<f64>)>),
    Bands(Vec<BandSpec>),
    Markers(Vec<MarkerSpec>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineStyleSpec {
    pub width: f64,
    pub dash: LineDash,
    pub opacity: f64,
}

/// A fully resolved series ready for the rendering surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSpec {
    /// Composite source name; stable identity for cross-filtering.
    pub id: String,
    /// Display label.
    pub name: String,
    pub kind: SeriesKind,
    pub time_offset: Option<String>,
    pub data: SeriesData,
    pub color: String,
    pub line_style: LineStyleSpec,
    /// Stack group identifier; series sharing a group are cumulated by
    /// the rendering surface.
    pub stack: Option<String>,
    pub area: bool,
    pub marker_size: f64,
    /// Per-point value-label visibility, aligned with `data` when the
    /// data is point-shaped.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub show_label: Vec<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum AxisKind {
    Category { categories: Vec<String> },
    Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisSpec {
    #[serde(flatten)]
    pub kind: AxisKind,
    pub title: Option<String>,
    pub title_margin: f64,
    /// `None` means "auto" for the rendering surface.
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub log: bool,
    /// Percent tick formatting (mutually exclusive with absolute).
    pub percent: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendSpec {
    pub show: bool,
    pub orientation: LegendOrientation,
    /// Observation series labels plus enabled annotation layer names.
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolboxSpec {
    pub zoom: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataZoomSpec {
    pub start: f64,
    pub end: f64,
}

/// Callback slots the engine wires to but does not implement; the host
/// attaches the actual handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HostBinding {
    SetDataMask,
    OnContextMenu,
    OnLegendStateChanged,
    OnFocusedSeries,
}

/// The fully resolved, declarative rendering specification. Owned by the
/// caller after return; the engine holds no reference to it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSpec {
    pub x_axis: AxisSpec,
    pub y_axis: AxisSpec,
    pub legend: LegendSpec,
    pub series: Vec<SeriesSpec>,
    #[serde(skip)]
    pub tooltip: TooltipFormatter,
    pub toolbox: ToolboxSpec,
    pub data_zoom: Option<DataZoomSpec>,
    /// Echo of the grouping columns.
    pub groupby: Vec<String>,
    /// Series label -> contributing columns, for host cross-filtering.
    pub label_map: IndexMap<String, Vec<String>>,
    /// Indices into `series` that are currently filter-selected.
    pub selected_values: Vec<usize>,
    pub bindings: Vec<HostBinding>,
}
