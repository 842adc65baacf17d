use indexmap::IndexMap;

use crate::ir::{Series, SeriesKind};

pub const FORECAST_TREND_SUFFIX: &str = "__yhat";
pub const FORECAST_LOWER_SUFFIX: &str = "__yhat_lower";
pub const FORECAST_UPPER_SUFFIX: &str = "__yhat_upper";

/// Classify a composite series name by its qualifier suffix and return the
/// base display name. Pure; the longer suffixes are checked first so
/// `__yhat_lower` never classifies as a bare trend.
pub fn classify(name: &str) -> (SeriesKind, &str) {
    if let Some(base) = name.strip_suffix(FORECAST_LOWER_SUFFIX) {
        (SeriesKind::ForecastLower, base)
    } else if let Some(base) = name.strip_suffix(FORECAST_UPPER_SUFFIX) {
        (SeriesKind::ForecastUpper, base)
    } else if let Some(base) = name.strip_suffix(FORECAST_TREND_SUFFIX) {
        (SeriesKind::ForecastTrend, base)
    } else {
        (SeriesKind::Observation, name)
    }
}

/// Match a base display name against the configured comparison offsets.
/// A series is "derived" iff its base name carries one of these labels.
pub fn detect_offset(base: &str, offsets: &[String]) -> Option<String> {
    offsets
        .iter()
        .find(|offset| base == offset.as_str() || base.ends_with(&format!(", {}", offset)))
        .cloned()
}

/// Assign each distinct offset a line width 1, 2, 3, ... in first-seen
/// order across the series list. An explicit fold, computed fresh per
/// render: the assignment is order-dependent and must not be memoized
/// across renders with different offset sets.
pub fn offset_line_widths<'a, I>(series: I) -> IndexMap<String, f64>
where
    I: IntoIterator<Item = &'a Series>,
{
    series.into_iter().fold(IndexMap::new(), |mut widths, s| {
        if let Some(offset) = &s.offset {
            let next = widths.len() as f64 + 1.0;
            widths.entry(offset.clone()).or_insert(next);
        }
        widths
    })
}
