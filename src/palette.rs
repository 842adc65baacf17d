use indexmap::IndexMap;
use tracing::warn;

// d3 categorical palettes.
const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const ACCENT: [&str; 8] = [
    "#7fc97f", "#beaed4", "#fdc086", "#ffff99", "#386cb0", "#f0027f", "#bf5b17", "#666666",
];

const DARK2: [&str; 8] = [
    "#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e", "#e6ab02", "#a6761d", "#666666",
];

/// A categorical color scale. Construction is a pure function of the
/// scheme name: the engine looks colors up, it never mutates a scheme.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: &'static [&'static str],
}

impl ColorPalette {
    pub fn category10() -> Self {
        Self {
            colors: &CATEGORY10,
        }
    }

    pub fn by_name(name: &str) -> Self {
        match name {
            "category10" => Self::category10(),
            "accent" => Self { colors: &ACCENT },
            "dark2" => Self { colors: &DARK2 },
            other => {
                warn!(scheme = %other, "unknown color scheme, falling back to category10");
                Self::category10()
            }
        }
    }

    pub fn color_at(&self, index: usize) -> &'static str {
        self.colors[index % self.colors.len()]
    }

    /// Assign colors by key in first-seen order, cycling when exhausted.
    pub fn assign_colors(&self, keys: &[String]) -> IndexMap<String, String> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), self.color_at(i).to_string()))
            .collect()
    }
}
