use std::cmp::Ordering;

use crate::data::{Datum, Row};

/// Fixed month -> index table for the `%b'%y` ordering key.
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Reshape raw rows into the canonical row set the extractor consumes.
///
/// When the x-format is the abbreviated-month'two-digit-year pattern the
/// rows are sorted by (year, month index). Any other format passes the rows
/// through unsorted; the extractor applies its own sort policy.
pub fn normalize_rows(rows: Vec<Row>, x_col: &str, time_format: Option<&str>) -> Vec<Row> {
    if time_format.is_some_and(is_month_year_format) {
        sort_by_month_year(rows, x_col)
    } else {
        rows
    }
}

fn is_month_year_format(format: &str) -> bool {
    format == "%b'%y"
}

/// Stable sort by (year, month). Rows whose x value is missing or
/// unparseable compare Equal against everything, so they are left at their
/// original positions while the keyed rows sort around them.
fn sort_by_month_year(rows: Vec<Row>, x_col: &str) -> Vec<Row> {
    let mut keyed: Vec<(usize, (u32, usize))> = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if let Some(key) = row.get(x_col).and_then(parse_month_year) {
            keyed.push((idx, key));
        }
    }
    // Stable: ties keep row order.
    keyed.sort_by(|a, b| a.1.cmp(&b.1));

    let mut slots: Vec<Option<Row>> = rows.into_iter().map(Some).collect();
    let keyed_slots: Vec<usize> = keyed.iter().map(|(idx, _)| *idx).collect();
    let mut sorted_rows: Vec<Row> = keyed
        .iter()
        .filter_map(|(idx, _)| slots[*idx].take())
        .collect();

    let mut keyed_slots_sorted = keyed_slots;
    keyed_slots_sorted.sort_unstable();
    for (slot, row) in keyed_slots_sorted.into_iter().zip(sorted_rows.drain(..)) {
        slots[slot] = Some(row);
    }

    slots.into_iter().flatten().collect()
}

/// Pairwise comparator for `Jan'24`-style x values. If either side is
/// missing the pair compares Equal (no crash, no guess).
pub fn compare_month_year(a: Option<&Datum>, b: Option<&Datum>) -> Ordering {
    match (a.and_then(parse_month_year), b.and_then(parse_month_year)) {
        (Some(ka), Some(kb)) => ka.cmp(&kb),
        _ => Ordering::Equal,
    }
}

/// Parse `Mar'24` into (year, month index).
fn parse_month_year(datum: &Datum) -> Option<(u32, usize)> {
    let text = match datum {
        Datum::Text(s) => s,
        _ => return None,
    };
    let (month_str, year_str) = text.split_once('\'')?;
    let month = MONTHS.iter().position(|m| *m == month_str)?;
    let year = year_str.parse::<u32>().ok()?;
    Some((year, month))
}
