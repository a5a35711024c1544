use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::model::{HeatmapCell, TimeSeriesPoint, Value};

/// Spreadsheet serial of 1970-01-01 (1900 date system).
pub const UNIX_EPOCH_SERIAL: f64 = 25569.0;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Datetime layouts tried after RFC 3339 / RFC 2822.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
];

/// Timestamp for a date cell: numbers are spreadsheet serials, text is parsed
/// as a calendar date. Times are taken as UTC.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Absent => None,
        Value::Number(n) => serial_to_datetime(*n),
        Value::Text(s) => parse_date_text(s),
    }
}

/// `(serial - 25569) * 86400 * 1000` milliseconds since the Unix epoch.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let millis = ((serial - UNIX_EPOCH_SERIAL) * MS_PER_DAY).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.naive_utc())
}

pub fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[derive(Debug, Clone)]
pub struct TemporalReport {
    pub time_series: Vec<TimeSeriesPoint>,
    pub heatmap: Vec<HeatmapCell>,
    /// Days between the earliest and latest timestamp; `None` without data.
    pub span_days: Option<f64>,
}

/// Daily totals and a weekday x hour activity grid.
#[derive(Debug)]
pub struct TemporalAggregator {
    days: BTreeMap<NaiveDate, (f64, usize)>,
    grid: [[usize; 24]; 7],
    earliest: Option<NaiveDateTime>,
    latest: Option<NaiveDateTime>,
}

impl Default for TemporalAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalAggregator {
    pub fn new() -> Self {
        Self {
            days: BTreeMap::new(),
            grid: [[0; 24]; 7],
            earliest: None,
            latest: None,
        }
    }

    pub fn observe(&mut self, at: NaiveDateTime, amount: f64) {
        let day = self.days.entry(at.date()).or_insert((0.0, 0));
        day.0 += amount;
        day.1 += 1;

        let weekday = at.weekday().num_days_from_sunday() as usize;
        self.grid[weekday][at.hour() as usize] += 1;

        self.earliest = Some(self.earliest.map_or(at, |e| e.min(at)));
        self.latest = Some(self.latest.map_or(at, |l| l.max(at)));
    }

    pub fn finish(self) -> TemporalReport {
        let time_series = self
            .days
            .into_iter()
            .map(|(date, (amount, count))| TimeSeriesPoint {
                date: date.format("%Y-%m-%d").to_string(),
                amount,
                count,
            })
            .collect();

        let max_cell = self.grid.iter().flatten().copied().max().unwrap_or(0);
        let mut heatmap = Vec::new();
        if max_cell > 0 {
            for (day, hours) in self.grid.iter().enumerate() {
                for (hour, &count) in hours.iter().enumerate() {
                    heatmap.push(HeatmapCell {
                        day: day as u8,
                        hour: hour as u8,
                        count,
                        intensity: count as f64 / max_cell as f64,
                    });
                }
            }
        }

        let span_days = match (self.earliest, self.latest) {
            (Some(e), Some(l)) => Some((l - e).num_milliseconds() as f64 / MS_PER_DAY),
            _ => None,
        };

        TemporalReport {
            time_series,
            heatmap,
            span_days,
        }
    }
}
