//! Time component/path parsing, the minimal-covering-range algorithm, and
//! marshalling. See spec §3, §4.2, §6.
//!
//! The six-level hierarchy is fixed: year, month, five-day index, day,
//! six-hour index, hour. Bounds at each level depend on the preceding
//! (coarser) components — most notably day bounds, which depend on month,
//! leap-year, and the five-day index.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};

use crate::error::TimeError;

pub const YEAR: u8 = 0;
pub const MONTH: u8 = 1;
pub const FIVE_DAY: u8 = 2;
pub const DAY: u8 = 3;
pub const SIX_HOUR: u8 = 4;
pub const HOUR: u8 = 5;

/// A single time component: its position in the hierarchy and its
/// quantity (the value at that level — e.g. the year number, or the
/// day-of-month).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeComponent {
    pub position: u8,
    pub quantity: u16,
}

/// An ordered, 0..6-length prefix of the time hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePath {
    components: Vec<TimeComponent>,
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => unreachable!("month out of 1..=12"),
    }
}

fn five_day_index(day: u32) -> u32 {
    if day <= 25 {
        (day - 1) / 5 + 1
    } else {
        6
    }
}

/// Inclusive `(start_day, end_day)` for the five-day group `k` (1..=6) in
/// the given month/year.
fn five_day_bounds(year: i32, month: u32, k: u32) -> (u32, u32) {
    if k < 6 {
        (5 * (k - 1) + 1, 5 * k)
    } else {
        (26, days_in_month(year, month))
    }
}

/// Bounds (inclusive) for the component at `position`, given the
/// already-fixed coarser components in `prefix`. Mirrors spec §3's table
/// and §4.2's `timeComponentBounds`.
pub fn time_component_bounds(prefix: &[TimeComponent], position: u8) -> (u16, u16) {
    match position {
        YEAR => (2015, 2050),
        MONTH => (1, 12),
        FIVE_DAY => (1, 6),
        DAY => {
            let year = prefix[0].quantity as i32;
            let month = prefix[1].quantity as u32;
            let k = prefix[2].quantity as u32;
            let (lo, hi) = five_day_bounds(year, month, k);
            (lo as u16, hi as u16)
        }
        SIX_HOUR => (1, 4),
        HOUR => {
            let six_hours = prefix[4].quantity;
            (6 * (six_hours - 1), 6 * six_hours - 1)
        }
        _ => unreachable!("time position out of 0..=5"),
    }
}

impl TimePath {
    /// Build (and validate) a path from an explicit component list.
    pub fn from_components(components: Vec<TimeComponent>) -> Result<Self, TimeError> {
        if components.len() > 6 {
            return Err(TimeError::TooLong(components.len()));
        }
        for (i, c) in components.iter().enumerate() {
            if c.position as usize != i {
                return Err(TimeError::OutOfRange {
                    position: c.position,
                    quantity: c.quantity,
                    min: i as u16,
                    max: i as u16,
                });
            }
            let (min, max) = time_component_bounds(&components[..i], c.position);
            if c.quantity < min || c.quantity > max {
                return Err(TimeError::OutOfRange {
                    position: c.position,
                    quantity: c.quantity,
                    min,
                    max,
                });
            }
        }
        Ok(TimePath { components })
    }

    /// Parse a UTC timestamp into the fully specified (six-component) path.
    pub fn parse(ts: DateTime<Utc>) -> Self {
        let year = ts.year();
        let month = ts.month();
        let day = ts.day();
        let hour = ts.hour();
        let five_day = five_day_index(day);
        let six_hour = hour / 6 + 1;

        TimePath {
            components: vec![
                TimeComponent {
                    position: YEAR,
                    quantity: year as u16,
                },
                TimeComponent {
                    position: MONTH,
                    quantity: month as u16,
                },
                TimeComponent {
                    position: FIVE_DAY,
                    quantity: five_day as u16,
                },
                TimeComponent {
                    position: DAY,
                    quantity: day as u16,
                },
                TimeComponent {
                    position: SIX_HOUR,
                    quantity: six_hour as u16,
                },
                TimeComponent {
                    position: HOUR,
                    quantity: hour as u16,
                },
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[TimeComponent] {
        &self.components
    }

    /// Write this path's components into the last six slots of `into`
    /// (the tail of a pattern); remaining time slots are left free.
    ///
    /// Panics if `into.len() != 6`.
    pub fn encode_into(&self, into: &mut [Option<Vec<u8>>]) {
        assert_eq!(into.len(), 6, "time pattern tail must be exactly 6 slots");
        for (slot, comp) in into.iter_mut().zip(self.components.iter()) {
            *slot = Some(comp.quantity.to_le_bytes().to_vec());
        }
        for slot in into.iter_mut().skip(self.components.len()) {
            *slot = None;
        }
    }

    /// Reconstruct a `TimePath` from the time portion of a pattern,
    /// trimming trailing free slots.
    pub fn decode_from(slots: &[Option<Vec<u8>>]) -> Result<Self, TimeError> {
        assert_eq!(slots.len(), 6, "time pattern tail must be exactly 6 slots");
        let last_bound = slots.iter().rposition(|s| s.is_some());
        let mut components = Vec::new();
        if let Some(last) = last_bound {
            for (i, slot) in slots.iter().enumerate().take(last + 1) {
                let bytes = slot
                    .as_ref()
                    .ok_or(TimeError::TooLong(6))?;
                let arr: [u8; 2] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| TimeError::TooLong(6))?;
                components.push(TimeComponent {
                    position: i as u8,
                    quantity: u16::from_le_bytes(arr),
                });
            }
        }
        TimePath::from_components(components)
    }

    /// `1-byte count, then 3 bytes per component (position, 16-bit LE
    /// quantity)`.
    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.components.len() * 3);
        out.push(self.components.len() as u8);
        for c in &self.components {
            out.push(c.position);
            out.extend_from_slice(&c.quantity.to_le_bytes());
        }
        out
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self, TimeError> {
        let (&n, rest) = bytes.split_first().ok_or(TimeError::TooLong(0))?;
        if rest.len() < n as usize * 3 {
            return Err(TimeError::TooLong(n as usize));
        }
        let mut components = Vec::with_capacity(n as usize);
        for chunk in rest[..n as usize * 3].chunks_exact(3) {
            let position = chunk[0];
            let quantity = u16::from_le_bytes([chunk[1], chunk[2]]);
            components.push(TimeComponent { position, quantity });
        }
        TimePath::from_components(components)
    }

    pub fn to_time_string(&self) -> String {
        self.components
            .iter()
            .map(|c| c.quantity.to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl std::fmt::Display for TimePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_time_string())
    }
}

fn floor_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(ts.year(), ts.month(), ts.day(), ts.hour(), 0, 0)
        .single()
        .expect("valid calendar date")
}

fn ymd_hms(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid calendar date")
}

/// Last hour (inclusive) of the block that starts at `cur` and spans
/// `level` (the deepest position the block still varies at — e.g.
/// `level == SIX_HOUR` means the block is one six-hour group).
fn block_end(cur: DateTime<Utc>, level: u8) -> DateTime<Utc> {
    let year = cur.year();
    let month = cur.month();
    let day = cur.day();
    let six_hour = cur.hour() / 6 + 1;

    match level {
        HOUR => cur,
        SIX_HOUR => ymd_hms(year, month, day, 6 * six_hour - 1),
        DAY => ymd_hms(year, month, day, 23),
        FIVE_DAY => {
            let k = five_day_index(day);
            let (_, end_day) = five_day_bounds(year, month, k);
            ymd_hms(year, month, end_day, 23)
        }
        MONTH => {
            let end_day = days_in_month(year, month);
            ymd_hms(year, month, end_day, 23)
        }
        YEAR => ymd_hms(year, 12, 31, 23),
        _ => unreachable!("time position out of 0..=5"),
    }
}

/// Is `cur` aligned to the *start* of a block at `level` (i.e. every
/// component finer than `level` is at its minimum)?
fn is_aligned(cur: DateTime<Utc>, level: u8) -> bool {
    let day = cur.day();
    let hour = cur.hour();
    match level {
        HOUR => true,
        SIX_HOUR => hour % 6 == 0,
        DAY => hour == 0,
        FIVE_DAY => {
            let year = cur.year();
            let month = cur.month();
            let k = five_day_index(day);
            let (start_day, _) = five_day_bounds(year, month, k);
            hour == 0 && day == start_day
        }
        MONTH => hour == 0 && day == 1,
        YEAR => hour == 0 && day == 1 && cur.month() == 1,
        _ => unreachable!("time position out of 0..=5"),
    }
}

fn path_prefix(cur: DateTime<Utc>, level: u8) -> TimePath {
    let full = TimePath::parse(cur);
    TimePath {
        components: full.components[..=level as usize].to_vec(),
    }
}

/// The minimal covering set of time paths whose union equals `[start, end]`
/// at one-hour granularity. See spec §4.2.
pub fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<TimePath>, TimeError> {
    let start = floor_hour(start);
    let end = floor_hour(end);
    if start > end {
        return Err(TimeError::EmptyInterval);
    }

    let mut out = Vec::new();
    let mut cur = start;
    loop {
        let mut best_level = HOUR;
        for level in (YEAR..=HOUR).rev() {
            if !is_aligned(cur, level) {
                break;
            }
            if block_end(cur, level) > end {
                break;
            }
            best_level = level;
        }
        let end_of_block = block_end(cur, best_level);
        out.push(path_prefix(cur, best_level));
        if end_of_block >= end {
            break;
        }
        cur = end_of_block + Duration::hours(1);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        ymd_hms(y, m, d, h)
    }

    #[test]
    fn parse_scenario_3() {
        let p = TimePath::parse(dt(2019, 7, 25, 21));
        assert_eq!(p.to_time_string(), "2019/7/5/25/4/21");
    }

    #[test]
    fn single_hour_range() {
        let t = dt(2020, 6, 15, 10);
        let r = range(t, t).unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].len(), 6);
    }

    #[test]
    fn scenario_4_cross_year() {
        let r = range(dt(2017, 12, 28, 21), dt(2019, 3, 1, 6)).unwrap();
        let strings: Vec<String> = r.iter().map(|p| p.to_time_string()).collect();
        assert_eq!(
            strings,
            vec![
                "2017/12/6/28/4/21",
                "2017/12/6/28/4/22",
                "2017/12/6/28/4/23",
                "2017/12/6/29",
                "2017/12/6/30",
                "2017/12/6/31",
                "2018",
                "2019/1",
                "2019/2",
                "2019/3/1/1/1",
                "2019/3/1/1/2/6",
            ]
        );
    }

    #[test]
    fn scenario_5_leap_year() {
        let r = range(dt(2016, 2, 28, 23), dt(2016, 3, 2, 0)).unwrap();
        let strings: Vec<String> = r.iter().map(|p| p.to_time_string()).collect();
        assert_eq!(
            strings,
            vec!["2016/2/6/28/4/23", "2016/2/6/29", "2016/3/1/1", "2016/3/1/2/1/0"]
        );
    }

    #[test]
    fn leap_year_rule() {
        assert!(is_leap_year(2016));
        assert!(!is_leap_year(2100));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(2019));
    }

    #[test]
    fn marshal_roundtrip() {
        let p = TimePath::parse(dt(2021, 1, 1, 0));
        let bytes = p.marshal();
        let decoded = TimePath::unmarshal(&bytes).unwrap();
        assert_eq!(p, decoded);
    }

    #[test]
    fn empty_interval_rejected() {
        let r = range(dt(2020, 1, 2, 0), dt(2020, 1, 1, 0));
        assert!(matches!(r, Err(TimeError::EmptyInterval)));
    }
}
