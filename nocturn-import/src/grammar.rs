//! Per-convention name grammar for archive directory trees
//!
//! Pure functions that validate and decode one path segment or file name into
//! structured fields. Each parse function takes the segment and the current
//! [`ParseContext`] and returns an extended context or a [`ParseError`]; no
//! side effects, no I/O.
//!
//! Historical conventions covered:
//! - years as 4 digits or 2-digit era shorthand (`<50` is 2000s, `>=50` 1900s)
//! - months as numbers or 3-letter name prefixes
//! - plain day-of-month directories and the legacy day-range form
//!   (`30-1jan`), whose effective month rolls back one month when the range
//!   crosses a month boundary
//! - nested classification directories with a misspelling-correction pass
//! - clip file names in the absolute and relative (elapsed-time) grammars

use crate::types::{ClipTime, LevelKind};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Recoverable parse failure for one path segment or file name.
///
/// The walker skips the offending subtree (or file) and continues at the
/// parent level; nothing about a ParseError aborts an import.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("bad {level} name '{segment}': {message}")]
pub struct ParseError {
    pub level: LevelKind,
    pub segment: String,
    pub message: String,
}

impl ParseError {
    fn new(level: LevelKind, segment: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            segment: segment.to_string(),
            message: message.into(),
        }
    }
}

/// Accumulated, level-by-level attributes of the walk.
///
/// Immutable snapshot: each successful parse produces an extended copy that
/// is threaded down the recursion and discarded on return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseContext {
    pub year: Option<i32>,
    pub station: Option<String>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    /// Classification directory components in descent order
    pub class_dirs: Vec<String>,
    /// Resolved dot-joined classification; `None` means unclassified
    pub clip_class: Option<String>,
    pub detector: Option<String>,
    pub clip_time: Option<ClipTime>,
}

impl ParseContext {
    /// Date accumulated so far, once year, month, and day have all parsed.
    pub fn date(&self) -> Option<NaiveDate> {
        match (self.year, self.month, self.day) {
            (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y, m, d),
            _ => None,
        }
    }
}

/// `detector_YYYY-MM-DD_HH.MM.SS_NN.wav`
static ABSOLUTE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)_(\d{4})-(\d{2})-(\d{2})_(\d{2})\.(\d{2})\.(\d{2})_(\d{2})\.wav$")
        .expect("absolute clip name regex")
});

/// `detector_HHH.MM.SS_NN.wav` (elapsed hours, up to 3 digits)
static RELATIVE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)_(\d{1,3})\.(\d{2})\.(\d{2})_(\d{2})\.wav$")
        .expect("relative clip name regex")
});

/// Day-range directory, end day optionally tagged with a month-name prefix:
/// `12-14`, `30-1jan`
static DAY_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})([A-Za-z]{3})?$").expect("day range regex"));

const MONTH_PREFIXES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Classification directory names accepted at the top of a classification
/// subtree, with the classification string each maps to. `None` marks the
/// `Classified`/`Unclassified` sentinels, which leave the clip unclassified.
const CLASS_DIR_NAMES: [(&str, Option<&str>); 9] = [
    ("Classified", None),
    ("Unclassified", None),
    ("Call", Some("Call")),
    ("Calls", Some("Call")),
    ("Noise", Some("Noise")),
    ("Noises", Some("Noise")),
    ("Tone", Some("Tone")),
    ("Tones", Some("Tone")),
    ("Unknown", Some("Unknown")),
];

/// Historical misspellings seen in real archive trees.
const SPELLING_CORRECTIONS: [(&str, &str); 5] = [
    ("Classifed", "Classified"),
    ("Clasified", "Classified"),
    ("Unclasified", "Unclassified"),
    ("Noice", "Noise"),
    ("Unkown", "Unknown"),
];

/// Parser for one archive tree's naming conventions.
///
/// The taxonomy and correction tables are immutable data loaded at
/// construction; a station set restricts station segments when supplied.
#[derive(Debug, Clone)]
pub struct NameGrammar {
    stations: HashSet<String>,
    corrections: HashMap<String, String>,
    class_dir_names: HashMap<String, Option<String>>,
    max_year: i32,
}

impl NameGrammar {
    /// Create a grammar. An empty `stations` list accepts any station name.
    pub fn new(stations: impl IntoIterator<Item = String>) -> Self {
        Self {
            stations: stations.into_iter().collect(),
            corrections: SPELLING_CORRECTIONS
                .iter()
                .map(|(bad, good)| (bad.to_string(), good.to_string()))
                .collect(),
            class_dir_names: CLASS_DIR_NAMES
                .iter()
                .map(|(name, class)| (name.to_string(), class.map(str::to_string)))
                .collect(),
            max_year: Utc::now().year(),
        }
    }

    /// Override the upper year bound (defaults to the current year).
    #[cfg(test)]
    fn with_max_year(mut self, max_year: i32) -> Self {
        self.max_year = max_year;
        self
    }

    /// Dispatch to the parse function for `level`.
    pub fn parse(
        &self,
        level: LevelKind,
        segment: &str,
        ctx: &ParseContext,
    ) -> Result<ParseContext, ParseError> {
        match level {
            LevelKind::Year => self.parse_year(segment, ctx),
            LevelKind::Station => self.parse_station(segment, ctx),
            LevelKind::Month => self.parse_month(segment, ctx),
            LevelKind::Day => self.parse_day(segment, ctx),
            LevelKind::ClipClass => self.parse_clip_class(segment, ctx),
            LevelKind::Clip => self.parse_clip_name(segment, ctx),
        }
    }

    /// Year directory: 4 digits, or 2-digit era shorthand.
    pub fn parse_year(&self, segment: &str, ctx: &ParseContext) -> Result<ParseContext, ParseError> {
        let err = |msg: &str| ParseError::new(LevelKind::Year, segment, msg);

        if !segment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err("not a number"));
        }
        let value: i32 = segment.parse().map_err(|_| err("not a number"))?;
        let year = match segment.len() {
            4 => value,
            2 => {
                if value < 50 {
                    2000 + value
                } else {
                    1900 + value
                }
            }
            _ => return Err(err("year must have two or four digits")),
        };
        if !(1900..=self.max_year).contains(&year) {
            return Err(err(&format!(
                "year {} outside [1900, {}]",
                year, self.max_year
            )));
        }

        let mut new = ctx.clone();
        new.year = Some(year);
        Ok(new)
    }

    /// Station directory: must belong to the known set when one is configured.
    pub fn parse_station(
        &self,
        segment: &str,
        ctx: &ParseContext,
    ) -> Result<ParseContext, ParseError> {
        if !self.stations.is_empty() && !self.stations.contains(segment) {
            return Err(ParseError::new(
                LevelKind::Station,
                segment,
                "unknown station",
            ));
        }
        let mut new = ctx.clone();
        new.station = Some(segment.to_string());
        Ok(new)
    }

    /// Month directory: number in [1, 12] or a 3-letter month-name prefix.
    pub fn parse_month(
        &self,
        segment: &str,
        ctx: &ParseContext,
    ) -> Result<ParseContext, ParseError> {
        let err = |msg: &str| ParseError::new(LevelKind::Month, segment, msg);

        let month = if segment.bytes().all(|b| b.is_ascii_digit()) {
            let value: u32 = segment.parse().map_err(|_| err("not a number"))?;
            if !(1..=12).contains(&value) {
                return Err(err("month outside [1, 12]"));
            }
            value
        } else {
            month_from_prefix(segment).ok_or_else(|| err("not a month name"))?
        };

        let mut new = ctx.clone();
        new.month = Some(month);
        Ok(new)
    }

    /// Day directory: plain day-of-month, or the legacy day-range form whose
    /// effective month rolls back one month when the range crosses a month
    /// boundary (`30-1jan` under a January directory is December 30th).
    pub fn parse_day(&self, segment: &str, ctx: &ParseContext) -> Result<ParseContext, ParseError> {
        let err = |msg: String| ParseError::new(LevelKind::Day, segment, msg);

        let (year, month) = match (ctx.year, ctx.month) {
            (Some(y), Some(m)) => (y, m),
            _ => return Err(err("day directory before year and month".to_string())),
        };

        let mut new = ctx.clone();
        let (eff_year, eff_month, day) = if segment.bytes().all(|b| b.is_ascii_digit()) {
            let day: u32 = segment.parse().map_err(|_| err("not a number".to_string()))?;
            (year, month, day)
        } else if let Some(caps) = DAY_RANGE_RE.captures(segment) {
            let start: u32 = caps[1].parse().map_err(|_| err("bad range".to_string()))?;
            let end: u32 = caps[2].parse().map_err(|_| err("bad range".to_string()))?;
            if let Some(prefix) = caps.get(3) {
                // The prefix tags the month the range ends in, which is the
                // directory's containing month.
                match month_from_prefix(prefix.as_str()) {
                    Some(m) if m == month => {}
                    Some(m) => {
                        return Err(err(format!(
                            "range month prefix names month {} but directory is in month {}",
                            m, month
                        )))
                    }
                    None => return Err(err("bad month prefix in range".to_string())),
                }
            }
            if end < start {
                // Range crosses a month boundary; the start day belongs to
                // the previous month (and year, across January).
                if month == 1 {
                    (year - 1, 12, start)
                } else {
                    (year, month - 1, start)
                }
            } else {
                (year, month, start)
            }
        } else {
            return Err(err("not a day number or day range".to_string()));
        };

        let last = days_in_month(eff_year, eff_month);
        if !(1..=last).contains(&day) {
            return Err(err(format!(
                "day {} outside [1, {}] for {}-{:02}",
                day, last, eff_year, eff_month
            )));
        }

        new.year = Some(eff_year);
        new.month = Some(eff_month);
        new.day = Some(day);
        Ok(new)
    }

    /// Classification directory. The name is capitalized, run through the
    /// misspelling table, then checked against the taxonomy. Nested
    /// directories accumulate into a dot-joined classification; the
    /// `Classified`/`Unclassified` sentinels leave the clip unclassified.
    ///
    /// An unrecognized leaf nested under an accumulated class is accepted as a
    /// call-type-style subclass (see DESIGN.md); an unrecognized name at the
    /// top of a classification subtree is a ParseError.
    pub fn parse_clip_class(
        &self,
        segment: &str,
        ctx: &ParseContext,
    ) -> Result<ParseContext, ParseError> {
        let err = |msg: &str| ParseError::new(LevelKind::ClipClass, segment, msg);

        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(err("classification names are alphanumeric"));
        }
        let name = capitalize(segment);
        let name = self.corrections.get(&name).cloned().unwrap_or(name);

        let mut new = ctx.clone();
        if name == "Classified" || name == "Unclassified" {
            new.clip_class = None;
        } else if ctx.class_dirs.is_empty() || ctx.clip_class.is_none() {
            match self.class_dir_names.get(&name) {
                Some(class) => new.clip_class = class.clone(),
                None => return Err(err("unrecognized classification")),
            }
        } else if let Some(parent) = &ctx.clip_class {
            new.clip_class = Some(format!("{}.{}", parent, name));
        }
        new.class_dirs.push(name);
        Ok(new)
    }

    /// Clip file name, absolute or relative grammar. Names matching neither
    /// are ParseErrors; a tenths field above 9 is specifically reported as
    /// "clip number too high".
    pub fn parse_clip_name(
        &self,
        name: &str,
        ctx: &ParseContext,
    ) -> Result<ParseContext, ParseError> {
        let err = |msg: &str| ParseError::new(LevelKind::Clip, name, msg);

        if let Some(caps) = ABSOLUTE_NAME_RE.captures(name) {
            let year: i32 = caps[2].parse().map_err(|_| err("bad year"))?;
            let month: u32 = caps[3].parse().map_err(|_| err("bad month"))?;
            let day: u32 = caps[4].parse().map_err(|_| err("bad day"))?;
            let hour: u32 = caps[5].parse().map_err(|_| err("bad hour"))?;
            let minute: u32 = caps[6].parse().map_err(|_| err("bad minute"))?;
            let second: u32 = caps[7].parse().map_err(|_| err("bad second"))?;
            let num: i64 = caps[8].parse().map_err(|_| err("bad clip number"))?;

            if !(1900..=self.max_year).contains(&year) {
                return Err(err("year out of range"));
            }
            if !(1..=12).contains(&month) {
                return Err(err("month out of range"));
            }
            if !(1..=days_in_month(year, month)).contains(&day) {
                return Err(err("day out of range"));
            }
            if hour > 23 || minute > 59 || second > 59 {
                return Err(err("time of day out of range"));
            }
            if num > 9 {
                return Err(err("clip number too high"));
            }

            let time = NaiveDate::from_ymd_opt(year, month, day)
                .and_then(|d| d.and_hms_opt(hour, minute, second))
                .ok_or_else(|| err("invalid date"))?
                + Duration::milliseconds(100 * num);

            let mut new = ctx.clone();
            new.detector = Some(caps[1].to_string());
            new.clip_time = Some(ClipTime::Absolute(time));
            Ok(new)
        } else if let Some(caps) = RELATIVE_NAME_RE.captures(name) {
            let hours: i64 = caps[2].parse().map_err(|_| err("bad hours"))?;
            let minutes: i64 = caps[3].parse().map_err(|_| err("bad minutes"))?;
            let seconds: i64 = caps[4].parse().map_err(|_| err("bad seconds"))?;
            let num: i64 = caps[5].parse().map_err(|_| err("bad clip number"))?;

            if minutes > 59 || seconds > 59 {
                return Err(err("elapsed minutes/seconds out of range"));
            }
            if num > 9 {
                return Err(err("clip number too high"));
            }

            let elapsed = Duration::hours(hours)
                + Duration::minutes(minutes)
                + Duration::seconds(seconds)
                + Duration::milliseconds(100 * num);

            let mut new = ctx.clone();
            new.detector = Some(caps[1].to_string());
            new.clip_time = Some(ClipTime::Relative(elapsed));
            Ok(new)
        } else {
            Err(err("matches neither clip file name grammar"))
        }
    }
}

/// True when `name` lexically matches either clip file name grammar. Used for
/// blast-radius counts under skipped subtrees; full field validation happens
/// in [`NameGrammar::parse_clip_name`].
pub fn matches_clip_grammar(name: &str) -> bool {
    ABSOLUTE_NAME_RE.is_match(name) || RELATIVE_NAME_RE.is_match(name)
}

fn month_from_prefix(segment: &str) -> Option<u32> {
    let prefix = segment.get(..3)?.to_ascii_lowercase();
    MONTH_PREFIXES
        .iter()
        .position(|p| *p == prefix)
        .map(|i| i as u32 + 1)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Days in a calendar month, leap-aware. Zero for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
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
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn grammar() -> NameGrammar {
        NameGrammar::new(vec!["Ridge".to_string(), "Harbor".to_string()]).with_max_year(2025)
    }

    fn ctx_ymd(year: i32, month: u32, day: u32) -> ParseContext {
        ParseContext {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            ..Default::default()
        }
    }

    #[test]
    fn test_four_digit_year() {
        let ctx = grammar().parse_year("2012", &ParseContext::default()).unwrap();
        assert_eq!(ctx.year, Some(2012));
    }

    #[test]
    fn test_two_digit_year_era_mapping() {
        let g = grammar();
        assert_eq!(g.parse_year("07", &Default::default()).unwrap().year, Some(2007));
        assert_eq!(g.parse_year("98", &Default::default()).unwrap().year, Some(1998));
        assert_eq!(g.parse_year("50", &Default::default()).unwrap().year, Some(1950));
        // 49 era-maps into the 2000s, past the grammar's upper bound
        assert!(g.parse_year("49", &Default::default()).is_err());
    }

    #[test]
    fn test_year_out_of_range() {
        let g = grammar();
        assert!(g.parse_year("1899", &Default::default()).is_err());
        assert!(g.parse_year("2026", &Default::default()).is_err());
        assert!(g.parse_year("212", &Default::default()).is_err());
        assert!(g.parse_year("notayear", &Default::default()).is_err());
    }

    #[test]
    fn test_station_set_membership() {
        let g = grammar();
        assert_eq!(
            g.parse_station("Ridge", &Default::default()).unwrap().station.as_deref(),
            Some("Ridge")
        );
        assert!(g.parse_station("Elsewhere", &Default::default()).is_err());
    }

    #[test]
    fn test_any_station_accepted_without_set() {
        let g = NameGrammar::new(vec![]);
        assert!(g.parse_station("Anything", &Default::default()).is_ok());
    }

    #[test]
    fn test_numeric_month() {
        let g = grammar();
        assert_eq!(g.parse_month("09", &Default::default()).unwrap().month, Some(9));
        assert_eq!(g.parse_month("12", &Default::default()).unwrap().month, Some(12));
        assert!(g.parse_month("0", &Default::default()).is_err());
        assert!(g.parse_month("13", &Default::default()).is_err());
    }

    #[test]
    fn test_month_name_prefix() {
        let g = grammar();
        assert_eq!(g.parse_month("jan", &Default::default()).unwrap().month, Some(1));
        assert_eq!(g.parse_month("September", &Default::default()).unwrap().month, Some(9));
        assert!(g.parse_month("xyz", &Default::default()).is_err());
    }

    #[test]
    fn test_plain_day_validated_against_month() {
        let g = grammar();
        let ctx = ctx_ymd(2012, 9, 0);
        assert_eq!(g.parse_day("15", &ctx).unwrap().day, Some(15));
        assert!(g.parse_day("31", &ctx).is_err()); // September has 30 days
    }

    #[test]
    fn test_leap_year_day() {
        let g = grammar();
        assert!(g.parse_day("29", &ctx_ymd(2012, 2, 0)).is_ok());
        assert!(g.parse_day("29", &ctx_ymd(2011, 2, 0)).is_err());
        assert!(g.parse_day("28", &ctx_ymd(1900, 2, 0)).is_ok());
        assert!(g.parse_day("29", &ctx_ymd(1900, 2, 0)).is_err()); // century, not leap
        assert!(g.parse_day("29", &ctx_ymd(2000, 2, 0)).is_ok()); // 400-year rule
    }

    #[test]
    fn test_day_range_within_month() {
        let g = grammar();
        let ctx = g.parse_day("12-14", &ctx_ymd(2012, 9, 0)).unwrap();
        assert_eq!(ctx.day, Some(12));
        assert_eq!(ctx.month, Some(9));
    }

    #[test]
    fn test_day_range_rolls_back_month() {
        // "30-1" under a September directory starts August 30th.
        let g = grammar();
        let ctx = g.parse_day("30-1sep", &ctx_ymd(2012, 9, 0)).unwrap();
        assert_eq!(ctx.year, Some(2012));
        assert_eq!(ctx.month, Some(8));
        assert_eq!(ctx.day, Some(30));
    }

    #[test]
    fn test_day_range_rolls_back_year_across_january() {
        let g = grammar();
        let ctx = g.parse_day("30-1jan", &ctx_ymd(2013, 1, 0)).unwrap();
        assert_eq!(ctx.year, Some(2012));
        assert_eq!(ctx.month, Some(12));
        assert_eq!(ctx.day, Some(30));
    }

    #[test]
    fn test_day_range_start_validated_in_effective_month() {
        // "31-1" under March would start in February; February has no 31st.
        let g = grammar();
        assert!(g.parse_day("31-1mar", &ctx_ymd(2012, 3, 0)).is_err());
    }

    #[test]
    fn test_day_range_prefix_must_match_containing_month() {
        let g = grammar();
        assert!(g.parse_day("30-1jan", &ctx_ymd(2012, 9, 0)).is_err());
    }

    #[test]
    fn test_class_dir_taxonomy() {
        let g = grammar();
        let ctx = g.parse_clip_class("Calls", &Default::default()).unwrap();
        assert_eq!(ctx.clip_class.as_deref(), Some("Call"));
        assert_eq!(ctx.class_dirs, vec!["Calls".to_string()]);

        assert!(g.parse_clip_class("Garbage", &Default::default()).is_err());
        assert!(g.parse_clip_class("no_dots", &Default::default()).is_err());
    }

    #[test]
    fn test_class_sentinels_leave_unclassified() {
        let g = grammar();
        let ctx = g.parse_clip_class("Unclassified", &Default::default()).unwrap();
        assert_eq!(ctx.clip_class, None);
        let ctx = g.parse_clip_class("Classified", &Default::default()).unwrap();
        assert_eq!(ctx.clip_class, None);
    }

    #[test]
    fn test_misspelling_correction() {
        let g = grammar();
        let ctx = g.parse_clip_class("Noice", &Default::default()).unwrap();
        assert_eq!(ctx.clip_class.as_deref(), Some("Noise"));
        let ctx = g.parse_clip_class("Classifed", &Default::default()).unwrap();
        assert_eq!(ctx.clip_class, None);
    }

    #[test]
    fn test_nested_class_dirs_accumulate() {
        let g = grammar();
        let ctx = g.parse_clip_class("Calls", &Default::default()).unwrap();
        let ctx = g.parse_clip_class("WIWA", &ctx).unwrap();
        assert_eq!(ctx.clip_class.as_deref(), Some("Call.WIWA"));
        let ctx = g.parse_clip_class("Songtype", &ctx).unwrap();
        assert_eq!(ctx.clip_class.as_deref(), Some("Call.WIWA.Songtype"));
        assert_eq!(ctx.class_dirs.len(), 3);
    }

    #[test]
    fn test_lowercase_class_dir_capitalized() {
        let g = grammar();
        let ctx = g.parse_clip_class("noise", &Default::default()).unwrap();
        assert_eq!(ctx.clip_class.as_deref(), Some("Noise"));
    }

    #[test]
    fn test_absolute_clip_name_exact_decode() {
        let g = grammar();
        let ctx = g
            .parse_clip_name("Tseep_2012-01-02_12.34.56_07.wav", &Default::default())
            .unwrap();
        assert_eq!(ctx.detector.as_deref(), Some("Tseep"));
        let expected = NaiveDate::from_ymd_opt(2012, 1, 2)
            .unwrap()
            .and_hms_milli_opt(12, 34, 56, 700)
            .unwrap();
        assert_eq!(ctx.clip_time, Some(ClipTime::Absolute(expected)));
    }

    #[test]
    fn test_relative_clip_name_exact_decode() {
        let g = grammar();
        let ctx = g
            .parse_clip_name("Tseep_123.45.56_05.wav", &Default::default())
            .unwrap();
        assert_eq!(ctx.detector.as_deref(), Some("Tseep"));
        let expected = Duration::hours(123)
            + Duration::minutes(45)
            + Duration::seconds(56)
            + Duration::milliseconds(500);
        assert_eq!(ctx.clip_time, Some(ClipTime::Relative(expected)));
    }

    #[test]
    fn test_relative_clip_short_hours_field() {
        let g = grammar();
        let ctx = g
            .parse_clip_name("Thrush_3.05.09_00.wav", &Default::default())
            .unwrap();
        let expected = Duration::hours(3) + Duration::minutes(5) + Duration::seconds(9);
        assert_eq!(ctx.clip_time, Some(ClipTime::Relative(expected)));
    }

    #[test]
    fn test_clip_number_too_high() {
        let g = grammar();
        let err = g
            .parse_clip_name("Tseep_2012-01-02_12.34.56_17.wav", &Default::default())
            .unwrap_err();
        assert_eq!(err.message, "clip number too high");
        let err = g
            .parse_clip_name("Tseep_123.45.56_99.wav", &Default::default())
            .unwrap_err();
        assert_eq!(err.message, "clip number too high");
    }

    #[test]
    fn test_clip_name_field_ranges() {
        let g = grammar();
        assert!(g
            .parse_clip_name("Tseep_2012-13-02_12.34.56_00.wav", &Default::default())
            .is_err());
        assert!(g
            .parse_clip_name("Tseep_2012-02-30_12.34.56_00.wav", &Default::default())
            .is_err());
        assert!(g
            .parse_clip_name("Tseep_2012-01-02_24.00.00_00.wav", &Default::default())
            .is_err());
        assert!(g
            .parse_clip_name("Tseep_123.60.00_00.wav", &Default::default())
            .is_err());
    }

    #[test]
    fn test_clip_name_matching_neither_grammar() {
        let g = grammar();
        assert!(g.parse_clip_name("notes.txt", &Default::default()).is_err());
        assert!(g
            .parse_clip_name("Tseep_2012-01-02_12.34.56_07.mp3", &Default::default())
            .is_err());
        assert!(g
            .parse_clip_name("Tseep_1234.00.00_00.wav", &Default::default())
            .is_err());
    }

    #[test]
    fn test_days_in_month_table() {
        assert_eq!(days_in_month(2012, 1), 31);
        assert_eq!(days_in_month(2012, 4), 30);
        assert_eq!(days_in_month(2012, 2), 29);
        assert_eq!(days_in_month(2013, 2), 28);
        assert_eq!(days_in_month(2013, 0), 0);
    }
}
