//! Parsing of the 12-hour clock strings quizzes are scheduled with.
//!
//! All instants are naive wall-clock times in the platform's single
//! configured timezone. The caller supplies "now"; nothing here reads a clock.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::domain::Quiz;

static CLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{1,2})(?::(\d{1,2}))?\s+([AaPp][Mm])$")
        .expect("CLOCK_REGEX is a valid regex pattern")
});

static CUSTOM_DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}),\s*(.+)$")
        .expect("CUSTOM_DATE_REGEX is a valid regex pattern")
});

/// Parses `"hh:mm[:ss] AM/PM"`. Seconds default to zero.
pub fn parse_clock_time(time_str: &str) -> Option<NaiveTime> {
    let caps = CLOCK_REGEX.captures(time_str.trim())?;

    let hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    let seconds: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };
    if !(1..=12).contains(&hours) {
        return None;
    }

    let is_pm = caps[4].eq_ignore_ascii_case("PM");
    let hours = match (hours, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };

    NaiveTime::from_hms_opt(hours, minutes, seconds)
}

/// Anchors a clock string on `on_date`.
pub fn parse_clock_string(time_str: &str, on_date: NaiveDate) -> Option<NaiveDateTime> {
    parse_clock_time(time_str).map(|time| on_date.and_time(time))
}

/// Parses a caller-supplied current time: `"DD/MM/YYYY, hh:mm:ss AM/PM"`.
pub fn parse_custom_date(value: &str) -> Option<NaiveDateTime> {
    let caps = CUSTOM_DATE_REGEX.captures(value.trim())?;

    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    parse_clock_string(&caps[4], date)
}

/// Formats as `"hh:mm:ss AM/PM"` with zero padding.
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%I:%M:%S %p").to_string()
}

pub fn start_of_day(instant: NaiveDateTime) -> NaiveDateTime {
    instant.date().and_time(NaiveTime::default())
}

/// Start and end instants of a scheduled quiz.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuizWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl QuizWindow {
    /// `None` when either time is absent or unparseable.
    pub fn for_quiz(quiz: &Quiz) -> Option<Self> {
        let start = parse_clock_string(quiz.start_time.as_deref()?, quiz.date)?;
        let end = parse_clock_string(quiz.end_time.as_deref()?, quiz.date)?;
        Some(QuizWindow { start, end })
    }

    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.start <= now && now <= self.end
    }

    pub fn elapsed_seconds(&self, now: NaiveDateTime) -> i64 {
        (now - self.start).num_seconds()
    }
}

/// End time for a quiz of `question_count` questions paced at
/// `seconds_per_question`, formatted as a clock string.
///
/// `None` when the last slot would end at or after midnight. Clock strings
/// carry no date, so such an end would read as earlier than the start.
pub fn end_time_for(start: NaiveTime, question_count: u64, seconds_per_question: u32) -> Option<String> {
    let total = i64::try_from(question_count)
        .ok()?
        .checked_mul(i64::from(seconds_per_question))?;
    let (end, wrapped) = start.overflowing_add_signed(Duration::try_seconds(total)?);
    (wrapped == 0).then(|| format_clock(end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{Money, QuizType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_morning_and_evening_times() {
        assert_eq!(
            parse_clock_time("09:05:30 AM"),
            NaiveTime::from_hms_opt(9, 5, 30)
        );
        assert_eq!(
            parse_clock_time("07:15:00 PM"),
            NaiveTime::from_hms_opt(19, 15, 0)
        );
    }

    #[test]
    fn handles_twelve_oclock_edges() {
        assert_eq!(parse_clock_time("12:00:00 AM"), NaiveTime::from_hms_opt(0, 0, 0));
        assert_eq!(parse_clock_time("12:30:00 PM"), NaiveTime::from_hms_opt(12, 30, 0));
    }

    #[test]
    fn seconds_are_optional_and_meridian_case_insensitive() {
        assert_eq!(parse_clock_time("8:45 pm"), NaiveTime::from_hms_opt(20, 45, 0));
    }

    #[test]
    fn rejects_malformed_clock_strings() {
        for input in ["", "10:00", "10:00:00", "13:00:00 PM", "00:10:00 AM", "10:61:00 AM", "ten AM", "10:00:00 XM"] {
            assert!(parse_clock_time(input).is_none(), "{input} should be rejected");
        }
    }

    #[test]
    fn clock_strings_round_trip() {
        for hour in 1..=12u32 {
            for meridian in ["AM", "PM"] {
                for (minute, second) in [(0, 0), (7, 9), (30, 45), (59, 59)] {
                    let text = format!("{:02}:{:02}:{:02} {}", hour, minute, second, meridian);
                    let parsed = parse_clock_time(&text).expect("valid clock string");
                    assert_eq!(format_clock(parsed), text);
                }
            }
        }
    }

    #[test]
    fn round_trip_normalizes_omitted_seconds() {
        let parsed = parse_clock_time("9:05 AM").unwrap();
        assert_eq!(format_clock(parsed), "09:05:00 AM");
    }

    #[test]
    fn anchors_on_date() {
        let instant = parse_clock_string("06:00:00 PM", date(2024, 5, 10)).unwrap();
        assert_eq!(instant, date(2024, 5, 10).and_hms_opt(18, 0, 0).unwrap());
    }

    #[test]
    fn parses_custom_current_time() {
        let now = parse_custom_date("10/05/2024, 06:00:15 PM").unwrap();
        assert_eq!(now, date(2024, 5, 10).and_hms_opt(18, 0, 15).unwrap());

        assert!(parse_custom_date("10/05/2024").is_none());
        assert!(parse_custom_date("31/02/2024, 06:00:15 PM").is_none());
        assert!(parse_custom_date("2024-05-10 18:00").is_none());
    }

    #[test]
    fn window_requires_both_times() {
        let mut quiz = Quiz::new(
            "Window",
            QuizType::Lite,
            date(2024, 5, 10),
            Some("06:00:00 PM".to_string()),
            Money::ZERO,
        );
        assert!(QuizWindow::for_quiz(&quiz).is_none());

        quiz.end_time = Some("06:05:00 PM".to_string());
        let window = QuizWindow::for_quiz(&quiz).unwrap();
        assert!(window.contains(date(2024, 5, 10).and_hms_opt(18, 5, 0).unwrap()));
        assert!(!window.contains(date(2024, 5, 10).and_hms_opt(18, 5, 1).unwrap()));
        assert_eq!(
            window.elapsed_seconds(date(2024, 5, 10).and_hms_opt(18, 0, 25).unwrap()),
            25
        );
    }

    #[test]
    fn end_time_adds_question_pacing() {
        let start = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert_eq!(end_time_for(start, 30, 10).as_deref(), Some("06:05:00 PM"));
        assert_eq!(end_time_for(start, 0, 10).as_deref(), Some("06:00:00 PM"));
    }

    #[test]
    fn end_time_never_wraps_past_midnight() {
        let start = NaiveTime::from_hms_opt(23, 59, 30).unwrap();
        assert_eq!(end_time_for(start, 2, 10).as_deref(), Some("11:59:50 PM"));
        assert_eq!(end_time_for(start, 3, 10), None);
        assert_eq!(end_time_for(start, 200, 10), None);
    }

    #[test]
    fn start_of_day_truncates_time() {
        let instant = date(2024, 5, 10).and_hms_opt(18, 30, 0).unwrap();
        assert_eq!(start_of_day(instant), date(2024, 5, 10).and_hms_opt(0, 0, 0).unwrap());
    }
}
