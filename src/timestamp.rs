use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike as _, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset as _,
    TimeZone as _, Timelike as _, Utc,
};

/// Three U+00A0 between the date and the time.
pub const SEPARATOR: &str = "\u{a0}\u{a0}\u{a0}";

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A parsed `data-timestamp` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceInstant {
    /// Carried an offset (or `Z`), or was a bare date (UTC midnight).
    Absolute(DateTime<Utc>),
    /// Date and time without an offset: already wall-clock time for the viewer.
    Floating(NaiveDateTime),
}

impl SourceInstant {
    /// `None` for empty or unrecognised input.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::Absolute(dt.with_timezone(&Utc)));
        }

        if let Some(naive) = s
            .strip_suffix(['Z', 'z'])
            .and_then(parse_naive_date_time)
        {
            return Some(Self::Absolute(Utc.from_utc_datetime(&naive)));
        }

        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(Self::Absolute(dt.with_timezone(&Utc)));
            }
        }

        if let Some(naive) = parse_naive_date_time(s) {
            return Some(Self::Floating(naive));
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Self::Absolute(Utc.from_utc_datetime(&naive)))
    }
}

fn parse_naive_date_time(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// The timezone the viewer's environment reports as local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl ViewerZone {
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Wall-clock time of `instant` in this zone.
    pub fn localize(&self, instant: SourceInstant) -> NaiveDateTime {
        match (instant, self) {
            (SourceInstant::Floating(naive), _) => naive,
            (SourceInstant::Absolute(utc), Self::Local) => utc.with_timezone(&Local).naive_local(),
            (SourceInstant::Absolute(utc), Self::Fixed(offset)) => {
                utc.with_timezone(offset).naive_local()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidZone(String);

impl fmt::Display for InvalidZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid zone {:?} (expected `local`, `utc` or an offset like `+02:00`)",
            self.0
        )
    }
}

impl std::error::Error for InvalidZone {}

impl FromStr for ViewerZone {
    type Err = InvalidZone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if t.eq_ignore_ascii_case("utc") || t == "Z" {
            return Ok(Self::utc());
        }
        t.parse::<FixedOffset>()
            .map(Self::Fixed)
            .map_err(|_| InvalidZone(s.to_string()))
    }
}

/// `DD.MM.YYYY` + [`SEPARATOR`] + `HH:mm`.
pub fn format_local(local: NaiveDateTime) -> String {
    format!(
        "{:02}.{:02}.{}{SEPARATOR}{:02}:{:02}",
        local.day(),
        local.month(),
        local.year(),
        local.hour(),
        local.minute()
    )
}

/// An instant together with the text shown for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampRecord {
    pub source: SourceInstant,
    pub display: String,
}

impl TimestampRecord {
    pub fn from_attribute(raw: Option<&str>, zone: &ViewerZone) -> Option<Self> {
        let raw = raw.filter(|s| !s.is_empty())?;
        let Some(source) = SourceInstant::parse(raw) else {
            tracing::debug!(value = raw, "skipping unparseable timestamp");
            return None;
        };
        Some(Self {
            source,
            display: format_local(zone.localize(source)),
        })
    }
}

/// Absent, empty and unparseable input all yield `None`.
pub fn format_timestamp(iso: Option<&str>, zone: &ViewerZone) -> Option<String> {
    TimestampRecord::from_attribute(iso, zone).map(|record| record.display)
}

/// An element carrying a source timestamp and a writable text slot.
pub trait TimestampSlot {
    fn source(&self) -> Option<String>;
    fn set_text(&mut self, text: &str);
}

/// Rewrites every element with a usable source; returns how many were written.
pub fn convert_all_timestamps<T: TimestampSlot>(elements: &mut [T], zone: &ViewerZone) -> usize {
    let mut converted = 0;
    for element in elements.iter_mut() {
        let source = element.source();
        if let Some(text) = format_timestamp(source.as_deref(), zone) {
            element.set_text(&text);
            converted += 1;
        }
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(s: &str) -> ViewerZone {
        s.parse().unwrap()
    }

    #[derive(Debug, Clone, PartialEq)]
    struct FakeSlot {
        source: Option<String>,
        text: String,
    }

    impl FakeSlot {
        fn new(source: Option<&str>, text: &str) -> Self {
            Self {
                source: source.map(str::to_string),
                text: text.to_string(),
            }
        }
    }

    impl TimestampSlot for FakeSlot {
        fn source(&self) -> Option<String> {
            self.source.clone()
        }

        fn set_text(&mut self, text: &str) {
            self.text = text.to_string();
        }
    }

    #[test]
    fn utc_viewer_sees_utc_fields() {
        assert_eq!(
            format_timestamp(Some("2025-12-20T19:33:00Z"), &ViewerZone::utc()).as_deref(),
            Some("20.12.2025\u{a0}\u{a0}\u{a0}19:33")
        );
    }

    #[test]
    fn offset_viewer_can_cross_midnight() {
        let zone = offset("+05:30");
        assert_eq!(
            format_timestamp(Some("2025-12-31T20:45:59.999Z"), &zone).as_deref(),
            Some("01.01.2026\u{a0}\u{a0}\u{a0}02:15")
        );
        let zone = offset("-08:00");
        assert_eq!(
            format_timestamp(Some("2025-03-01T03:07:00+00:00"), &zone).as_deref(),
            Some("28.02.2025\u{a0}\u{a0}\u{a0}19:07")
        );
    }

    #[test]
    fn separator_only_between_date_and_time() {
        let out = format_timestamp(Some("2024-02-09T04:05:00+01:00"), &ViewerZone::utc()).unwrap();
        assert_eq!(out.matches('\u{a0}').count(), 3);
        let (date, time) = out.split_once(SEPARATOR).unwrap();
        assert_eq!(date, "09.02.2024");
        assert_eq!(time, "03:05");
        assert!(!date.contains('\u{a0}') && !time.contains('\u{a0}'));
    }

    #[test]
    fn repeated_calls_agree() {
        let zone = offset("+02:00");
        let first = format_timestamp(Some("2025-06-01T10:00:00Z"), &zone);
        for _ in 0..3 {
            assert_eq!(format_timestamp(Some("2025-06-01T10:00:00Z"), &zone), first);
        }
    }

    #[test]
    fn absent_empty_and_garbage_are_skipped() {
        let zone = ViewerZone::utc();
        assert_eq!(format_timestamp(None, &zone), None);
        assert_eq!(format_timestamp(Some(""), &zone), None);
        assert_eq!(format_timestamp(Some("   "), &zone), None);
        assert_eq!(format_timestamp(Some("yesterday"), &zone), None);
        assert_eq!(format_timestamp(Some("2025-13-40T99:00:00Z"), &zone), None);
    }

    #[test]
    fn lenient_iso_shapes() {
        let zone = ViewerZone::utc();
        assert_eq!(
            format_timestamp(Some("2025-12-20T19:33Z"), &zone).as_deref(),
            Some("20.12.2025\u{a0}\u{a0}\u{a0}19:33")
        );
        assert_eq!(
            format_timestamp(Some("2025-12-20T21:33+02:00"), &zone).as_deref(),
            Some("20.12.2025\u{a0}\u{a0}\u{a0}19:33")
        );
        // date-only is UTC midnight
        assert_eq!(
            format_timestamp(Some("2025-12-20"), &offset("-01:00")).as_deref(),
            Some("19.12.2025\u{a0}\u{a0}\u{a0}23:00")
        );
        // no offset: shown as written whatever the zone
        assert_eq!(
            format_timestamp(Some("2025-12-20T08:09:10"), &offset("+09:00")).as_deref(),
            Some("20.12.2025\u{a0}\u{a0}\u{a0}08:09")
        );
    }

    #[test]
    fn year_is_not_padded() {
        assert_eq!(
            format_timestamp(Some("0987-05-04T03:02:00Z"), &ViewerZone::utc()).as_deref(),
            Some("04.05.987\u{a0}\u{a0}\u{a0}03:02")
        );
    }

    #[test]
    fn zone_parsing() {
        assert_eq!("local".parse::<ViewerZone>(), Ok(ViewerZone::Local));
        assert_eq!("UTC".parse::<ViewerZone>(), Ok(ViewerZone::utc()));
        assert_eq!(
            "-0330".parse::<ViewerZone>(),
            Ok(ViewerZone::Fixed(FixedOffset::west_opt(3 * 3600 + 30 * 60).unwrap()))
        );
        assert_eq!(
            " +02:00 ".parse::<ViewerZone>(),
            Ok(ViewerZone::Fixed(FixedOffset::east_opt(7200).unwrap()))
        );
        for bad in ["+25:00", "Europe/Berlin", "+1:2:3:4", "+2:00", "02:00", "+", ""] {
            assert!(bad.parse::<ViewerZone>().is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn local_zone_follows_the_system_offset() {
        let raw = "2025-12-20T19:33:00Z";
        let instant: DateTime<Utc> = raw.parse().unwrap();
        let local = instant.with_timezone(&Local);

        let expected = format_local(local.naive_local());
        assert_eq!(
            format_timestamp(Some(raw), &ViewerZone::Local),
            Some(expected.clone())
        );
        // same text as a fixed zone pinned to the system's offset at that instant
        let pinned = ViewerZone::Fixed(*local.offset());
        assert_eq!(format_timestamp(Some(raw), &pinned), Some(expected));
    }

    #[test]
    fn converts_only_elements_with_sources() {
        let mut slots = vec![
            FakeSlot::new(Some("2025-12-20T19:33:00Z"), "raw one"),
            FakeSlot::new(None, "keep me"),
            FakeSlot::new(Some("2025-01-02T03:04:00Z"), "raw two"),
        ];
        let untouched = slots[1].clone();

        let zone = ViewerZone::utc();
        assert_eq!(convert_all_timestamps(&mut slots, &zone), 2);
        assert_eq!(slots[0].text, "20.12.2025\u{a0}\u{a0}\u{a0}19:33");
        assert_eq!(slots[1], untouched);
        assert_eq!(slots[2].text, "02.01.2025\u{a0}\u{a0}\u{a0}03:04");

        let after_first = slots.clone();
        assert_eq!(convert_all_timestamps(&mut slots, &zone), 2);
        assert_eq!(slots, after_first);
    }

    #[test]
    fn malformed_source_leaves_text_alone() {
        let mut slots = vec![FakeSlot::new(Some("not a date"), "as rendered")];
        assert_eq!(convert_all_timestamps(&mut slots, &ViewerZone::utc()), 0);
        assert_eq!(slots[0].text, "as rendered");
    }
}
