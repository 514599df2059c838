//! Timeframe domain: the structured form (§6), scalar-shorthand parsing,
//! and the coarsest-timeframe ordering used by the timeframe resolver
//! (C10) and the validator's timeframe-consistency phase (§4.1 phase 5).

use crate::errors::CoreError;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Timeframe type/class (§6). Ordering is by class first (`minute < hour <
/// day < week < month < quarter < year`, per §4.8), then by interval. `bday`
/// sorts alongside `day` (same granularity); `session` is the coarsest
/// class, since a session-bounded timeframe spans at least a full trading
/// session. Neither placement is specified by §4.8 — both are explicit
/// decisions recorded in DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeframeType {
    Minute,
    Hour,
    Day,
    BDay,
    Week,
    Month,
    Quarter,
    Year,
    Session,
}

impl TimeframeType {
    fn class_rank(self) -> u8 {
        match self {
            TimeframeType::Minute => 0,
            TimeframeType::Hour => 1,
            TimeframeType::Day | TimeframeType::BDay => 2,
            TimeframeType::Week => 3,
            TimeframeType::Month => 4,
            TimeframeType::Quarter => 5,
            TimeframeType::Year => 6,
            TimeframeType::Session => 7,
        }
    }

    fn code(self) -> &'static str {
        match self {
            TimeframeType::Minute => "Min",
            TimeframeType::Hour => "H",
            TimeframeType::Day => "D",
            TimeframeType::BDay => "BD",
            TimeframeType::Week => "W",
            TimeframeType::Month => "M",
            TimeframeType::Quarter => "Q",
            TimeframeType::Year => "Y",
            TimeframeType::Session => "S",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Anchor {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    fn from_code(s: &str) -> Option<Self> {
        Some(match s {
            "MON" => Weekday::Mon,
            "TUE" => Weekday::Tue,
            "WED" => Weekday::Wed,
            "THU" => Weekday::Thu,
            "FRI" => Weekday::Fri,
            "SAT" => Weekday::Sat,
            "SUN" => Weekday::Sun,
            _ => return None,
        })
    }

    fn code(self) -> &'static str {
        match self {
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
            Weekday::Sat => "SAT",
            Weekday::Sun => "SUN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekOfMonth {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl WeekOfMonth {
    fn from_code(s: &str) -> Option<Self> {
        Some(match s.to_ascii_lowercase().as_str() {
            "1st" => WeekOfMonth::First,
            "2nd" => WeekOfMonth::Second,
            "3rd" => WeekOfMonth::Third,
            "4th" => WeekOfMonth::Fourth,
            "last" => WeekOfMonth::Last,
            _ => return None,
        })
    }

    fn code(self) -> &'static str {
        match self {
            WeekOfMonth::First => "1st",
            WeekOfMonth::Second => "2nd",
            WeekOfMonth::Third => "3rd",
            WeekOfMonth::Fourth => "4th",
            WeekOfMonth::Last => "last",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SessionAnchor {
    BeforeOpen,
    AfterOpen,
    BeforeClose,
    AfterClose,
}

/// The full structured timeframe (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeframe {
    #[serde(rename = "type")]
    pub timeframe_type: TimeframeType,
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday: Option<Weekday>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_of_month: Option<WeekOfMonth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_anchor: Option<SessionAnchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_offset_minutes: Option<i32>,
}

impl Timeframe {
    pub fn simple(timeframe_type: TimeframeType, interval: u32) -> Self {
        Self {
            timeframe_type,
            interval,
            anchor: None,
            month: None,
            weekday: None,
            week_of_month: None,
            session: None,
            session_anchor: None,
            time_offset_minutes: None,
        }
    }

    /// Canonical scalar-shorthand serialization (inverse of `parse_scalar`
    /// for the forms this compiler produces). Used by the CSE optimiser to
    /// fold a timeframe into its semantic hash input (§4.9).
    pub fn to_scalar(&self) -> String {
        let mut s = format!("{}{}", self.interval, self.timeframe_type.code());
        if let Some(anchor) = self.anchor {
            if matches!(anchor, Anchor::End) {
                s.push('E');
            } else {
                s.push('S');
            }
        }
        if let Some(wd) = self.weekday {
            s.push('-');
            s.push_str(wd.code());
        }
        if let Some(wom) = self.week_of_month {
            s.push('-');
            s.push_str(wom.code());
        }
        s
    }

    /// The ordering key used by `coarsest` (§4.8): class rank first, then
    /// interval magnitude within class. Per §4.8 this is independent of the
    /// timeframe's real-time duration — 60 minutes sorts below 1 hour.
    fn order_key(&self) -> (u8, u32) {
        (self.timeframe_type.class_rank(), self.interval)
    }
}

impl Ord for Timeframe {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl PartialOrd for Timeframe {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for Timeframe {}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_scalar())
    }
}

/// Parse a scalar shorthand (`"1Min"`, `"1H"`, `"1D"`, `"1W-FRI"`,
/// `"1W-MON-2nd"`, `"1ME"`, …) into the structured form (§6).
pub fn parse_scalar(raw: &str) -> Result<Timeframe, CoreError> {
    let bytes = raw.as_bytes();
    let digit_end = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if digit_end == 0 {
        return Err(CoreError::InvalidTimeframe(raw.to_string()));
    }
    let interval: u32 = raw[..digit_end]
        .parse()
        .map_err(|_| CoreError::InvalidTimeframe(raw.to_string()))?;
    let rest = &raw[digit_end..];

    let mut parts = rest.split('-');
    let type_code = parts.next().unwrap_or("");
    let (timeframe_type, anchor) = parse_type_code(type_code).ok_or_else(|| CoreError::InvalidTimeframe(raw.to_string()))?;

    let mut weekday = None;
    let mut week_of_month = None;
    for suffix in parts {
        if let Some(wd) = Weekday::from_code(&suffix.to_ascii_uppercase()) {
            weekday = Some(wd);
        } else if let Some(wom) = WeekOfMonth::from_code(suffix) {
            week_of_month = Some(wom);
        } else {
            return Err(CoreError::InvalidTimeframe(raw.to_string()));
        }
    }

    Ok(Timeframe {
        timeframe_type,
        interval,
        anchor,
        month: None,
        weekday,
        week_of_month,
        session: None,
        session_anchor: None,
        time_offset_minutes: None,
    })
}

fn parse_type_code(code: &str) -> Option<(TimeframeType, Option<Anchor>)> {
    Some(match code {
        "Min" => (TimeframeType::Minute, None),
        "H" => (TimeframeType::Hour, None),
        "D" => (TimeframeType::Day, None),
        "BD" => (TimeframeType::BDay, None),
        "W" => (TimeframeType::Week, None),
        "M" => (TimeframeType::Month, None),
        "ME" => (TimeframeType::Month, Some(Anchor::End)),
        "MS" => (TimeframeType::Month, Some(Anchor::Start)),
        "Q" => (TimeframeType::Quarter, None),
        "QE" => (TimeframeType::Quarter, Some(Anchor::End)),
        "QS" => (TimeframeType::Quarter, Some(Anchor::Start)),
        "Y" => (TimeframeType::Year, None),
        "YE" => (TimeframeType::Year, Some(Anchor::End)),
        "YS" => (TimeframeType::Year, Some(Anchor::Start)),
        _ => return None,
    })
}

/// The coarsest timeframe among `inputs`, per §4.8 (`max` under the
/// timeframe ordering). Returns `None` for an empty slice.
pub fn coarsest<'a>(inputs: impl IntoIterator<Item = &'a Timeframe>) -> Option<&'a Timeframe> {
    inputs.into_iter().max()
}

/// Accept either a scalar shorthand string or the structured JSON shape
/// (§6: "Scalar shorthands ... must be accepted and parsed to the same
/// structured form"). Used where UI graph JSON feeds a `timeframe` field.
pub fn from_json_value(value: &serde_json::Value) -> Result<Timeframe, CoreError> {
    match value {
        serde_json::Value::String(s) => parse_scalar(s),
        serde_json::Value::Object(_) => serde_json::from_value(value.clone())
            .map_err(|e| CoreError::InvalidTimeframe(e.to_string())),
        other => Err(CoreError::InvalidTimeframe(other.to_string())),
    }
}

/// `serde(deserialize_with = ...)` helper for an optional timeframe field
/// that may arrive as either shape.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<Timeframe>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => from_json_value(&v).map(Some).map_err(serde::de::Error::custom),
    }
}
