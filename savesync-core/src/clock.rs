//! Version clock — sortable string tokens for modification instants.
//!
//! A [`Token`] is a UTC instant truncated to whole seconds and rendered as
//! `yyMMdd-HHmmss`. Every token has the same width, so sorting token strings
//! sorts the instants they encode. Snapshot names are `<token>.sav`; the
//! newest snapshot in a group is the greatest name, no metadata needed.
//!
//! Two-digit years limit the supported range to 2000-01-01 ..= 2099-12-31.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Serialize, Serializer};

use crate::error::ClockError;

/// Rendering format of a token (chrono strftime syntax).
pub const TOKEN_FORMAT: &str = "%y%m%d-%H%M%S";

/// Fixed content-type suffix appended to every snapshot name.
pub const SNAPSHOT_SUFFIX: &str = ".sav";

const TOKEN_LEN: usize = 13;
const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2099;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A modification instant at one-second resolution.
///
/// `Ord` on tokens matches both chronological order and the lexicographic
/// order of their string forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(DateTime<Utc>);

impl Token {
    /// Encode an instant, dropping sub-second precision.
    pub fn from_instant(instant: DateTime<Utc>) -> Result<Self, ClockError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&instant.year()) {
            return Err(ClockError::OutOfRange {
                instant: instant.to_rfc3339(),
            });
        }
        let truncated = instant
            .with_nanosecond(0)
            .ok_or_else(|| ClockError::OutOfRange {
                instant: instant.to_rfc3339(),
            })?;
        Ok(Self(truncated))
    }

    /// Encode a filesystem timestamp.
    pub fn from_system_time(time: SystemTime) -> Result<Self, ClockError> {
        Self::from_instant(DateTime::<Utc>::from(time))
    }

    /// Decode a `yyMMdd-HHmmss` string. Only the canonical form is accepted.
    pub fn parse(s: &str) -> Result<Self, ClockError> {
        let malformed = || ClockError::Malformed(s.to_string());
        if s.len() != TOKEN_LEN || s.as_bytes()[6] != b'-' {
            return Err(malformed());
        }
        if !s
            .bytes()
            .enumerate()
            .all(|(i, b)| i == 6 || b.is_ascii_digit())
        {
            return Err(malformed());
        }

        // chrono's `%y` pivots at 1969; tokens always mean 20yy.
        let naive = NaiveDateTime::parse_from_str(&format!("20{s}"), "%Y%m%d-%H%M%S")
            .map_err(|_| malformed())?;
        let token = Self(Utc.from_utc_datetime(&naive));
        if token.to_string() != s {
            return Err(malformed());
        }
        Ok(token)
    }

    /// The decoded instant.
    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TOKEN_FORMAT))
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Token {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// SnapshotName
// ---------------------------------------------------------------------------

/// Remote snapshot file name: `<token>.sav`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotName {
    token: Token,
}

impl SnapshotName {
    pub fn new(token: Token) -> Self {
        Self { token }
    }

    /// Parse a remote file name. Anything other than `<token>.sav` is rejected.
    pub fn parse(name: &str) -> Result<Self, ClockError> {
        let stem = name
            .strip_suffix(SNAPSHOT_SUFFIX)
            .ok_or_else(|| ClockError::NotASnapshot(name.to_string()))?;
        let token =
            Token::parse(stem).map_err(|_| ClockError::NotASnapshot(name.to_string()))?;
        Ok(Self { token })
    }

    pub fn token(&self) -> Token {
        self.token
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.token, SNAPSHOT_SUFFIX)
    }
}

impl Serialize for SnapshotName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<Token> for SnapshotName {
    fn from(token: Token) -> Self {
        Self::new(token)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn encodes_fixed_width() {
        let token = Token::from_instant(utc(2024, 3, 7, 9, 5, 1)).unwrap();
        assert_eq!(token.to_string(), "240307-090501");
    }

    #[test]
    fn truncates_sub_second_precision() {
        let base = utc(2024, 3, 7, 9, 5, 1);
        let a = Token::from_instant(base + Duration::milliseconds(10)).unwrap();
        let b = Token::from_instant(base + Duration::milliseconds(990)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.instant(), base);
    }

    #[rstest]
    #[case(utc(2000, 1, 1, 0, 0, 0))]
    #[case(utc(2023, 12, 31, 23, 59, 59))]
    #[case(utc(2070, 6, 15, 12, 30, 45))]
    #[case(utc(2099, 12, 31, 23, 59, 59))]
    fn decode_reproduces_encoded_instant(#[case] instant: DateTime<Utc>) {
        let token = Token::from_instant(instant).unwrap();
        let decoded = Token::parse(&token.to_string()).unwrap();
        assert_eq!(decoded.instant(), instant);
    }

    #[rstest]
    #[case(utc(1999, 12, 31, 23, 59, 59))]
    #[case(utc(2100, 1, 1, 0, 0, 0))]
    fn rejects_instants_outside_range(#[case] instant: DateTime<Utc>) {
        assert!(matches!(
            Token::from_instant(instant),
            Err(ClockError::OutOfRange { .. })
        ));
    }

    #[rstest]
    #[case("")]
    #[case("240307090501")]
    #[case("240307-0905")]
    #[case("24030a-090501")]
    #[case("241307-090501")]
    #[case("240230-090501")]
    #[case("240307_090501")]
    fn rejects_malformed_tokens(#[case] input: &str) {
        assert!(matches!(Token::parse(input), Err(ClockError::Malformed(_))));
    }

    #[test]
    fn string_order_matches_time_order() {
        let times = [
            utc(2023, 12, 31, 23, 59, 59),
            utc(2024, 1, 1, 0, 0, 0),
            utc(2024, 1, 1, 0, 0, 1),
            utc(2024, 10, 2, 8, 0, 0),
        ];
        let tokens: Vec<Token> = times
            .iter()
            .map(|t| Token::from_instant(*t).unwrap())
            .collect();
        for pair in tokens.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].to_string() < pair[1].to_string());
        }
    }

    #[test]
    fn snapshot_name_has_suffix() {
        let token = Token::from_instant(utc(2024, 3, 7, 9, 5, 1)).unwrap();
        let name = SnapshotName::new(token);
        assert_eq!(name.to_string(), "240307-090501.sav");
        assert_eq!(SnapshotName::parse("240307-090501.sav").unwrap(), name);
    }

    #[rstest]
    #[case(".")]
    #[case("..")]
    #[case("240307-090501")]
    #[case("240307-090501.sav.partial")]
    #[case("notes.txt")]
    fn snapshot_name_rejects_other_files(#[case] input: &str) {
        assert!(matches!(
            SnapshotName::parse(input),
            Err(ClockError::NotASnapshot(_))
        ));
    }
}
