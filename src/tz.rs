//! Timezones given as POSIX-style abbreviations with offsets (`JST-9`) or as
//! IANA names (`Asia/Tokyo`).

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::{OffsetName, Tz};
use lazy_static::lazy_static;
use regex::Regex;

#[derive(Clone, Debug, PartialEq)]
pub enum Timezone {
    Fixed { name: String, offset: FixedOffset },
    Named(Tz),
}

/// A point in time together with the abbreviation of its zone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ZonedDateTime {
    pub datetime: DateTime<FixedOffset>,
    pub zone: String,
}

impl PartialOrd for ZonedDateTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ZonedDateTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.datetime.cmp(&other.datetime)
    }
}

impl Timezone {
    /// Midnight at the start of `date`.
    pub fn start_of_day(&self, date: NaiveDate) -> Result<ZonedDateTime> {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("invalid midnight for {}", date))?;
        self.localize(&naive)
    }

    pub fn localize(&self, naive: &NaiveDateTime) -> Result<ZonedDateTime> {
        use chrono::LocalResult;
        match self {
            Timezone::Fixed { name, offset } => match offset.from_local_datetime(naive) {
                LocalResult::Single(datetime) => Ok(ZonedDateTime {
                    datetime,
                    zone: name.clone(),
                }),
                _ => bail!("date time {} does not exist in {}", naive, self),
            },
            Timezone::Named(tz) => match tz.from_local_datetime(naive) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(zoned(dt)),
                LocalResult::None => bail!("date time {} does not exist in {}", naive, self),
            },
        }
    }

    pub fn now(&self) -> ZonedDateTime {
        let now = Utc::now();
        match self {
            Timezone::Fixed { name, offset } => ZonedDateTime {
                datetime: now.with_timezone(offset),
                zone: name.clone(),
            },
            Timezone::Named(tz) => zoned(now.with_timezone(tz)),
        }
    }
}

fn zoned(dt: DateTime<Tz>) -> ZonedDateTime {
    ZonedDateTime {
        datetime: dt.with_timezone(&dt.offset().fix()),
        zone: dt.offset().abbreviation().to_string(),
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Timezone::Fixed { name, offset } => write!(f, "{} ({})", name, offset),
            Timezone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl FromStr for Timezone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(tz) = parse_posix(s)? {
            return Ok(tz);
        }
        s.parse::<Tz>()
            .map(Timezone::Named)
            .map_err(|_| anyhow!("timezone is not in a recognized format: {:?}", s))
    }
}

/// Parses `NAME[+-]H[:MM]`. The sign follows POSIX: positive offsets lie west
/// of UTC, so `JST-9` is nine hours ahead of UTC.
fn parse_posix(s: &str) -> Result<Option<Timezone>> {
    lazy_static! {
        static ref POSIX_RX: Regex = Regex::new("^([A-Za-z]+)([-+])([0-9]{1,2})(?::([0-9]{2}))?$").unwrap();
    }
    let captures = match POSIX_RX.captures(s) {
        Some(captures) => captures,
        None => return Ok(None),
    };
    let west = &captures[2] == "+";
    let hours: i32 = captures[3].parse()?;
    let minutes: i32 = match captures.get(4) {
        Some(m) => m.as_str().parse()?,
        None => 0,
    };
    if minutes > 59 {
        bail!("timezone offset minutes > 59 in {:?}", s);
    }
    let sign: i32 = if west { -1 } else { 1 };
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("timezone offset is out of range in: {:?}", s))?;
    Ok(Some(Timezone::Fixed {
        name: captures[1].to_uppercase(),
        offset,
    }))
}
