//! PDF date strings.

use crate::cursor::Cursor;
use std::fmt;
use std::str::FromStr;

/// A date, as stored in `/CreationDate` and friends.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DateTime {
    /// The year.
    pub year: u16,
    /// The month (1-based).
    pub month: u8,
    /// The day (1-based).
    pub day: u8,
    /// The hour.
    pub hour: u8,
    /// The minute.
    pub minute: u8,
    /// The second.
    pub second: u8,
    /// The offset in hours from UTC.
    pub utc_offset_hour: i8,
    /// The offset in minutes from UTC.
    pub utc_offset_minute: u8,
}

impl DateTime {
    /// Parse a `D:YYYYMMDDHHmmSSOHH'mm` date. Every field after the year is
    /// optional; a stray trailing apostrophe (emitted by some producers) is
    /// tolerated.
    pub fn parse(bytes: &[u8]) -> Option<DateTime> {
        let mut c = Cursor::new(bytes);

        // The `D:` prefix is required by the specification but missing in
        // some files.
        let _ = c.eat_tag(b"D:");

        let read_num = |c: &mut Cursor, digits: usize, min: u16, max: u16| -> Option<u16> {
            if matches!(c.peek(), Some(b'-') | Some(b'+') | Some(b'Z') | None) {
                return None;
            }

            let raw = c.take(digits)?;
            let num = u16::from_str(std::str::from_utf8(raw).ok()?).ok()?;
            (min..=max).contains(&num).then_some(num)
        };

        let year = read_num(&mut c, 4, 0, 9999)?;
        let month = read_num(&mut c, 2, 1, 12).map(|n| n as u8).unwrap_or(1);
        let day = read_num(&mut c, 2, 1, 31).map(|n| n as u8).unwrap_or(1);
        let hour = read_num(&mut c, 2, 0, 23).map(|n| n as u8).unwrap_or(0);
        let minute = read_num(&mut c, 2, 0, 59).map(|n| n as u8).unwrap_or(0);
        let second = read_num(&mut c, 2, 0, 59).map(|n| n as u8).unwrap_or(0);

        let (utc_offset_hour, utc_offset_minute) = match c.bump() {
            None | Some(b'Z') => {
                if c.peek() == Some(b'0') {
                    // Z00'00 style suffixes still parse, but always mean UTC.
                    let _ = read_num(&mut c, 2, 0, 23);
                    let _ = c.eat_tag(b"'");
                    let _ = read_num(&mut c, 2, 0, 59);
                }
                (0, 0)
            }
            Some(sign) => {
                let multiplier = if sign == b'-' { -1 } else { 1 };
                let hour = multiplier * read_num(&mut c, 2, 0, 23).map(|n| n as i8).unwrap_or(0);
                let _ = c.eat_tag(b"'");
                let minute = read_num(&mut c, 2, 0, 59).map(|n| n as u8).unwrap_or(0);
                (hour, minute)
            }
        };

        Some(DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            utc_offset_hour,
            utc_offset_minute,
        })
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "D:{:04}{:02}{:02}{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;

        if self.utc_offset_hour == 0 && self.utc_offset_minute == 0 {
            write!(f, "Z")
        } else {
            let sign = if self.utc_offset_hour < 0 { '-' } else { '+' };
            write!(
                f,
                "{}{:02}'{:02}",
                sign,
                self.utc_offset_hour.unsigned_abs(),
                self.utc_offset_minute
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DateTime;

    #[allow(clippy::too_many_arguments)]
    fn dt(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        utc_hour: i8,
        utc_minute: u8,
    ) -> DateTime {
        DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            utc_offset_hour: utc_hour,
            utc_offset_minute: utc_minute,
        }
    }

    fn parse(s: &str) -> DateTime {
        DateTime::parse(s.as_bytes()).unwrap()
    }

    #[test]
    fn year_only_defaults() {
        assert_eq!(parse("D:2023"), dt(2023, 1, 1, 0, 0, 0, 0, 0));
    }

    #[test]
    fn partial_fields_default() {
        assert_eq!(parse("D:202312"), dt(2023, 12, 1, 0, 0, 0, 0, 0));
        assert_eq!(parse("D:2023122514"), dt(2023, 12, 25, 14, 0, 0, 0, 0));
    }

    #[test]
    fn full_local_time() {
        assert_eq!(parse("D:20231225143015"), dt(2023, 12, 25, 14, 30, 15, 0, 0));
    }

    #[test]
    fn negative_offset() {
        assert_eq!(
            parse("D:199812231952-08'00"),
            dt(1998, 12, 23, 19, 52, 0, -8, 0)
        );
    }

    #[test]
    fn positive_offset_with_minutes() {
        assert_eq!(
            parse("D:20230701120000+05'30"),
            dt(2023, 7, 1, 12, 0, 0, 5, 30)
        );
    }

    #[test]
    fn utc_z() {
        assert_eq!(parse("D:20230701120000Z"), dt(2023, 7, 1, 12, 0, 0, 0, 0));
        assert_eq!(
            parse("D:20230701120000Z00'00"),
            dt(2023, 7, 1, 12, 0, 0, 0, 0)
        );
    }

    #[test]
    fn trailing_apostrophe() {
        // Some producers end the string with a stray apostrophe.
        assert_eq!(
            parse("D:20230701120000+05'30'"),
            dt(2023, 7, 1, 12, 0, 0, 5, 30)
        );
    }

    #[test]
    fn missing_prefix() {
        assert_eq!(parse("20230701"), dt(2023, 7, 1, 0, 0, 0, 0, 0));
    }

    #[test]
    fn format_round_trips() {
        for s in [
            "D:20231225143015Z",
            "D:19981223195200-08'00",
            "D:20230701120000+05'30",
            "D:00000101000000Z",
            "D:99991231235959+14'00",
        ] {
            let parsed = parse(s);
            assert_eq!(DateTime::parse(parsed.to_string().as_bytes()), Some(parsed));
        }
    }
}
