//! Argument parsing for command request lines: integers, floats, booleans,
//! durations, and the `Range`/`Position` selectors commands take for queue
//! and list positions. Split out into freestanding parse functions so the
//! command registry can validate arity independently of any one grammar.

use crate::error::AckError;

pub fn parse_uint(s: &str, max: Option<u32>) -> Result<u32, AckError> {
    let value: u32 = s
        .parse()
        .map_err(|_| AckError::arg(format!("Integer expected: {s}")))?;
    if let Some(max) = max
        && value > max
    {
        return Err(AckError::arg(format!("Number too large: {value}")));
    }
    Ok(value)
}

pub fn parse_int(s: &str) -> Result<i32, AckError> {
    s.parse().map_err(|_| AckError::arg(format!("Integer expected: {s}")))
}

pub fn parse_bool(s: &str) -> Result<bool, AckError> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(AckError::arg(format!("Boolean (0/1) expected: {s}"))),
    }
}

pub fn parse_float(s: &str) -> Result<f32, AckError> {
    s.parse().map_err(|_| AckError::arg(format!("Float expected: {s}")))
}

/// Non-negative float seconds.
pub fn parse_song_time(s: &str) -> Result<f32, AckError> {
    let v = parse_float(s)?;
    if v < 0.0 {
        return Err(AckError::arg(format!("Negative duration: {s}")));
    }
    Ok(v)
}

/// Allows negative durations.
pub fn parse_signed_song_time(s: &str) -> Result<f32, AckError> {
    parse_float(s)
}

/// A half-open `[start, end)` range of queue/list positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: u32,
    pub end: Option<u32>,
}

impl Range {
    pub fn full() -> Self {
        Range { start: 0, end: None }
    }

    pub fn single(pos: Position) -> Self {
        match pos {
            Position::Absolute(n) => Range { start: n, end: Some(n + 1) },
            Position::Relative(_) => Range { start: 0, end: None },
        }
    }

    pub fn single_index(n: u32) -> Self {
        Range { start: n, end: Some(n + 1) }
    }

    /// Resolves `end: None` against `len`: `"N"` parses to `{N, N+1}`,
    /// `"N:"` to open-ended, and the legacy sentinel `-1` means "all"
    /// (handled by `parse` before reaching here).
    pub fn resolve(self, len: u32) -> Result<(u32, u32), AckError> {
        let end = self.end.unwrap_or(len);
        if self.start > end {
            return Err(AckError::arg(format!(
                "start position ({}) is greater than end position ({end})",
                self.start
            )));
        }
        Ok((self.start, end))
    }

    /// `"START:END"`, `"START"`, `"START:"`, or the legacy `-1` ("all").
    pub fn parse(s: &str) -> Result<Self, AckError> {
        if s == "-1" {
            return Ok(Range::full());
        }
        if let Some((start, end)) = s.split_once(':') {
            let start: i64 = start
                .parse()
                .map_err(|_| AckError::arg(format!("Integer expected: {start}")))?;
            if start < 0 {
                return Err(AckError::arg(format!("Number is negative: {start}")));
            }
            let end = if end.is_empty() {
                None
            } else {
                let end: i64 = end
                    .parse()
                    .map_err(|_| AckError::arg(format!("Integer expected: {end}")))?;
                if end > i32::MAX as i64 {
                    return Err(AckError::arg(format!("Number too large: {end}")));
                }
                Some(end as u32)
            };
            if let Some(end) = end
                && start as u32 > end
            {
                return Err(AckError::arg(format!(
                    "start position ({start}) is greater than end position ({end})"
                )));
            }
            Ok(Range { start: start as u32, end })
        } else {
            let n: i64 = s.parse().map_err(|_| AckError::arg(format!("Integer expected: {s}")))?;
            if n < 0 {
                return Err(AckError::arg(format!("Number is negative: {n}")));
            }
            Ok(Range { start: n as u32, end: Some(n as u32 + 1) })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Absolute(u32),
    /// `+N`/`-N` already folded to "current +/- N"; resolved against the
    /// caller's current position by `resolve`.
    Relative(i32),
}

impl Position {
    /// `START` is absolute; `+N` is current+1+N; `-N` is current-N. `current`
    /// is `None` when there is no playing/stopped-on song, in which case
    /// relative positions are rejected.
    pub fn resolve(self, current: Option<u32>) -> Result<u32, AckError> {
        match self {
            Position::Absolute(n) => Ok(n),
            Position::Relative(delta) => {
                let current = current
                    .ok_or_else(|| AckError::arg("No current song, relative position invalid"))?;
                let resolved = current as i64 + delta as i64;
                if resolved < 0 {
                    return Err(AckError::arg("Relative position before start of queue"));
                }
                Ok(resolved as u32)
            }
        }
    }

    pub fn parse(s: &str) -> Result<Self, AckError> {
        if let Some(rest) = s.strip_prefix('+') {
            let n: i32 = rest.parse().map_err(|_| AckError::arg(format!("Integer expected: {s}")))?;
            Ok(Position::Relative(n + 1))
        } else if let Some(rest) = s.strip_prefix('-') {
            let n: i32 = rest.parse().map_err(|_| AckError::arg(format!("Integer expected: {s}")))?;
            Ok(Position::Relative(-n))
        } else {
            Ok(Position::Absolute(parse_uint(s, Some(i32::MAX as u32))?))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosOrRange {
    Position(Position),
    Range(Range),
}

impl PosOrRange {
    pub fn parse(s: &str) -> Result<Self, AckError> {
        if s.contains(':') {
            Range::parse(s).map(PosOrRange::Range)
        } else {
            Position::parse(s).map(PosOrRange::Position)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_round_trip() {
        assert_eq!(Range::parse("3:7").unwrap(), Range { start: 3, end: Some(7) });
        assert_eq!(Range::parse("5").unwrap(), Range { start: 5, end: Some(6) });
        assert_eq!(Range::parse("2:").unwrap(), Range { start: 2, end: None });
    }

    #[test]
    fn range_rejects_negative_start() {
        assert!(Range::parse("-2").is_err());
        assert_eq!(Range::parse("-1").unwrap(), Range::full());
    }

    #[test]
    fn range_rejects_start_after_end() {
        assert!(Range::parse("7:3").is_err());
    }

    #[test]
    fn relative_position_needs_current_song() {
        let pos = Position::parse("+0").unwrap();
        assert!(pos.resolve(None).is_err());
        assert_eq!(pos.resolve(Some(4)).unwrap(), 5);
    }

    #[test]
    fn negative_relative_position() {
        let pos = Position::parse("-2").unwrap();
        assert_eq!(pos.resolve(Some(5)).unwrap(), 3);
    }
}
