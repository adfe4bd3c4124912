//! Fixed 13-week quarter partition of the 52-week year.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Weeks in each quarter window.
pub const WEEKS_PER_QUARTER: usize = 13;

/// One of the four quarters of a 52-week year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// All quarters in calendar order.
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn name(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }

    fn ordinal(&self) -> usize {
        match self {
            Quarter::Q1 => 0,
            Quarter::Q2 => 1,
            Quarter::Q3 => 2,
            Quarter::Q4 => 3,
        }
    }

    /// The week window this quarter spans.
    pub fn window(&self) -> QuarterWindow {
        let first = self.ordinal() * WEEKS_PER_QUARTER + 1;
        QuarterWindow {
            quarter: *self,
            first_week: first,
            last_week: first + WEEKS_PER_QUARTER - 1,
        }
    }

    /// The quarter containing a 1-based week offset within the year.
    pub fn containing(offset: usize) -> Option<Quarter> {
        if offset == 0 {
            return None;
        }
        Quarter::ALL.get((offset - 1) / WEEKS_PER_QUARTER).copied()
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Quarter {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Q1" => Ok(Quarter::Q1),
            "Q2" => Ok(Quarter::Q2),
            "Q3" => Ok(Quarter::Q3),
            "Q4" => Ok(Quarter::Q4),
            other => Err(ForecastError::InvalidParameter(format!(
                "unknown quarter name: {other}"
            ))),
        }
    }
}

/// Contiguous 13-week range of 1-based week offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuarterWindow {
    pub quarter: Quarter,
    pub first_week: usize,
    pub last_week: usize,
}

impl QuarterWindow {
    /// Offsets covered, inclusive on both ends.
    pub fn offsets(&self) -> RangeInclusive<usize> {
        self.first_week..=self.last_week
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.offsets().contains(&offset)
    }

    pub fn len(&self) -> usize {
        self.last_week - self.first_week + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarters_partition_the_year() {
        let mut covered = vec![0usize; 53];
        for q in Quarter::ALL {
            let window = q.window();
            assert_eq!(window.len(), WEEKS_PER_QUARTER);
            for week in window.offsets() {
                covered[week] += 1;
            }
        }
        assert_eq!(covered[0], 0);
        assert!(covered[1..].iter().all(|&c| c == 1));
    }

    #[test]
    fn quarter_windows_match_calendar() {
        assert_eq!(Quarter::Q1.window().offsets(), 1..=13);
        assert_eq!(Quarter::Q2.window().offsets(), 14..=26);
        assert_eq!(Quarter::Q3.window().offsets(), 27..=39);
        assert_eq!(Quarter::Q4.window().offsets(), 40..=52);
    }

    #[test]
    fn quarter_lookup_by_offset() {
        assert_eq!(Quarter::containing(0), None);
        assert_eq!(Quarter::containing(1), Some(Quarter::Q1));
        assert_eq!(Quarter::containing(13), Some(Quarter::Q1));
        assert_eq!(Quarter::containing(14), Some(Quarter::Q2));
        assert_eq!(Quarter::containing(52), Some(Quarter::Q4));
        assert_eq!(Quarter::containing(53), None);
    }

    #[test]
    fn quarter_parses_names() {
        assert_eq!("q3".parse::<Quarter>().unwrap(), Quarter::Q3);
        assert_eq!(" Q4 ".parse::<Quarter>().unwrap(), Quarter::Q4);
        assert!("Q5".parse::<Quarter>().is_err());
        assert_eq!(Quarter::Q2.to_string(), "Q2");
    }
}
