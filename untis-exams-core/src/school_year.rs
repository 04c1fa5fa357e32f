use chrono::{Datelike, Local, NaiveDate};

use crate::{Error, Result};

/// First day of the default fetch window (1 September).
const START: (u32, u32) = (9, 1);
/// Last day of the default fetch window (8 July of the following year).
const END: (u32, u32) = (7, 8);

/// School year running from September to the following summer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchoolYear {
    /// Calendar year in which the school year starts
    pub start_year: i32,
}

impl SchoolYear {
    /// January to August belong to the school year that began the previous
    /// September.
    pub fn containing(date: NaiveDate) -> Self {
        let start_year = if date.month() <= 8 {
            date.year() - 1
        } else {
            date.year()
        };
        Self { start_year }
    }

    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn start(self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, START.0, START.1)
            .ok_or_else(|| Error::Config(format!("Invalid school year {}", self.start_year)))
    }

    pub fn end(self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year + 1, END.0, END.1)
            .ok_or_else(|| Error::Config(format!("Invalid school year {}", self.start_year)))
    }

    /// Default exam fetch window `(from, to)`.
    pub fn range(self) -> Result<(NaiveDate, NaiveDate)> {
        Ok((self.start()?, self.end()?))
    }
}
