use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};

use crate::entry::Entry;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum FirstDay {
  #[default]
  Monday,
  Sunday
}

impl FirstDay {
  pub fn weekday(self) -> Weekday {
    match self {
      | Self::Monday => Weekday::Mon,
      | Self::Sunday => Weekday::Sun
    }
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Monday => "monday",
      | Self::Sunday => "sunday"
    }
  }
}

impl FromStr for FirstDay {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "monday" | "mon" => {
        Ok(Self::Monday)
      }
      | "sunday" | "sun" => {
        Ok(Self::Sunday)
      }
      | other => Err(anyhow!(
        "unknown first day of week: \
         {other}"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
  #[default]
  Day,
  Week,
  Month
}

impl ViewMode {
  pub fn all() -> [Self; 3] {
    [Self::Day, Self::Week, Self::Month]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Day => "day",
      | Self::Week => "week",
      | Self::Month => "month"
    }
  }
}

impl FromStr for ViewMode {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let key =
      s.trim().to_ascii_lowercase();
    Self::all()
      .into_iter()
      .find(|mode| mode.as_key() == key)
      .ok_or_else(|| {
        anyhow!("unknown view: {key}")
      })
  }
}

/// One cell of a month grid. `dimmed` marks days of the neighbouring
/// months that pad the first and last row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDay {
  pub date:   NaiveDate,
  pub dimmed: bool
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

pub fn start_of_week(
  date: NaiveDate,
  first_day: FirstDay
) -> NaiveDate {
  let day_idx = date
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = first_day
    .weekday()
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(date, -diff)
}

pub fn week_days(
  date: NaiveDate,
  first_day: FirstDay
) -> [NaiveDate; 7] {
  let start =
    start_of_week(date, first_day);
  std::array::from_fn(|offset| {
    add_days(start, offset as i64)
  })
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

/// Whole weeks covering the month of `date`, aligned to `first_day`.
#[tracing::instrument(level = "trace")]
pub fn month_grid(
  date: NaiveDate,
  first_day: FirstDay
) -> Vec<GridDay> {
  let first = first_day_of_month(
    date.year(),
    date.month()
  );
  let last = last_day_of_month(
    date.year(),
    date.month()
  );
  let start =
    start_of_week(first, first_day);
  let end = add_days(
    start_of_week(last, first_day),
    6
  );

  let grid = start
    .iter_days()
    .take_while(|day| *day <= end)
    .map(|day| GridDay {
      date:   day,
      dimmed: day.month() != date.month()
        || day.year() != date.year()
    })
    .collect::<Vec<_>>();

  tracing::trace!(
    month = %first.format("%Y-%m"),
    first_day = first_day.as_key(),
    cells = grid.len(),
    "month grid computed"
  );
  grid
}

/// Calendar-day equality of two instants as seen in `tz`.
pub fn same_day(
  a: DateTime<Utc>,
  b: DateTime<Utc>,
  tz: &Tz
) -> bool {
  a.with_timezone(tz).date_naive()
    == b.with_timezone(tz).date_naive()
}

/// Moves the anchor date by `step` units of `view`.
pub fn shift_focus(
  current: NaiveDate,
  view: ViewMode,
  step: i64
) -> NaiveDate {
  match view {
    | ViewMode::Day => {
      add_days(current, step)
    }
    | ViewMode::Week => {
      add_days(current, step * 7)
    }
    | ViewMode::Month => {
      shift_months(current, step)
    }
  }
}

fn shift_months(
  date: NaiveDate,
  months: i64
) -> NaiveDate {
  let total = date.year() as i64 * 12
    + date.month0() as i64
    + months;
  let Ok(year) =
    i32::try_from(total.div_euclid(12))
  else {
    return date;
  };
  let month =
    total.rem_euclid(12) as u32 + 1;

  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

/// Incomplete dated entries per calendar day, for month-cell badges.
pub fn open_counts_by_day(
  entries: &[Entry],
  tz: &Tz
) -> BTreeMap<NaiveDate, usize> {
  let mut counts = BTreeMap::new();
  for entry in entries {
    if entry.completed {
      continue;
    }
    if let Some(day) =
      entry.due_date(tz)
    {
      *counts
        .entry(day)
        .or_insert(0_usize) += 1;
    }
  }
  counts
}

pub fn iso_week_number(
  date: NaiveDate
) -> u32 {
  date.iso_week().week()
}
