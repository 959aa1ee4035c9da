use std::borrow::Borrow;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::datetime::local_to_utc;
use crate::entry::Entry;
use crate::grid::same_day;

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
pub enum FilterMode {
  #[default]
  All,
  Today,
  Planned,
  Done
}

impl FilterMode {
  pub fn all() -> [Self; 4] {
    [
      Self::All,
      Self::Today,
      Self::Planned,
      Self::Done
    ]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::All => "all",
      | Self::Today => "today",
      | Self::Planned => "planned",
      | Self::Done => "done"
    }
  }
}

impl FromStr for FilterMode {
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
        anyhow!(
          "unknown filter: {key} \
           (expected all, today, \
           planned or done)"
        )
      })
  }
}

/// Snapshot of the view inputs that decide which entries a day list shows.
#[derive(Debug, Clone)]
pub struct EntryFilter {
  pub selected_date:  NaiveDate,
  /// The literal current day, used by [`FilterMode::Today`].
  pub today:          NaiveDate,
  pub query:          String,
  pub show_completed: bool,
  pub mode:           FilterMode,
  pub timezone:       Tz
}

impl EntryFilter {
  pub fn matches(
    &self,
    entry: &Entry
  ) -> bool {
    let due = entry.due_at(&self.timezone);

    let on_day = match due {
      | Some(due) => {
        self.falls_on(due, self.selected_date)
      }
      | None => {
        self.mode != FilterMode::Today
      }
    };
    if !on_day {
      trace!(id = %entry.id, "not on selected day");
      return false;
    }

    if !self.show_completed
      && entry.completed
    {
      return false;
    }

    let category = match self.mode {
      | FilterMode::All => true,
      | FilterMode::Today => {
        due.is_some_and(|due| {
          self.falls_on(due, self.today)
        })
      }
      | FilterMode::Planned => {
        due.is_some()
      }
      | FilterMode::Done => {
        entry.completed
      }
    };
    if !category {
      trace!(id = %entry.id, mode = ?self.mode, "rejected by category");
      return false;
    }

    self.matches_query(entry)
  }

  /// Whether `due` lies on the local calendar `day`.
  fn falls_on(
    &self,
    due: DateTime<Utc>,
    day: NaiveDate
  ) -> bool {
    match day_anchor(day, &self.timezone) {
      | Some(anchor) => {
        same_day(due, anchor, &self.timezone)
      }
      | None => {
        due
          .with_timezone(&self.timezone)
          .date_naive()
          == day
      }
    }
  }

  fn matches_query(
    &self,
    entry: &Entry
  ) -> bool {
    let q =
      self.query.trim().to_lowercase();
    if q.is_empty() {
      return true;
    }

    entry.title.to_lowercase().contains(&q)
      || entry
        .notes
        .as_deref()
        .unwrap_or_default()
        .to_lowercase()
        .contains(&q)
      || entry
        .tags
        .iter()
        .any(|tag| tag.to_lowercase() == q)
  }

  /// Filters and orders `entries` for display.
  #[tracing::instrument(skip(
    self, entries
  ), fields(total = entries.len()))]
  pub fn apply<'a>(
    &self,
    entries: &'a [Entry]
  ) -> Vec<&'a Entry> {
    let mut visible = entries
      .iter()
      .filter(|entry| self.matches(entry))
      .collect::<Vec<_>>();
    sort_entries(
      &mut visible,
      &self.timezone
    );

    tracing::debug!(
      visible = visible.len(),
      selected = %self.selected_date,
      mode = self.mode.as_key(),
      "entries filtered"
    );
    visible
  }
}

/// Local noon of `day`, an instant inside that day in every zone.
fn day_anchor(
  day: NaiveDate,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  local_to_utc(day.and_hms_opt(12, 0, 0)?, tz)
}

/// The instant an entry sorts by. All-day entries sort from the start of
/// their local day, whatever clock time the record carries.
fn sort_instant(
  entry: &Entry,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  let due = entry.due_at(tz)?;
  if !entry.all_day {
    return Some(due);
  }
  due
    .with_timezone(tz)
    .date_naive()
    .and_hms_opt(0, 0, 0)
    .and_then(|midnight| {
      local_to_utc(midnight, tz)
    })
    .or(Some(due))
}

/// Stable sort: open before done, then priority, then due ascending with
/// undated entries last. Equal keys keep their input order.
pub fn sort_entries<E>(
  entries: &mut [E],
  tz: &Tz
) where
  E: Borrow<Entry>
{
  entries.sort_by_cached_key(|entry| {
    let entry = entry.borrow();
    let due = sort_instant(entry, tz);
    (
      entry.completed,
      entry.priority,
      due.is_none(),
      due
    )
  });
}
