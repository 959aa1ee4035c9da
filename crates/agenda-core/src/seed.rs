use chrono::{
  DateTime,
  Datelike,
  NaiveDate,
  NaiveTime,
  Utc
};
use chrono_tz::Tz;

use crate::datetime::{
  format_timestamp,
  local_to_utc
};
use crate::entry::{
  APPOINTMENT_COLOR,
  DEFAULT_COLOR,
  Entry,
  EntryKind,
  Priority,
  Recurrence,
  new_entry_id
};
use crate::grid::add_days;

const SEED_REMINDER_MINUTES: u32 = 30;
const SEED_ATTENDEE: &str =
  "you@example.com";

struct Sample {
  title:       &'static str,
  notes:       &'static str,
  priority:    Priority,
  appointment: bool
}

const SAMPLES: [Sample; 6] = [
  Sample {
    title:       "Budget Review",
    notes:       "Align roadmap",
    priority:    Priority::High,
    appointment: true
  },
  Sample {
    title:       "Write unit tests",
    notes:       "Zustand selectors",
    priority:    Priority::Med,
    appointment: false
  },
  Sample {
    title:       "Design Onboarding",
    notes:       "Empty & Loading states",
    priority:    Priority::High,
    appointment: false
  },
  Sample {
    title:       "Email inbox zero",
    notes:       "Snooze low-priority",
    priority:    Priority::Low,
    appointment: false
  },
  Sample {
    title:       "Client standup",
    notes:       "Share updates",
    priority:    Priority::Low,
    appointment: true
  },
  Sample {
    title:       "Refactor store",
    notes:       "Improve perf",
    priority:    Priority::Med,
    appointment: false
  }
];

/// Sample entries for the days `base - 2 ..= base + 7`.
///
/// The number of entries per day and which samples land on it depend only
/// on the day of month, so two calls with the same base agree on everything
/// except ids.
#[tracing::instrument(skip(now, tz))]
pub fn seed_entries(
  base: NaiveDate,
  now: DateTime<Utc>,
  tz: &Tz
) -> Vec<Entry> {
  let mut entries = Vec::new();
  for offset in -2_i64..=7 {
    let day = add_days(base, offset);
    let dom = i64::from(day.day());
    let count = ((dom + offset) % 3).max(1);

    for slot in 0..count {
      let sample = &SAMPLES
        [((dom + slot) % 6) as usize];
      let due = NaiveTime::from_hms_opt(
        9 + (slot % 6) as u32,
        0,
        0
      )
      .and_then(|at| {
        local_to_utc(day.and_time(at), tz)
      })
      .map(format_timestamp);

      entries.push(sample_entry(
        sample,
        due,
        slot % 2 == 1,
        now
      ));
    }
  }
  entries
}

fn sample_entry(
  sample: &Sample,
  due: Option<String>,
  work: bool,
  now: DateTime<Utc>
) -> Entry {
  let (kind, color) = if sample.appointment
  {
    (
      EntryKind::Appointment {
        location:  Some(
          "Office".to_string()
        ),
        attendees: vec![
          SEED_ATTENDEE.to_string(),
        ]
      },
      APPOINTMENT_COLOR
    )
  } else {
    (EntryKind::Todo, DEFAULT_COLOR)
  };

  Entry {
    id: new_entry_id(),
    kind,
    title: sample.title.to_string(),
    notes: Some(sample.notes.to_string()),
    due,
    all_day: false,
    reminder: Some(SEED_REMINDER_MINUTES),
    color: Some(color.to_string()),
    recurrence: Recurrence::None,
    priority: sample.priority,
    tags: vec![
      (if work { "work" } else { "personal" })
        .to_string(),
    ],
    completed: false,
    created_at: now,
    updated_at: now
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;

  use chrono::TimeZone;

  use super::*;

  fn now() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2024, 5, 15, 6, 0, 0
      )
      .single()
      .expect("valid now")
  }

  fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 15)
      .expect("valid date")
  }

  #[test]
  fn covers_ten_days_around_base() {
    let tz = chrono_tz::Europe::Berlin;
    let entries =
      seed_entries(base(), now(), &tz);
    let days = entries
      .iter()
      .filter_map(|e| e.due_date(&tz))
      .collect::<BTreeSet<_>>();

    assert_eq!(days.len(), 10);
    assert_eq!(
      days.first().copied(),
      NaiveDate::from_ymd_opt(2024, 5, 13)
    );
    assert_eq!(
      days.last().copied(),
      NaiveDate::from_ymd_opt(2024, 5, 22)
    );
  }

  #[test]
  fn first_day_matches_sample_table() {
    // 13 May, offset -2: (13 - 2) % 3 = 2 entries, samples 13 % 6 and 14 % 6.
    let tz = chrono_tz::UTC;
    let entries =
      seed_entries(base(), now(), &tz);
    assert_eq!(entries[0].title, "Write unit tests");
    assert_eq!(entries[1].title, "Design Onboarding");
    assert_eq!(entries[0].tags, ["personal"]);
    assert_eq!(entries[1].tags, ["work"]);
    assert_eq!(
      entries[1].due.as_deref(),
      Some("2024-05-13T10:00:00.000Z")
    );
  }

  #[test]
  fn appointments_carry_location_and_color() {
    let tz = chrono_tz::UTC;
    let entries =
      seed_entries(base(), now(), &tz);
    let appointment = entries
      .iter()
      .find(|e| e.is_appointment())
      .expect("an appointment is seeded");
    assert_eq!(appointment.location(), Some("Office"));
    assert_eq!(
      appointment.color.as_deref(),
      Some(APPOINTMENT_COLOR)
    );
    assert!(entries.iter().all(|e| !e.completed));

    let ids = entries
      .iter()
      .map(|e| e.id.as_str())
      .collect::<BTreeSet<_>>();
    assert_eq!(ids.len(), entries.len());
  }
}
