use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::{format_timestamp, local_to_utc, parse_clock, parse_date, parse_timestamp};
use crate::error::EntryError;
use crate::preferences::Preferences;

pub const DEFAULT_COLOR: &str = "#10b981";
pub const APPOINTMENT_COLOR: &str = "#0ea5e9";

/// Declaration order is sort order: `High < Med < Low`.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Med,
    Low,
}

impl Priority {
    /// Low -> Med -> High -> Low.
    pub fn cycled(self) -> Self {
        match self {
            Self::Low => Self::Med,
            Self::Med => Self::High,
            Self::High => Self::Low,
        }
    }

    pub fn as_key(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Med => "med",
            Self::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Self::High),
            "med" | "medium" | "m" => Ok(Self::Med),
            "low" | "l" => Ok(Self::Low),
            other => Err(anyhow!("unknown priority: {other}")),
        }
    }
}

/// Stored for display only; occurrences are never expanded.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for Recurrence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(anyhow!("unknown recurrence: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Todo,
    Appointment {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attendees: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,

    #[serde(flatten)]
    pub kind: EntryKind,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Raw stored timestamp. Read through [`Entry::due_at`]; a value that
    /// does not parse counts as undated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,

    #[serde(default)]
    pub all_day: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default)]
    pub recurrence: Recurrence,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub completed: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Quick-add: a medium priority to-do on `day` at the work-start time.
    pub fn quick(
        title: &str,
        day: NaiveDate,
        now: DateTime<Utc>,
        prefs: &Preferences,
    ) -> Result<Self, EntryError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EntryError::EmptyTitle);
        }

        let tz = prefs.timezone();
        let due = local_to_utc(day.and_time(prefs.work_start_time()), &tz).map(format_timestamp);

        Ok(Self {
            id: new_entry_id(),
            kind: EntryKind::Todo,
            title: title.to_string(),
            notes: None,
            due,
            all_day: false,
            reminder: Some(prefs.default_reminder),
            color: None,
            recurrence: Recurrence::None,
            priority: Priority::Med,
            tags: vec![],
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn due_at(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        let raw = self.due.as_deref()?;
        let parsed = parse_timestamp(raw, tz);
        if parsed.is_none() {
            tracing::trace!(id = %self.id, due = %raw, "unparseable due; treating entry as undated");
        }
        parsed
    }

    /// Calendar day of `due` in `tz`.
    pub fn due_date(&self, tz: &Tz) -> Option<NaiveDate> {
        self.due_at(tz).map(|dt| dt.with_timezone(tz).date_naive())
    }

    pub fn is_appointment(&self) -> bool {
        matches!(self.kind, EntryKind::Appointment { .. })
    }

    pub fn location(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Appointment { location, .. } => location.as_deref(),
            EntryKind::Todo => None,
        }
    }

    pub fn attendees(&self) -> &[String] {
        match &self.kind {
            EntryKind::Appointment { attendees, .. } => attendees,
            EntryKind::Todo => &[],
        }
    }

    /// Stamps a mutation. `updated_at` never falls behind `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }

    pub fn reschedule(&mut self, due: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        self.due = due.map(format_timestamp);
        self.all_day = false;
        self.touch(now);
    }
}

/// Form data of the detailed creation dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    pub title: String,
    pub appointment: bool,
    pub notes: String,
    /// `YYYY-MM-DD`; the selected day is used when absent.
    pub date: Option<String>,
    /// `HH:MM`; the work-start time is used when absent.
    pub time: Option<String>,
    pub all_day: bool,
    pub reminder: Option<u32>,
    pub location: String,
    /// Comma separated.
    pub attendees: String,
    pub color: Option<String>,
    pub recurrence: Recurrence,
    pub priority: Priority,
    /// Comma separated.
    pub tags: String,
}

impl EntryDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[tracing::instrument(skip(self, now, prefs), fields(title = %self.title))]
    pub fn build(
        self,
        now: DateTime<Utc>,
        selected_day: NaiveDate,
        prefs: &Preferences,
    ) -> Result<Entry, EntryError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(EntryError::EmptyTitle);
        }

        let color = match self.color.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                if !is_hex_color(raw) {
                    return Err(EntryError::InvalidColor(raw.to_string()));
                }
                raw.to_ascii_lowercase()
            }
            _ => DEFAULT_COLOR.to_string(),
        };

        let tz = prefs.timezone();
        let due = resolve_due(
            self.date.as_deref(),
            self.time.as_deref(),
            self.all_day,
            selected_day,
            prefs,
            &tz,
        );

        let kind = if self.appointment {
            let location = self.location.trim();
            EntryKind::Appointment {
                location: (!location.is_empty()).then(|| location.to_string()),
                attendees: split_list(&self.attendees),
            }
        } else {
            EntryKind::Todo
        };

        let notes = self.notes.trim();

        Ok(Entry {
            id: new_entry_id(),
            kind,
            title,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            due: due.map(format_timestamp),
            all_day: self.all_day,
            reminder: Some(self.reminder.unwrap_or(prefs.default_reminder)),
            color: Some(color),
            recurrence: self.recurrence,
            priority: self.priority,
            tags: split_list(&self.tags),
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }
}

pub fn new_entry_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Comma separated text to trimmed, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_hex_color(raw: &str) -> bool {
    Regex::new(r"^#[0-9a-fA-F]{6}$")
        .map(|re| re.is_match(raw))
        .unwrap_or(false)
}

fn resolve_due(
    date: Option<&str>,
    time: Option<&str>,
    all_day: bool,
    selected_day: NaiveDate,
    prefs: &Preferences,
    tz: &Tz,
) -> Option<DateTime<Utc>> {
    let day = match date.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => match parse_date(raw) {
            Some(day) => day,
            None => {
                tracing::warn!(date = %raw, "invalid date in draft; entry will be undated");
                return None;
            }
        },
        None => selected_day,
    };

    let clock = if all_day {
        NaiveTime::from_hms_opt(0, 0, 0)?
    } else {
        match time.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => match parse_clock(raw) {
                Some(clock) => clock,
                None => {
                    tracing::warn!(time = %raw, "invalid time in draft; entry will be undated");
                    return None;
                }
            },
            None => prefs.work_start_time(),
        }
    };

    local_to_utc(day.and_time(clock), tz)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0)
            .single()
            .expect("valid now")
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn priority_orders_high_first_and_cycles() {
        let mut all = vec![Priority::Low, Priority::High, Priority::Med];
        all.sort();
        assert_eq!(all, vec![Priority::High, Priority::Med, Priority::Low]);

        assert_eq!(Priority::Low.cycled(), Priority::Med);
        assert_eq!(Priority::Med.cycled(), Priority::High);
        assert_eq!(Priority::High.cycled(), Priority::Low);
    }

    #[test]
    fn reads_flat_appointment_record() {
        let raw = r##"{
            "id": "k3j2h1",
            "kind": "appointment",
            "title": "Budget Review",
            "notes": "Align roadmap",
            "due": "2024-05-01T07:00:00.000Z",
            "allDay": false,
            "reminder": 30,
            "location": "Office",
            "attendees": ["you@example.com"],
            "color": "#0ea5e9",
            "recurrence": "none",
            "priority": "high",
            "tags": ["work"],
            "completed": false,
            "createdAt": "2024-04-30T10:00:00.000Z",
            "updatedAt": "2024-04-30T10:00:00.000Z"
        }"##;

        let entry: Entry = serde_json::from_str(raw).expect("parse entry");
        assert!(entry.is_appointment());
        assert_eq!(entry.location(), Some("Office"));
        assert_eq!(entry.priority, Priority::High);
        assert_eq!(
            entry.due_date(&chrono_tz::Europe::Berlin),
            Some(day(2024, 5, 1))
        );

        let back = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(back["kind"], "appointment");
        assert_eq!(back["location"], "Office");
        assert_eq!(back["allDay"], false);
    }

    #[test]
    fn todo_ignores_appointment_only_fields() {
        let raw = r#"{
            "id": "a1",
            "kind": "todo",
            "title": "Write unit tests",
            "location": null,
            "priority": "med",
            "tags": [],
            "completed": true,
            "createdAt": "2024-04-30T10:00:00Z",
            "updatedAt": "2024-04-30T11:00:00Z"
        }"#;

        let entry: Entry = serde_json::from_str(raw).expect("parse entry");
        assert_eq!(entry.kind, EntryKind::Todo);
        assert!(entry.completed);
        assert!(entry.due.is_none());
    }

    #[test]
    fn empty_title_is_rejected() {
        let prefs = Preferences::default();
        let err = EntryDraft::titled("   ")
            .build(now(), day(2024, 5, 1), &prefs)
            .expect_err("empty title");
        assert_eq!(err, EntryError::EmptyTitle);

        let err = Entry::quick("", day(2024, 5, 1), now(), &prefs).expect_err("empty title");
        assert_eq!(err, EntryError::EmptyTitle);
    }

    #[test]
    fn bad_color_is_rejected() {
        let prefs = Preferences::default();
        let draft = EntryDraft {
            color: Some("teal".to_string()),
            ..EntryDraft::titled("Paint")
        };
        let err = draft
            .build(now(), day(2024, 5, 1), &prefs)
            .expect_err("bad color");
        assert_eq!(err, EntryError::InvalidColor("teal".to_string()));
    }

    #[test]
    fn draft_resolves_due_in_configured_zone() {
        let prefs = Preferences::default();
        let berlin = prefs.timezone();
        let draft = EntryDraft {
            date: Some("2024-05-03".to_string()),
            time: Some("14:15".to_string()),
            tags: "work, , urgent ".to_string(),
            appointment: true,
            location: " Office ".to_string(),
            attendees: "a@example.com,b@example.com".to_string(),
            ..EntryDraft::titled("  Client standup ")
        };

        let entry = draft
            .build(now(), day(2024, 5, 1), &prefs)
            .expect("build entry");
        assert_eq!(entry.title, "Client standup");
        assert_eq!(entry.tags, vec!["work", "urgent"]);
        assert_eq!(entry.location(), Some("Office"));
        assert_eq!(entry.reminder, Some(30));
        assert_eq!(entry.color.as_deref(), Some(DEFAULT_COLOR));

        let due = entry.due_at(&berlin).expect("due").with_timezone(&berlin);
        assert_eq!(due.date_naive(), day(2024, 5, 3));
        assert_eq!((due.hour(), due.minute()), (14, 15));
    }

    #[test]
    fn draft_without_date_uses_selected_day_and_work_start() {
        let prefs = Preferences::default();
        let berlin = prefs.timezone();
        let entry = EntryDraft::titled("Refactor store")
            .build(now(), day(2024, 5, 9), &prefs)
            .expect("build entry");
        let due = entry.due_at(&berlin).expect("due").with_timezone(&berlin);
        assert_eq!(due.date_naive(), day(2024, 5, 9));
        assert_eq!(due.hour(), 9);
    }

    #[test]
    fn invalid_draft_date_leaves_entry_undated() {
        let prefs = Preferences::default();
        let draft = EntryDraft {
            date: Some("2024-02-30".to_string()),
            ..EntryDraft::titled("Leap confusion")
        };
        let entry = draft
            .build(now(), day(2024, 5, 1), &prefs)
            .expect("build entry");
        assert!(entry.due.is_none());
    }

    #[test]
    fn touch_keeps_updated_after_created() {
        let mut entry =
            Entry::quick("Inbox zero", day(2024, 5, 1), now(), &Preferences::default())
                .expect("quick add");
        let earlier = now() - chrono::Duration::hours(1);
        entry.touch(earlier);
        assert_eq!(entry.updated_at, entry.created_at);
    }
}
