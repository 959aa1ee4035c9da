//! Display strings. Every [`Message`] is resolved by an exhaustive match
//! per language, so a missing translation does not compile.

use std::borrow::Cow;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

use crate::entry::Priority;
use crate::filter::FilterMode;
use crate::grid::{
  FirstDay,
  ViewMode
};

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
pub enum Lang {
  #[default]
  De,
  En
}

impl Lang {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::De => "de",
      | Self::En => "en"
    }
  }
}

impl FromStr for Lang {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "de" | "german" | "deutsch" => {
        Ok(Self::De)
      }
      | "en" | "english" => Ok(Self::En),
      | other => Err(anyhow!(
        "unknown language: {other}"
      ))
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
  AppName,
  Day,
  Week,
  Month,
  WeekOf(String),
  SearchTasks,
  ShowDone,
  HideDone,
  FilterAll,
  FilterToday,
  FilterPlanned,
  FilterDone,
  AddForDay,
  NoneForDay,
  Complete,
  ProfileSettings,
  Name,
  Email,
  Avatar,
  Theme,
  System,
  Light,
  Dark,
  Density,
  Comfortable,
  Compact,
  Language,
  German,
  English,
  Timezone,
  DefaultView,
  FirstDay,
  Monday,
  Sunday,
  DefaultReminder,
  WorkHours,
  ShowWeekNumbers,
  ShowCompletedByDefault,
  Todo,
  Appointment,
  Title,
  Notes,
  Date,
  Time,
  AllDay,
  Reminder,
  MinutesBefore,
  Location,
  Attendees,
  Recurrence,
  RecurrenceNone,
  Daily,
  Weekly,
  Monthly,
  Color,
  Priority,
  Low,
  Med,
  High,
  Tags,
  Created(String),
  OpenDone {
    open: usize,
    done: usize
  },
  OpenBadge(usize),
  WeekNumberShort,
  WeekdayShort(Weekday),
  MonthName(u32)
}

impl Message {
  pub fn text(
    &self,
    lang: Lang
  ) -> Cow<'static, str> {
    match lang {
      | Lang::De => self.de(),
      | Lang::En => self.en()
    }
  }

  fn de(&self) -> Cow<'static, str> {
    let text = match self {
      | Self::AppName => {
        "Financial District"
      }
      | Self::Day => "Tag",
      | Self::Week => "Woche",
      | Self::Month => "Monat",
      | Self::WeekOf(start) => {
        return format!(
          "Woche ab {start}"
        )
        .into();
      }
      | Self::SearchTasks => {
        "Aufgaben suchen"
      }
      | Self::ShowDone => "✓ zeigen",
      | Self::HideDone => "✓ ausblenden",
      | Self::FilterAll => "alle",
      | Self::FilterToday => "heute",
      | Self::FilterPlanned => "geplant",
      | Self::FilterDone => "erledigt",
      | Self::AddForDay => {
        "Aufgabe für diesen Tag \
         hinzufügen…"
      }
      | Self::NoneForDay => {
        "Für diesen Tag keine Aufgaben."
      }
      | Self::Complete => "Erledigen",
      | Self::ProfileSettings => {
        "Profil & Einstellungen"
      }
      | Self::Name => "Name",
      | Self::Email => "E‑Mail",
      | Self::Avatar => "Avatar‑Initiale",
      | Self::Theme => "Theme",
      | Self::System => "System",
      | Self::Light => "Hell",
      | Self::Dark => "Dunkel",
      | Self::Density => "Dichte",
      | Self::Comfortable => "Komfort",
      | Self::Compact => "Kompakt",
      | Self::Language => "Sprache",
      | Self::German => "Deutsch",
      | Self::English => "English",
      | Self::Timezone => "Zeitzone",
      | Self::DefaultView => {
        "Standardansicht"
      }
      | Self::FirstDay => "Wochenstart",
      | Self::Monday => "Montag",
      | Self::Sunday => "Sonntag",
      | Self::DefaultReminder => {
        "Standard‑Erinnerung (Min.)"
      }
      | Self::WorkHours => {
        "Arbeitszeit (Start/Ende)"
      }
      | Self::ShowWeekNumbers => {
        "KW anzeigen"
      }
      | Self::ShowCompletedByDefault => {
        "Erledigte standardmäßig zeigen"
      }
      | Self::Todo => "To‑Do",
      | Self::Appointment => "Termin",
      | Self::Title => "Titel",
      | Self::Notes => "Notizen",
      | Self::Date => "Datum",
      | Self::Time => "Zeit",
      | Self::AllDay => "Ganztägig",
      | Self::Reminder => "Erinnerung",
      | Self::MinutesBefore => {
        "Min. vorher"
      }
      | Self::Location => "Ort",
      | Self::Attendees => "Teilnehmer",
      | Self::Recurrence => "Wiederholung",
      | Self::RecurrenceNone => "Keine",
      | Self::Daily => "Täglich",
      | Self::Weekly => "Wöchentlich",
      | Self::Monthly => "Monatlich",
      | Self::Color => "Farbe",
      | Self::Priority => "Priorität",
      | Self::Low => "Niedrig",
      | Self::Med => "Mittel",
      | Self::High => "Hoch",
      | Self::Tags => "Tags",
      | Self::Created(id) => {
        return format!(
          "Angelegt: {id}"
        )
        .into();
      }
      | Self::OpenDone {
        open,
        done
      } => {
        return format!(
          "{open} offen · {done} \
           erledigt"
        )
        .into();
      }
      | Self::OpenBadge(count) => {
        return format!("{count} offen")
          .into();
      }
      | Self::WeekNumberShort => "KW",
      | Self::WeekdayShort(day) => {
        match day {
          | Weekday::Mon => "Mo",
          | Weekday::Tue => "Di",
          | Weekday::Wed => "Mi",
          | Weekday::Thu => "Do",
          | Weekday::Fri => "Fr",
          | Weekday::Sat => "Sa",
          | Weekday::Sun => "So"
        }
      }
      | Self::MonthName(month) => {
        match month {
          | 1 => "Januar",
          | 2 => "Februar",
          | 3 => "März",
          | 4 => "April",
          | 5 => "Mai",
          | 6 => "Juni",
          | 7 => "Juli",
          | 8 => "August",
          | 9 => "September",
          | 10 => "Oktober",
          | 11 => "November",
          | _ => "Dezember"
        }
      }
    };
    Cow::Borrowed(text)
  }

  fn en(&self) -> Cow<'static, str> {
    let text = match self {
      | Self::AppName => {
        "Financial District"
      }
      | Self::Day => "Day",
      | Self::Week => "Week",
      | Self::Month => "Month",
      | Self::WeekOf(start) => {
        return format!(
          "Week of {start}"
        )
        .into();
      }
      | Self::SearchTasks => {
        "Search tasks"
      }
      | Self::ShowDone => "Show ✓",
      | Self::HideDone => "Hide ✓",
      | Self::FilterAll => "all",
      | Self::FilterToday => "today",
      | Self::FilterPlanned => "planned",
      | Self::FilterDone => "done",
      | Self::AddForDay => {
        "Add a task for this day…"
      }
      | Self::NoneForDay => {
        "No tasks for this day."
      }
      | Self::Complete => "Complete",
      | Self::ProfileSettings => {
        "Profile & Settings"
      }
      | Self::Name => "Name",
      | Self::Email => "Email",
      | Self::Avatar => "Avatar initial",
      | Self::Theme => "Theme",
      | Self::System => "System",
      | Self::Light => "Light",
      | Self::Dark => "Dark",
      | Self::Density => "Density",
      | Self::Comfortable => {
        "Comfortable"
      }
      | Self::Compact => "Compact",
      | Self::Language => "Language",
      | Self::German => "Deutsch",
      | Self::English => "English",
      | Self::Timezone => "Time zone",
      | Self::DefaultView => {
        "Default view"
      }
      | Self::FirstDay => "Week starts",
      | Self::Monday => "Monday",
      | Self::Sunday => "Sunday",
      | Self::DefaultReminder => {
        "Default reminder (min)"
      }
      | Self::WorkHours => {
        "Work hours (start/end)"
      }
      | Self::ShowWeekNumbers => {
        "Show week numbers"
      }
      | Self::ShowCompletedByDefault => {
        "Show completed by default"
      }
      | Self::Todo => "To‑Do",
      | Self::Appointment => {
        "Appointment"
      }
      | Self::Title => "Title",
      | Self::Notes => "Notes",
      | Self::Date => "Date",
      | Self::Time => "Time",
      | Self::AllDay => "All day",
      | Self::Reminder => "Reminder",
      | Self::MinutesBefore => {
        "min before"
      }
      | Self::Location => "Location",
      | Self::Attendees => "Attendees",
      | Self::Recurrence => "Recurrence",
      | Self::RecurrenceNone => "None",
      | Self::Daily => "Daily",
      | Self::Weekly => "Weekly",
      | Self::Monthly => "Monthly",
      | Self::Color => "Color",
      | Self::Priority => "Priority",
      | Self::Low => "Low",
      | Self::Med => "Med",
      | Self::High => "High",
      | Self::Tags => "Tags",
      | Self::Created(id) => {
        return format!("Created: {id}")
          .into();
      }
      | Self::OpenDone {
        open,
        done
      } => {
        return format!(
          "{open} open · {done} done"
        )
        .into();
      }
      | Self::OpenBadge(count) => {
        return format!("{count} open")
          .into();
      }
      | Self::WeekNumberShort => "Wk",
      | Self::WeekdayShort(day) => {
        match day {
          | Weekday::Mon => "Mon",
          | Weekday::Tue => "Tue",
          | Weekday::Wed => "Wed",
          | Weekday::Thu => "Thu",
          | Weekday::Fri => "Fri",
          | Weekday::Sat => "Sat",
          | Weekday::Sun => "Sun"
        }
      }
      | Self::MonthName(month) => {
        match month {
          | 1 => "January",
          | 2 => "February",
          | 3 => "March",
          | 4 => "April",
          | 5 => "May",
          | 6 => "June",
          | 7 => "July",
          | 8 => "August",
          | 9 => "September",
          | 10 => "October",
          | 11 => "November",
          | _ => "December"
        }
      }
    };
    Cow::Borrowed(text)
  }
}

impl From<FilterMode> for Message {
  fn from(mode: FilterMode) -> Self {
    match mode {
      | FilterMode::All => Self::FilterAll,
      | FilterMode::Today => {
        Self::FilterToday
      }
      | FilterMode::Planned => {
        Self::FilterPlanned
      }
      | FilterMode::Done => {
        Self::FilterDone
      }
    }
  }
}

impl From<Priority> for Message {
  fn from(priority: Priority) -> Self {
    match priority {
      | Priority::High => Self::High,
      | Priority::Med => Self::Med,
      | Priority::Low => Self::Low
    }
  }
}

impl From<ViewMode> for Message {
  fn from(mode: ViewMode) -> Self {
    match mode {
      | ViewMode::Day => Self::Day,
      | ViewMode::Week => Self::Week,
      | ViewMode::Month => Self::Month
    }
  }
}

impl From<FirstDay> for Message {
  fn from(day: FirstDay) -> Self {
    match day {
      | FirstDay::Monday => Self::Monday,
      | FirstDay::Sunday => Self::Sunday
    }
  }
}

/// Short day label, e.g. `Mi 15. Mai` / `Wed, May 15`.
pub fn day_label(
  date: NaiveDate,
  lang: Lang
) -> String {
  let weekday =
    Message::WeekdayShort(date.weekday())
      .text(lang);
  let month =
    Message::MonthName(date.month())
      .text(lang);
  match lang {
    | Lang::De => format!(
      "{weekday} {}. {month}",
      date.day()
    ),
    | Lang::En => format!(
      "{weekday}, {month} {}",
      date.day()
    )
  }
}

/// Month title, e.g. `Februar 2024`.
pub fn month_title(
  date: NaiveDate,
  lang: Lang
) -> String {
  format!(
    "{} {}",
    Message::MonthName(date.month())
      .text(lang),
    date.year()
  )
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parameterized_messages_fill_in_values() {
    let msg = Message::OpenDone {
      open: 3,
      done: 1
    };
    assert_eq!(
      msg.text(Lang::De),
      "3 offen · 1 erledigt"
    );
    assert_eq!(
      msg.text(Lang::En),
      "3 open · 1 done"
    );
    assert_eq!(
      Message::WeekOf("Mo 13. Mai".into())
        .text(Lang::De),
      "Woche ab Mo 13. Mai"
    );
  }

  #[test]
  fn languages_differ_where_expected() {
    assert_eq!(
      Message::NoneForDay.text(Lang::En),
      "No tasks for this day."
    );
    assert_ne!(
      Message::NoneForDay.text(Lang::De),
      Message::NoneForDay.text(Lang::En)
    );
    assert_eq!(
      Message::from(FilterMode::Planned)
        .text(Lang::De),
      "geplant"
    );
  }

  #[test]
  fn day_and_month_labels() {
    let day = date(2024, 5, 15);
    assert_eq!(
      day_label(day, Lang::De),
      "Mi 15. Mai"
    );
    assert_eq!(
      day_label(day, Lang::En),
      "Wed, May 15"
    );
    assert_eq!(
      month_title(date(2024, 3, 1), Lang::De),
      "März 2024"
    );
  }

  #[test]
  fn lang_parses_names() {
    assert_eq!(
      "English".parse::<Lang>().ok(),
      Some(Lang::En)
    );
    assert!("fr".parse::<Lang>().is_err());
  }
}
