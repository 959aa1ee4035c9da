use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  warn
};

use crate::datetime::{
  DEFAULT_TIMEZONE,
  find_preset,
  parse_clock,
  resolve_timezone
};
use crate::grid::{
  FirstDay,
  ViewMode
};
use crate::i18n::Lang;

const DEFAULT_WORK_START: &str = "09:00";
const DEFAULT_WORK_END: &str = "17:00";
const DEFAULT_REMINDER_MINUTES: u32 = 30;
const MAX_REMINDER_MINUTES: u32 =
  7 * 24 * 60;

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
pub enum Theme {
  #[default]
  System,
  Light,
  Dark
}

impl FromStr for Theme {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "system" => Ok(Self::System),
      | "light" => Ok(Self::Light),
      | "dark" => Ok(Self::Dark),
      | other => {
        Err(anyhow!("unknown theme: {other}"))
      }
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
pub enum Density {
  #[default]
  Comfortable,
  Compact
}

impl FromStr for Density {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "comfortable" => {
        Ok(Self::Comfortable)
      }
      | "compact" => Ok(Self::Compact),
      | other => Err(anyhow!(
        "unknown density: {other}"
      ))
    }
  }
}

/// The persisted user profile. Fields missing from a stored record take
/// their defaults.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
  pub name:                      String,
  pub email:                     String,
  pub avatar:                    String,
  /// Uploaded picture as a data URL. Stored as-is, never decoded.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avatar_image:              Option<String>,
  pub theme:                     Theme,
  pub default_view:              ViewMode,
  pub first_day:                 FirstDay,
  /// IANA name of one of the time zone presets.
  pub timezone:                  String,
  pub default_reminder:          u32,
  pub work_start:                String,
  pub work_end:                  String,
  pub density:                   Density,
  pub language:                  Lang,
  pub show_week_numbers:         bool,
  pub show_completed_by_default: bool
}

impl Default for Preferences {
  fn default() -> Self {
    Self {
      name: "User".to_string(),
      email: String::new(),
      avatar: "FD".to_string(),
      avatar_image: None,
      theme: Theme::System,
      default_view: ViewMode::Day,
      first_day: FirstDay::Monday,
      timezone: DEFAULT_TIMEZONE
        .to_string(),
      default_reminder:
        DEFAULT_REMINDER_MINUTES,
      work_start: DEFAULT_WORK_START
        .to_string(),
      work_end: DEFAULT_WORK_END
        .to_string(),
      density: Density::Comfortable,
      language: Lang::De,
      show_week_numbers: false,
      show_completed_by_default: true
    }
  }
}

impl Preferences {
  pub fn timezone(&self) -> Tz {
    resolve_timezone(&self.timezone)
  }

  pub fn work_start_time(
    &self
  ) -> NaiveTime {
    parse_clock(&self.work_start)
      .or_else(|| {
        parse_clock(DEFAULT_WORK_START)
      })
      .unwrap_or_default()
  }

  pub fn work_end_time(
    &self
  ) -> NaiveTime {
    parse_clock(&self.work_end)
      .or_else(|| {
        parse_clock(DEFAULT_WORK_END)
      })
      .unwrap_or_default()
  }

  /// Repairs values a hand-edited or stale record may carry.
  pub fn sanitize(&mut self) {
    match find_preset(&self.timezone) {
      | Some(preset) => {
        self.timezone =
          preset.iana.to_string();
      }
      | None => {
        warn!(
          timezone = %self.timezone,
          "unknown timezone preset; resetting"
        );
        self.timezone =
          DEFAULT_TIMEZONE.to_string();
      }
    }

    if parse_clock(&self.work_start)
      .is_none()
    {
      warn!(
        work_start = %self.work_start,
        "invalid work start; resetting"
      );
      self.work_start =
        DEFAULT_WORK_START.to_string();
    }
    if parse_clock(&self.work_end)
      .is_none()
    {
      warn!(
        work_end = %self.work_end,
        "invalid work end; resetting"
      );
      self.work_end =
        DEFAULT_WORK_END.to_string();
    }
    if self.work_end_time()
      < self.work_start_time()
    {
      self.work_end =
        self.work_start.clone();
    }

    if self.default_reminder
      > MAX_REMINDER_MINUTES
    {
      self.default_reminder =
        MAX_REMINDER_MINUTES;
    }
  }

  /// Sets one field by its record key (`camelCase`) and re-sanitizes.
  pub fn set_field(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    let value = value.trim();
    match key {
      | "name" => {
        self.name = value.to_string()
      }
      | "email" => {
        self.email = value.to_string()
      }
      | "avatar" => {
        self.avatar = value.to_string()
      }
      | "theme" => {
        self.theme = value.parse()?
      }
      | "defaultView" => {
        self.default_view =
          value.parse()?
      }
      | "firstDay" => {
        self.first_day = value.parse()?
      }
      | "timezone" => {
        let preset = find_preset(value)
          .ok_or_else(|| {
            anyhow!(
              "timezone must be one of \
               the presets (e.g. \
               Europe/Berlin or UTC+1): \
               {value}"
            )
          })?;
        self.timezone =
          preset.iana.to_string();
      }
      | "defaultReminder" => {
        self.default_reminder = value
          .parse()
          .with_context(|| {
            format!(
              "invalid reminder minutes: \
               {value}"
            )
          })?
      }
      | "workStart" | "workEnd" => {
        parse_clock(value).ok_or_else(
          || {
            anyhow!(
              "expected HH:MM, got: \
               {value}"
            )
          }
        )?;
        if key == "workStart" {
          self.work_start =
            value.to_string();
        } else {
          self.work_end =
            value.to_string();
        }
      }
      | "density" => {
        self.density = value.parse()?
      }
      | "language" => {
        self.language = value.parse()?
      }
      | "showWeekNumbers" => {
        self.show_week_numbers =
          parse_bool(value)?
      }
      | "showCompletedByDefault" => {
        self.show_completed_by_default =
          parse_bool(value)?
      }
      | other => {
        return Err(anyhow!(
          "unknown preference: {other}"
        ));
      }
    }

    debug!(key, value, "preference updated");
    self.sanitize();
    Ok(())
  }
}

fn parse_bool(
  s: &str
) -> anyhow::Result<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => Err(anyhow!(
      "expected a boolean, got: {other}"
    ))
  }
}
