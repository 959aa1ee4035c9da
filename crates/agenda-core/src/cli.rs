use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use clap::builder::ValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::datetime::parse_date;
use crate::entry::{EntryDraft, Priority, Recurrence};
use crate::filter::FilterMode;
use crate::grid::ViewMode;
use crate::state::PlanWhen;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "agenda",
    version,
    about = "Agenda: day, week and month planner for to-dos and appointments",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// TOML config file.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the records.
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// Anchor date (YYYY-MM-DD); defaults to today.
    #[arg(long = "date", global = true, value_parser = ValueParser::new(parse_date_arg))]
    pub date: Option<NaiveDate>,

    /// Pin the current time (RFC 3339).
    #[arg(long = "now", global = true, value_parser = ValueParser::new(parse_now_arg))]
    pub now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Entries of one day.
    Day(ViewArgs),
    /// Week strip plus the anchor day's entries.
    Week(ViewArgs),
    /// Month grid plus the anchor day's entries.
    Month(ViewArgs),
    /// Quick-add a to-do on the anchor day at the work-start time.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Create an entry with every field.
    New(NewArgs),
    Show {
        id: String,
    },
    /// Mark done, or open again.
    Toggle {
        id: String,
    },
    Delete {
        id: String,
    },
    /// Cycle priority low, med, high.
    Prio {
        id: String,
    },
    /// Move to today, tomorrow or next week at 09:00, or clear the due date.
    Plan {
        id: String,
        #[arg(value_parser = ValueParser::new(|s: &str| s.parse::<PlanWhen>()))]
        when: PlanWhen,
    },
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

impl Command {
    pub fn view_mode(&self) -> Option<ViewMode> {
        match self {
            Self::Day(_) => Some(ViewMode::Day),
            Self::Week(_) => Some(ViewMode::Week),
            Self::Month(_) => Some(ViewMode::Month),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    #[arg(long = "query", short = 's')]
    pub query: Option<String>,

    #[arg(long = "filter", value_parser = ValueParser::new(|s: &str| s.parse::<FilterMode>()))]
    pub filter: Option<FilterMode>,

    #[arg(long = "hide-done", conflicts_with = "show_done")]
    pub hide_done: bool,

    #[arg(long = "show-done")]
    pub show_done: bool,

    /// Move the anchor by this many days, weeks or months.
    #[arg(long = "shift", allow_hyphen_values = true, default_value_t = 0)]
    pub shift: i64,
}

impl ViewArgs {
    pub fn show_completed(&self) -> Option<bool> {
        if self.hide_done {
            Some(false)
        } else if self.show_done {
            Some(true)
        } else {
            None
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,

    #[arg(long = "appointment")]
    pub appointment: bool,

    #[arg(long = "notes")]
    pub notes: Option<String>,

    /// YYYY-MM-DD; the anchor day when omitted.
    #[arg(long = "on")]
    pub on: Option<String>,

    /// HH:MM; the work-start time when omitted.
    #[arg(long = "at")]
    pub at: Option<String>,

    #[arg(long = "all-day")]
    pub all_day: bool,

    /// Minutes before.
    #[arg(long = "reminder")]
    pub reminder: Option<u32>,

    #[arg(long = "location")]
    pub location: Option<String>,

    /// Comma separated.
    #[arg(long = "attendees")]
    pub attendees: Option<String>,

    #[arg(long = "color")]
    pub color: Option<String>,

    #[arg(long = "repeat", value_parser = ValueParser::new(|s: &str| s.parse::<Recurrence>()))]
    pub repeat: Option<Recurrence>,

    #[arg(long = "priority", value_parser = ValueParser::new(|s: &str| s.parse::<Priority>()))]
    pub priority: Option<Priority>,

    /// Comma separated.
    #[arg(long = "tags")]
    pub tags: Option<String>,
}

impl NewArgs {
    pub fn into_draft(self) -> EntryDraft {
        EntryDraft {
            title: self.title.join(" "),
            appointment: self.appointment,
            notes: self.notes.unwrap_or_default(),
            date: self.on,
            time: self.at,
            all_day: self.all_day,
            reminder: self.reminder,
            location: self.location.unwrap_or_default(),
            attendees: self.attendees.unwrap_or_default(),
            color: self.color,
            recurrence: self.repeat.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    Show,
    /// Set one preference by its record key, e.g. `firstDay sunday`.
    Set { key: String, value: String },
    /// List the time zone presets.
    Zones,
}

fn parse_date_arg(s: &str) -> anyhow::Result<NaiveDate> {
    parse_date(s).ok_or_else(|| anyhow!("expected YYYY-MM-DD, got: {s}"))
}

fn parse_now_arg(s: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("expected an RFC 3339 timestamp, got {s}: {err}"))
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
