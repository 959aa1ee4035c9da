use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  DateTime,
  NaiveDate,
  NaiveTime,
  Utc
};
use chrono_tz::Tz;
use tracing::debug;

use crate::datetime::{
  local_to_utc,
  today_in
};
use crate::entry::{
  Entry,
  EntryDraft
};
use crate::error::EntryError;
use crate::filter::{
  EntryFilter,
  FilterMode
};
use crate::grid::{
  ViewMode,
  add_days,
  shift_focus
};
use crate::preferences::Preferences;

const PLAN_HOUR: u32 = 9;

/// Ephemeral view selectors. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
  pub selected_date:  NaiveDate,
  pub mode:           ViewMode,
  pub query:          String,
  pub show_completed: bool,
  pub filter:         FilterMode
}

impl ViewState {
  pub fn for_preferences(
    prefs: &Preferences,
    today: NaiveDate
  ) -> Self {
    Self {
      selected_date:  today,
      mode:           prefs.default_view,
      query:          String::new(),
      show_completed: prefs
        .show_completed_by_default,
      filter:         FilterMode::All
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanWhen {
  Today,
  Tomorrow,
  NextWeek,
  Unplanned
}

impl FromStr for PlanWhen {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "today" => Ok(Self::Today),
      | "tomorrow" => Ok(Self::Tomorrow),
      | "nextweek" | "next-week" => {
        Ok(Self::NextWeek)
      }
      | "none" | "unplanned" => {
        Ok(Self::Unplanned)
      }
      | other => Err(anyhow!(
        "unknown plan target: {other} \
         (expected today, tomorrow, \
         nextweek or none)"
      ))
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  QuickAdd {
    title: String
  },
  Create(EntryDraft),
  Toggle(String),
  Delete(String),
  CyclePriority(String),
  Plan {
    id:   String,
    when: PlanWhen
  },
  SelectDate(NaiveDate),
  SetView(ViewMode),
  Navigate(i64),
  SetQuery(String),
  SetShowCompleted(bool),
  SetFilter(FilterMode),
  UpdatePreferences(Preferences)
}

impl Action {
  pub fn name(&self) -> &'static str {
    match self {
      | Self::QuickAdd {
        ..
      } => "quick_add",
      | Self::Create(_) => "create",
      | Self::Toggle(_) => "toggle",
      | Self::Delete(_) => "delete",
      | Self::CyclePriority(_) => {
        "cycle_priority"
      }
      | Self::Plan {
        ..
      } => "plan",
      | Self::SelectDate(_) => {
        "select_date"
      }
      | Self::SetView(_) => "set_view",
      | Self::Navigate(_) => "navigate",
      | Self::SetQuery(_) => "set_query",
      | Self::SetShowCompleted(_) => {
        "set_show_completed"
      }
      | Self::SetFilter(_) => "set_filter",
      | Self::UpdatePreferences(_) => {
        "update_preferences"
      }
    }
  }

  /// Whether the action changes a persisted record.
  pub fn mutates_records(&self) -> bool {
    matches!(
      self,
      Self::QuickAdd { .. }
        | Self::Create(_)
        | Self::Toggle(_)
        | Self::Delete(_)
        | Self::CyclePriority(_)
        | Self::Plan { .. }
        | Self::UpdatePreferences(_)
    )
  }
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct Stats {
  pub open: usize,
  pub done: usize
}

/// Everything the views read. Transitions return a new snapshot and leave
/// the receiver untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
  pub entries:     Vec<Entry>,
  pub preferences: Preferences,
  pub view:        ViewState
}

impl AppState {
  pub fn new(
    entries: Vec<Entry>,
    preferences: Preferences,
    now: DateTime<Utc>
  ) -> Self {
    let today = today_in(
      &preferences.timezone(),
      now
    );
    let view = ViewState::for_preferences(
      &preferences,
      today
    );
    Self {
      entries,
      preferences,
      view
    }
  }

  pub fn timezone(&self) -> Tz {
    self.preferences.timezone()
  }

  pub fn today(
    &self,
    now: DateTime<Utc>
  ) -> NaiveDate {
    today_in(&self.timezone(), now)
  }

  pub fn find(
    &self,
    id: &str
  ) -> Option<&Entry> {
    self
      .entries
      .iter()
      .find(|entry| entry.id == id)
  }

  #[tracing::instrument(skip(
    self, action, now
  ), fields(action = action.name()))]
  pub fn apply(
    &self,
    action: Action,
    now: DateTime<Utc>
  ) -> Result<Self, EntryError> {
    let mut next = self.clone();
    next.reduce(action, now)?;
    Ok(next)
  }

  /// Applies `actions` in order; each step sees the previous snapshot.
  pub fn apply_all<I>(
    &self,
    actions: I,
    now: DateTime<Utc>
  ) -> Result<Self, EntryError>
  where
    I: IntoIterator<Item = Action>
  {
    actions.into_iter().try_fold(
      self.clone(),
      |state, action| {
        state.apply(action, now)
      }
    )
  }

  fn reduce(
    &mut self,
    action: Action,
    now: DateTime<Utc>
  ) -> Result<(), EntryError> {
    match action {
      | Action::QuickAdd {
        title
      } => {
        let entry = Entry::quick(
          &title,
          self.view.selected_date,
          now,
          &self.preferences
        )?;
        debug!(id = %entry.id, "quick-added entry");
        self.entries.insert(0, entry);
      }
      | Action::Create(draft) => {
        let entry = draft.build(
          now,
          self.view.selected_date,
          &self.preferences
        )?;
        debug!(id = %entry.id, kind = ?entry.kind, "created entry");
        self.entries.insert(0, entry);
      }
      | Action::Toggle(id) => {
        self.update_entry(&id, |entry| {
          entry.completed =
            !entry.completed;
          entry.touch(now);
        });
      }
      | Action::Delete(id) => {
        let before = self.entries.len();
        self
          .entries
          .retain(|entry| entry.id != id);
        if self.entries.len() == before {
          debug!(id = %id, "delete of unknown entry ignored");
        }
      }
      | Action::CyclePriority(id) => {
        self.update_entry(&id, |entry| {
          entry.priority =
            entry.priority.cycled();
          entry.touch(now);
        });
      }
      | Action::Plan {
        id,
        when
      } => {
        let due = self.plan_target(when, now);
        self.update_entry(&id, |entry| {
          entry.reschedule(due, now);
        });
      }
      | Action::SelectDate(date) => {
        self.view.selected_date = date;
      }
      | Action::SetView(mode) => {
        self.view.mode = mode;
      }
      | Action::Navigate(step) => {
        self.view.selected_date =
          shift_focus(
            self.view.selected_date,
            self.view.mode,
            step
          );
      }
      | Action::SetQuery(query) => {
        self.view.query = query;
      }
      | Action::SetShowCompleted(show) => {
        self.view.show_completed = show;
      }
      | Action::SetFilter(mode) => {
        self.view.filter = mode;
      }
      | Action::UpdatePreferences(
        mut prefs
      ) => {
        prefs.sanitize();
        self.preferences = prefs;
      }
    }
    Ok(())
  }

  fn update_entry<F>(
    &mut self,
    id: &str,
    apply: F
  ) where
    F: FnOnce(&mut Entry)
  {
    match self
      .entries
      .iter_mut()
      .find(|entry| entry.id == id)
    {
      | Some(entry) => apply(entry),
      | None => {
        debug!(id, "update of unknown entry ignored");
      }
    }
  }

  fn plan_target(
    &self,
    when: PlanWhen,
    now: DateTime<Utc>
  ) -> Option<DateTime<Utc>> {
    let today = self.today(now);
    let day = match when {
      | PlanWhen::Today => today,
      | PlanWhen::Tomorrow => {
        add_days(today, 1)
      }
      | PlanWhen::NextWeek => {
        add_days(today, 7)
      }
      | PlanWhen::Unplanned => {
        return None;
      }
    };
    let at = NaiveTime::from_hms_opt(
      PLAN_HOUR, 0, 0
    )?;
    local_to_utc(
      day.and_time(at),
      &self.timezone()
    )
  }

  pub fn entry_filter(
    &self,
    now: DateTime<Utc>
  ) -> EntryFilter {
    EntryFilter {
      selected_date:  self
        .view
        .selected_date,
      today:          self.today(now),
      query:          self.view.query.clone(),
      show_completed: self
        .view
        .show_completed,
      mode:           self.view.filter,
      timezone:       self.timezone()
    }
  }

  /// Filtered, ordered entries of the selected day.
  pub fn visible_entries(
    &self,
    now: DateTime<Utc>
  ) -> Vec<&Entry> {
    self
      .entry_filter(now)
      .apply(&self.entries)
  }

  pub fn stats(&self) -> Stats {
    let open = self
      .entries
      .iter()
      .filter(|entry| !entry.completed)
      .count();
    Stats {
      open,
      done: self.entries.len() - open
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Timelike
  };

  use super::*;
  use crate::entry::Priority;

  fn now() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2024, 5, 15, 6, 0, 0
      )
      .single()
      .expect("valid now")
  }

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn state_with(
    titles: &[&str]
  ) -> AppState {
    let empty = AppState::new(
      vec![],
      Preferences::default(),
      now()
    );
    empty
      .apply_all(
        titles.iter().rev().map(|title| {
          Action::QuickAdd {
            title: title.to_string()
          }
        }),
        now()
      )
      .expect("quick add")
  }

  #[test]
  fn new_state_follows_preferences() {
    let prefs = Preferences {
      default_view: ViewMode::Month,
      show_completed_by_default: false,
      ..Preferences::default()
    };
    let state =
      AppState::new(vec![], prefs, now());
    assert_eq!(state.view.mode, ViewMode::Month);
    assert!(!state.view.show_completed);
    assert_eq!(
      state.view.selected_date,
      date(2024, 5, 15)
    );
  }

  #[test]
  fn quick_add_prepends_on_selected_day() {
    let state = state_with(&["first", "second"]);
    assert_eq!(state.entries[0].title, "first");
    assert_eq!(state.entries[1].title, "second");

    let moved = state
      .apply(
        Action::SelectDate(date(2024, 5, 20)),
        now()
      )
      .and_then(|s| {
        s.apply(
          Action::QuickAdd {
            title: "third".to_string()
          },
          now()
        )
      })
      .expect("apply");
    assert_eq!(moved.entries[0].title, "third");
    assert_eq!(
      moved.entries[0]
        .due_date(&moved.timezone()),
      Some(date(2024, 5, 20))
    );
    assert_eq!(state.entries.len(), 2);
  }

  #[test]
  fn empty_title_leaves_state_untouched() {
    let state = state_with(&["only"]);
    let err = state
      .apply(
        Action::QuickAdd {
          title: "  ".to_string()
        },
        now()
      )
      .expect_err("empty title");
    assert_eq!(err, EntryError::EmptyTitle);

    let err = state
      .apply(
        Action::Create(EntryDraft::default()),
        now()
      )
      .expect_err("empty title");
    assert_eq!(err, EntryError::EmptyTitle);
    assert_eq!(state.entries.len(), 1);
  }

  #[test]
  fn toggle_cycle_and_delete() {
    let state = state_with(&["a", "b"]);
    let id = state.entries[0].id.clone();
    let later = now() + chrono::Duration::minutes(5);

    let toggled = state
      .apply(Action::Toggle(id.clone()), later)
      .expect("toggle");
    let entry = toggled.find(&id).expect("entry");
    assert!(entry.completed);
    assert_eq!(entry.updated_at, later);
    assert_eq!(toggled.stats(), Stats { open: 1, done: 1 });

    let cycled = toggled
      .apply(Action::CyclePriority(id.clone()), later)
      .expect("cycle");
    assert_eq!(
      cycled.find(&id).map(|e| e.priority),
      Some(Priority::High)
    );

    let deleted = cycled
      .apply(Action::Delete(id.clone()), later)
      .expect("delete");
    assert!(deleted.find(&id).is_none());
    assert_eq!(deleted.entries.len(), 1);
  }

  #[test]
  fn unknown_ids_are_no_ops() {
    let state = state_with(&["a"]);
    let next = state
      .apply_all(
        [
          Action::Toggle("missing".into()),
          Action::Delete("missing".into()),
          Action::CyclePriority(
            "missing".into()
          ),
        ],
        now()
      )
      .expect("apply");
    assert_eq!(next, state);
  }

  #[test]
  fn plan_moves_due_relative_to_today() {
    let state = state_with(&["a"]);
    let id = state.entries[0].id.clone();
    let tz = state.timezone();

    let planned = state
      .apply(
        Action::Plan {
          id:   id.clone(),
          when: PlanWhen::NextWeek
        },
        now()
      )
      .expect("plan");
    let due = planned
      .find(&id)
      .and_then(|e| e.due_at(&tz))
      .expect("due")
      .with_timezone(&tz);
    assert_eq!(due.date_naive(), date(2024, 5, 22));
    assert_eq!(due.hour(), 9);

    let cleared = planned
      .apply(
        Action::Plan {
          id:   id.clone(),
          when: PlanWhen::Unplanned
        },
        now()
      )
      .expect("plan");
    assert!(
      cleared.find(&id).and_then(|e| e.due.clone()).is_none()
    );
  }

  #[test]
  fn actions_apply_in_issue_order() {
    let state = state_with(&[]);
    let next = state
      .apply_all(
        [
          Action::SetView(ViewMode::Month),
          Action::Navigate(1),
          Action::SetView(ViewMode::Week),
          Action::Navigate(-1),
        ],
        now()
      )
      .expect("apply");
    assert_eq!(
      next.view.selected_date,
      date(2024, 6, 8)
    );
    assert_eq!(next.view.mode, ViewMode::Week);
  }

  #[test]
  fn visible_entries_use_view_state() {
    let state = state_with(&["Budget Review", "Client standup"]);
    let next = state
      .apply(
        Action::SetQuery("budget".into()),
        now()
      )
      .expect("apply");
    let visible = next.visible_entries(now());
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title, "Budget Review");
  }

  #[test]
  fn preferences_are_sanitized_on_update() {
    let state = state_with(&[]);
    let prefs = Preferences {
      work_start: "nonsense".into(),
      ..Preferences::default()
    };
    let next = state
      .apply(
        Action::UpdatePreferences(prefs),
        now()
      )
      .expect("apply");
    assert_eq!(next.preferences.work_start, "09:00");
  }

  #[test]
  fn plan_when_parses() {
    assert_eq!(
      "next-week".parse::<PlanWhen>().ok(),
      Some(PlanWhen::NextWeek)
    );
    assert!("later".parse::<PlanWhen>().is_err());
  }
}
