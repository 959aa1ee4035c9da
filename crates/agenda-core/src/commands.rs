use std::io::Write;

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::cli::{Command, SettingsCommand, ViewArgs};
use crate::config::AgendaConfig;
use crate::grid::ViewMode;
use crate::render::Renderer;
use crate::state::{Action, AppState};
use crate::store::{ENTRIES_KEY, KeyValueStore, load_state, save_state};

/// One load, apply, render and save cycle.
#[instrument(skip(store, cfg, out, command, now))]
pub fn dispatch<S, W>(
    store: &mut S,
    cfg: &AgendaConfig,
    out: &mut W,
    anchor: Option<NaiveDate>,
    now: DateTime<Utc>,
    command: Option<Command>,
) -> anyhow::Result<()>
where
    S: KeyValueStore + ?Sized,
    W: Write,
{
    let fresh = store.get(ENTRIES_KEY).ok().flatten().is_none();
    let mut state = load_state(&*store, now);
    if let Some(date) = anchor {
        state = state.apply(Action::SelectDate(date), now)?;
    }

    let renderer = Renderer::new(cfg, state.preferences.language);
    let command = command.unwrap_or_else(|| default_command(&state));
    debug!(?command, fresh, "dispatching");

    let mut changed = false;
    let mut apply = |state: &AppState, action: Action| -> anyhow::Result<AppState> {
        changed |= action.mutates_records();
        Ok(state.apply(action, now)?)
    };

    let view_mode = command.view_mode();
    match command {
        Command::Day(args) | Command::Week(args) | Command::Month(args) => {
            let mode = view_mode.unwrap_or(state.view.mode);
            for action in view_actions(mode, &args) {
                state = apply(&state, action)?;
            }
            renderer.render_view(out, &state, now)?;
        }
        Command::Add { title } => {
            state = apply(&state, Action::QuickAdd { title: title.join(" ") })?;
            announce_created(&renderer, out, &state)?;
        }
        Command::New(args) => {
            state = apply(&state, Action::Create(args.into_draft()))?;
            announce_created(&renderer, out, &state)?;
        }
        Command::Show { id } => {
            let id = resolve_entry_id(&state, &id)?;
            if let Some(entry) = state.find(&id) {
                renderer.write_entry(out, entry, &state.timezone())?;
            }
        }
        Command::Toggle { id } => {
            let id = resolve_entry_id(&state, &id)?;
            state = apply(&state, Action::Toggle(id.clone()))?;
            write_entry_line(&renderer, out, &state, &id)?;
        }
        Command::Prio { id } => {
            let id = resolve_entry_id(&state, &id)?;
            state = apply(&state, Action::CyclePriority(id.clone()))?;
            write_entry_line(&renderer, out, &state, &id)?;
        }
        Command::Plan { id, when } => {
            let id = resolve_entry_id(&state, &id)?;
            state = apply(&state, Action::Plan { id: id.clone(), when })?;
            write_entry_line(&renderer, out, &state, &id)?;
        }
        Command::Delete { id } => {
            let id = resolve_entry_id(&state, &id)?;
            let title = state.find(&id).map(|entry| entry.title.clone()).unwrap_or_default();
            state = apply(&state, Action::Delete(id.clone()))?;
            info!(id = %id, "entry deleted");
            writeln!(out, "- {title}")?;
        }
        Command::Settings { action } => match action {
            SettingsCommand::Show => {
                renderer.write_preferences(out, &state.preferences)?;
            }
            SettingsCommand::Set { key, value } => {
                let mut prefs = state.preferences.clone();
                prefs
                    .set_field(&key, &value)
                    .with_context(|| format!("cannot set {key}"))?;
                state = apply(&state, Action::UpdatePreferences(prefs))?;
                Renderer::new(cfg, state.preferences.language).write_preferences(out, &state.preferences)?;
            }
            SettingsCommand::Zones => {
                renderer.write_zones(out, &state.preferences.timezone)?;
            }
        },
    }

    if changed || fresh {
        debug!(changed, fresh, "saving records");
        save_state(store, &state).context("failed to save records")?;
    }
    Ok(())
}

fn default_command(state: &AppState) -> Command {
    let args = ViewArgs::default();
    match state.preferences.default_view {
        ViewMode::Day => Command::Day(args),
        ViewMode::Week => Command::Week(args),
        ViewMode::Month => Command::Month(args),
    }
}

fn view_actions(mode: ViewMode, args: &ViewArgs) -> Vec<Action> {
    let mut actions = vec![Action::SetView(mode)];
    if args.shift != 0 {
        actions.push(Action::Navigate(args.shift));
    }
    if let Some(query) = &args.query {
        actions.push(Action::SetQuery(query.clone()));
    }
    if let Some(filter) = args.filter {
        actions.push(Action::SetFilter(filter));
    }
    if let Some(show) = args.show_completed() {
        actions.push(Action::SetShowCompleted(show));
    }
    actions
}

/// Prints the confirmation and detail block for the newest entry.
fn announce_created<W: Write>(renderer: &Renderer, out: &mut W, state: &AppState) -> anyhow::Result<()> {
    let entry = state
        .entries
        .first()
        .ok_or_else(|| anyhow!("entry was not created"))?;
    info!(id = %entry.id, "entry created");
    writeln!(out, "{}", renderer.created(entry))?;
    renderer.write_entry(out, entry, &state.timezone())
}

fn write_entry_line<W: Write>(renderer: &Renderer, out: &mut W, state: &AppState, id: &str) -> anyhow::Result<()> {
    let entry = state.find(id).ok_or_else(|| anyhow!("entry vanished: {id}"))?;
    renderer.write_day_list(out, &[entry], &state.timezone())
}

/// Full id for `raw`, which may be any unique prefix.
pub fn resolve_entry_id(state: &AppState, raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(anyhow!("entry id cannot be empty"));
    }
    if let Some(entry) = state.find(raw) {
        return Ok(entry.id.clone());
    }

    let mut matches = state.entries.iter().filter(|entry| entry.id.starts_with(raw));
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no entry matches id {raw}"))?;
    let others = matches.count();
    if others > 0 {
        return Err(anyhow!("id prefix {raw} is ambiguous ({} entries)", others + 1));
    }
    Ok(first.id.clone())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use clap::Parser;

    use super::*;
    use crate::cli::GlobalCli;
    use crate::entry::Priority;
    use crate::preferences::Preferences;
    use crate::store::{MemoryStore, PREFERENCES_KEY, save};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 6, 0, 0)
            .single()
            .expect("valid now")
    }

    fn plain() -> AgendaConfig {
        AgendaConfig {
            color: Some(false),
            ..AgendaConfig::default()
        }
    }

    fn run(store: &mut MemoryStore, args: &[&str]) -> anyhow::Result<String> {
        let cli = GlobalCli::try_parse_from(std::iter::once("agenda").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        dispatch(store, &plain(), &mut out, cli.date, now(), cli.command)?;
        Ok(String::from_utf8(out)?)
    }

    fn empty_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        save::<_, [crate::entry::Entry]>(&mut store, ENTRIES_KEY, &[]).expect("save");
        let prefs = Preferences {
            language: crate::i18n::Lang::En,
            ..Preferences::default()
        };
        save(&mut store, PREFERENCES_KEY, &prefs).expect("save");
        store
    }

    #[test]
    fn first_run_seeds_and_persists() {
        let mut store = MemoryStore::new();
        let text = run(&mut store, &["day"]).expect("day view");
        assert!(!text.is_empty());
        assert!(store.get(ENTRIES_KEY).expect("get").is_some());
    }

    #[test]
    fn add_then_list_then_cycle() {
        let mut store = empty_store();
        let created = run(&mut store, &["add", "Pay", "rent"]).expect("add");
        assert!(created.starts_with("Created: "));

        let listed = run(&mut store, &["day"]).expect("day");
        assert!(listed.contains("Pay rent"));
        assert!(listed.contains("09:00"));

        let state = load_state(&store, now());
        let id = state.entries[0].id.clone();
        run(&mut store, &["prio", &id[..6]]).expect("prio");
        let state = load_state(&store, now());
        assert_eq!(state.entries[0].priority, Priority::High);
    }

    #[test]
    fn view_options_do_not_persist() {
        let mut store = empty_store();
        run(&mut store, &["add", "Pay", "rent"]).expect("add");
        let before = store.get(ENTRIES_KEY).expect("get");

        let text = run(&mut store, &["day", "--query", "groceries"]).expect("day");
        assert!(text.contains("No tasks for this day."));
        assert_eq!(store.get(ENTRIES_KEY).expect("get"), before);
    }

    #[test]
    fn read_only_commands_leave_records_alone() {
        let mut store = empty_store();
        run(&mut store, &["add", "Pay", "rent"]).expect("add");
        let entries = store.get(ENTRIES_KEY).expect("get");
        let prefs = store.get(PREFERENCES_KEY).expect("get");

        let id = load_state(&store, now()).entries[0].id.clone();
        run(&mut store, &["show", &id]).expect("show");
        run(&mut store, &["settings", "show"]).expect("settings");
        run(&mut store, &["week", "--filter", "done", "--shift", "2"]).expect("week");
        assert_eq!(store.get(ENTRIES_KEY).expect("get"), entries);
        assert_eq!(store.get(PREFERENCES_KEY).expect("get"), prefs);

        run(&mut store, &["toggle", &id]).expect("toggle");
        assert!(load_state(&store, now()).entries[0].completed);
    }

    #[test]
    fn empty_title_is_reported() {
        let mut store = empty_store();
        let err = run(&mut store, &["add", "  "]).expect_err("empty title");
        assert!(format!("{err:#}").contains("title"));
        assert!(load_state(&store, now()).entries.is_empty());
    }

    #[test]
    fn settings_set_persists_preference() {
        let mut store = empty_store();
        run(&mut store, &["settings", "set", "firstDay", "sunday"]).expect("set");
        let state = load_state(&store, now());
        assert_eq!(state.preferences.first_day, crate::grid::FirstDay::Sunday);
        assert!(run(&mut store, &["settings", "set", "timezone", "Mars/Base"]).is_err());
    }

    #[test]
    fn id_prefix_must_be_unique() {
        let state = AppState::new(vec![], Preferences::default(), now())
            .apply_all(
                [
                    Action::QuickAdd { title: "a".into() },
                    Action::QuickAdd { title: "b".into() },
                ],
                now(),
            )
            .expect("add");
        let id = state.entries[0].id.clone();
        assert_eq!(resolve_entry_id(&state, &id).expect("full id"), id);
        assert!(resolve_entry_id(&state, "").is_err());
        assert!(resolve_entry_id(&state, "zzzz").is_err());
    }
}
