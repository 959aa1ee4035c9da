use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::config::AgendaConfig;
use crate::datetime::TZ_PRESETS;
use crate::entry::{Entry, Priority, Recurrence};
use crate::grid::{ViewMode, iso_week_number, month_grid, open_counts_by_day, start_of_week, week_days};
use crate::i18n::{Lang, Message, day_label, month_title};
use crate::preferences::{Density, Preferences, Theme};
use crate::state::AppState;

const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    lang: Lang,
}

impl Renderer {
    pub fn new(cfg: &AgendaConfig, lang: Lang) -> Self {
        Self {
            color: cfg.color_enabled() && io::stdout().is_terminal(),
            lang,
        }
    }

    /// No escape codes, whatever the terminal.
    pub fn plain(lang: Lang) -> Self {
        Self { color: false, lang }
    }

    fn text(&self, message: impl Into<Message>) -> String {
        message.into().text(self.lang).into_owned()
    }

    pub fn header(&self, state: &AppState) -> String {
        let date = state.view.selected_date;
        match state.view.mode {
            ViewMode::Day => day_label(date, self.lang),
            ViewMode::Week => {
                let start = start_of_week(date, state.preferences.first_day);
                self.text(Message::WeekOf(day_label(start, self.lang)))
            }
            ViewMode::Month => month_title(date, self.lang),
        }
    }

    /// Header, the calendar for the current view, the selected day's list
    /// and the open/done footer.
    #[tracing::instrument(skip(self, out, state, now), fields(mode = state.view.mode.as_key(), lang = self.lang.as_key()))]
    pub fn render_view<W: Write>(
        &self,
        out: &mut W,
        state: &AppState,
        now: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<()> {
        let today = state.today(now);
        writeln!(out, "{}", self.paint(&self.header(state), "1"))?;
        writeln!(out, "{}", self.paint(&self.view_status(state), "2"))?;
        writeln!(out)?;

        match state.view.mode {
            ViewMode::Day => {}
            ViewMode::Week => {
                self.write_week_strip(&mut *out, state, today)?;
                writeln!(out)?;
            }
            ViewMode::Month => {
                self.write_month_grid(&mut *out, state, today)?;
                writeln!(out)?;
                writeln!(out, "{}", day_label(state.view.selected_date, self.lang))?;
            }
        }

        let visible = state.visible_entries(now);
        self.write_day_list(&mut *out, &visible, &state.timezone())?;
        if visible.is_empty() {
            writeln!(out, "{}", self.paint(&self.text(Message::AddForDay), "2"))?;
        }

        let stats = state.stats();
        writeln!(out)?;
        writeln!(
            out,
            "{}",
            self.text(Message::OpenDone {
                open: stats.open,
                done: stats.done,
            })
        )?;
        Ok(())
    }

    /// Filter, completed toggle and active search, in one line.
    fn view_status(&self, state: &AppState) -> String {
        let toggle = if state.view.show_completed {
            Message::HideDone
        } else {
            Message::ShowDone
        };
        let mut parts = vec![self.text(state.view.filter), self.text(toggle)];
        let query = state.view.query.trim();
        if !query.is_empty() {
            parts.push(format!("{}: \"{query}\"", self.text(Message::SearchTasks)));
        }
        parts.join(" · ")
    }

    pub fn write_day_list<W: Write>(&self, out: &mut W, entries: &[&Entry], tz: &Tz) -> anyhow::Result<()> {
        if entries.is_empty() {
            writeln!(out, "{}", self.text(Message::NoneForDay))?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            self.text(Message::Complete),
            self.text(Message::Priority),
            self.text(Message::Time),
            self.text(Message::Title),
            self.text(Message::Tags),
            self.text(Message::Location),
        ];

        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = self.paint(short_id(&entry.id), "33");
            let done = (if entry.completed { "[x]" } else { "[ ]" }).to_string();

            let priority = self.text(entry.priority);
            let priority = match entry.priority {
                Priority::High => self.paint(&priority, "31"),
                Priority::Med => priority,
                Priority::Low => self.paint(&priority, "2"),
            };

            let time = match entry.due_at(tz) {
                Some(_) if entry.all_day => self.text(Message::AllDay),
                Some(due) => due.with_timezone(tz).format("%H:%M").to_string(),
                None => "-".to_string(),
            };

            let title = if entry.completed {
                self.paint(&entry.title, "9")
            } else {
                entry.title.clone()
            };

            let tags = entry
                .tags
                .iter()
                .map(|tag| format!("+{tag}"))
                .collect::<Vec<_>>()
                .join(" ");
            let location = entry.location().unwrap_or_default().to_string();

            rows.push(vec![id, done, priority, time, title, tags, location]);
        }

        write_table(out, headers, rows)
    }

    pub fn write_week_strip<W: Write>(&self, out: &mut W, state: &AppState, today: NaiveDate) -> anyhow::Result<()> {
        let tz = state.timezone();
        let counts = open_counts_by_day(&state.entries, &tz);
        let days = week_days(state.view.selected_date, state.preferences.first_day);

        let headers = days
            .iter()
            .map(|day| self.text(Message::WeekdayShort(day.weekday())))
            .collect::<Vec<_>>();
        let numbers = days
            .iter()
            .map(|day| self.day_cell(*day, state.view.selected_date, today, false))
            .collect::<Vec<_>>();
        let badges = days
            .iter()
            .map(|day| match counts.get(day) {
                Some(count) => self.paint(&self.text(Message::OpenBadge(*count)), "36"),
                None => String::new(),
            })
            .collect::<Vec<_>>();

        write_table(out, headers, vec![numbers, badges])
    }

    pub fn write_month_grid<W: Write>(&self, out: &mut W, state: &AppState, today: NaiveDate) -> anyhow::Result<()> {
        let prefs = &state.preferences;
        let tz = state.timezone();
        let counts = open_counts_by_day(&state.entries, &tz);
        let grid = month_grid(state.view.selected_date, prefs.first_day);

        let mut headers = Vec::with_capacity(8);
        if prefs.show_week_numbers {
            headers.push(self.text(Message::WeekNumberShort));
        }
        headers.extend(
            grid.iter()
                .take(7)
                .map(|cell| self.text(Message::WeekdayShort(cell.date.weekday()))),
        );

        let mut rows = Vec::with_capacity(grid.len() / 7);
        for week in grid.chunks(7) {
            let mut row = Vec::with_capacity(8);
            if prefs.show_week_numbers {
                let week_number = week
                    .iter()
                    .find(|cell| cell.date.weekday() == Weekday::Thu)
                    .map(|cell| iso_week_number(cell.date).to_string())
                    .unwrap_or_default();
                row.push(self.paint(&week_number, "2"));
            }
            for cell in week {
                let mut text = self.day_cell(cell.date, state.view.selected_date, today, cell.dimmed);
                if !cell.dimmed
                    && let Some(count) = counts.get(&cell.date)
                {
                    text.push(' ');
                    text.push_str(&self.paint(&format!("·{count}"), "36"));
                }
                row.push(text);
            }
            rows.push(row);
        }

        write_table(out, headers, rows)
    }

    fn day_cell(&self, day: NaiveDate, selected: NaiveDate, today: NaiveDate, dimmed: bool) -> String {
        let number = day.day().to_string();
        if dimmed {
            return if self.color {
                self.paint(&number, "2")
            } else {
                format!("({number})")
            };
        }
        if day == selected {
            return self.paint(&format!("[{number}]"), "7");
        }
        if day == today {
            return self.paint(&format!("{number}*"), "1");
        }
        number
    }

    pub fn write_preferences<W: Write>(&self, out: &mut W, prefs: &Preferences) -> anyhow::Result<()> {
        let theme = match prefs.theme {
            Theme::System => Message::System,
            Theme::Light => Message::Light,
            Theme::Dark => Message::Dark,
        };
        let density = match prefs.density {
            Density::Comfortable => Message::Comfortable,
            Density::Compact => Message::Compact,
        };
        let language = match prefs.language {
            Lang::De => Message::German,
            Lang::En => Message::English,
        };
        let yes_no = |flag: bool| (if flag { "✓" } else { "-" }).to_string();

        let rows = vec![
            ("name", Message::Name, prefs.name.clone()),
            ("email", Message::Email, prefs.email.clone()),
            ("avatar", Message::Avatar, prefs.avatar.clone()),
            ("theme", Message::Theme, self.text(theme)),
            ("defaultView", Message::DefaultView, self.text(prefs.default_view)),
            ("firstDay", Message::FirstDay, self.text(prefs.first_day)),
            ("timezone", Message::Timezone, prefs.timezone.clone()),
            (
                "defaultReminder",
                Message::DefaultReminder,
                format!("{} {}", prefs.default_reminder, self.text(Message::MinutesBefore)),
            ),
            (
                "workStart/workEnd",
                Message::WorkHours,
                format!("{} - {}", prefs.work_start, prefs.work_end),
            ),
            ("density", Message::Density, self.text(density)),
            ("language", Message::Language, self.text(language)),
            (
                "showWeekNumbers",
                Message::ShowWeekNumbers,
                yes_no(prefs.show_week_numbers),
            ),
            (
                "showCompletedByDefault",
                Message::ShowCompletedByDefault,
                yes_no(prefs.show_completed_by_default),
            ),
        ];

        let title = format!("{} · {}", self.text(Message::AppName), self.text(Message::ProfileSettings));
        writeln!(out, "{}", self.paint(&title, "1"))?;
        let rows = rows
            .into_iter()
            .map(|(key, label, value)| vec![self.text(label), value, self.paint(key, "2")])
            .collect();
        write_table(out, vec![String::new(), String::new(), String::new()], rows)
    }

    pub fn write_zones<W: Write>(&self, out: &mut W, current: &str) -> anyhow::Result<()> {
        let rows = TZ_PRESETS
            .iter()
            .map(|preset| {
                let label = match self.lang {
                    Lang::De => preset.label_de,
                    Lang::En => preset.label_en,
                };
                let marker = if preset.iana == current { "*" } else { "" };
                vec![
                    marker.to_string(),
                    preset.id.to_string(),
                    preset.iana.to_string(),
                    label.to_string(),
                ]
            })
            .collect();
        write_table(
            out,
            vec![
                String::new(),
                "ID".to_string(),
                "IANA".to_string(),
                self.text(Message::Timezone),
            ],
            rows,
        )
    }

    /// Detail lines for one entry.
    pub fn write_entry<W: Write>(&self, out: &mut W, entry: &Entry, tz: &Tz) -> anyhow::Result<()> {
        let kind = if entry.is_appointment() {
            Message::Appointment
        } else {
            Message::Todo
        };
        let due = match entry.due_at(tz) {
            Some(due) if entry.all_day => format!(
                "{} ({})",
                due.with_timezone(tz).format("%Y-%m-%d"),
                self.text(Message::AllDay)
            ),
            Some(due) => due.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string(),
            None => "-".to_string(),
        };
        let recurrence = match entry.recurrence {
            Recurrence::None => Message::RecurrenceNone,
            Recurrence::Daily => Message::Daily,
            Recurrence::Weekly => Message::Weekly,
            Recurrence::Monthly => Message::Monthly,
        };

        let mut rows = vec![
            vec!["ID".to_string(), entry.id.clone()],
            vec![self.text(kind), entry.title.clone()],
            vec![self.text(Message::Date), due],
            vec![self.text(Message::Priority), self.text(entry.priority)],
            vec![self.text(Message::Recurrence), self.text(recurrence)],
        ];
        if let Some(notes) = &entry.notes {
            rows.push(vec![self.text(Message::Notes), notes.clone()]);
        }
        if let Some(reminder) = entry.reminder {
            rows.push(vec![
                self.text(Message::Reminder),
                format!("{reminder} {}", self.text(Message::MinutesBefore)),
            ]);
        }
        if let Some(location) = entry.location() {
            rows.push(vec![self.text(Message::Location), location.to_string()]);
        }
        if !entry.attendees().is_empty() {
            rows.push(vec![self.text(Message::Attendees), entry.attendees().join(", ")]);
        }
        if let Some(color) = &entry.color {
            rows.push(vec![self.text(Message::Color), self.paint(color, "2")]);
        }
        if !entry.tags.is_empty() {
            rows.push(vec![self.text(Message::Tags), entry.tags.join(", ")]);
        }
        write_table(out, vec![String::new(), String::new()], rows)
    }

    pub fn created(&self, entry: &Entry) -> String {
        self.text(Message::Created(short_id(&entry.id).to_string()))
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

fn write_table<W: Write>(writer: &mut W, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().take(column_count).enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    if headers.iter().any(|header| !header.is_empty()) {
        write_row(writer, &headers, &widths)?;
        let rule = widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>();
        write_row(writer, &rule, &widths)?;
    }

    for row in &rows {
        write_row(writer, row, &widths)?;
    }

    Ok(())
}

fn write_row<W: Write>(writer: &mut W, cells: &[String], widths: &[usize]) -> anyhow::Result<()> {
    let mut line = String::new();
    for (cell, width) in cells.iter().zip(widths) {
        let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
        let padding = width.saturating_sub(visible_width);
        line.push_str(cell);
        line.push_str(&" ".repeat(padding));
        line.push(' ');
    }
    writeln!(writer, "{}", line.trim_end())?;
    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::entry::EntryDraft;
    use crate::state::Action;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 6, 0, 0)
            .single()
            .expect("valid now")
    }

    fn render(state: &AppState, lang: Lang) -> String {
        let mut out = Vec::new();
        Renderer::plain(lang)
            .render_view(&mut out, state, now())
            .expect("render");
        String::from_utf8(out).expect("utf8")
    }

    fn sample_state() -> AppState {
        let draft = EntryDraft {
            time: Some("14:30".to_string()),
            tags: "work".to_string(),
            ..EntryDraft::titled("Budget Review")
        };
        AppState::new(vec![], Preferences::default(), now())
            .apply(Action::Create(draft), now())
            .expect("create")
    }

    #[test]
    fn day_view_lists_selected_entries() {
        let text = render(&sample_state(), Lang::En);
        assert!(text.starts_with("Wed, May 15"));
        assert!(text.contains("Budget Review"));
        assert!(text.contains("14:30"));
        assert!(text.contains("+work"));
        assert!(text.contains("1 open · 0 done"));
    }

    #[test]
    fn empty_day_says_so() {
        let state = sample_state()
            .apply(Action::Navigate(1), now())
            .expect("navigate");
        let text = render(&state, Lang::De);
        assert!(text.contains("Für diesen Tag keine Aufgaben."));
    }

    #[test]
    fn month_view_marks_padding_and_badges() {
        let state = sample_state()
            .apply(Action::SetView(ViewMode::Month), now())
            .expect("view");
        let text = render(&state, Lang::En);
        assert!(text.starts_with("May 2024"));
        // May 2024 starts on a Wednesday; Monday-first pads with 29 and 30 April.
        assert!(text.contains("(29)"));
        assert!(text.contains("[15] ·1"));
    }

    #[test]
    fn week_view_header_names_first_day() {
        let state = sample_state()
            .apply(Action::SetView(ViewMode::Week), now())
            .expect("view");
        let text = render(&state, Lang::De);
        assert!(text.starts_with("Woche ab Mo 13. Mai"));
    }

    #[test]
    fn status_line_shows_filter_toggle_and_search() {
        let state = sample_state()
            .apply_all(
                [
                    Action::SetFilter(crate::filter::FilterMode::Planned),
                    Action::SetShowCompleted(false),
                    Action::SetQuery("budget".to_string()),
                ],
                now(),
            )
            .expect("view");
        let text = render(&state, Lang::En);
        assert!(text.contains("planned · Show ✓ · Search tasks: \"budget\""));

        let state = state
            .apply(Action::SetQuery("nothing here".to_string()), now())
            .expect("query");
        let text = render(&state, Lang::De);
        assert!(text.contains("Aufgabe für diesen Tag hinzufügen…"));
    }

    #[test]
    fn day_list_headers_are_localized() {
        let text = render(&sample_state(), Lang::De);
        let header = text
            .lines()
            .find(|line| line.starts_with("ID"))
            .expect("header row");
        assert!(header.contains("Erledigen"));
        assert!(header.contains("Tags"));
        assert!(header.contains("Ort"));
    }

    #[test]
    fn entry_detail_lists_attendees_and_color() {
        let draft = EntryDraft {
            appointment: true,
            location: "Room 4".to_string(),
            attendees: "ana@example.com, bo@example.com".to_string(),
            color: Some("#3366ff".to_string()),
            tags: "work".to_string(),
            ..EntryDraft::titled("Kickoff")
        };
        let state = AppState::new(vec![], Preferences::default(), now())
            .apply(Action::Create(draft), now())
            .expect("create");

        let mut out = Vec::new();
        Renderer::plain(Lang::En)
            .write_entry(&mut out, &state.entries[0], &state.timezone())
            .expect("entry");
        let text = String::from_utf8(out).expect("utf8");
        let row = |label: &str| {
            text.lines()
                .find(|line| line.starts_with(label))
                .map(str::to_string)
                .unwrap_or_default()
        };
        assert!(row("Attendees").ends_with("ana@example.com, bo@example.com"));
        assert!(row("Color").ends_with("#3366ff"));
        assert!(row("Tags").ends_with("work"));
        assert!(row("Location").ends_with("Room 4"));
    }

    #[test]
    fn settings_title_names_the_app() {
        let mut out = Vec::new();
        Renderer::plain(Lang::En)
            .write_preferences(&mut out, &Preferences::default())
            .expect("prefs");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("Financial District · Profile & Settings"));
    }

    #[test]
    fn zones_mark_current_preset() {
        let mut out = Vec::new();
        Renderer::plain(Lang::En)
            .write_zones(&mut out, "Europe/Berlin")
            .expect("zones");
        let text = String::from_utf8(out).expect("utf8");
        let line = text
            .lines()
            .find(|line| line.contains("Europe/Berlin"))
            .expect("berlin row");
        assert!(line.starts_with('*'));
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
