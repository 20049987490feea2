use crate::filter::{visible_tasks, FiltersState};
use crate::gesture::{CellGeometry, Gesture, GestureController, GestureEffect, SegmentHit};
use crate::grid::{
    build_month_grid, first_of_month, next_month, prev_month, MonthDayCell, GRID_COLS, GRID_ROWS,
};
use crate::lanes::{assign_lanes, LaneLayout};
use crate::model::{clamp_hours, TaskCategory, TaskItem};
use crate::storage::PlannerScope;
use crate::store::{TaskPatch, TaskStore};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{stdout, Stdout};
use std::time::Duration;

pub fn run(store: TaskStore) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(store);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    store: TaskStore,
    month: NaiveDate,
    days: Vec<MonthDayCell>,
    filters: FiltersState,
    visible: Vec<TaskItem>,
    layout: LaneLayout,
    layout_key: u64,
    geometry: CellGeometry,
    gestures: GestureController,
    cursor: usize,
    status: String,
    mode: Mode,
    view: ViewMode,
    board: BoardState,
}

enum Mode {
    Normal,
    Search,
    Creating {
        form: TaskForm,
        start: NaiveDate,
        end: NaiveDate,
    },
    Editing {
        task_id: String,
        form: TaskForm,
    },
    ConfirmDelete {
        task_id: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ViewMode {
    Month,
    Board,
}

impl ViewMode {
    fn label(&self) -> &'static str {
        match self {
            ViewMode::Month => "Month",
            ViewMode::Board => "Board",
        }
    }
}

struct BoardState {
    column: usize,
    task: usize,
}

struct TaskForm {
    name: FieldValue,
    hours: FieldValue,
    category: TaskCategory,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Name,
    Category,
    Hours,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_grapheme(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_grapheme(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_grapheme(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl App {
    fn new(store: TaskStore) -> Self {
        let today = Local::now().date_naive();
        let month = first_of_month(today);
        let days = build_month_grid(month);
        let cursor = days
            .iter()
            .position(|d| d.date == today)
            .unwrap_or_default();
        let status = format!(
            "Loaded {} task(s) from {}",
            store.len(),
            store.location().path.display()
        );
        App {
            store,
            month,
            days,
            filters: FiltersState::default(),
            visible: Vec::new(),
            layout: LaneLayout::default(),
            layout_key: 0,
            geometry: CellGeometry::default(),
            gestures: GestureController::default(),
            cursor,
            status,
            mode: Mode::Normal,
            view: ViewMode::Month,
            board: BoardState { column: 0, task: 0 },
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.refresh();
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Recomputes the visible set and, only when its content changed, the
    /// lane layout.
    fn refresh(&mut self) {
        let today = Local::now().date_naive();
        self.visible = visible_tasks(self.store.snapshot(), &self.filters, today);
        let mut hasher = DefaultHasher::new();
        for task in &self.visible {
            task.id.hash(&mut hasher);
            task.start.hash(&mut hasher);
            task.end.hash(&mut hasher);
        }
        let key = hasher.finish();
        if key != self.layout_key {
            self.layout = assign_lanes(&self.visible);
            self.layout_key = key;
        }
        self.ensure_board_bounds();
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Search => {
                self.handle_search_key(key);
                Ok(false)
            }
            Mode::Creating { .. } | Mode::Editing { .. } => {
                self.handle_form_key(key);
                Ok(false)
            }
            Mode::ConfirmDelete { .. } => {
                self.handle_confirm_key(key);
                Ok(false)
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        // The grid must not change underneath an in-flight drag.
        if self.gestures.is_active() && key.code != KeyCode::Char('q') {
            return Ok(false);
        }
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Tab => {
                self.view = match self.view {
                    ViewMode::Month => ViewMode::Board,
                    ViewMode::Board => ViewMode::Month,
                };
                self.status = format!("Switched to {} view", self.view.label());
                return Ok(false);
            }
            KeyCode::Char('/') => {
                self.mode = Mode::Search;
                self.status = "Searching (Enter/Esc to finish)".into();
                return Ok(false);
            }
            KeyCode::Char(c @ '1'..='4') => {
                let category = TaskCategory::ALL[c as usize - '1' as usize];
                self.filters.toggle_category(category);
                self.status = if self.filters.categories.contains(&category) {
                    format!("Filtering on {}", category.label())
                } else {
                    format!("Cleared {} filter", category.label())
                };
                return Ok(false);
            }
            KeyCode::Char('w') => {
                self.filters.cycle_time_window();
                self.status = match self.filters.time_window_weeks {
                    0 => "Time window: all tasks".into(),
                    n => format!("Time window: within {} week(s)", n),
                };
                return Ok(false);
            }
            KeyCode::Char('r') => {
                self.filters.reset();
                self.status = "Filters reset".into();
                return Ok(false);
            }
            KeyCode::Char('[') => {
                self.set_month(prev_month(self.month));
                return Ok(false);
            }
            KeyCode::Char(']') => {
                self.set_month(next_month(self.month));
                return Ok(false);
            }
            KeyCode::Char('t') => {
                let today = Local::now().date_naive();
                self.set_month(first_of_month(today));
                self.cursor = self
                    .days
                    .iter()
                    .position(|d| d.date == today)
                    .unwrap_or_default();
                return Ok(false);
            }
            KeyCode::Char('n') => {
                let seed = self
                    .days
                    .get(self.cursor)
                    .map(|d| d.date)
                    .unwrap_or_else(|| Local::now().date_naive());
                self.open_create(seed, seed);
                return Ok(false);
            }
            _ => {}
        }

        match self.view {
            ViewMode::Month => self.handle_month_key(key),
            ViewMode::Board => self.handle_board_key(key),
        }
        Ok(false)
    }

    fn handle_month_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-(GRID_COLS as i64)),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(GRID_COLS as i64),
            KeyCode::Enter => {
                if let Some(day) = self.days.get(self.cursor) {
                    self.open_create(day.date, day.date);
                }
            }
            KeyCode::Char('e') => {
                if let Some(task_id) = self.first_task_on_cursor() {
                    self.open_edit(&task_id);
                } else {
                    self.status = "No task on the selected day to edit".into();
                }
            }
            KeyCode::Char('d') => {
                if let Some(task_id) = self.first_task_on_cursor() {
                    self.mode = Mode::ConfirmDelete {
                        task_id: task_id.clone(),
                    };
                    self.status = format!("Delete {}? (y to confirm, n/Esc to cancel)", task_id);
                } else {
                    self.status = "No task on the selected day to delete".into();
                }
            }
            _ => {}
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                if self.board.column > 0 {
                    self.board.column -= 1;
                    self.board.task = 0;
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.board.column + 1 < TaskCategory::ALL.len() {
                    self.board.column += 1;
                    self.board.task = 0;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.board.task > 0 {
                    self.board.task -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.board.task += 1,
            KeyCode::Char('m') | KeyCode::Char('>') => self.recategorize(true),
            KeyCode::Char('b') | KeyCode::Char('<') => self.recategorize(false),
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(task_id) = self.selected_board_task() {
                    self.open_edit(&task_id);
                } else {
                    self.status = "No task selected to edit".into();
                }
            }
            KeyCode::Char('d') => {
                if let Some(task_id) = self.selected_board_task() {
                    self.mode = Mode::ConfirmDelete {
                        task_id: task_id.clone(),
                    };
                    self.status = format!("Delete {}? (y to confirm, n/Esc to cancel)", task_id);
                } else {
                    self.status = "No task selected to delete".into();
                }
            }
            _ => {}
        }
        self.ensure_board_bounds();
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.mode = Mode::Normal;
                self.status = if self.filters.search.trim().is_empty() {
                    "Search cleared".into()
                } else {
                    format!("Searching for \"{}\"", self.filters.search.trim())
                };
            }
            KeyCode::Backspace => {
                self.filters.search.pop();
            }
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.filters.search.push(c);
                }
            }
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let mut close_form = false;
        let mut confirm_delete = None;
        match &mut mode {
            Mode::Creating { form, start, end } => match key.code {
                KeyCode::Esc => {
                    close_form = true;
                    self.status = "Canceled".into();
                }
                KeyCode::Enter => {
                    self.create_from_form(form, *start, *end);
                    close_form = true;
                }
                _ => form_field_key(form, key),
            },
            Mode::Editing { task_id, form } => match key.code {
                KeyCode::Esc => {
                    close_form = true;
                    self.status = "Canceled".into();
                }
                KeyCode::Enter => {
                    self.save_edit(task_id, form);
                    close_form = true;
                }
                KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    confirm_delete = Some(task_id.clone());
                }
                _ => form_field_key(form, key),
            },
            _ => {}
        }
        self.mode = if let Some(task_id) = confirm_delete {
            self.status = format!("Delete {}? (y to confirm, n/Esc to cancel)", task_id);
            Mode::ConfirmDelete { task_id }
        } else if close_form {
            Mode::Normal
        } else {
            mode
        };
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let task_id = match &self.mode {
            Mode::ConfirmDelete { task_id } => task_id.clone(),
            _ => return,
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let name = self
                    .store
                    .get(&task_id)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| task_id.clone());
                if self.store.remove(&task_id) {
                    self.status = format!("Deleted \"{}\"", name);
                } else {
                    self.status = format!("Task {} was already gone", task_id);
                }
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(self.mode, Mode::Normal) || self.view != ViewMode::Month {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.gestures
                    .pointer_down(mouse.column, mouse.row, &self.geometry, &self.store);
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.gestures.pointer_move(
                    mouse.column,
                    mouse.row,
                    &self.geometry,
                    &self.days,
                    &mut self.store,
                );
            }
            MouseEventKind::Up(MouseButton::Left) => {
                match self.gestures.pointer_up(&self.days) {
                    GestureEffect::OpenCreateDialog { start, end } => self.open_create(start, end),
                    GestureEffect::OpenEditDialog { task_id } => self.open_edit(&task_id),
                    GestureEffect::None => {}
                }
            }
            _ => {}
        }
    }

    fn set_month(&mut self, month: NaiveDate) {
        self.month = month;
        self.days = build_month_grid(month);
        self.status = format!("Showing {}", month.format("%B %Y"));
    }

    fn move_cursor(&mut self, delta: i64) {
        let max = self.days.len() as i64 - 1;
        self.cursor = (self.cursor as i64 + delta).clamp(0, max) as usize;
    }

    fn first_task_on_cursor(&self) -> Option<String> {
        let day = self.days.get(self.cursor)?;
        self.layout
            .segments_for_day(&self.visible, day.date)
            .first()
            .map(|s| s.task_id.clone())
    }

    fn board_column_tasks(&self, category: TaskCategory) -> Vec<&TaskItem> {
        self.visible
            .iter()
            .filter(|t| t.category == category)
            .collect()
    }

    fn selected_board_task(&self) -> Option<String> {
        let category = TaskCategory::ALL.get(self.board.column)?;
        self.board_column_tasks(*category)
            .get(self.board.task)
            .map(|t| t.id.clone())
    }

    fn ensure_board_bounds(&mut self) {
        self.board.column = self.board.column.min(TaskCategory::ALL.len() - 1);
        let len = self
            .board_column_tasks(TaskCategory::ALL[self.board.column])
            .len();
        self.board.task = if len == 0 {
            0
        } else {
            self.board.task.min(len - 1)
        };
    }

    fn recategorize(&mut self, forward: bool) {
        let Some(task_id) = self.selected_board_task() else {
            self.status = "No task selected to move".into();
            return;
        };
        let Some(task) = self.store.get(&task_id) else {
            return;
        };
        let target = if forward {
            task.category.next()
        } else {
            task.category.prev()
        };
        self.store.update(
            &task_id,
            TaskPatch {
                category: Some(target),
                ..TaskPatch::default()
            },
        );
        self.board.column = TaskCategory::ALL
            .iter()
            .position(|c| *c == target)
            .unwrap_or(0);
        self.status = format!("Moved to {}", target.label());
        self.note_save_failure();
    }

    fn open_create(&mut self, start: NaiveDate, end: NaiveDate) {
        self.mode = Mode::Creating {
            form: TaskForm::new(),
            start,
            end,
        };
        self.status = "Creating task (Enter save, Esc cancel, Tab next field)".into();
    }

    fn open_edit(&mut self, task_id: &str) {
        let Some(task) = self.store.get(task_id) else {
            self.status = format!("Task {} no longer exists", task_id);
            return;
        };
        self.mode = Mode::Editing {
            task_id: task_id.to_string(),
            form: TaskForm::from_task(task),
        };
        self.status = format!("Editing \"{}\"", task.name);
    }

    fn create_from_form(&mut self, form: &TaskForm, start: NaiveDate, end: NaiveDate) {
        let name = form.task_name();
        let task = TaskItem::new(
            String::new(),
            name.clone(),
            form.category,
            start,
            end,
            form.hours(),
        );
        let span = task.span_days();
        self.store.add(task);
        self.status = format!("Created \"{}\" • {} day(s)", name, span);
        self.note_save_failure();
    }

    fn save_edit(&mut self, task_id: &str, form: &TaskForm) {
        let name = form.task_name();
        let patch = TaskPatch {
            name: Some(name.clone()),
            category: Some(form.category),
            daily_hours: Some(clamp_hours(form.hours())),
            ..TaskPatch::default()
        };
        if self.store.update(task_id, patch) {
            self.status = format!("Updated \"{}\"", name);
        } else {
            self.status = format!("Task {} no longer exists", task_id);
        }
        self.note_save_failure();
    }

    fn note_save_failure(&mut self) {
        if self.store.save_failed() {
            self.status
                .push_str(" (warning: changes could not be written to disk)");
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(10),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        match self.view {
            ViewMode::Month => self.draw_month(f, layout[1]),
            ViewMode::Board => self.draw_board(f, layout[1]),
        }
        self.draw_footer(f, layout[2]);

        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match &mode {
            Mode::Creating { form, start, end } => {
                self.draw_form(f, "Create Task", form, *start, *end)
            }
            Mode::Editing { task_id, form } => {
                let (start, end) = self
                    .store
                    .get(task_id)
                    .map(|t| (t.start, t.end))
                    .unwrap_or((self.month, self.month));
                self.draw_form(f, "Edit Task", form, start, end);
            }
            Mode::ConfirmDelete { task_id } => self.draw_confirm(f, task_id),
            Mode::Normal | Mode::Search => {}
        }
        self.mode = mode;
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let scope = match self.store.location().scope {
            PlannerScope::Project => "project",
            PlannerScope::Global => "global",
        };
        let mut spans = vec![
            Span::styled(
                "planit ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.month.format("%B %Y").to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(scope, Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{} of {} task(s)", self.visible.len(), self.store.len()),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("view {}", self.view.label().to_lowercase()),
                Style::default().fg(Color::Magenta),
            ),
        ];
        if self.store.save_failed() {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled(
                "not saved",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_month(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let sections = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(35), Constraint::Length(30)])
            .split(area);

        let grid_area = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(6)])
            .split(sections[0]);

        self.draw_weekday_header(f, grid_area[0]);
        self.draw_grid(f, grid_area[1]);
        self.draw_filter_panel(f, sections[1]);
    }

    fn draw_weekday_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, GRID_COLS as u32); GRID_COLS])
            .split(area);
        for (idx, label) in ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
            .iter()
            .enumerate()
        {
            let paragraph = Paragraph::new(*label)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray));
            f.render_widget(paragraph, columns[idx]);
        }
    }

    fn draw_grid(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        self.geometry.clear();
        let today = Local::now().date_naive();
        let selection = self.gestures.selection_range();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Ratio(1, GRID_ROWS as u32); GRID_ROWS])
            .split(area);

        for row in 0..GRID_ROWS {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Ratio(1, GRID_COLS as u32); GRID_COLS])
                .split(rows[row]);
            for col in 0..GRID_COLS {
                let index = row * GRID_COLS + col;
                let cell = columns[col];
                self.geometry.record_cell(index, cell);
                self.draw_day_cell(f, cell, index, today, selection);
            }
        }
    }

    fn draw_day_cell(
        &mut self,
        f: &mut ratatui::Frame<'_>,
        cell: Rect,
        index: usize,
        today: NaiveDate,
        selection: Option<(usize, usize)>,
    ) {
        if cell.width == 0 || cell.height == 0 {
            return;
        }
        let day = &self.days[index];
        let in_selection = selection.is_some_and(|(a, b)| index >= a && index <= b);

        let bg = if in_selection {
            Color::Rgb(30, 58, 110)
        } else if day.date == today {
            Color::Rgb(20, 32, 48)
        } else if day.in_current_month {
            Color::Rgb(16, 18, 24)
        } else {
            Color::Rgb(10, 11, 14)
        };
        f.render_widget(Block::default().style(Style::default().bg(bg)), cell);

        let number_style = if index == self.cursor {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else if day.date == today {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if day.in_current_month {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let header = Line::from(vec![
            Span::styled(format!("{:>2}", day.date.format("%-d")), number_style),
            Span::styled(
                format!(" {}", day.date.format("%b")),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        let header_area = Rect::new(cell.x, cell.y, cell.width, 1);
        f.render_widget(Paragraph::new(header), header_area);

        let capacity = cell.height.saturating_sub(1) as usize;
        let segments = self.layout.segments_for_day(&self.visible, day.date);
        let mut hidden = 0usize;
        for segment in &segments {
            if segment.lane >= capacity {
                hidden += 1;
                continue;
            }
            let bar_y = cell.y + 1 + segment.lane as u16;
            let mut bar_x = cell.x;
            let mut bar_w = cell.width;
            if segment.is_range_start {
                bar_x += 1;
                bar_w = bar_w.saturating_sub(1);
            }
            if segment.is_range_end {
                bar_w = bar_w.saturating_sub(1);
            }
            if bar_w == 0 {
                continue;
            }
            let bar = Rect::new(bar_x, bar_y, bar_w, 1);
            let Some(task) = self.store.get(&segment.task_id) else {
                continue;
            };
            let (bar_bg, bar_fg) = category_colors(task.category);
            let mut text = String::new();
            if segment.is_range_start {
                text.push('▌');
                text.push_str(&truncate_text(&task.name, bar_w.saturating_sub(2) as usize));
            }
            if segment.is_range_end && bar_w > 1 {
                let used = text.chars().count();
                let pad = (bar_w as usize).saturating_sub(used + 1);
                text.push_str(&" ".repeat(pad));
                text.push('▐');
            }
            let paragraph =
                Paragraph::new(text).style(Style::default().bg(bar_bg).fg(bar_fg));
            f.render_widget(paragraph, bar);
            self.geometry.record_segment(SegmentHit {
                task_id: segment.task_id.clone(),
                rect: bar,
                start_handle: segment.is_range_start,
                end_handle: segment.is_range_end,
            });
        }
        if hidden > 0 && cell.height > 1 {
            let marker = format!("+{}", hidden);
            let width = marker.len().min(cell.width as usize) as u16;
            let area = Rect::new(
                cell.x + cell.width - width,
                cell.y + cell.height - 1,
                width,
                1,
            );
            f.render_widget(
                Paragraph::new(marker).style(Style::default().fg(Color::Gray)),
                area,
            );
        }
    }

    fn draw_filter_panel(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let searching = matches!(self.mode, Mode::Search);
        let mut lines = vec![Line::from(Span::styled(
            "Categories",
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        ))];
        for (idx, category) in TaskCategory::ALL.iter().enumerate() {
            let checked = self.filters.categories.contains(category);
            let (accent, _) = category_colors(*category);
            lines.push(Line::from(vec![
                Span::styled(
                    format!(" {} ", idx + 1),
                    Style::default().fg(Color::LightCyan),
                ),
                Span::styled(
                    if checked { "[x] " } else { "[ ] " },
                    Style::default().fg(Color::White),
                ),
                Span::styled(category.label(), Style::default().fg(accent)),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Time window",
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        )));
        let window = match self.filters.time_window_weeks {
            0 => "all tasks".to_string(),
            n => format!("within {} week(s)", n),
        };
        lines.push(Line::from(vec![
            Span::styled(" w ", Style::default().fg(Color::LightCyan)),
            Span::styled(window, Style::default().fg(Color::White)),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Search",
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        )));
        let search_text = if searching {
            format!("{}▌", self.filters.search)
        } else if self.filters.search.is_empty() {
            "(press / to search)".to_string()
        } else {
            self.filters.search.clone()
        };
        lines.push(Line::from(vec![
            Span::styled(" / ", Style::default().fg(Color::LightCyan)),
            Span::styled(
                search_text,
                Style::default().fg(if searching { Color::Cyan } else { Color::White }),
            ),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(" r ", Style::default().fg(Color::LightCyan)),
            Span::styled("reset filters", Style::default().fg(Color::White)),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "{} task(s) shown • {} lane(s)",
                self.visible.len(),
                self.layout.total_lanes
            ),
            Style::default().fg(Color::DarkGray),
        )));

        let block = Block::default()
            .title(Span::styled(
                "Filters",
                Style::default()
                    .fg(if self.filters.is_default() {
                        Color::Gray
                    } else {
                        Color::Cyan
                    })
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_board(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(area);

        for (idx, category) in TaskCategory::ALL.iter().enumerate() {
            let tasks = self.board_column_tasks(*category);
            let (accent, _) = category_colors(*category);
            let focused = idx == self.board.column;
            let card_width = columns[idx].width.saturating_sub(2);
            let items = tasks
                .iter()
                .enumerate()
                .map(|(t_idx, task)| {
                    task_card(task, card_width, focused && t_idx == self.board.task)
                })
                .collect::<Vec<_>>();

            let mut state = ListState::default();
            if focused && !tasks.is_empty() {
                state.select(Some(self.board.task.min(tasks.len() - 1)));
            }

            let block = Block::default()
                .title(Span::styled(
                    format!("{} ({})", category.label(), tasks.len()),
                    Style::default()
                        .fg(accent)
                        .add_modifier(if focused {
                            Modifier::BOLD | Modifier::UNDERLINED
                        } else {
                            Modifier::BOLD
                        }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent))
                .style(Style::default().bg(Color::Rgb(16, 18, 24)));

            let list = List::new(items).block(block);
            f.render_stateful_widget(list, columns[idx], &mut state);
        }
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let (detail, title) = self.detail_content();
        let detail = Paragraph::new(detail).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title),
        );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        if let Some(hint) = self.gesture_hint() {
            return hint;
        }
        let mut spans = vec![
            Span::styled("Tab", Style::default().fg(Color::LightCyan)),
            Span::raw(" view  "),
        ];
        match self.view {
            ViewMode::Month => spans.extend([
                Span::styled("drag", Style::default().fg(Color::LightGreen)),
                Span::raw(" create/move/resize  "),
                Span::styled("click", Style::default().fg(Color::LightGreen)),
                Span::raw(" edit  "),
                Span::styled("[ ]", Style::default().fg(Color::LightCyan)),
                Span::raw(" month  "),
                Span::styled("t", Style::default().fg(Color::LightCyan)),
                Span::raw(" today  "),
                Span::styled("n", Style::default().fg(Color::LightMagenta)),
                Span::raw(" new  "),
                Span::styled("1-4 w / r", Style::default().fg(Color::LightYellow)),
                Span::raw(" filters  "),
                Span::styled("q", Style::default().fg(Color::LightRed)),
                Span::raw(" quit"),
            ]),
            ViewMode::Board => spans.extend([
                Span::styled("←↑↓→ / h j k l", Style::default().fg(Color::LightCyan)),
                Span::raw(" move  "),
                Span::styled("m/>", Style::default().fg(Color::LightGreen)),
                Span::raw(" forward  "),
                Span::styled("b/<", Style::default().fg(Color::LightGreen)),
                Span::raw(" back  "),
                Span::styled("e", Style::default().fg(Color::LightYellow)),
                Span::raw(" edit  "),
                Span::styled("d", Style::default().fg(Color::LightRed)),
                Span::raw(" delete  "),
                Span::styled("q", Style::default().fg(Color::LightRed)),
                Span::raw(" quit"),
            ]),
        }
        Line::from(spans)
    }

    fn gesture_hint(&self) -> Option<Line<'static>> {
        let text = match self.gestures.gesture() {
            Gesture::Idle => return None,
            Gesture::CreatingSelection { .. } => "release to choose the selected range",
            Gesture::ResizingTask { .. } => "release to finish resizing",
            Gesture::MovingTask { .. } => "release to drop the task (no move = edit)",
        };
        Some(Line::from(Span::styled(
            text,
            Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )))
    }

    fn detail_content(&self) -> (Vec<Line<'static>>, String) {
        match self.view {
            ViewMode::Month => {
                let Some(day) = self.days.get(self.cursor) else {
                    return (vec![Line::from("No day selected")], "Day".into());
                };
                let segments = self.layout.segments_for_day(&self.visible, day.date);
                let mut lines = vec![Line::from(Span::styled(
                    format!("{} {}", day.date.format("%A"), day.iso),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ))];
                if segments.is_empty() {
                    lines.push(Line::from("No tasks on this day"));
                } else {
                    lines.push(Line::from(format!(
                        "{} task(s) across {} lane(s)",
                        segments.len(),
                        self.layout.lane_count(day.date)
                    )));
                    for segment in segments.iter().take(1) {
                        if let Some(task) = self.store.get(&segment.task_id) {
                            lines.push(task_detail(task));
                        }
                    }
                }
                (lines, "Day".into())
            }
            ViewMode::Board => {
                if let Some(task) = self
                    .selected_board_task()
                    .and_then(|id| self.store.get(&id))
                {
                    (vec![task_detail(task)], "Selected".into())
                } else {
                    (vec![Line::from("No task selected")], "Selected".into())
                }
            }
        }
    }

    fn draw_form(
        &self,
        f: &mut ratatui::Frame<'_>,
        title: &str,
        form: &TaskForm,
        start: NaiveDate,
        end: NaiveDate,
    ) {
        let area = centered_rect(60, 50, f.size());
        let mut fields = Vec::new();
        fields.extend(text_field_lines(
            "Name",
            &form.name,
            form.field == FormField::Name,
        ));
        let category_style = Style::default().fg(if form.field == FormField::Category {
            Color::Cyan
        } else {
            Color::White
        });
        fields.push(Line::from(vec![
            Span::styled(
                "Category: ",
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::BOLD | Modifier::DIM),
            ),
            Span::styled(
                if form.field == FormField::Category {
                    format!("◂ {} ▸", form.category.label())
                } else {
                    form.category.label().to_string()
                },
                category_style,
            ),
        ]));
        fields.extend(text_field_lines(
            "Daily hours (1-24)",
            &form.hours,
            form.field == FormField::Hours,
        ));
        fields.push(Line::from(""));
        fields.push(Line::from(Span::styled(
            format!(
                "Range: {} → {} ({} day(s))",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d"),
                (end - start).num_days() + 1
            ),
            Style::default().fg(Color::Gray),
        )));
        let mut hint =
            "Enter save • Esc cancel • Tab/Shift-Tab move • ←→ pick category".to_string();
        if title.starts_with("Edit") {
            hint.push_str(" • Ctrl+D delete");
        }
        fields.push(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::Gray),
        )));

        let dialog = Paragraph::new(fields)
            .block(
                Block::default()
                    .title(Span::styled(
                        title.to_string(),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, task_id: &str) {
        let area = centered_rect(50, 30, f.size());
        let name = self
            .store
            .get(task_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| task_id.to_string());
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\"?", name),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm Delete",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

impl TaskForm {
    fn new() -> Self {
        TaskForm {
            name: FieldValue::new(""),
            hours: FieldValue::new("8"),
            category: TaskCategory::Todo,
            field: FormField::Name,
        }
    }

    fn from_task(task: &TaskItem) -> Self {
        TaskForm {
            name: FieldValue::new(&task.name),
            hours: FieldValue::new(&task.daily_hours.to_string()),
            category: task.category,
            field: FormField::Name,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Name => FormField::Category,
            FormField::Category => FormField::Hours,
            FormField::Hours => FormField::Name,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Name => FormField::Hours,
            FormField::Category => FormField::Name,
            FormField::Hours => FormField::Category,
        };
    }

    fn active_field_mut(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            FormField::Name => Some(&mut self.name),
            FormField::Hours => Some(&mut self.hours),
            FormField::Category => None,
        }
    }

    fn task_name(&self) -> String {
        let trimmed = self.name.value.trim();
        if trimmed.is_empty() {
            "Untitled Task".to_string()
        } else {
            trimmed.to_string()
        }
    }

    fn hours(&self) -> f64 {
        self.hours.value.trim().parse().unwrap_or(1.0)
    }
}

fn form_field_key(form: &mut TaskForm, key: KeyEvent) {
    match key.code {
        KeyCode::Tab => form.next_field(),
        KeyCode::BackTab => form.prev_field(),
        KeyCode::Left => {
            if form.field == FormField::Category {
                form.category = form.category.prev();
            } else if let Some(field) = form.active_field_mut() {
                field.move_left();
            }
        }
        KeyCode::Right => {
            if form.field == FormField::Category {
                form.category = form.category.next();
            } else if let Some(field) = form.active_field_mut() {
                field.move_right();
            }
        }
        KeyCode::Up => {
            if form.field == FormField::Category {
                form.category = form.category.prev();
            }
        }
        KeyCode::Down => {
            if form.field == FormField::Category {
                form.category = form.category.next();
            }
        }
        KeyCode::Backspace => {
            if let Some(field) = form.active_field_mut() {
                field.backspace();
            }
        }
        KeyCode::Char(c) => {
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            {
                if let Some(field) = form.active_field_mut() {
                    field.insert_char(c);
                }
            }
        }
        _ => {}
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn category_colors(category: TaskCategory) -> (Color, Color) {
    match category {
        TaskCategory::Todo => (Color::Rgb(30, 64, 120), Color::White),
        TaskCategory::InProgress => (Color::Rgb(130, 105, 20), Color::White),
        TaskCategory::Review => (Color::Rgb(100, 45, 130), Color::White),
        TaskCategory::Completed => (Color::Rgb(25, 105, 60), Color::White),
    }
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    for ch in text.chars() {
        if out.chars().count() >= max {
            break;
        }
        out.push(ch);
    }
    out
}

fn task_card(task: &TaskItem, width: u16, selected: bool) -> ListItem<'static> {
    let inner_width = width.saturating_sub(4).max(10) as usize;
    let border_char = if selected { "=" } else { "-" };
    let horiz = border_char.repeat(inner_width);
    let top = format!("+{}+", horiz);
    let name = truncate_text(&task.name, inner_width.saturating_sub(2));
    let range_line = truncate_text(
        &format!(
            "{} → {}",
            task.start.format("%Y-%m-%d"),
            task.end.format("%Y-%m-%d")
        ),
        inner_width,
    );
    let meta_line = truncate_text(
        &format!("{}h/day  [{}]", task.daily_hours, task.id),
        inner_width,
    );
    let lines = vec![
        Line::raw(top.clone()),
        Line::raw(format!("| {:width$} |", name, width = inner_width)),
        Line::raw(format!("| {:width$} |", range_line, width = inner_width)),
        Line::raw(format!("| {:width$} |", meta_line, width = inner_width)),
        Line::raw(top),
    ];
    let base = Style::default().bg(Color::Rgb(22, 24, 30)).fg(Color::Gray);
    let mut item = ListItem::new(lines).style(base);
    if selected {
        item = item.style(
            Style::default()
                .bg(Color::Rgb(252, 214, 112))
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
    }
    item
}

fn text_field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    vec![Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])]
}

fn task_detail(task: &TaskItem) -> Line<'static> {
    let (accent, _) = category_colors(task.category);
    Line::from(vec![
        Span::styled(
            task.name.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(task.category.label(), Style::default().fg(accent)),
        Span::raw("  "),
        Span::styled(
            format!(
                "{} → {} • {}h/day",
                task.start.format("%Y-%m-%d"),
                task.end.format("%Y-%m-%d"),
                task.daily_hours
            ),
            Style::default().fg(Color::Gray),
        ),
    ])
}

fn prev_grapheme(cursor: usize, text: &str) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut prev = 0;
    for (idx, _) in text.char_indices() {
        if idx >= cursor {
            break;
        }
        prev = idx;
    }
    prev
}

fn next_grapheme(cursor: usize, text: &str) -> usize {
    for (idx, ch) in text.char_indices() {
        if idx > cursor {
            return idx;
        }
        if idx == cursor {
            return cursor + ch.len_utf8();
        }
    }
    text.len()
}
