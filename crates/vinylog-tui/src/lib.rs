// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use vinylog_app::{
    AppCommand, AppMode, AppState, CatalogSuggestion, Condition, DateRange, FieldKey, FieldValue,
    FilterSet, FilterState, FormKind, ListQuery, Lookups, PageLink, PageView, Pager, Record,
    RecordFormInput, RecordId, SellingStatus, SortDirection, SortKey, SortSpec, StatsReport,
    Support, TabKind, UserInfo, page_links, values,
};

const STATS_BAR_WIDTH: usize = 30;

/// Seam between the UI and the outside world. The CLI implements this over
/// the inventory service; tests implement it with recording fakes.
pub trait AppRuntime {
    fn fetch_page(&mut self, query: &ListQuery) -> Result<PageView>;
    fn fetch_record(&mut self, id: RecordId) -> Result<Record>;
    fn patch_field(&mut self, id: RecordId, key: FieldKey, value: &FieldValue) -> Result<Record>;
    fn create_record(&mut self, form: &RecordFormInput) -> Result<Record>;
    fn update_record(&mut self, id: RecordId, form: &RecordFormInput) -> Result<Record>;
    fn delete_record(&mut self, id: RecordId) -> Result<()>;
    fn fetch_stats(&mut self, range: &DateRange) -> Result<StatsReport>;
    fn load_lookups(&mut self) -> Result<Lookups>;
    fn current_user(&mut self) -> Result<Option<UserInfo>>;
    fn catalog_search(&mut self, artist: &str, title: &str) -> Result<Vec<CatalogSuggestion>>;

    /// A shareable link reproducing the applied filter view, when the
    /// runtime knows the service's public URL.
    fn share_link(&self, filters: &FilterSet) -> Option<String> {
        let _ = filters;
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub initial_filters: Option<FilterSet>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnSpec {
    label: &'static str,
    field: FieldKey,
    sort: Option<SortKey>,
    width: u16,
}

const COLUMNS: [ColumnSpec; 14] = [
    ColumnSpec {
        label: "artist",
        field: FieldKey::Artist,
        sort: Some(SortKey::Artist),
        width: 18,
    },
    ColumnSpec {
        label: "title",
        field: FieldKey::Title,
        sort: Some(SortKey::Title),
        width: 20,
    },
    ColumnSpec {
        label: "support",
        field: FieldKey::Support,
        sort: None,
        width: 8,
    },
    ColumnSpec {
        label: "year",
        field: FieldKey::Year,
        sort: Some(SortKey::Year),
        width: 5,
    },
    ColumnSpec {
        label: "cond",
        field: FieldKey::Condition,
        sort: None,
        width: 4,
    },
    ColumnSpec {
        label: "bought",
        field: FieldKey::BuyDate,
        sort: Some(SortKey::BuyDate),
        width: 10,
    },
    ColumnSpec {
        label: "net buy",
        field: FieldKey::NetBuyPrice,
        sort: Some(SortKey::NetBuyPrice),
        width: 9,
    },
    ColumnSpec {
        label: "status",
        field: FieldKey::SellingStatus,
        sort: None,
        width: 8,
    },
    ColumnSpec {
        label: "sell place",
        field: FieldKey::SellPlace,
        sort: None,
        width: 11,
    },
    ColumnSpec {
        label: "sold",
        field: FieldKey::SellDate,
        sort: Some(SortKey::SellDate),
        width: 10,
    },
    ColumnSpec {
        label: "sell price",
        field: FieldKey::SellPrice,
        sort: Some(SortKey::SellPrice),
        width: 10,
    },
    ColumnSpec {
        label: "margin",
        field: FieldKey::Margin,
        sort: None,
        width: 9,
    },
    ColumnSpec {
        label: "discogs",
        field: FieldKey::DiscogsStatus,
        sort: None,
        width: 8,
    },
    ColumnSpec {
        label: "issues",
        field: FieldKey::Issues,
        sort: None,
        width: 18,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct TableUiState {
    selected_row: usize,
    selected_col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatsMode {
    Purchases,
    Sales,
    Margin,
}

impl StatsMode {
    const fn label(self) -> &'static str {
        match self {
            Self::Purchases => "purchases",
            Self::Sales => "sales",
            Self::Margin => "margin",
        }
    }

    const fn next(self) -> Self {
        match self {
            Self::Purchases => Self::Sales,
            Self::Sales => Self::Margin,
            Self::Margin => Self::Purchases,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StatsUiState {
    mode: StatsMode,
    year: i32,
}

#[derive(Debug, Clone, PartialEq)]
struct CellEditorUiState {
    record_id: RecordId,
    field: FieldKey,
    draft: String,
    committed: FieldValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterFieldKind {
    Text,
    Toggle,
    Support,
    Statuses,
    Date,
    Price,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FilterFieldSpec {
    label: &'static str,
    kind: FilterFieldKind,
}

const FILTER_FIELDS: [FilterFieldSpec; 18] = [
    FilterFieldSpec {
        label: "artist",
        kind: FilterFieldKind::Text,
    },
    FilterFieldSpec {
        label: "artist exact",
        kind: FilterFieldKind::Toggle,
    },
    FilterFieldSpec {
        label: "title",
        kind: FilterFieldKind::Text,
    },
    FilterFieldSpec {
        label: "title exact",
        kind: FilterFieldKind::Toggle,
    },
    FilterFieldSpec {
        label: "buy place",
        kind: FilterFieldKind::Text,
    },
    FilterFieldSpec {
        label: "sell place",
        kind: FilterFieldKind::Text,
    },
    FilterFieldSpec {
        label: "support",
        kind: FilterFieldKind::Support,
    },
    FilterFieldSpec {
        label: "statuses",
        kind: FilterFieldKind::Statuses,
    },
    FilterFieldSpec {
        label: "bought from",
        kind: FilterFieldKind::Date,
    },
    FilterFieldSpec {
        label: "bought to",
        kind: FilterFieldKind::Date,
    },
    FilterFieldSpec {
        label: "sold from",
        kind: FilterFieldKind::Date,
    },
    FilterFieldSpec {
        label: "sold to",
        kind: FilterFieldKind::Date,
    },
    FilterFieldSpec {
        label: "buy price min",
        kind: FilterFieldKind::Price,
    },
    FilterFieldSpec {
        label: "buy price max",
        kind: FilterFieldKind::Price,
    },
    FilterFieldSpec {
        label: "sell price min",
        kind: FilterFieldKind::Price,
    },
    FilterFieldSpec {
        label: "sell price max",
        kind: FilterFieldKind::Price,
    },
    FilterFieldSpec {
        label: "year min",
        kind: FilterFieldKind::Year,
    },
    FilterFieldSpec {
        label: "year max",
        kind: FilterFieldKind::Year,
    },
];

#[derive(Debug, Clone, PartialEq)]
struct FilterFormUiState {
    cursor: usize,
    inputs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordFieldKind {
    Text,
    Support,
    Condition,
    Status,
    Date,
    Price,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordFieldSpec {
    label: &'static str,
    kind: RecordFieldKind,
}

const RECORD_FIELDS: [RecordFieldSpec; 20] = [
    RecordFieldSpec {
        label: "artist",
        kind: RecordFieldKind::Text,
    },
    RecordFieldSpec {
        label: "title",
        kind: RecordFieldKind::Text,
    },
    RecordFieldSpec {
        label: "support",
        kind: RecordFieldKind::Support,
    },
    RecordFieldSpec {
        label: "label",
        kind: RecordFieldKind::Text,
    },
    RecordFieldSpec {
        label: "catalog number",
        kind: RecordFieldKind::Text,
    },
    RecordFieldSpec {
        label: "country",
        kind: RecordFieldKind::Text,
    },
    RecordFieldSpec {
        label: "year",
        kind: RecordFieldKind::Year,
    },
    RecordFieldSpec {
        label: "condition",
        kind: RecordFieldKind::Condition,
    },
    RecordFieldSpec {
        label: "buy place",
        kind: RecordFieldKind::Text,
    },
    RecordFieldSpec {
        label: "buy date",
        kind: RecordFieldKind::Date,
    },
    RecordFieldSpec {
        label: "net buy price",
        kind: RecordFieldKind::Price,
    },
    RecordFieldSpec {
        label: "buy fees",
        kind: RecordFieldKind::Price,
    },
    RecordFieldSpec {
        label: "selling status",
        kind: RecordFieldKind::Status,
    },
    RecordFieldSpec {
        label: "sell place",
        kind: RecordFieldKind::Text,
    },
    RecordFieldSpec {
        label: "sell date",
        kind: RecordFieldKind::Date,
    },
    RecordFieldSpec {
        label: "sell price",
        kind: RecordFieldKind::Price,
    },
    RecordFieldSpec {
        label: "sell fees",
        kind: RecordFieldKind::Price,
    },
    RecordFieldSpec {
        label: "commission",
        kind: RecordFieldKind::Price,
    },
    RecordFieldSpec {
        label: "platform fees",
        kind: RecordFieldKind::Price,
    },
    RecordFieldSpec {
        label: "issues",
        kind: RecordFieldKind::Text,
    },
];

#[derive(Debug, Clone, PartialEq)]
struct RecordFormUiState {
    cursor: usize,
    inputs: Vec<String>,
    editing: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug)]
struct ViewData {
    filter_state: FilterState,
    pager: Pager,
    sort: SortSpec,
    page: Option<PageView>,
    overlay: vinylog_app::RowOverlay,
    table: TableUiState,
    editor: Option<CellEditorUiState>,
    filter_form: Option<FilterFormUiState>,
    record_form: Option<RecordFormUiState>,
    stats: StatsUiState,
    stats_report: Option<StatsReport>,
    lookups: Option<Lookups>,
    user: Option<UserInfo>,
    help_visible: bool,
    status_token: u64,
}

impl Default for ViewData {
    fn default() -> Self {
        Self {
            filter_state: FilterState::default(),
            pager: Pager::default(),
            sort: SortSpec::default(),
            page: None,
            overlay: vinylog_app::RowOverlay::default(),
            table: TableUiState::default(),
            editor: None,
            filter_form: None,
            record_form: None,
            stats: StatsUiState {
                mode: StatsMode::Purchases,
                year: OffsetDateTime::now_utc().year(),
            },
            stats_report: None,
            lookups: None,
            user: None,
            help_visible: false,
            status_token: 0,
        }
    }
}

impl ViewData {
    fn build_query(&self) -> ListQuery {
        ListQuery {
            filters: self.filter_state.applied.clone(),
            pager: self.pager,
            sort: self.sort,
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: LaunchOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    if let Some(size) = options.page_size {
        view_data.pager.set_size(size);
    }
    if let Some(filters) = options.initial_filters {
        view_data.filter_state.draft = filters.clone();
        view_data.filter_state.applied = filters;
    }

    let (internal_tx, internal_rx) = mpsc::channel();

    match runtime.current_user() {
        Ok(user) => view_data.user = user,
        Err(error) => {
            state.dispatch(AppCommand::SetStatus(format!("session check failed: {error:#}")));
        }
    }
    if let Ok(lookups) = runtime.load_lookups() {
        view_data.lookups = Some(lookups);
    }
    if let Err(error) = refresh_inventory(runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error:#}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.editor.is_some() {
        handle_editor_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if view_data.record_form.is_some() {
        handle_record_form_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if view_data.filter_form.is_some() {
        handle_filter_form_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('?'), KeyModifiers::NONE) => {
            view_data.help_visible = true;
            return false;
        }
        (KeyCode::Char('f'), KeyModifiers::NONE) => {
            state.dispatch(AppCommand::NextTab);
            ensure_tab_data(state, runtime, view_data, internal_tx);
            return false;
        }
        (KeyCode::Char('b'), KeyModifiers::NONE) => {
            state.dispatch(AppCommand::PrevTab);
            ensure_tab_data(state, runtime, view_data, internal_tx);
            return false;
        }
        _ => {}
    }

    match state.active_tab {
        TabKind::Inventory => handle_inventory_key(state, runtime, view_data, internal_tx, key),
        TabKind::Stats => handle_stats_key(state, runtime, view_data, internal_tx, key),
    }
    false
}

fn ensure_tab_data<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if state.active_tab == TabKind::Stats && view_data.stats_report.is_none() {
        refresh_stats(state, runtime, view_data, internal_tx);
    }
}

fn handle_inventory_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match state.mode {
        AppMode::Nav => match (key.code, key.modifiers) {
            (KeyCode::Char('i'), KeyModifiers::NONE) => {
                state.dispatch(AppCommand::EnterEditMode);
            }
            (KeyCode::Char('/'), KeyModifiers::NONE) => {
                open_filter_form(state, view_data);
            }
            (KeyCode::Char('a'), KeyModifiers::NONE) => {
                open_record_form(state, view_data, None);
            }
            (KeyCode::Enter, _) => {
                if let Some(record) = selected_record(view_data) {
                    open_record_form(state, view_data, Some(record));
                }
            }
            (KeyCode::Char('r'), KeyModifiers::NONE) => {
                match refresh_inventory(runtime, view_data) {
                    Ok(()) => emit_status(state, view_data, internal_tx, "refreshed"),
                    Err(error) => emit_status(
                        state,
                        view_data,
                        internal_tx,
                        format!("refresh failed: {error:#}"),
                    ),
                }
            }
            (KeyCode::Char('n'), KeyModifiers::NONE) => {
                next_page(state, runtime, view_data, internal_tx);
            }
            (KeyCode::Char('p'), KeyModifiers::NONE) => {
                prev_page(state, runtime, view_data, internal_tx);
            }
            (KeyCode::Char('z'), KeyModifiers::NONE) => {
                view_data.pager.next_size();
                let size = view_data.pager.size;
                refetch_with_status(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    format!("page size {size}"),
                );
            }
            (KeyCode::Char('s'), KeyModifiers::NONE) => {
                cycle_sort(state, runtime, view_data, internal_tx);
            }
            (KeyCode::Char('u'), KeyModifiers::NONE) => {
                match runtime.share_link(&view_data.filter_state.applied) {
                    Some(link) => emit_status(state, view_data, internal_tx, link),
                    None => emit_status(state, view_data, internal_tx, "share link unavailable"),
                }
            }
            (KeyCode::Char('D'), _) => {
                delete_selected(state, runtime, view_data, internal_tx);
            }
            _ => {
                move_table_cursor(view_data, key);
            }
        },
        AppMode::Edit => match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => {
                state.dispatch(AppCommand::ExitToNav);
            }
            (KeyCode::Enter, _) => {
                open_cell_editor(state, view_data, internal_tx);
            }
            _ => {
                move_table_cursor(view_data, key);
            }
        },
        AppMode::Form(_) => {}
    }
}

fn handle_stats_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Char('m'), KeyModifiers::NONE) => {
            view_data.stats.mode = view_data.stats.mode.next();
        }
        (KeyCode::Char('['), KeyModifiers::NONE) => {
            view_data.stats.year -= 1;
            refresh_stats(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char(']'), KeyModifiers::NONE) => {
            view_data.stats.year += 1;
            refresh_stats(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            refresh_stats(state, runtime, view_data, internal_tx);
        }
        _ => {}
    }
}

fn move_table_cursor(view_data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => move_row(view_data, 1),
        KeyCode::Up | KeyCode::Char('k') => move_row(view_data, -1),
        KeyCode::Right | KeyCode::Char('l') => move_col(view_data, 1),
        KeyCode::Left | KeyCode::Char('h') => move_col(view_data, -1),
        KeyCode::Char('g') => view_data.table.selected_row = 0,
        KeyCode::Char('G') => {
            view_data.table.selected_row = visible_row_count(view_data).saturating_sub(1);
        }
        _ => {}
    }
}

fn visible_row_count(view_data: &ViewData) -> usize {
    view_data
        .page
        .as_ref()
        .map(|page| page.rows.len())
        .unwrap_or(0)
}

fn move_row(view_data: &mut ViewData, delta: isize) {
    let count = visible_row_count(view_data);
    if count == 0 {
        view_data.table.selected_row = 0;
        return;
    }
    let current = view_data.table.selected_row as isize;
    let next = (current + delta).clamp(0, count as isize - 1);
    view_data.table.selected_row = next as usize;
}

fn move_col(view_data: &mut ViewData, delta: isize) {
    let current = view_data.table.selected_col as isize;
    let next = (current + delta).clamp(0, COLUMNS.len() as isize - 1);
    view_data.table.selected_col = next as usize;
}

fn clamp_table_cursor(view_data: &mut ViewData) {
    let count = visible_row_count(view_data);
    if count == 0 {
        view_data.table.selected_row = 0;
    } else if view_data.table.selected_row >= count {
        view_data.table.selected_row = count - 1;
    }
}

/// Rows as the user sees them: the fetched page with the edit overlay
/// applied row-by-row.
fn display_rows(view_data: &ViewData) -> Vec<Record> {
    view_data
        .page
        .as_ref()
        .map(|page| {
            page.rows
                .iter()
                .map(|row| view_data.overlay.merge(row))
                .collect()
        })
        .unwrap_or_default()
}

fn display_row(view_data: &ViewData, id: RecordId) -> Option<Record> {
    view_data.page.as_ref().and_then(|page| {
        page.rows
            .iter()
            .find(|row| row.id == id)
            .map(|row| view_data.overlay.merge(row))
    })
}

fn selected_record(view_data: &ViewData) -> Option<Record> {
    let rows = display_rows(view_data);
    rows.get(view_data.table.selected_row).cloned()
}

fn refresh_inventory<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) -> Result<()> {
    let query = view_data.build_query();
    let page = runtime.fetch_page(&query)?;
    if !page.stale {
        // A fresh fetch is ground truth; the overlay has been reconciled.
        view_data.overlay.clear();
    }
    view_data.page = Some(page);
    clamp_table_cursor(view_data);
    Ok(())
}

fn refetch_with_status<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    ok_message: String,
) {
    match refresh_inventory(runtime, view_data) {
        Ok(()) => emit_status(state, view_data, internal_tx, ok_message),
        Err(error) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("fetch failed: {error:#}"),
        ),
    }
}

fn next_page<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let at_end = view_data
        .page
        .as_ref()
        .map(|page| page.envelope.last)
        .unwrap_or(true);
    if at_end {
        emit_status(state, view_data, internal_tx, "already on last page");
        return;
    }
    view_data.pager.set_page(view_data.pager.page + 1);
    let page = view_data.pager.page;
    refetch_with_status(state, runtime, view_data, internal_tx, format!("page {page}"));
}

fn prev_page<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if view_data.pager.page == 0 {
        emit_status(state, view_data, internal_tx, "already on first page");
        return;
    }
    view_data.pager.set_page(view_data.pager.page - 1);
    let page = view_data.pager.page;
    refetch_with_status(state, runtime, view_data, internal_tx, format!("page {page}"));
}

fn cycle_sort<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let column = COLUMNS[view_data.table.selected_col];
    let Some(sort_key) = column.sort else {
        emit_status(state, view_data, internal_tx, "column is not sortable");
        return;
    };

    if view_data.sort.key == sort_key {
        view_data.sort.direction = view_data.sort.direction.flipped();
    } else {
        view_data.sort = SortSpec {
            key: sort_key,
            direction: SortDirection::Asc,
        };
    }
    let message = format!(
        "sort {} {}",
        column.label,
        view_data.sort.direction.wire_name()
    );
    refetch_with_status(state, runtime, view_data, internal_tx, message);
}

fn delete_selected<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(record) = selected_record(view_data) else {
        emit_status(state, view_data, internal_tx, "nothing selected");
        return;
    };
    match runtime.delete_record(record.id) {
        Ok(()) => {
            let label = format!("deleted {} - {}", record.artist, record.title);
            refetch_with_status(state, runtime, view_data, internal_tx, label);
        }
        Err(error) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("delete failed: {error:#}"),
        ),
    }
}

fn refresh_stats<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let range = stats_range(view_data.stats.year);
    match runtime.fetch_stats(&range) {
        Ok(report) => view_data.stats_report = Some(report),
        Err(error) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("stats failed: {error:#}"),
        ),
    }
}

fn stats_range(year: i32) -> DateRange {
    DateRange {
        from: time::Date::from_calendar_date(year, time::Month::January, 1).ok(),
        to: time::Date::from_calendar_date(year, time::Month::December, 31).ok(),
    }
}

fn field_label(key: FieldKey) -> &'static str {
    match key {
        FieldKey::Artist => "artist",
        FieldKey::Title => "title",
        FieldKey::Support => "support",
        FieldKey::Label => "label",
        FieldKey::CatalogNumber => "catalog number",
        FieldKey::Country => "country",
        FieldKey::Year => "year",
        FieldKey::Condition => "condition",
        FieldKey::BuyPlace => "buy place",
        FieldKey::BuyDate => "buy date",
        FieldKey::NetBuyPrice => "net buy price",
        FieldKey::BuyFees => "buy fees",
        FieldKey::SellingStatus => "selling status",
        FieldKey::SellPlace => "sell place",
        FieldKey::SellDate => "sell date",
        FieldKey::SellPrice => "sell price",
        FieldKey::SellFees => "sell fees",
        FieldKey::Commission => "commission",
        FieldKey::PlatformFees => "platform fees",
        FieldKey::Margin => "margin",
        FieldKey::Paid => "paid",
        FieldKey::Shipped => "shipped",
        FieldKey::Received => "received",
        FieldKey::Scanned => "scanned",
        FieldKey::DiscogsStatus => "discogs listing",
        FieldKey::DiscogsPrice => "discogs price",
        FieldKey::EbayStatus => "ebay listing",
        FieldKey::EbayPrice => "ebay price",
        FieldKey::Issues => "issues",
    }
}

fn cell_text(record: &Record, key: FieldKey) -> String {
    match record.field(key) {
        FieldValue::Text(value) => value,
        FieldValue::Money(cents) => values::format_optional_cents(cents),
        FieldValue::Date(date) => values::format_date(date),
        FieldValue::Year(year) => year.map(|value| value.to_string()).unwrap_or_default(),
        FieldValue::Status(status) => status.label().to_owned(),
        FieldValue::Support(support) => support.label().to_owned(),
        FieldValue::Condition(condition) => condition.label().to_owned(),
        FieldValue::Listing(listing) => listing.label().to_owned(),
        FieldValue::Flag(true) => "yes".to_owned(),
        FieldValue::Flag(false) => String::new(),
    }
}

// --- inline cell editor ---------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum CommitOutcome {
    NoEditor,
    Unchanged,
    Saved(FieldKey),
    Invalid(String),
    Failed(String),
}

fn open_cell_editor(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let column = COLUMNS[view_data.table.selected_col];
    if !column.field.is_editable() {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("{} is computed by the service", field_label(column.field)),
        );
        return;
    }
    let Some(record) = selected_record(view_data) else {
        emit_status(state, view_data, internal_tx, "nothing selected");
        return;
    };

    let committed = record.field(column.field);
    view_data.editor = Some(CellEditorUiState {
        record_id: record.id,
        field: column.field,
        draft: committed.display(),
        committed,
    });
}

fn handle_editor_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.editor = None;
            emit_status(state, view_data, internal_tx, "edit canceled");
        }
        KeyCode::Enter => {
            let outcome = commit_cell_editor(runtime, view_data);
            let message = match outcome {
                CommitOutcome::NoEditor => return,
                CommitOutcome::Unchanged => "unchanged".to_owned(),
                CommitOutcome::Saved(field) => format!("saved {}", field_label(field)),
                CommitOutcome::Invalid(message) | CommitOutcome::Failed(message) => message,
            };
            emit_status(state, view_data, internal_tx, message);
        }
        KeyCode::Backspace => {
            if let Some(editor) = view_data.editor.as_mut() {
                editor.draft.pop();
            }
        }
        KeyCode::Char(ch) => {
            if let Some(editor) = view_data.editor.as_mut() {
                editor.draft.push(ch);
            }
        }
        _ => {}
    }
}

/// Commit the open editor. An unchanged value never issues a request; a
/// failed request reverts the editor and reconciles the row against the
/// server (refetch the row, else drop its overlay entry).
fn commit_cell_editor<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) -> CommitOutcome {
    let Some(editor) = view_data.editor.clone() else {
        return CommitOutcome::NoEditor;
    };

    let parsed = match FieldValue::parse_for_key(editor.field, &editor.draft) {
        Ok(value) => value,
        Err(error) => {
            // Keep the editor open so the draft can be corrected.
            return CommitOutcome::Invalid(format!("{}: {error}", field_label(editor.field)));
        }
    };

    if parsed == editor.committed {
        view_data.editor = None;
        return CommitOutcome::Unchanged;
    }

    let Some(base) = display_row(view_data, editor.record_id) else {
        view_data.editor = None;
        return CommitOutcome::Failed("row no longer visible; refresh".to_owned());
    };

    match runtime.patch_field(editor.record_id, editor.field, &parsed) {
        Ok(canonical) => {
            view_data.overlay.absorb(&base, &canonical);
            view_data.editor = None;
            CommitOutcome::Saved(editor.field)
        }
        Err(error) => {
            view_data.editor = None;
            match runtime.fetch_record(editor.record_id) {
                Ok(server) => view_data.overlay.rebuild_row(&base, &server),
                Err(_) => view_data.overlay.drop_row(editor.record_id),
            }
            CommitOutcome::Failed(format!("save failed: {error:#}"))
        }
    }
}

// --- filter form ----------------------------------------------------------

fn open_filter_form(state: &mut AppState, view_data: &mut ViewData) {
    state.dispatch(AppCommand::OpenForm(FormKind::Filters));
    view_data.filter_form = Some(FilterFormUiState {
        cursor: 0,
        inputs: filter_form_inputs(&view_data.filter_state.draft),
    });
}

fn filter_form_inputs(filters: &FilterSet) -> Vec<String> {
    vec![
        filters.artist.clone(),
        toggle_text(filters.match_exact_artist),
        filters.title.clone(),
        toggle_text(filters.match_exact_title),
        filters.buy_place.clone(),
        filters.sell_place.clone(),
        filters
            .support
            .map(|support| support.as_str().to_owned())
            .unwrap_or_default(),
        filters
            .statuses
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>()
            .join(","),
        values::format_date(filters.buy_date_min),
        values::format_date(filters.buy_date_max),
        values::format_date(filters.sell_date_min),
        values::format_date(filters.sell_date_max),
        values::format_plain_optional_cents(filters.buy_price_min_cents),
        values::format_plain_optional_cents(filters.buy_price_max_cents),
        values::format_plain_optional_cents(filters.sell_price_min_cents),
        values::format_plain_optional_cents(filters.sell_price_max_cents),
        filters
            .year_min
            .map(|year| year.to_string())
            .unwrap_or_default(),
        filters
            .year_max
            .map(|year| year.to_string())
            .unwrap_or_default(),
    ]
}

fn toggle_text(value: bool) -> String {
    if value { "true".to_owned() } else { "false".to_owned() }
}

fn parse_filter_form(inputs: &[String]) -> Result<FilterSet> {
    let field = |index: usize| inputs.get(index).map(String::as_str).unwrap_or("");
    let date = |index: usize| {
        values::parse_optional_date(field(index))
            .map_err(|error| anyhow::anyhow!("{}: {error}", FILTER_FIELDS[index].label))
    };
    let price = |index: usize| {
        values::parse_optional_cents(field(index))
            .map_err(|error| anyhow::anyhow!("{}: {error}", FILTER_FIELDS[index].label))
    };
    let year = |index: usize| {
        values::parse_optional_year(field(index))
            .map_err(|error| anyhow::anyhow!("{}: {error}", FILTER_FIELDS[index].label))
    };

    let support_text = field(6).trim();
    let support = if support_text.is_empty() {
        None
    } else {
        Some(
            Support::parse(support_text)
                .ok_or_else(|| anyhow::anyhow!("support: unknown value {support_text:?}"))?,
        )
    };

    let mut statuses = Vec::new();
    for token in field(7).split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let status = SellingStatus::parse(token)
            .ok_or_else(|| anyhow::anyhow!("statuses: unknown value {token:?}"))?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }

    Ok(FilterSet {
        artist: field(0).trim().to_owned(),
        match_exact_artist: field(1) == "true",
        title: field(2).trim().to_owned(),
        match_exact_title: field(3) == "true",
        buy_place: field(4).trim().to_owned(),
        sell_place: field(5).trim().to_owned(),
        support,
        statuses,
        buy_date_min: date(8)?,
        buy_date_max: date(9)?,
        sell_date_min: date(10)?,
        sell_date_max: date(11)?,
        buy_price_min_cents: price(12)?,
        buy_price_max_cents: price(13)?,
        sell_price_min_cents: price(14)?,
        sell_price_max_cents: price(15)?,
        year_min: year(16)?,
        year_max: year(17)?,
    })
}

fn handle_filter_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(mut form) = view_data.filter_form.take() else {
        return;
    };

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            // Keep the draft so reopening the form resumes where it left
            // off; an unparseable draft is discarded.
            if let Ok(filters) = parse_filter_form(&form.inputs) {
                view_data.filter_state.draft = filters;
            }
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, internal_tx, "filters closed");
            return;
        }
        (KeyCode::Enter, _) => match parse_filter_form(&form.inputs) {
            Ok(filters) => {
                view_data.filter_state.draft = filters;
                view_data.filter_state.apply(&mut view_data.pager);
                state.dispatch(AppCommand::ExitToNav);
                refetch_with_status(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    "filters applied".to_owned(),
                );
                return;
            }
            Err(error) => {
                emit_status(state, view_data, internal_tx, format!("{error:#}"));
            }
        },
        (KeyCode::Char('r'), KeyModifiers::CONTROL) => {
            view_data.filter_state.reset(&mut view_data.pager);
            state.dispatch(AppCommand::ExitToNav);
            refetch_with_status(
                state,
                runtime,
                view_data,
                internal_tx,
                "filters reset".to_owned(),
            );
            return;
        }
        (KeyCode::Down | KeyCode::Tab, _) => {
            form.cursor = (form.cursor + 1) % FILTER_FIELDS.len();
        }
        (KeyCode::Up, _) => {
            form.cursor = form.cursor.checked_sub(1).unwrap_or(FILTER_FIELDS.len() - 1);
        }
        (KeyCode::Char(' '), _) if FILTER_FIELDS[form.cursor].kind == FilterFieldKind::Toggle => {
            let flipped = form.inputs[form.cursor] != "true";
            form.inputs[form.cursor] = toggle_text(flipped);
        }
        (KeyCode::Backspace, _) => {
            form.inputs[form.cursor].pop();
        }
        (KeyCode::Char(ch), _) if FILTER_FIELDS[form.cursor].kind != FilterFieldKind::Toggle => {
            form.inputs[form.cursor].push(ch);
        }
        _ => {}
    }

    view_data.filter_form = Some(form);
}

// --- record form ----------------------------------------------------------

fn open_record_form(state: &mut AppState, view_data: &mut ViewData, existing: Option<Record>) {
    state.dispatch(AppCommand::OpenForm(FormKind::Record));
    let (inputs, editing) = match existing {
        Some(record) => (
            record_form_inputs(&RecordFormInput::from_record(&record)),
            Some(record.id),
        ),
        None => (record_form_inputs(&RecordFormInput::blank()), None),
    };
    view_data.record_form = Some(RecordFormUiState {
        cursor: 0,
        inputs,
        editing,
    });
}

fn record_form_inputs(form: &RecordFormInput) -> Vec<String> {
    vec![
        form.artist.clone(),
        form.title.clone(),
        form.support.as_str().to_owned(),
        form.label.clone(),
        form.catalog_number.clone(),
        form.country.clone(),
        form.year.map(|year| year.to_string()).unwrap_or_default(),
        form.condition.as_str().to_owned(),
        form.buy_place.clone(),
        values::format_date(form.buy_date),
        values::format_plain_optional_cents(form.net_buy_price_cents),
        values::format_plain_optional_cents(form.buy_fees_cents),
        form.selling_status.as_str().to_owned(),
        form.sell_place.clone(),
        values::format_date(form.sell_date),
        values::format_plain_optional_cents(form.sell_price_cents),
        values::format_plain_optional_cents(form.sell_fees_cents),
        values::format_plain_optional_cents(form.commission_cents),
        values::format_plain_optional_cents(form.platform_fees_cents),
        form.issues.clone(),
    ]
}

fn parse_record_form(inputs: &[String]) -> Result<RecordFormInput> {
    let field = |index: usize| inputs.get(index).map(String::as_str).unwrap_or("");
    let date = |index: usize| {
        values::parse_optional_date(field(index))
            .map_err(|error| anyhow::anyhow!("{}: {error}", RECORD_FIELDS[index].label))
    };
    let price = |index: usize| {
        values::parse_optional_cents(field(index))
            .map_err(|error| anyhow::anyhow!("{}: {error}", RECORD_FIELDS[index].label))
    };

    let support = Support::parse(field(2).trim())
        .ok_or_else(|| anyhow::anyhow!("support: unknown value {:?}", field(2)))?;
    let condition = Condition::parse(field(7).trim())
        .ok_or_else(|| anyhow::anyhow!("condition: unknown value {:?}", field(7)))?;
    let selling_status = SellingStatus::parse(field(12).trim())
        .ok_or_else(|| anyhow::anyhow!("selling status: unknown value {:?}", field(12)))?;
    let year = values::parse_optional_year(field(6))
        .map_err(|error| anyhow::anyhow!("year: {error}"))?;

    Ok(RecordFormInput {
        artist: field(0).trim().to_owned(),
        title: field(1).trim().to_owned(),
        support,
        label: field(3).trim().to_owned(),
        catalog_number: field(4).trim().to_owned(),
        country: field(5).trim().to_owned(),
        year,
        condition,
        buy_place: field(8).trim().to_owned(),
        buy_date: date(9)?,
        net_buy_price_cents: price(10)?,
        buy_fees_cents: price(11)?,
        selling_status,
        sell_place: field(13).trim().to_owned(),
        sell_date: date(14)?,
        sell_price_cents: price(15)?,
        sell_fees_cents: price(16)?,
        commission_cents: price(17)?,
        platform_fees_cents: price(18)?,
        issues: field(19).trim().to_owned(),
    })
}

fn handle_record_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(mut form) = view_data.record_form.take() else {
        return;
    };

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, internal_tx, "form closed");
            return;
        }
        (KeyCode::Char('s'), KeyModifiers::CONTROL) => {
            submit_record_form(state, runtime, view_data, internal_tx, form);
            return;
        }
        (KeyCode::Char('p'), KeyModifiers::CONTROL) => {
            prefill_from_catalog(state, runtime, view_data, internal_tx, &mut form);
        }
        (KeyCode::Enter | KeyCode::Down | KeyCode::Tab, _) => {
            form.cursor = (form.cursor + 1) % RECORD_FIELDS.len();
        }
        (KeyCode::Up, _) => {
            form.cursor = form.cursor.checked_sub(1).unwrap_or(RECORD_FIELDS.len() - 1);
        }
        (KeyCode::Backspace, _) => {
            form.inputs[form.cursor].pop();
        }
        (KeyCode::Char(ch), _) => {
            form.inputs[form.cursor].push(ch);
        }
        _ => {}
    }

    view_data.record_form = Some(form);
}

fn submit_record_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    form: RecordFormUiState,
) {
    let parsed = match parse_record_form(&form.inputs) {
        Ok(parsed) => parsed,
        Err(error) => {
            emit_status(state, view_data, internal_tx, format!("{error:#}"));
            view_data.record_form = Some(form);
            return;
        }
    };

    if let Err(error) = parsed.validate() {
        emit_status(state, view_data, internal_tx, format!("{error:#}"));
        view_data.record_form = Some(form);
        return;
    }

    let saved = match form.editing {
        Some(id) => runtime.update_record(id, &parsed),
        None => runtime.create_record(&parsed),
    };
    match saved {
        Ok(record) => {
            state.dispatch(AppCommand::ExitToNav);
            let label = format!("saved {} - {}", record.artist, record.title);
            refetch_with_status(state, runtime, view_data, internal_tx, label);
        }
        Err(error) => {
            emit_status(state, view_data, internal_tx, format!("save failed: {error:#}"));
            view_data.record_form = Some(form);
        }
    }
}

/// Fill empty identification fields from the first catalog hit. Every
/// failure path is non-fatal and just skips pre-fill.
fn prefill_from_catalog<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    form: &mut RecordFormUiState,
) {
    let artist = form.inputs[0].clone();
    let title = form.inputs[1].clone();
    if artist.trim().is_empty() && title.trim().is_empty() {
        emit_status(state, view_data, internal_tx, "enter artist or title first");
        return;
    }

    match runtime.catalog_search(&artist, &title) {
        Ok(suggestions) => match suggestions.into_iter().next() {
            Some(suggestion) => {
                apply_catalog_suggestion(form, &suggestion);
                emit_status(state, view_data, internal_tx, "prefilled from catalog");
            }
            None => emit_status(state, view_data, internal_tx, "no catalog match"),
        },
        Err(error) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("catalog unavailable: {error:#}"),
        ),
    }
}

fn apply_catalog_suggestion(form: &mut RecordFormUiState, suggestion: &CatalogSuggestion) {
    if form.inputs[1].trim().is_empty() && !suggestion.title.is_empty() {
        form.inputs[1] = suggestion.title.clone();
    }
    if form.inputs[3].trim().is_empty() && !suggestion.label.is_empty() {
        form.inputs[3] = suggestion.label.clone();
    }
    if form.inputs[4].trim().is_empty() && !suggestion.catalog_number.is_empty() {
        form.inputs[4] = suggestion.catalog_number.clone();
    }
    if form.inputs[5].trim().is_empty() && !suggestion.country.is_empty() {
        form.inputs[5] = suggestion.country.clone();
    }
    if form.inputs[6].trim().is_empty()
        && let Some(year) = suggestion.year
    {
        form.inputs[6] = year.to_string();
    }
}

// --- rendering ------------------------------------------------------------

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = TabKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tab_titles = TabKind::ALL
        .iter()
        .map(|tab| tab.label().to_owned())
        .collect::<Vec<String>>();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title("vinylog").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    match state.active_tab {
        TabKind::Inventory => {
            render_table(frame, layout[1], view_data);
            let footer = Paragraph::new(render_pagination_text(view_data))
                .block(Block::default().borders(Borders::ALL).title("pages"));
            frame.render_widget(footer, layout[2]);
        }
        TabKind::Stats => {
            let body = Paragraph::new(render_stats_text(view_data))
                .block(Block::default().borders(Borders::ALL).title("stats"));
            frame.render_widget(body, layout[1]);
            let footer = Paragraph::new("m: mode · [ ]: year · r: refresh")
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(footer, layout[2]);
        }
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);

    if let Some(form) = &view_data.filter_form {
        let area = centered_rect(64, 80, frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(render_filter_form_text(form, view_data)).block(
            Block::default()
                .title("filters (enter: apply, ctrl-r: reset, esc: close)")
                .borders(Borders::ALL),
        );
        frame.render_widget(body, area);
    }

    if let Some(form) = &view_data.record_form {
        let area = centered_rect(64, 86, frame.area());
        frame.render_widget(Clear, area);
        let title = if form.editing.is_some() {
            "edit record (ctrl-s: save, ctrl-p: catalog, esc: close)"
        } else {
            "new record (ctrl-s: save, ctrl-p: catalog, esc: close)"
        };
        let body = Paragraph::new(render_record_form_text(form))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(body, area);
    }

    if let Some(editor) = &view_data.editor {
        let area = centered_rect(48, 20, frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(format!(
            "{}\n\n> {}",
            field_label(editor.field),
            editor.draft
        ))
        .block(
            Block::default()
                .title("edit cell (enter: save, esc: cancel)")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(body, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 72, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let rows_data = display_rows(view_data);

    let header = Row::new(
        COLUMNS
            .iter()
            .enumerate()
            .map(|(index, _)| Cell::from(header_label_for_column(view_data, index)))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = rows_data
        .iter()
        .enumerate()
        .map(|(row_index, record)| {
            Row::new(
                COLUMNS
                    .iter()
                    .enumerate()
                    .map(|(col_index, column)| {
                        let text = cell_text(record, column.field);
                        let selected = row_index == view_data.table.selected_row
                            && col_index == view_data.table.selected_col;
                        if selected {
                            Cell::from(text).style(
                                Style::default()
                                    .fg(Color::Cyan)
                                    .add_modifier(Modifier::BOLD),
                            )
                        } else {
                            Cell::from(text)
                        }
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect::<Vec<_>>();

    let widths = COLUMNS
        .iter()
        .map(|column| Constraint::Length(column.width))
        .collect::<Vec<_>>();

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(table_title(view_data)),
        );

    let mut table_state = ratatui::widgets::TableState::default();
    table_state.select(Some(view_data.table.selected_row));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn header_label_for_column(view_data: &ViewData, index: usize) -> String {
    let column = COLUMNS[index];
    let marker = match column.sort {
        Some(key) if key == view_data.sort.key => match view_data.sort.direction {
            SortDirection::Asc => " ^",
            SortDirection::Desc => " v",
        },
        _ => "",
    };
    format!("{}{marker}", column.label)
}

fn table_title(view_data: &ViewData) -> String {
    let Some(page) = &view_data.page else {
        return "records".to_owned();
    };
    let mut title = format!(
        "records {} · bought {} · sold {} · margin {}",
        page.envelope.total_elements,
        values::format_cents(page.totals.buy_total_cents),
        values::format_cents(page.totals.sell_total_cents),
        values::format_cents(page.totals.margin_total_cents),
    );
    if page.stale {
        title.push_str(" · stale");
    }
    if has_active_filters(view_data) {
        title.push_str(" · filtered");
    }
    title
}

fn has_active_filters(view_data: &ViewData) -> bool {
    !view_data.filter_state.applied.is_default()
}

fn render_pagination_text(view_data: &ViewData) -> String {
    let Some(page) = &view_data.page else {
        return "no data".to_owned();
    };
    let envelope = &page.envelope;
    if envelope.total_pages == 0 {
        return "no records · n/p: page · z: size".to_owned();
    }

    let links = page_links(envelope.total_pages, envelope.page)
        .into_iter()
        .map(|link| match link {
            PageLink::Page(index) if index == envelope.page => format!("[{index}]"),
            PageLink::Page(index) => index.to_string(),
            PageLink::Ellipsis => "…".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "{links} · page {}/{} · size {} · n/p: page · z: size",
        envelope.page + 1,
        envelope.total_pages,
        envelope.size,
    )
}

fn render_filter_form_text(form: &FilterFormUiState, view_data: &ViewData) -> String {
    let mut lines = Vec::with_capacity(FILTER_FIELDS.len() + 2);
    for (index, spec) in FILTER_FIELDS.iter().enumerate() {
        let cursor = if index == form.cursor { ">" } else { " " };
        let value = form.inputs.get(index).map(String::as_str).unwrap_or("");
        lines.push(format!("{cursor} {:<14} {value}", spec.label));
    }
    if let Some(lookups) = &view_data.lookups {
        let bounds = &lookups.bounds;
        lines.push(String::new());
        lines.push(format!(
            "known range: {} – {} · years {} – {}",
            values::format_optional_cents(bounds.price_min_cents),
            values::format_optional_cents(bounds.price_max_cents),
            bounds
                .year_min
                .map(|year| year.to_string())
                .unwrap_or_else(|| "?".to_owned()),
            bounds
                .year_max
                .map(|year| year.to_string())
                .unwrap_or_else(|| "?".to_owned()),
        ));
    }
    lines.join("\n")
}

fn render_record_form_text(form: &RecordFormUiState) -> String {
    RECORD_FIELDS
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let cursor = if index == form.cursor { ">" } else { " " };
            let value = form.inputs.get(index).map(String::as_str).unwrap_or("");
            format!("{cursor} {:<14} {value}", spec.label)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_stats_text(view_data: &ViewData) -> String {
    let Some(report) = &view_data.stats_report else {
        return "loading stats...".to_owned();
    };

    let mode = view_data.stats.mode;
    let mut lines = vec![format!("{} · {}", view_data.stats.year, mode.label())];
    lines.push(String::new());

    let value_of = |month: &vinylog_app::MonthlyStat| match mode {
        StatsMode::Purchases => month.purchases_cents,
        StatsMode::Sales => month.sales_cents,
        StatsMode::Margin => month.margin_cents,
    };

    let max = report
        .months
        .iter()
        .map(|month| value_of(month).abs())
        .max()
        .unwrap_or(0);

    for month in &report.months {
        let value = value_of(month);
        lines.push(format!(
            "{} {:<width$} {}",
            month.month,
            stats_bar(value, max),
            values::format_cents(value),
            width = STATS_BAR_WIDTH,
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "totals: bought {} ({}) · sold {} ({}) · margin {}",
        report.totals.bought,
        values::format_cents(report.totals.purchases_cents),
        report.totals.sold,
        values::format_cents(report.totals.sales_cents),
        values::format_cents(report.totals.margin_cents),
    ));
    lines.join("\n")
}

fn stats_bar(value: i64, max: i64) -> String {
    if max <= 0 {
        return String::new();
    }
    let length = ((value.abs() as f64 / max as f64) * STATS_BAR_WIDTH as f64).round() as usize;
    let bar = "#".repeat(length.min(STATS_BAR_WIDTH));
    if value < 0 { format!("-{bar}") } else { bar }
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let mode = mode_label(state.mode);
    let user = view_data
        .user
        .as_ref()
        .map(|user| user.username.clone())
        .unwrap_or_else(|| "signed out".to_owned());

    let mut parts = vec![format!("[{mode}]"), user];
    if let Some(page) = &view_data.page
        && page.stale
    {
        parts.push("stale data".to_owned());
    }
    if let Some(message) = &state.status_line {
        parts.push(message.clone());
    } else {
        parts.push("?: help".to_owned());
    }
    parts.join(" · ")
}

const fn mode_label(mode: AppMode) -> &'static str {
    match mode {
        AppMode::Nav => "nav",
        AppMode::Edit => "edit",
        AppMode::Form(_) => "form",
    }
}

fn help_overlay_text() -> &'static str {
    "vinylog keys\n\
     \n\
     f/b          next/previous tab\n\
     j/k h/l      move selection\n\
     g/G          first/last row\n\
     n/p          next/previous page\n\
     z            cycle page size (resets to page 1)\n\
     s            sort by column (again: flip direction)\n\
     /            filters (enter: apply, ctrl-r: reset)\n\
     u            show share link for current filters\n\
     a            new record\n\
     enter        open record form (nav) / edit cell (edit mode)\n\
     i            enter edit mode, esc leaves\n\
     D            delete selected record\n\
     r            refresh\n\
     m [ ]        stats: mode / year\n\
     ctrl-q       quit"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, COLUMNS, CellEditorUiState, CommitOutcome, FilterFormUiState, LaunchOptions,
        RecordFormUiState, StatsMode, ViewData, apply_catalog_suggestion, cell_text,
        commit_cell_editor, display_rows, filter_form_inputs, header_label_for_column,
        open_cell_editor, parse_filter_form, parse_record_form, record_form_inputs,
        render_pagination_text, render_stats_text, stats_bar, status_text, table_title,
    };
    use anyhow::{Result, anyhow};
    use std::sync::mpsc;
    use time::{Date, Month, OffsetDateTime};
    use vinylog_app::{
        AppState, CatalogSuggestion, Condition, DateRange, FieldKey, FieldValue, FilterSet,
        ListQuery, ListTotals, ListingStatus, Lookups, MonthlyStat, PageEnvelope, PageView, Record,
        RecordFormInput, RecordId, SellingStatus, SortKey, StatsReport, StatsTotals, Support,
        UserInfo,
    };

    fn sample_record(id: i64, artist: &str, title: &str) -> Record {
        Record {
            id: RecordId::new(id),
            artist: artist.to_owned(),
            title: title.to_owned(),
            support: Support::Lp,
            label: "Blue Note".to_owned(),
            catalog_number: "BLP 1577".to_owned(),
            country: "US".to_owned(),
            year: Some(1958),
            condition: Condition::VgPlus,
            buy_place: "record fair".to_owned(),
            buy_date: Some(Date::from_calendar_date(2025, Month::March, 2).expect("valid date")),
            net_buy_price_cents: Some(2_500),
            buy_fees_cents: Some(150),
            selling_status: SellingStatus::NotForSale,
            sell_place: String::new(),
            sell_date: None,
            sell_price_cents: None,
            sell_fees_cents: None,
            commission_cents: None,
            platform_fees_cents: None,
            margin_cents: None,
            paid: false,
            shipped: false,
            received: true,
            scanned: false,
            discogs_status: ListingStatus::NotListed,
            discogs_price_cents: None,
            ebay_status: ListingStatus::NotListed,
            ebay_price_cents: None,
            issues: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn page_view(rows: Vec<Record>) -> PageView {
        let total = rows.len();
        PageView {
            rows,
            envelope: PageEnvelope {
                page: 0,
                size: 25,
                total_pages: 1,
                total_elements: total,
                first: true,
                last: true,
            },
            totals: ListTotals::default(),
            stale: false,
        }
    }

    #[derive(Debug, Default)]
    struct TestRuntime {
        rows: Vec<Record>,
        fetch_page_calls: usize,
        queries: Vec<ListQuery>,
        patch_calls: Vec<(RecordId, FieldKey, FieldValue)>,
        patch_response: Option<Record>,
        fail_patch: bool,
        fetch_record_calls: Vec<RecordId>,
        fetch_record_response: Option<Record>,
        fail_fetch_record: bool,
        created: Vec<RecordFormInput>,
        updated: Vec<(RecordId, RecordFormInput)>,
        deleted: Vec<RecordId>,
        catalog_results: Vec<CatalogSuggestion>,
        fail_catalog: bool,
        catalog_calls: Vec<(String, String)>,
    }

    impl AppRuntime for TestRuntime {
        fn fetch_page(&mut self, query: &ListQuery) -> Result<PageView> {
            self.fetch_page_calls += 1;
            self.queries.push(query.clone());
            Ok(page_view(self.rows.clone()))
        }

        fn fetch_record(&mut self, id: RecordId) -> Result<Record> {
            self.fetch_record_calls.push(id);
            if self.fail_fetch_record {
                return Err(anyhow!("record fetch down"));
            }
            self.fetch_record_response
                .clone()
                .ok_or_else(|| anyhow!("no record configured"))
        }

        fn patch_field(
            &mut self,
            id: RecordId,
            key: FieldKey,
            value: &FieldValue,
        ) -> Result<Record> {
            self.patch_calls.push((id, key, value.clone()));
            if self.fail_patch {
                return Err(anyhow!("server error (422): rejected"));
            }
            self.patch_response
                .clone()
                .ok_or_else(|| anyhow!("no patch response configured"))
        }

        fn create_record(&mut self, form: &RecordFormInput) -> Result<Record> {
            self.created.push(form.clone());
            Ok(sample_record(99, &form.artist, &form.title))
        }

        fn update_record(&mut self, id: RecordId, form: &RecordFormInput) -> Result<Record> {
            self.updated.push((id, form.clone()));
            Ok(sample_record(id.get(), &form.artist, &form.title))
        }

        fn delete_record(&mut self, id: RecordId) -> Result<()> {
            self.deleted.push(id);
            Ok(())
        }

        fn fetch_stats(&mut self, _range: &DateRange) -> Result<StatsReport> {
            Ok(StatsReport::default())
        }

        fn load_lookups(&mut self) -> Result<Lookups> {
            Ok(Lookups::default())
        }

        fn current_user(&mut self) -> Result<Option<UserInfo>> {
            Ok(Some(UserInfo {
                id: vinylog_app::UserId::new(1),
                username: "collector".to_owned(),
            }))
        }

        fn catalog_search(
            &mut self,
            artist: &str,
            title: &str,
        ) -> Result<Vec<CatalogSuggestion>> {
            self.catalog_calls.push((artist.to_owned(), title.to_owned()));
            if self.fail_catalog {
                return Err(anyhow!("catalog down"));
            }
            Ok(self.catalog_results.clone())
        }
    }

    fn view_with_rows(rows: Vec<Record>) -> ViewData {
        let mut view_data = ViewData::default();
        view_data.page = Some(page_view(rows));
        view_data
    }

    fn open_editor(view_data: &mut ViewData, id: i64, field: FieldKey, draft: &str) {
        let record = display_rows(view_data)
            .into_iter()
            .find(|record| record.id.get() == id)
            .expect("row exists");
        view_data.editor = Some(CellEditorUiState {
            record_id: record.id,
            field,
            draft: draft.to_owned(),
            committed: record.field(field),
        });
    }

    #[test]
    fn unchanged_commit_issues_no_request() {
        let mut view_data = view_with_rows(vec![sample_record(1, "Miles Davis", "Blue Haze")]);
        let mut runtime = TestRuntime::default();

        // netBuyPrice is 25.00; retyping the same value is a no-op.
        open_editor(&mut view_data, 1, FieldKey::NetBuyPrice, "25.00");
        let outcome = commit_cell_editor(&mut runtime, &mut view_data);

        assert_eq!(outcome, CommitOutcome::Unchanged);
        assert!(runtime.patch_calls.is_empty());
        assert!(view_data.editor.is_none());
    }

    #[test]
    fn successful_commit_merges_all_canonical_fields() {
        let base = sample_record(1, "Miles Davis", "Blue Haze");
        let mut canonical = base.clone();
        canonical.selling_status = SellingStatus::ForSale;
        canonical.sell_date =
            Some(Date::from_calendar_date(2026, Month::April, 2).expect("valid date"));
        canonical.margin_cents = Some(1_234);

        let mut view_data = view_with_rows(vec![base]);
        let mut runtime = TestRuntime {
            patch_response: Some(canonical),
            ..TestRuntime::default()
        };

        open_editor(&mut view_data, 1, FieldKey::SellDate, "2026-04-02");
        let outcome = commit_cell_editor(&mut runtime, &mut view_data);

        assert_eq!(outcome, CommitOutcome::Saved(FieldKey::SellDate));
        assert_eq!(runtime.patch_calls.len(), 1);
        assert_eq!(runtime.patch_calls[0].1, FieldKey::SellDate);

        // The overlay carries the edited field and the derived ones.
        let rows = display_rows(&view_data);
        assert_eq!(rows[0].selling_status, SellingStatus::ForSale);
        assert_eq!(rows[0].margin_cents, Some(1_234));
        assert_eq!(
            rows[0].sell_date,
            Some(Date::from_calendar_date(2026, Month::April, 2).expect("valid date")),
        );
    }

    #[test]
    fn invalid_draft_keeps_editor_open_and_sends_nothing() {
        let mut view_data = view_with_rows(vec![sample_record(1, "Miles Davis", "Blue Haze")]);
        let mut runtime = TestRuntime::default();

        open_editor(&mut view_data, 1, FieldKey::SellDate, "not a date");
        let outcome = commit_cell_editor(&mut runtime, &mut view_data);

        assert!(matches!(outcome, CommitOutcome::Invalid(_)));
        assert!(runtime.patch_calls.is_empty());
        assert!(view_data.editor.is_some());
    }

    #[test]
    fn failed_commit_reverts_and_rebuilds_the_row_from_the_server() {
        let base = sample_record(1, "Miles Davis", "Blue Haze");
        let mut server = base.clone();
        server.sell_place = "ebay".to_owned();

        let mut view_data = view_with_rows(vec![base.clone()]);
        let mut runtime = TestRuntime {
            fail_patch: true,
            fetch_record_response: Some(server),
            ..TestRuntime::default()
        };

        open_editor(&mut view_data, 1, FieldKey::SellPrice, "90.00");
        let outcome = commit_cell_editor(&mut runtime, &mut view_data);

        assert!(matches!(outcome, CommitOutcome::Failed(_)));
        assert_eq!(runtime.patch_calls.len(), 1);
        assert_eq!(runtime.fetch_record_calls, vec![RecordId::new(1)]);
        assert!(view_data.editor.is_none());

        // The failed price edit never shows; the server's copy does.
        let rows = display_rows(&view_data);
        assert_eq!(rows[0].sell_price_cents, base.sell_price_cents);
        assert_eq!(rows[0].sell_place, "ebay");
    }

    #[test]
    fn failed_commit_with_failed_refetch_drops_the_overlay_entry() {
        let base = sample_record(1, "Miles Davis", "Blue Haze");
        let mut optimistic = base.clone();
        optimistic.paid = true;

        let mut view_data = view_with_rows(vec![base.clone()]);
        view_data.overlay.absorb(&base, &optimistic);

        let mut runtime = TestRuntime {
            fail_patch: true,
            fail_fetch_record: true,
            ..TestRuntime::default()
        };

        open_editor(&mut view_data, 1, FieldKey::SellPrice, "90.00");
        let outcome = commit_cell_editor(&mut runtime, &mut view_data);

        assert!(matches!(outcome, CommitOutcome::Failed(_)));
        assert!(view_data.overlay.is_empty());
        assert_eq!(display_rows(&view_data)[0], base);
    }

    #[test]
    fn margin_cell_cannot_be_edited() {
        let mut view_data = view_with_rows(vec![sample_record(1, "Miles Davis", "Blue Haze")]);
        let mut state = AppState::default();
        let (tx, _rx) = mpsc::channel();

        let margin_col = COLUMNS
            .iter()
            .position(|column| column.field == FieldKey::Margin)
            .expect("margin column exists");
        view_data.table.selected_col = margin_col;

        open_cell_editor(&mut state, &mut view_data, &tx);
        assert!(view_data.editor.is_none());
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("computed")),
        );
    }

    #[test]
    fn fresh_fetch_clears_the_overlay_but_stale_keeps_it() {
        let base = sample_record(1, "Miles Davis", "Blue Haze");
        let mut changed = base.clone();
        changed.paid = true;

        let mut view_data = view_with_rows(vec![base.clone()]);
        view_data.overlay.absorb(&base, &changed);
        assert!(!view_data.overlay.is_empty());

        let mut runtime = TestRuntime {
            rows: vec![base.clone()],
            ..TestRuntime::default()
        };
        super::refresh_inventory(&mut runtime, &mut view_data).expect("refresh works");
        assert!(view_data.overlay.is_empty());

        // Simulate a stale page landing: overlay state must survive.
        view_data.overlay.absorb(&base, &changed);
        let mut stale = page_view(vec![base.clone()]);
        stale.stale = true;
        view_data.page = Some(stale);
        assert!(!view_data.overlay.is_empty());
    }

    #[test]
    fn filter_form_round_trips_and_applies() {
        let mut filters = FilterSet::default();
        filters.artist = "Miles Davis".to_owned();
        filters.match_exact_artist = true;
        filters.statuses = vec![SellingStatus::Sold];
        filters.buy_price_min_cents = Some(1_050);

        let inputs = filter_form_inputs(&filters);
        let parsed = parse_filter_form(&inputs).expect("form parses");
        assert_eq!(parsed, filters);
    }

    #[test]
    fn filter_form_rejects_bad_values_with_field_names() {
        let mut inputs = filter_form_inputs(&FilterSet::default());
        inputs[8] = "03/02/2025".to_owned();
        let error = parse_filter_form(&inputs).expect_err("bad date should fail");
        assert!(error.to_string().contains("bought from"));

        let mut inputs = filter_form_inputs(&FilterSet::default());
        inputs[7] = "sold,gifted".to_owned();
        let error = parse_filter_form(&inputs).expect_err("bad status should fail");
        assert!(error.to_string().contains("gifted"));
    }

    #[test]
    fn applying_filters_resets_page_and_refetches() {
        let mut state = AppState::default();
        let mut view_data = view_with_rows(vec![sample_record(1, "Miles Davis", "Blue Haze")]);
        let mut runtime = TestRuntime::default();
        let (tx, _rx) = mpsc::channel();

        view_data.pager.set_page(4);
        let mut inputs = filter_form_inputs(&FilterSet::default());
        inputs[0] = "Miles Davis".to_owned();
        view_data.filter_form = Some(FilterFormUiState { cursor: 0, inputs });
        state.dispatch(vinylog_app::AppCommand::OpenForm(
            vinylog_app::FormKind::Filters,
        ));

        super::handle_filter_form_key(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            crossterm::event::KeyEvent::new(
                crossterm::event::KeyCode::Enter,
                crossterm::event::KeyModifiers::NONE,
            ),
        );

        assert_eq!(view_data.pager.page, 0);
        assert_eq!(view_data.filter_state.applied.artist, "Miles Davis");
        assert_eq!(runtime.fetch_page_calls, 1);
        assert_eq!(runtime.queries[0].filters.artist, "Miles Davis");
        assert!(view_data.filter_form.is_none());
    }

    #[test]
    fn ctrl_r_resets_filters_to_defaults() {
        let mut state = AppState::default();
        let mut view_data = view_with_rows(vec![]);
        let mut runtime = TestRuntime::default();
        let (tx, _rx) = mpsc::channel();

        view_data.filter_state.draft.artist = "Miles Davis".to_owned();
        view_data.filter_state.draft.match_exact_artist = true;
        view_data.filter_state.apply(&mut view_data.pager);
        assert!(!view_data.filter_state.applied.to_query_pairs().is_empty());

        view_data.filter_form = Some(FilterFormUiState {
            cursor: 0,
            inputs: filter_form_inputs(&view_data.filter_state.draft),
        });
        super::handle_filter_form_key(
            &mut state,
            &mut runtime,
            &mut view_data,
            &tx,
            crossterm::event::KeyEvent::new(
                crossterm::event::KeyCode::Char('r'),
                crossterm::event::KeyModifiers::CONTROL,
            ),
        );

        assert_eq!(view_data.filter_state.applied, FilterSet::default());
        assert_eq!(view_data.filter_state.draft, FilterSet::default());
        assert!(view_data.filter_state.applied.to_query_pairs().is_empty());
    }

    #[test]
    fn record_form_round_trips() {
        let mut form = RecordFormInput::blank();
        form.artist = "Nina Simone".to_owned();
        form.title = "Pastel Blues".to_owned();
        form.year = Some(1965);
        form.net_buy_price_cents = Some(4_200);

        let inputs = record_form_inputs(&form);
        let parsed = parse_record_form(&inputs).expect("form parses");
        assert_eq!(parsed, form);
    }

    #[test]
    fn invalid_record_form_blocks_submission() {
        let mut state = AppState::default();
        let mut view_data = view_with_rows(vec![]);
        let mut runtime = TestRuntime::default();
        let (tx, _rx) = mpsc::channel();

        // Sold status without sale fields must fail client-side.
        let mut form = RecordFormInput::blank();
        form.artist = "Nina Simone".to_owned();
        form.title = "Pastel Blues".to_owned();
        form.selling_status = SellingStatus::Sold;
        let form_state = RecordFormUiState {
            cursor: 0,
            inputs: record_form_inputs(&form),
            editing: None,
        };

        super::submit_record_form(&mut state, &mut runtime, &mut view_data, &tx, form_state);

        assert!(runtime.created.is_empty());
        assert!(view_data.record_form.is_some());
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("selling")),
        );
    }

    #[test]
    fn valid_record_form_submits_and_refetches() {
        let mut state = AppState::default();
        let mut view_data = view_with_rows(vec![]);
        let mut runtime = TestRuntime::default();
        let (tx, _rx) = mpsc::channel();

        let mut form = RecordFormInput::blank();
        form.artist = "Nina Simone".to_owned();
        form.title = "Pastel Blues".to_owned();
        let form_state = RecordFormUiState {
            cursor: 0,
            inputs: record_form_inputs(&form),
            editing: None,
        };

        super::submit_record_form(&mut state, &mut runtime, &mut view_data, &tx, form_state);

        assert_eq!(runtime.created.len(), 1);
        assert_eq!(runtime.created[0].artist, "Nina Simone");
        assert_eq!(runtime.fetch_page_calls, 1);
        assert!(view_data.record_form.is_none());
    }

    #[test]
    fn editing_an_existing_record_issues_an_update() {
        let mut state = AppState::default();
        let mut view_data = view_with_rows(vec![]);
        let mut runtime = TestRuntime::default();
        let (tx, _rx) = mpsc::channel();

        let record = sample_record(7, "Can", "Tape Echo");
        let form_state = RecordFormUiState {
            cursor: 0,
            inputs: record_form_inputs(&RecordFormInput::from_record(&record)),
            editing: Some(record.id),
        };
        super::submit_record_form(&mut state, &mut runtime, &mut view_data, &tx, form_state);

        assert!(runtime.created.is_empty());
        assert_eq!(runtime.updated.len(), 1);
        assert_eq!(runtime.updated[0].0, RecordId::new(7));
    }

    #[test]
    fn catalog_prefill_fills_only_empty_fields() {
        let mut form = RecordFormUiState {
            cursor: 0,
            inputs: record_form_inputs(&RecordFormInput::blank()),
            editing: None,
        };
        form.inputs[0] = "Miles Davis".to_owned();
        form.inputs[3] = "Already Set".to_owned();

        apply_catalog_suggestion(
            &mut form,
            &CatalogSuggestion {
                title: "Kind Of Blue".to_owned(),
                year: Some(1959),
                label: "Columbia".to_owned(),
                catalog_number: "CL 1355".to_owned(),
                country: "US".to_owned(),
            },
        );

        assert_eq!(form.inputs[1], "Kind Of Blue");
        assert_eq!(form.inputs[3], "Already Set", "existing values are kept");
        assert_eq!(form.inputs[4], "CL 1355");
        assert_eq!(form.inputs[5], "US");
        assert_eq!(form.inputs[6], "1959");
    }

    #[test]
    fn catalog_failure_is_non_fatal() {
        let mut state = AppState::default();
        let mut view_data = view_with_rows(vec![]);
        let mut runtime = TestRuntime {
            fail_catalog: true,
            ..TestRuntime::default()
        };
        let (tx, _rx) = mpsc::channel();

        let mut form = RecordFormUiState {
            cursor: 0,
            inputs: record_form_inputs(&RecordFormInput::blank()),
            editing: None,
        };
        form.inputs[0] = "Miles Davis".to_owned();

        super::prefill_from_catalog(&mut state, &mut runtime, &mut view_data, &tx, &mut form);
        assert_eq!(runtime.catalog_calls.len(), 1);
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("catalog unavailable")),
        );
    }

    #[test]
    fn cycling_sort_flips_direction_on_second_press() {
        let mut state = AppState::default();
        let mut view_data = view_with_rows(vec![sample_record(1, "Miles Davis", "Blue Haze")]);
        let mut runtime = TestRuntime::default();
        let (tx, _rx) = mpsc::channel();

        view_data.table.selected_col = 0; // artist column
        super::cycle_sort(&mut state, &mut runtime, &mut view_data, &tx);
        assert_eq!(view_data.sort.key, SortKey::Artist);
        assert_eq!(view_data.sort.direction, vinylog_app::SortDirection::Asc);

        super::cycle_sort(&mut state, &mut runtime, &mut view_data, &tx);
        assert_eq!(view_data.sort.direction, vinylog_app::SortDirection::Desc);
        assert_eq!(runtime.fetch_page_calls, 2);
    }

    #[test]
    fn page_navigation_respects_envelope_edges() {
        let mut state = AppState::default();
        let mut view_data = view_with_rows(vec![sample_record(1, "Miles Davis", "Blue Haze")]);
        let mut runtime = TestRuntime::default();
        let (tx, _rx) = mpsc::channel();

        // Single-page envelope: both directions refuse to move.
        super::next_page(&mut state, &mut runtime, &mut view_data, &tx);
        super::prev_page(&mut state, &mut runtime, &mut view_data, &tx);
        assert_eq!(view_data.pager.page, 0);
        assert_eq!(runtime.fetch_page_calls, 0);

        if let Some(page) = view_data.page.as_mut() {
            page.envelope.last = false;
            page.envelope.total_pages = 3;
        }
        super::next_page(&mut state, &mut runtime, &mut view_data, &tx);
        assert_eq!(view_data.pager.page, 1);
        assert_eq!(runtime.fetch_page_calls, 1);
    }

    #[test]
    fn pagination_footer_collapses_long_ranges() {
        let mut view_data = ViewData::default();
        let mut page = page_view(vec![]);
        page.envelope = PageEnvelope {
            page: 5,
            size: 25,
            total_pages: 10,
            total_elements: 250,
            first: false,
            last: false,
        };
        view_data.page = Some(page);

        let footer = render_pagination_text(&view_data);
        assert!(footer.starts_with("0 … 4 [5] 6 … 9"), "got {footer}");
        assert!(footer.contains("page 6/10"));
        assert!(footer.contains("size 25"));
    }

    #[test]
    fn table_title_reports_totals_stale_and_filtering() {
        let mut view_data = view_with_rows(vec![]);
        if let Some(page) = view_data.page.as_mut() {
            page.totals = ListTotals {
                buy_total_cents: 123_456,
                sell_total_cents: 50_000,
                margin_total_cents: 10_000,
            };
            page.stale = true;
        }
        view_data.filter_state.applied.artist = "Miles".to_owned();

        let title = table_title(&view_data);
        assert!(title.contains("$1,234.56"));
        assert!(title.contains("stale"));
        assert!(title.contains("filtered"));
    }

    #[test]
    fn header_marks_the_sorted_column() {
        let mut view_data = ViewData::default();
        view_data.sort = vinylog_app::SortSpec {
            key: SortKey::Artist,
            direction: vinylog_app::SortDirection::Asc,
        };
        assert_eq!(header_label_for_column(&view_data, 0), "artist ^");
        assert_eq!(header_label_for_column(&view_data, 1), "title");
    }

    #[test]
    fn cells_render_human_readable_values() {
        let record = sample_record(1, "Miles Davis", "Blue Haze");
        assert_eq!(cell_text(&record, FieldKey::NetBuyPrice), "$25.00");
        assert_eq!(cell_text(&record, FieldKey::BuyDate), "2025-03-02");
        assert_eq!(cell_text(&record, FieldKey::SellingStatus), "keep");
        assert_eq!(cell_text(&record, FieldKey::Condition), "VG+");
        assert_eq!(cell_text(&record, FieldKey::SellPrice), "");
    }

    #[test]
    fn stats_text_scales_bars_to_the_largest_month() {
        let mut view_data = ViewData::default();
        view_data.stats.mode = StatsMode::Sales;
        view_data.stats.year = 2026;
        view_data.stats_report = Some(StatsReport {
            months: vec![
                MonthlyStat {
                    month: "2026-01".to_owned(),
                    purchases_cents: 0,
                    sales_cents: 10_000,
                    margin_cents: 4_000,
                    bought: 0,
                    sold: 2,
                },
                MonthlyStat {
                    month: "2026-02".to_owned(),
                    purchases_cents: 0,
                    sales_cents: 5_000,
                    margin_cents: 1_000,
                    bought: 0,
                    sold: 1,
                },
            ],
            totals: StatsTotals {
                purchases_cents: 0,
                sales_cents: 15_000,
                margin_cents: 5_000,
                bought: 0,
                sold: 3,
            },
        });

        let text = render_stats_text(&view_data);
        assert!(text.contains("2026 · sales"));
        assert!(text.contains("2026-01"));
        assert!(text.contains("$100.00"));
        assert!(text.contains("totals: bought 0"));

        let full = stats_bar(10_000, 10_000);
        let half = stats_bar(5_000, 10_000);
        assert_eq!(full.len(), super::STATS_BAR_WIDTH);
        assert_eq!(half.len(), super::STATS_BAR_WIDTH / 2);
        assert!(stats_bar(-5_000, 10_000).starts_with('-'));
        assert_eq!(stats_bar(1, 0), "");
    }

    #[test]
    fn stats_mode_cycles_through_all_modes() {
        let mode = StatsMode::Purchases;
        let next = mode.next();
        let third = next.next();
        assert_eq!(next, StatsMode::Sales);
        assert_eq!(third, StatsMode::Margin);
        assert_eq!(third.next(), StatsMode::Purchases);
    }

    #[test]
    fn status_line_shows_mode_user_and_staleness() {
        let mut state = AppState::default();
        let mut view_data = view_with_rows(vec![]);
        view_data.user = Some(UserInfo {
            id: vinylog_app::UserId::new(1),
            username: "collector".to_owned(),
        });
        if let Some(page) = view_data.page.as_mut() {
            page.stale = true;
        }
        state.dispatch(vinylog_app::AppCommand::SetStatus("saved".to_owned()));

        let text = status_text(&state, &view_data);
        assert!(text.contains("[nav]"));
        assert!(text.contains("collector"));
        assert!(text.contains("stale data"));
        assert!(text.contains("saved"));
    }

    #[test]
    fn deleting_the_selected_row_refetches() {
        let mut state = AppState::default();
        let mut view_data =
            view_with_rows(vec![sample_record(5, "Sun Ra", "Saturn Return")]);
        let mut runtime = TestRuntime::default();
        let (tx, _rx) = mpsc::channel();

        super::delete_selected(&mut state, &mut runtime, &mut view_data, &tx);
        assert_eq!(runtime.deleted, vec![RecordId::new(5)]);
        assert_eq!(runtime.fetch_page_calls, 1);
    }

    #[test]
    fn launch_options_seed_filters_and_page_size() {
        let options = LaunchOptions {
            initial_filters: Some({
                let mut filters = FilterSet::default();
                filters.artist = "Fela Kuti".to_owned();
                filters
            }),
            page_size: Some(50),
        };

        let mut view_data = ViewData::default();
        if let Some(size) = options.page_size {
            view_data.pager.set_size(size);
        }
        if let Some(filters) = options.initial_filters {
            view_data.filter_state.draft = filters.clone();
            view_data.filter_state.applied = filters;
        }

        assert_eq!(view_data.pager.size, 50);
        assert_eq!(view_data.build_query().filters.artist, "Fela Kuti");
    }
}
