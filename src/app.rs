use chrono::{DateTime, Local};
use tracing::{error, warn};

use crate::config::DashboardConfig;
use crate::error::{ConfigError, FatalUiError};
use crate::event::AppEvent;
use crate::input::{Action, InputMode, map_key};
use crate::k8s::{build_describe_command, build_get_command};
use crate::model::{ResourceReference, ResourceTable, Row};
use crate::refresh::{CyclePhase, RefreshController, TickOutcome};
use crate::status::StatusStore;
use crate::view::{DetailMode, DetailView, PopOutcome, View, ViewStack};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    StartCycle {
        cycle: u64,
    },
    PollStatuses {
        cycle: u64,
        namespace: String,
        refs: Vec<ResourceReference>,
    },
    LoadDetail {
        mode: DetailMode,
        title: String,
        command: String,
    },
}

pub struct App {
    running: bool,
    header: String,
    config_warning: Option<String>,
    views: ViewStack<View>,
    table: ResourceTable,
    table_page_size: usize,
    refresh: RefreshController,
    store: StatusStore,
    error: Option<String>,
    fatal: Option<String>,
    show_help: bool,
    detail_pending: bool,
    failed_polls: usize,
}

impl App {
    pub fn new(config: &DashboardConfig, store: StatusStore) -> Self {
        let config_warning = config.validate().err().map(|error: ConfigError| {
            warn!("starting in degraded mode: {error}");
            error.to_string()
        });

        Self {
            running: true,
            header: config.header_label(),
            config_warning,
            views: ViewStack::new(View::Table),
            table: ResourceTable::new(),
            table_page_size: 10,
            refresh: RefreshController::new(),
            store,
            error: None,
            fatal: None,
            show_help: false,
            detail_pending: false,
            failed_polls: 0,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn config_warning(&self) -> Option<&str> {
        self.config_warning.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn fatal(&self) -> Option<&str> {
        self.fatal.as_deref()
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    pub fn active_view(&self) -> &View {
        self.views.peek()
    }

    pub fn view_depth(&self) -> usize {
        self.views.len()
    }

    pub fn refreshing(&self) -> bool {
        self.refresh.in_flight()
    }

    pub fn cycle_phase(&self) -> CyclePhase {
        self.refresh.phase()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.table.last_refreshed()
    }

    pub fn failed_polls(&self) -> usize {
        self.failed_polls
    }

    pub fn input_mode(&self) -> InputMode {
        if self.fatal.is_some() {
            return InputMode::Fatal;
        }
        match self.views.peek() {
            View::Table => InputMode::Table,
            View::Detail(_) => InputMode::Detail,
        }
    }

    pub fn set_table_page_size(&mut self, rows: usize) {
        self.table_page_size = rows.max(1);
    }

    pub fn set_detail_viewport(&mut self, width: u16, height: u16) {
        if let View::Detail(detail) = self.views.peek_mut() {
            detail.set_viewport(width, height);
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> AppCommand {
        match event {
            AppEvent::Tick => match self.refresh.on_tick() {
                TickOutcome::Started(cycle) => AppCommand::StartCycle { cycle },
                TickOutcome::Skipped => AppCommand::None,
            },
            AppEvent::RefsLoaded {
                cycle,
                namespace,
                refs,
            } => {
                if !self.refresh.on_refs_loaded(cycle) {
                    return AppCommand::None;
                }
                self.error = None;
                self.merge_rows(&namespace, &refs);
                AppCommand::PollStatuses {
                    cycle,
                    namespace,
                    refs,
                }
            }
            AppEvent::CycleFailed { cycle, error } => {
                if self.refresh.on_extract_failed(cycle) {
                    warn!("refresh cycle {cycle} aborted: {error}");
                    self.error = Some(compact_error(&error.to_string()));
                }
                AppCommand::None
            }
            AppEvent::StatusLoaded {
                cycle,
                namespace,
                refs,
                failed,
            } => {
                if self.refresh.on_status_loaded(cycle) {
                    self.failed_polls = failed;
                    self.merge_rows(&namespace, &refs);
                    self.refresh.finish_merge();
                }
                AppCommand::None
            }
            AppEvent::DetailLoaded { mode, title, text } => {
                self.detail_pending = false;
                if self.fatal.is_none() && self.views.at_base() {
                    self.views
                        .push(View::Detail(DetailView::new(mode, title, text)));
                }
                AppCommand::None
            }
            AppEvent::DetailFailed { message } => {
                self.detail_pending = false;
                self.error = Some(compact_error(&message));
                AppCommand::None
            }
            AppEvent::Key(key) => match map_key(self.input_mode(), key) {
                Some(action) => self.apply_action(action),
                None => AppCommand::None,
            },
            AppEvent::Resize => AppCommand::None,
            AppEvent::Fatal(fatal) => {
                self.enter_fatal(fatal);
                AppCommand::None
            }
        }
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if self.fatal.is_some() {
            if action == Action::Quit {
                self.running = false;
            }
            return AppCommand::None;
        }

        if self.show_help && action != Action::ToggleHelp {
            self.show_help = false;
            if action == Action::Back {
                return AppCommand::None;
            }
        }

        match action {
            Action::Quit => {
                self.running = false;
                AppCommand::None
            }
            Action::Back => {
                match self.views.pop() {
                    PopOutcome::Popped(_) => {}
                    PopOutcome::Exit => self.running = false,
                }
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::Down => self.move_or_scroll(1),
            Action::Up => self.move_or_scroll(-1),
            Action::PageDown => {
                let step = self.page_step();
                self.move_or_scroll(step)
            }
            Action::PageUp => {
                let step = self.page_step();
                self.move_or_scroll(-step)
            }
            Action::Top => {
                match self.views.peek_mut() {
                    View::Table => self.table.select_first(),
                    View::Detail(detail) => detail.scroll_top(),
                }
                AppCommand::None
            }
            Action::Bottom => {
                match self.views.peek_mut() {
                    View::Table => self.table.select_last(),
                    View::Detail(detail) => detail.scroll_bottom(),
                }
                AppCommand::None
            }
            Action::ShowYaml => self.open_selected(DetailMode::Yaml),
            Action::ShowDescribe => self.open_selected(DetailMode::Describe),
        }
    }

    fn merge_rows(&mut self, namespace: &str, refs: &[ResourceReference]) {
        let rows = refs
            .iter()
            .map(|reference| Row::derive(namespace, reference, &self.store.get(&reference.name)))
            .collect::<Vec<_>>();
        self.table.apply_rows(&rows, Local::now());
    }

    fn move_or_scroll(&mut self, delta: isize) -> AppCommand {
        match self.views.peek_mut() {
            View::Table => self.table.move_selection(delta),
            View::Detail(detail) => detail.scroll_by(delta),
        }
        AppCommand::None
    }

    fn page_step(&self) -> isize {
        match self.views.peek() {
            View::Table => self.table_page_size as isize,
            View::Detail(detail) => detail.page_step(),
        }
    }

    fn open_selected(&mut self, mode: DetailMode) -> AppCommand {
        if !self.views.at_base() || self.detail_pending || self.table.is_empty() {
            return AppCommand::None;
        }

        let row = match self.table.selected_row() {
            Some(Ok(row)) => row,
            Some(Err(shape)) => {
                self.error = Some(shape.to_string());
                return AppCommand::None;
            }
            None => return AppCommand::None,
        };

        let built = match mode {
            DetailMode::Yaml => {
                build_get_command(&row.kind, "", &row.api_version, &row.name, &row.namespace)
            }
            DetailMode::Describe => {
                build_describe_command(&row.kind, "", &row.api_version, &row.name, &row.namespace)
            }
        };

        match built {
            Ok(command) => {
                self.detail_pending = true;
                AppCommand::LoadDetail {
                    mode,
                    title: format!("{} {}/{}", mode.label(), row.kind, row.name),
                    command,
                }
            }
            Err(build_error) => {
                self.error = Some(format!("{}/{}: {build_error}", row.kind, row.name));
                AppCommand::None
            }
        }
    }

    fn enter_fatal(&mut self, fatal: FatalUiError) {
        error!("fatal: {fatal}");
        self.refresh.halt();
        self.show_help = false;
        self.fatal = Some(fatal.to_string());
    }
}

fn compact_error(message: &str) -> String {
    let first = message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error");
    let mut compact = first.chars().take(200).collect::<String>();
    if first.chars().count() > 200 {
        compact.push_str("...");
    }
    compact
}
