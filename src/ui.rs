//! The dashboard renderer. It only reads the registry's sorted view; all
//! mutation happens in the event loop between draws.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Cell, Clear, Gauge, Row, Table, Widget},
};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget, TuiWidgetState};

use crate::format;
use crate::monitor::process::Process;
use crate::monitor::registry::{Registry, SortKey};
use crate::monitor::source::MetricSource;
use crate::ui::theme::Theme;

pub mod theme;

const LOG_PANEL_HEIGHT: u16 = 10;
const KEY_HELP: &str = " q quit │ p/u/s/c/r/t/o sort │ -/+ order │ a cores │ l logs ";

pub struct UiState {
    pub theme: Theme,
    pub show_cores: bool,
    pub show_logs: bool,
    pub logger_state: TuiWidgetState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            theme: Theme::dark(),
            show_cores: false,
            show_logs: false,
            logger_state: TuiWidgetState::new(),
        }
    }
}

impl UiState {
    pub fn toggle_cores(&mut self) {
        self.show_cores = !self.show_cores;
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
    }
}

pub struct DashboardWidget<'a, S> {
    pub ui: &'a UiState,
    pub registry: &'a Registry<S>,
}

impl<S: MetricSource> Widget for &DashboardWidget<'_, S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);
        Block::new()
            .style(Style::default().bg(self.ui.theme.background).fg(self.ui.theme.foreground))
            .render(area, buf);

        let core_rows = if self.ui.show_cores {
            self.registry.core_cpus().len() as u16
        } else {
            0
        };
        let system_height = 6 + core_rows;
        let mut constraints = vec![
            Constraint::Length(system_height),
            Constraint::Fill(1),
        ];
        if self.ui.show_logs {
            constraints.push(Constraint::Length(LOG_PANEL_HEIGHT));
        }
        let rects = Layout::vertical(constraints).split(area);

        self.render_system(rects[0], buf);
        self.render_processes(rects[1], buf);
        if self.ui.show_logs {
            self.render_logs(rects[2], buf);
        }
    }
}

impl<S: MetricSource> DashboardWidget<'_, S> {
    fn render_system(&self, area: Rect, buf: &mut Buffer) {
        let theme = &self.ui.theme;
        let block = Block::bordered()
            .title(Span::from(" ptop ").fg(theme.primary).bold())
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.surface));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut rows = vec![Constraint::Length(1); 4 + self.core_gauge_count()];
        rows.push(Constraint::Fill(1));
        let lines = Layout::vertical(rows).split(inner);

        Line::from(vec![
            Span::from("OS: ").fg(theme.primary),
            Span::from(self.registry.operating_system().to_string()),
            Span::from("  Kernel: ").fg(theme.primary),
            Span::from(self.registry.kernel().to_string()),
        ])
        .render(lines[0], buf);

        Line::from(vec![
            Span::from("Uptime: ").fg(theme.primary),
            Span::from(format::elapsed_time(self.registry.uptime_secs())),
            Span::from("  Tasks: ").fg(theme.primary),
            Span::from(format!(
                "{} total, {} running, {} shown",
                self.registry.total_processes(),
                self.registry.running_processes(),
                self.registry.processes().len(),
            )),
        ])
        .render(lines[1], buf);

        self.render_gauge(
            "CPU".to_string(),
            self.registry.aggregate_cpu().utilization(),
            lines[2],
            buf,
        );
        self.render_gauge(
            "Mem".to_string(),
            self.registry.memory_utilization(),
            lines[3],
            buf,
        );
        if self.ui.show_cores {
            for (index, core) in self.registry.core_cpus().iter().enumerate() {
                let label = format!("cpu{}", core.id().unwrap_or(index));
                self.render_gauge(label, core.utilization(), lines[4 + index], buf);
            }
        }
    }

    fn core_gauge_count(&self) -> usize {
        if self.ui.show_cores {
            self.registry.core_cpus().len()
        } else {
            0
        }
    }

    fn render_gauge(&self, label: String, ratio: f64, area: Rect, buf: &mut Buffer) {
        let theme = &self.ui.theme;
        let [name, bar] = Layout::horizontal([Constraint::Length(6), Constraint::Fill(1)])
            .areas(area);
        Span::from(label).fg(theme.primary).render(name, buf);
        Gauge::default()
            .ratio(ratio.clamp(0.0, 1.0))
            .label(format!("{}%", format::percentage(ratio)))
            .gauge_style(Style::default().fg(theme.primary).bg(theme.surface))
            .render(bar, buf);
    }

    fn render_processes(&self, area: Rect, buf: &mut Buffer) {
        let theme = &self.ui.theme;
        let order = if self.registry.descending() { "-" } else { "+" };
        let block = Block::bordered()
            .title(Span::from(format!(" Sort: {order} ")).fg(theme.accent))
            .title_bottom(Line::from(KEY_HELP).alignment(Alignment::Right))
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.surface));

        let columns = [
            (SortKey::Pid, "PID"),
            (SortKey::User, "USER"),
            (SortKey::State, "S"),
            (SortKey::Cpu, "CPU%"),
            (SortKey::Ram, "RAM[MB]"),
            (SortKey::UpTime, "TIME+"),
            (SortKey::Command, "COMMAND"),
        ];
        let header = Row::new(columns.map(|(key, title)| {
            let style = if key == self.registry.sort_key() {
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(theme.primary)
            };
            Cell::from(title).style(style)
        }));

        let rows = self.registry.processes().iter().map(|p| self.process_row(p));
        Table::new(
            rows,
            [
                Constraint::Length(7),
                Constraint::Length(9),
                Constraint::Length(2),
                Constraint::Length(6),
                Constraint::Length(9),
                Constraint::Length(9),
                Constraint::Fill(1),
            ],
        )
        .header(header)
        .column_spacing(1)
        .block(block)
        .render(area, buf);
    }

    fn process_row(&self, process: &Process) -> Row<'static> {
        let theme = &self.ui.theme;
        let state_style = match process.state() {
            'R' => Style::default().fg(theme.success),
            'D' | 'T' => Style::default().fg(theme.warning),
            'Z' => Style::default().fg(theme.error),
            _ => Style::default(),
        };
        Row::new(vec![
            Cell::from(process.pid().to_string()),
            Cell::from(process.user().to_string()),
            Cell::from(process.state().to_string()).style(state_style),
            Cell::from(format::percentage(process.cpu_utilization())),
            Cell::from(format::megabytes(process.ram_bytes())),
            Cell::from(format::elapsed_time(process.uptime_secs())),
            Cell::from(process.command().to_string()),
        ])
    }

    fn render_logs(&self, area: Rect, buf: &mut Buffer) {
        let theme = &self.ui.theme;
        let panel_style = Style::default().bg(theme.surface).fg(theme.foreground);
        TuiLoggerWidget::default()
            .style_error(panel_style.fg(theme.error))
            .style_warn(panel_style.fg(theme.warning))
            .style_info(panel_style)
            .style_debug(panel_style)
            .style_trace(panel_style)
            .style(panel_style)
            .output_separator(':')
            .output_timestamp(Some("%H:%M:%S".to_string()))
            .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
            .output_target(true)
            .output_file(false)
            .output_line(false)
            .state(&self.ui.logger_state)
            .block(Block::bordered().title("Logs"))
            .render(area, buf);
    }
}
