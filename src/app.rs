use std::path::PathBuf;
use std::time::Duration;

use color_eyre::eyre::Result;
use log::*;
use ratatui::{
    DefaultTerminal,
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
};
use tokio::time::sleep;

use crate::config::{ConfigManager, MonitorConfig};
use crate::event::{AppEvent, Event, EventHandler};
use crate::monitor::procfs::ProcSource;
use crate::monitor::registry::{Registry, SortKey};
use crate::ui::{DashboardWidget, UiState};

pub struct App {
    pub running: bool,
    pub events: EventHandler,
    pub config: ConfigManager,
    pub registry: Registry<ProcSource>,
    pub ui_state: UiState,
}

impl App {
    pub fn new(config_path: PathBuf) -> Result<Self> {
        let events = EventHandler::new();
        let config = ConfigManager::new(config_path, events.clone_sender())?;
        let mut app = Self {
            running: true,
            registry: Registry::new(ProcSource::new()?),
            ui_state: UiState::default(),
            events,
            config,
        };
        let settings = app.config.current();
        app.apply(&settings);
        app.spawn_sampler(settings.refresh_secs);
        Ok(app)
    }

    /// Emit a SampleRefresh on the configured cadence. The render tick runs
    /// much faster; sampling stays on its own clock.
    // TODO: restart this task when a reload changes refresh_secs
    fn spawn_sampler(&self, refresh_secs: u64) {
        let ticker = self.events.clone_sender();
        let period = Duration::from_secs(refresh_secs.max(1));
        tokio::spawn(async move {
            loop {
                sleep(period).await;
                if ticker.send(Event::App(AppEvent::SampleRefresh)).is_err() {
                    return;
                }
            }
        });
    }

    /// Run the application's main loop.
    pub async fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        // First sample before the first draw, so the table is never empty.
        self.registry.tick();
        while self.running {
            terminal.draw(|frame| {
                let widget = DashboardWidget {
                    ui: &self.ui_state,
                    registry: &self.registry,
                };
                frame.render_widget(&widget, frame.area());
            })?;
            match self.events.next().await? {
                Event::Tick => {}
                Event::Crossterm(event) => match event {
                    crossterm::event::Event::Key(key_event)
                        if key_event.kind == KeyEventKind::Press =>
                    {
                        self.handle_key_events(key_event)?
                    }
                    _ => {}
                },
                Event::App(app_event) => match app_event {
                    AppEvent::Quit => self.quit(),
                    AppEvent::Reload => self.reload_config(),
                    AppEvent::SampleRefresh => self.registry.tick(),
                },
            }
        }
        Ok(())
    }

    /// Handles the key events and updates the state of [`App`].
    pub fn handle_key_events(&mut self, key_event: KeyEvent) -> Result<()> {
        match key_event.code {
            KeyCode::Esc | KeyCode::Char('q' | 'Q') => self.events.send(AppEvent::Quit),
            KeyCode::Char('c' | 'C') if key_event.modifiers == KeyModifiers::CONTROL => {
                self.events.send(AppEvent::Quit)
            }
            KeyCode::Char('p' | 'P') => self.registry.set_sort(SortKey::Pid),
            KeyCode::Char('u' | 'U') => self.registry.set_sort(SortKey::User),
            KeyCode::Char('s' | 'S') => self.registry.set_sort(SortKey::State),
            KeyCode::Char('c' | 'C') => self.registry.set_sort(SortKey::Cpu),
            KeyCode::Char('r' | 'R') => self.registry.set_sort(SortKey::Ram),
            KeyCode::Char('t' | 'T') => self.registry.set_sort(SortKey::UpTime),
            KeyCode::Char('o' | 'O') => self.registry.set_sort(SortKey::Command),
            KeyCode::Char('-' | '_') => self.registry.set_descending(true),
            KeyCode::Char('+' | '=') => self.registry.set_descending(false),
            KeyCode::Char('a' | 'A') => self.ui_state.toggle_cores(),
            KeyCode::Char('l' | 'L') => self.ui_state.toggle_logs(),
            _ => {}
        }
        Ok(())
    }

    /// Set running to false to quit the application.
    fn quit(&mut self) {
        self.running = false;
    }

    fn reload_config(&mut self) {
        debug!(target: "App", "Reload!");
        match self.config.reload() {
            Ok(settings) => self.apply(&settings),
            Err(e) => error!(target: "App", "{}", e),
        }
    }

    fn apply(&mut self, settings: &MonitorConfig) {
        self.registry.set_sort(settings.sort);
        self.registry.set_descending(settings.descending);
        self.ui_state.show_cores = settings.show_cores;
    }
}
