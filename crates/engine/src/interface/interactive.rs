// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full-screen terminal dashboard.
//!
//! Two background threads share the job table with the build tasks: a ticker
//! that redraws on a fixed period, and an input loop that redraws on resize
//! and turns Ctrl-C, Esc, or `q` into a cancel request. The terminal is in raw
//! mode, so Ctrl-C arrives as a key press rather than a signal.

use super::{
    render_dashboard, CancelListener, CancelListeners, DashboardLine, Interface, InterfaceError,
    JobTable, LineKind, LogTail,
};
use crate::error::BuildError;
use kiln_core::JobState;
use parking_lot::Mutex;
use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use std::io::{self, IsTerminal, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const REDRAW_PERIOD: Duration = Duration::from_millis(150);
const INPUT_POLL: Duration = Duration::from_millis(100);
/// Log lines kept per job for display
const TAIL_LINES: usize = 20;

const FAILED_COLOR: Color = Color::Rgb(190, 0, 0);
const BUILDING_COLOR: Color = Color::Rgb(190, 190, 0);
const FOOTER_COLOR: Color = Color::Rgb(190, 190, 190);

type Screen = Terminal<CrosstermBackend<Stdout>>;

struct Shared {
    jobs: Mutex<JobTable<LogTail>>,
    screen: Mutex<Screen>,
    cancel: CancelListeners,
    running: AtomicBool,
}

impl Shared {
    fn redraw(&self) {
        let mut screen = self.screen.lock();
        let size = match screen.size() {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!(error = %e, "cannot read terminal size");
                return;
            }
        };
        let lines = {
            let jobs = self.jobs.lock();
            render_dashboard(&jobs, usize::from(size.width), usize::from(size.height))
        };
        if let Err(e) = screen.draw(|frame| draw(frame, &lines)) {
            tracing::warn!(error = %e, "failed to draw dashboard");
        }
    }
}

pub struct InteractiveInterface {
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl InteractiveInterface {
    /// Take over the terminal. Fails when stdout is not a terminal, in which
    /// case the caller should fall back to plain text output.
    pub fn new() -> Result<Self, InterfaceError> {
        if !io::stdout().is_terminal() {
            return Err(InterfaceError::NotATerminal);
        }
        enable_raw_mode()?;
        let screen = match open_screen() {
            Ok(screen) => screen,
            Err(e) => {
                if let Err(restore) = disable_raw_mode() {
                    tracing::warn!(error = %restore, "failed to leave raw mode");
                }
                return Err(e.into());
            }
        };
        let shared = Arc::new(Shared {
            jobs: Mutex::new(JobTable::default()),
            screen: Mutex::new(screen),
            cancel: CancelListeners::default(),
            running: AtomicBool::new(true),
        });
        let ticker = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                while shared.running.load(Ordering::SeqCst) {
                    shared.redraw();
                    thread::sleep(REDRAW_PERIOD);
                }
            })
        };
        let input = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || read_input(&shared))
        };
        Ok(Self {
            shared,
            threads: Mutex::new(vec![ticker, input]),
            closed: AtomicBool::new(false),
        })
    }

    fn restore(&self) -> io::Result<()> {
        self.shared.running.store(false, Ordering::SeqCst);
        for handle in self.threads.lock().drain(..) {
            if handle.join().is_err() {
                tracing::warn!("dashboard thread panicked");
            }
        }
        let mut screen = self.shared.screen.lock();
        disable_raw_mode()?;
        execute!(screen.backend_mut(), LeaveAlternateScreen)?;
        screen.show_cursor()
    }
}

fn open_screen() -> io::Result<Screen> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut screen = Terminal::new(CrosstermBackend::new(stdout))?;
    screen.hide_cursor()?;
    screen.clear()?;
    Ok(screen)
}

fn read_input(shared: &Shared) {
    while shared.running.load(Ordering::SeqCst) {
        match event::poll(INPUT_POLL) {
            Ok(false) => {}
            Ok(true) => match event::read() {
                Ok(Event::Resize(..)) => shared.redraw(),
                Ok(Event::Key(key)) if is_cancel_key(&key) => {
                    tracing::info!("cancel requested from dashboard");
                    shared.cancel.fire();
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read terminal input");
                    return;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to poll terminal input");
                return;
            }
        }
    }
}

fn is_cancel_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn style_for(kind: LineKind) -> Style {
    match kind {
        LineKind::FailedHeader => Style::default().fg(FAILED_COLOR),
        LineKind::BuildingHeader => Style::default().fg(BUILDING_COLOR),
        LineKind::Footer => Style::default().fg(FOOTER_COLOR),
        LineKind::Log | LineKind::Blank => Style::default(),
    }
}

fn draw(frame: &mut Frame, lines: &[DashboardLine]) {
    let text: Vec<Line> =
        lines.iter().map(|line| Line::styled(line.text.clone(), style_for(line.kind))).collect();
    frame.render_widget(Paragraph::new(text), frame.area());
}

impl Interface for InteractiveInterface {
    fn start_job(&self, service: &str, image: &str) {
        self.shared.jobs.lock().start(service, image, LogTail::new(TAIL_LINES));
    }

    fn fail_job(&self, service: &str, err: &BuildError) {
        if err.is_cancelled() {
            return;
        }
        self.shared.jobs.lock().advance(service, JobState::Failed);
    }

    fn succeed_job(&self, service: &str) {
        self.shared.jobs.lock().advance(service, JobState::Succeeded);
    }

    fn set_pushing(&self, service: &str) {
        self.shared.jobs.lock().advance(service, JobState::Pushing);
    }

    fn process_log(&self, service: &str, line: &str) {
        let mut jobs = self.shared.jobs.lock();
        if let Some(job) = jobs.get_mut(service) {
            if !job.state.is_terminal() {
                job.view.push(line.to_string());
            }
        }
    }

    fn add_cancel_listener(&self, listener: CancelListener) {
        self.shared.cancel.add(listener);
    }

    fn close(&self) -> Result<(), InterfaceError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.restore()?;
        let summary = self.shared.jobs.lock().summary().to_string();
        if !summary.is_empty() {
            let mut out = io::stdout();
            writeln!(out, "{summary}")?;
            out.flush()?;
        }
        Ok(())
    }
}

impl Drop for InteractiveInterface {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.restore() {
                tracing::warn!(error = %e, "failed to restore terminal");
            }
        }
    }
}

#[cfg(test)]
#[path = "interactive_tests.rs"]
mod tests;
