//! Minimal terminal dashboard: pipeline FPS, VAD phase, audio level,
//! and GEC per-stage timing, refreshed on a fixed tick.

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use talkie_telemetry::{GecStageMetrics, PipelineMetrics};

pub struct DashboardHandles {
    pub pipeline: PipelineMetrics,
    pub gec: GecStageMetrics,
}

/// Runs the dashboard until the user presses `q`. Draws at a fixed
/// interval; never panics on terminal setup failure paths that already
/// ran raw-mode cleanup.
pub async fn run_tui(handles: DashboardHandles) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &handles).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn run_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, handles: &DashboardHandles) -> io::Result<()> {
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    let started = Instant::now();

    loop {
        terminal.draw(|f| draw_ui(f, handles, started))?;

        tokio::select! {
            _ = tick.tick() => {}
            key = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            } => {
                if let Some(Event::Key(key)) = key {
                    if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn draw_ui(f: &mut Frame, handles: &DashboardHandles, started: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(6)])
        .split(f.area());

    let pm = &handles.pipeline;
    let is_speaking = pm.is_speaking.load(Ordering::Relaxed);
    let pipeline_lines = vec![
        Line::from(format!("uptime: {}s", started.elapsed().as_secs())),
        Line::from(format!(
            "capture fps: {} | chunker fps: {} | vad fps: {}",
            pm.capture_fps.load(Ordering::Relaxed),
            pm.chunker_fps.load(Ordering::Relaxed),
            pm.vad_fps.load(Ordering::Relaxed),
        )),
        Line::from(format!(
            "vad phase: {}",
            if is_speaking { "SPEAKING" } else { "silence" }
        ))
        .style(Style::default().fg(if is_speaking { Color::Green } else { Color::Gray })),
        Line::from(format!(
            "speech segments: {}",
            pm.speech_segments_count.load(Ordering::Relaxed)
        )),
        Line::from(format!(
            "audio level: {:.1} dB",
            pm.audio_level_db.load(Ordering::Relaxed) as f32 / 10.0
        )),
    ];
    let pipeline_block = Paragraph::new(pipeline_lines).block(Block::default().title("Pipeline").borders(Borders::ALL));
    f.render_widget(pipeline_block, chunks[0]);

    let snap = handles.gec.snapshot();
    let avg_ms = if snap.processed > 0 {
        snap.total_ms as f64 / snap.processed as f64
    } else {
        0.0
    };
    let gec_lines = vec![
        Line::from(format!("utterances processed: {}", snap.processed)),
        Line::from(format!("avg latency: {:.1}ms", avg_ms)),
        Line::from(format!("homophone corrections: {}", snap.homo_changes)),
        Line::from(format!("punct/cap corrections: {}", snap.punct_changes)),
        Line::from(format!("grammar rewrites: {}", snap.grammar_changes)),
        Line::from(""),
        Line::from("[Q] quit"),
    ];
    let gec_block = Paragraph::new(gec_lines).block(Block::default().title("GEC").borders(Borders::ALL));
    f.render_widget(gec_block, chunks[1]);
}
