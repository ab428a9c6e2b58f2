use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::cursor;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use directories::ProjectDirs;
use spdf_core::surface::execute;
use spdf_core::{open_document, Config, Effect, InputEvent, Session, Surface};
use spdf_render::PdfiumProvider;
use spdf_tty::{CellSize, EventTranslator, KittySurface, Palette};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

mod selection;

use selection::SelectionOwner;

#[derive(Debug, Parser)]
#[command(name = "spdf", version, about = "Minimal PDF viewer for kitty terminals")]
struct Args {
    /// Page to open the document on (1-based)
    #[arg(short = 'p', long = "page", default_value_t = 1)]
    page: usize,

    /// Configuration file to use instead of the default location
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Path to the PDF file to open
    file: PathBuf,
}

/// Puts the terminal into viewer mode and restores it on drop.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = Self;
        let mut stdout = io::stdout();
        crossterm::execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(
            stdout,
            DisableMouseCapture,
            LeaveAlternateScreen,
            cursor::Show
        );
        let _ = terminal::disable_raw_mode();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "spdf", "spdf")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_dirs.config_dir().join("config.toml"));
    let config = Config::load(&config_path)?;

    let provider = PdfiumProvider::new()?;
    let backend = open_document(&provider, &args.file).await?;
    let title = backend.info().display_title();
    let (cell, window) = CellSize::detect()?;

    let mut surface = KittySurface::new(
        io::stdout(),
        Palette::from(&config),
        cell,
        window.width as u32,
        window.height as u32,
    );
    let mut session = Session::new(
        backend,
        config,
        surface.line_metrics(),
        args.page.saturating_sub(1),
    )?;

    let _terminal = TerminalGuard::new()?;
    {
        let mut writer = surface.renderer().writer();
        crossterm::execute!(&mut writer, SetTitle(&title))?;
    }
    info!(path = ?args.file, %title, "viewer started");

    let translator = EventTranslator::new(cell);
    let mut selections = SelectionOwner::default();
    let mut pending = VecDeque::from([InputEvent::GeometryChanged(window)]);
    let mut dirty = false;

    'run: loop {
        let event = match pending.pop_front() {
            Some(event) => event,
            None => {
                if dirty {
                    surface.present()?;
                    dirty = false;
                }
                match translator.translate(event::read()?) {
                    Some(event) => event,
                    None => continue,
                }
            }
        };

        if let InputEvent::GeometryChanged(rect) = &event {
            surface.resize(rect.width.max(0) as u32, rect.height.max(0) as u32);
        }

        let mut effects = VecDeque::from(session.handle(event)?);
        while let Some(effect) = effects.pop_front() {
            match effect {
                Effect::Draw(op) => {
                    execute(&mut surface, session.image(), &op)?;
                    dirty = true;
                }
                Effect::Damage(rect) => pending.push_back(InputEvent::Expose(rect)),
                Effect::SetSelection { target, text } => selections.claim(target, &text),
                Effect::Reload => {
                    debug!(path = ?args.file, "reloading");
                    let backend = open_document(&provider, &args.file).await?;
                    effects.extend(session.reload(backend)?);
                }
                Effect::Quit => break 'run,
            }
        }
    }

    surface
        .renderer()
        .delete_all()
        .context("failed to remove the page image")?;
    surface.renderer().writer().flush()?;
    Ok(())
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {:?}", log_dir))?;

    let file_appender = tracing_appender::rolling::never(log_dir, "spdf.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal shows the document, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
