use std::error::Error;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;

use crate::app::{Controller, share_link};
use crate::audio::{AudioPlayer, MediaEvent};
use crate::catalog::format_file_size;
use crate::mpris::ControlCmd;
use crate::store::Backend;
use crate::upload::{self, UploadClient, UploadRequest};

mod cli;
mod event_loop;
mod input;
mod logging;
mod mpris_sync;
mod startup;

use cli::{Cli, Command};

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::PrintConfig) => {
            logging::init_for_cli();
            print_config()
        }
        Some(Command::Upload(args)) => {
            logging::init_for_cli();
            run_upload(args.into_request())
        }
        None => {
            logging::init_for_tui();
            run_player(cli.deep_link())
        }
    }
}

fn current_thread_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

fn run_player(deep_link: Option<String>) -> Result<(), Box<dyn Error>> {
    let settings = startup::load_settings();
    let backend = startup::open_backend(&settings)?;
    let source = backend.describe();
    let user_id = startup::listener_id(&settings);

    let (media_tx, media_rx) = mpsc::unbounded_channel::<MediaEvent>();
    let (control_tx, control_rx) = mpsc::unbounded_channel::<ControlCmd>();
    let (input_tx, input_rx) = mpsc::unbounded_channel::<Event>();

    let player = AudioPlayer::new(media_tx);
    let mpris = crate::mpris::spawn_mpris(control_tx);
    let mut ctrl = Controller::new(Rc::new(backend), player, user_id, &settings.player);
    let mut channels = event_loop::Channels {
        input: input_rx,
        control: control_rx,
        media: media_rx,
    };

    let rt = current_thread_runtime()?;

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    input::spawn_input_reader(input_tx);

    let run_result = rt.block_on(async {
        ctrl.init(deep_link);
        event_loop::run(
            &mut terminal,
            &settings,
            &mut ctrl,
            &mpris,
            &mut channels,
            &source,
        )
        .await
    });

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    run_result
}

fn run_upload(request: UploadRequest) -> Result<(), Box<dyn Error>> {
    let settings = startup::load_settings();
    let store = startup::open_backend(&settings)?;
    if let Backend::Local(_) = store {
        log::warn!("no database configured; the track will only exist for this run");
    }
    let user_id = startup::listener_id(&settings);
    let timeout = Duration::from_secs(settings.store.timeout_secs);
    let client = UploadClient::new(&settings.upload.api_origin, timeout)?;
    let max_bytes = settings.upload.max_file_mb.saturating_mul(1024 * 1024);
    let size = std::fs::metadata(&request.path).map(|m| m.len()).ok();

    let rt = current_thread_runtime()?;
    let track = rt.block_on(upload::publish(&store, &client, request, &user_id, max_bytes))?;

    match size {
        Some(size) => println!("published {} ({})", track.id, format_file_size(size)),
        None => println!("published {}", track.id),
    }
    println!("audio: {}", track.audio_url);
    match share_link(&settings.site.share_base_url, &track.id) {
        Ok(link) => println!("share: {link}"),
        Err(e) => log::warn!("cannot build share link: {e}"),
    }
    Ok(())
}

fn print_config() -> Result<(), Box<dyn Error>> {
    let settings = startup::load_settings().redacted();
    if let Some(path) = crate::config::resolve_config_path() {
        println!("# {}", path.display());
    }
    print!("{}", settings.to_toml()?);
    Ok(())
}
