//! Terminal front end for the pad engine.
//!
//! Keys `a`/`s`/`d` trigger kick/snare/hihat, the arrow keys adjust the
//! global volume, `o` toggles no-overlap replay and `q` quits. A single
//! status line shows the pads (highlighted briefly when triggered), live
//! layer counts, the volume, the replay mode and the last announcement.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::style::Stylize;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{cursor, execute, queue};

use padkit::{
    EngineMessage, FileStore, MemoryStore, NUM_PADS, PadController, PadId, PadKit, SettingsStore,
    pad_for_key,
};

const VOLUME_STEP: f32 = 0.05;
const POLL_INTERVAL: Duration = Duration::from_millis(30);

fn open_store() -> Box<dyn SettingsStore> {
    if let Some(path) = FileStore::default_path() {
        match FileStore::open(&path) {
            Ok(store) => return Box::new(store),
            Err(err) => log::warn!("settings file unavailable ({err}), using memory store"),
        }
    }
    Box::new(MemoryStore::new())
}

fn draw(
    out: &mut impl Write,
    controller: &PadController,
    layers: &[usize; NUM_PADS],
) -> io::Result<()> {
    queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;

    for pad in PadId::ALL {
        let label = if layers[pad.index()] > 0 {
            format!(" {}[{}] ", pad.name(), layers[pad.index()])
        } else {
            format!(" {} ", pad.name())
        };
        let cell = if controller.is_pulsing(pad) {
            label.negative()
        } else if controller.pad_loaded(pad) {
            label.stylize()
        } else {
            label.dim()
        };
        queue!(out, crossterm::style::PrintStyledContent(cell))?;
    }

    let settings = controller.settings();
    let mode = if settings.no_overlap { "no-overlap" } else { "overlap" };
    let status = controller.last_status().unwrap_or("");
    queue!(
        out,
        crossterm::style::Print(format!(
            " | vol {:>3}% | {} | {}",
            (settings.volume * 100.0).round() as u32,
            mode,
            status
        ))
    )?;

    out.flush()
}

fn run(controller: &mut PadController) -> io::Result<()> {
    let mut out = io::stdout();
    let mut layers = [0usize; NUM_PADS];

    loop {
        // Voice-completion feedback drives the layer counters down.
        while let Some(message) = controller.poll_event() {
            if let EngineMessage::VoiceEnded { id } = message {
                if id < NUM_PADS {
                    layers[id] = layers[id].saturating_sub(1);
                }
            }
        }

        draw(&mut out, controller, &layers)?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }

        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind == KeyEventKind::Release {
            continue;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char('o') => {
                let flipped = !controller.settings().no_overlap;
                controller.set_no_overlap(flipped);
            }
            KeyCode::Up => {
                let volume = controller.settings().volume + VOLUME_STEP;
                controller.set_volume(volume);
            }
            KeyCode::Down => {
                let volume = controller.settings().volume - VOLUME_STEP;
                controller.set_volume(volume);
            }
            KeyCode::Char(key) => {
                if let Some(pad) = pad_for_key(key) {
                    controller.trigger(pad);
                    if controller.pad_loaded(pad) {
                        if controller.settings().no_overlap {
                            layers[pad.index()] = 1;
                        } else {
                            layers[pad.index()] += 1;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn main() -> io::Result<()> {
    let sample_dir = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let kit = PadKit::standard(&sample_dir);

    let mut controller = PadController::new(open_store());
    if let Err(err) = controller.initialize(&kit) {
        eprintln!("failed to start audio engine: {err}");
        std::process::exit(1);
    }

    println!("pads: a/s/d trigger, up/down volume, o overlap mode, q quit");

    terminal::enable_raw_mode()?;
    let result = run(&mut controller);
    terminal::disable_raw_mode()?;
    execute!(io::stdout(), crossterm::style::Print("\n"))?;

    controller.shut_down();
    result
}
