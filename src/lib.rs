pub mod actions;
pub mod admin;
pub mod combat;
mod config;
pub mod entities;
pub mod error;
pub mod net;
pub mod scripting;
pub mod status;
pub mod telemetry;
pub mod world;

pub use config::AppConfig;
pub use error::{CoreError, CoreResult};
pub use net::server::{ServerControl, ServerExit};
pub use world::state::{World, WorldRequest, WorldSettings};

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

const CONSOLE_POLL: Duration = Duration::from_millis(250);

pub fn run(args: &[String]) -> Result<(), String> {
    let console = spawn_console_reader();
    loop {
        let config = AppConfig::from_args(args)?;
        telemetry::logging::init(&config.log)?;
        let templates = world::template::TemplateIndex::load(&config.root)
            .map_err(|err| err.to_string())?;
        println!("tileworld: data root {}", config.root.display());
        println!("- archetypes: {}", templates.archetype_count());
        println!("- map templates: {}", templates.map_count());

        let world = Arc::new(World::new(
            Arc::new(templates),
            Arc::new(scripting::NoScripts),
            WorldSettings::from(&config),
        ));
        world
            .load_map(world.default_map())
            .map_err(|err| format!("default map: {}", err))?;
        println!(
            "tileworld: map '{}' active, tick {}ms",
            world.default_map(),
            config.tick_length.as_millis()
        );

        let control = Arc::new(ServerControl::new());
        let tick_handle = net::server::spawn_world_tick_loop(
            Arc::clone(&world),
            Arc::clone(&control),
            config.tick_length,
        );
        let maintenance_handle = net::server::spawn_maintenance_loop(
            Arc::clone(&world),
            Arc::clone(&control),
            config.maintenance_interval,
        );

        while control.is_running() {
            match console.recv_timeout(CONSOLE_POLL) {
                Ok(line) => match admin::commands::parse_console_command(&line) {
                    Ok(Some(command)) => {
                        println!("{}", admin::commands::execute(command, &world, &control));
                    }
                    Ok(None) => {}
                    Err(err) => eprintln!("tileworld: {}", err),
                },
                Err(RecvTimeoutError::Timeout) => {}
                // No console attached; keep serving until signalled.
                Err(RecvTimeoutError::Disconnected) => std::thread::sleep(CONSOLE_POLL),
            }
        }

        if tick_handle.join().is_err() {
            eprintln!("tileworld: tick thread panicked");
        }
        if let Some(handle) = maintenance_handle {
            if handle.join().is_err() {
                eprintln!("tileworld: maintenance thread panicked");
            }
        }

        match control.exit_reason() {
            ServerExit::Shutdown => return Ok(()),
            ServerExit::Restart => {
                telemetry::logging::log_game("restart requested");
                println!("tileworld: restart requested, relaunching");
            }
        }
    }
}

/// Reads stdin lines on a background thread so a restart can keep the same
/// console.
fn spawn_console_reader() -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}
