use crate::net::server::ServerControl;
use crate::world::state::World;

/// Operator commands read from the server console. A leading `!` is
/// accepted so the same lines work when relayed from chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Online,
    Maps,
    Load { map: String },
    Sweep,
    Restart,
    Shutdown,
    Unknown(String),
}

pub fn parse_console_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('!').unwrap_or(trimmed);
    let mut parts = trimmed.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(None);
    };
    let command = command.to_ascii_lowercase();
    let parsed = match command.as_str() {
        "help" | "?" => ConsoleCommand::Help,
        "online" | "status" => ConsoleCommand::Online,
        "maps" => ConsoleCommand::Maps,
        "load" | "wake" => ConsoleCommand::Load {
            map: parse_map_name(parts.next())?,
        },
        "sweep" => ConsoleCommand::Sweep,
        "restart" => ConsoleCommand::Restart,
        "shutdown" | "quit" | "exit" => ConsoleCommand::Shutdown,
        _ => ConsoleCommand::Unknown(command),
    };
    Ok(Some(parsed))
}

fn parse_map_name(value: Option<&str>) -> Result<String, String> {
    let value = value.ok_or_else(|| "console command missing map name".to_string())?;
    if value.contains(['/', '\\']) || value.starts_with('.') {
        return Err(format!("console command got invalid map name '{value}'"));
    }
    Ok(value.to_string())
}

/// Runs one command against the live world and returns the reply line.
pub fn execute(command: ConsoleCommand, world: &World, control: &ServerControl) -> String {
    let reply = match command {
        ConsoleCommand::Help => {
            Ok("commands: online, maps, load <map>, sweep, restart, shutdown".to_string())
        }
        ConsoleCommand::Online => world.owner_count().and_then(|owners| {
            let maps = world.active_maps()?.len();
            let ids = world.live_ids()?;
            Ok(format!(
                "owners: {}, active maps: {}, live objects: {}",
                owners, maps, ids
            ))
        }),
        ConsoleCommand::Maps => world.active_maps().and_then(|active| {
            let inactive = world.inactive_maps()?;
            Ok(format!(
                "active: [{}] inactive: [{}]",
                active.join(", "),
                inactive.join(", ")
            ))
        }),
        ConsoleCommand::Load { map } => world
            .load_map(&map)
            .map(|()| format!("map '{}' is active", map)),
        ConsoleCommand::Sweep => world.maintenance_sweep().map(|report| {
            format!(
                "sweep: slept {}, expired {}, freed {} ids",
                report.slept.len(),
                report.expired.len(),
                report.freed_ids
            )
        }),
        ConsoleCommand::Restart => {
            control.request_restart();
            Ok("restarting".to_string())
        }
        ConsoleCommand::Shutdown => {
            control.request_shutdown();
            Ok("shutting down".to_string())
        }
        ConsoleCommand::Unknown(name) => Ok(format!("unknown command '{}'", name)),
    };
    reply.unwrap_or_else(|err| format!("error: {}", err))
}
