use crate::telemetry::logging;
use crate::world::state::World;
use crate::world::time::Schedule;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const MAINTENANCE_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerExit {
    Shutdown,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerSignal {
    Running = 0,
    Shutdown = 1,
    Restart = 2,
}

/// Shared stop flag for the world threads.
#[derive(Debug)]
pub struct ServerControl {
    signal: AtomicU8,
}

impl Default for ServerControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerControl {
    pub fn new() -> Self {
        Self {
            signal: AtomicU8::new(ServerSignal::Running as u8),
        }
    }

    pub fn request_shutdown(&self) {
        self.signal.store(ServerSignal::Shutdown as u8, Ordering::SeqCst);
    }

    pub fn request_restart(&self) {
        self.signal.store(ServerSignal::Restart as u8, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        matches!(self.current_signal(), ServerSignal::Running)
    }

    pub fn exit_reason(&self) -> ServerExit {
        match self.current_signal() {
            ServerSignal::Restart => ServerExit::Restart,
            _ => ServerExit::Shutdown,
        }
    }

    fn current_signal(&self) -> ServerSignal {
        match self.signal.load(Ordering::SeqCst) {
            2 => ServerSignal::Restart,
            1 => ServerSignal::Shutdown,
            _ => ServerSignal::Running,
        }
    }
}

/// Drives `World::tick` at a fixed interval until the control stops. Each
/// tick is handed the real time since the previous one.
pub fn spawn_world_tick_loop(
    world: Arc<World>,
    control: Arc<ServerControl>,
    tick_length: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last = Instant::now();
        while control.is_running() {
            let now = Instant::now();
            let delta = now.saturating_duration_since(last);
            if delta >= tick_length {
                last = now;
                match world.tick(delta) {
                    Ok(report) => {
                        let spent = now.elapsed();
                        if spent > tick_length {
                            logging::log_lag(&format!(
                                "tick {} took {}ms (resolved {}, failed {})",
                                report.tick.0,
                                spent.as_millis(),
                                report.resolved,
                                report.failed
                            ));
                        }
                    }
                    Err(err) => {
                        logging::log_error(&format!("world tick failed: {}", err));
                        control.request_shutdown();
                        break;
                    }
                }
            }
            thread::sleep(tick_length / 2);
        }
    })
}

/// Runs the maintenance sweep on its own schedule. A zero interval disables
/// the job and no thread is started.
pub fn spawn_maintenance_loop(
    world: Arc<World>,
    control: Arc<ServerControl>,
    interval: Duration,
) -> Option<thread::JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }
    logging::log_game(&format!(
        "maintenance enabled: interval={}s",
        interval.as_secs()
    ));
    Some(thread::spawn(move || {
        let mut schedule = Schedule::new(interval, Instant::now());
        while control.is_running() {
            let now = Instant::now();
            if schedule.due(now) {
                if let Err(err) = world.maintenance_sweep() {
                    logging::log_error(&format!("maintenance failed: {}", err));
                }
                if let (Ok(maps), Ok(objects)) = (world.active_maps(), world.live_ids()) {
                    logging::log_load(maps.len(), objects);
                }
                schedule.mark_done(now);
            }
            thread::sleep(MAINTENANCE_POLL);
        }
    }))
}
