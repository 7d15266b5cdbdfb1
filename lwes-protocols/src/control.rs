//! Zero-attribute liveness events shared by every emitter in the process.

use once_cell::sync::Lazy;

use crate::event::Event;

pub const STARTUP_NAME: &str = "System::Startup";
pub const SHUTDOWN_NAME: &str = "System::Shutdown";
pub const HEARTBEAT_NAME: &str = "System::Heartbeat";

pub static STARTUP: Lazy<Event> = Lazy::new(|| Event::new(STARTUP_NAME));
pub static SHUTDOWN: Lazy<Event> = Lazy::new(|| Event::new(SHUTDOWN_NAME));
pub static HEARTBEAT: Lazy<Event> = Lazy::new(|| Event::new(HEARTBEAT_NAME));

/// Liveness event kinds, recognized by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Startup,
    Shutdown,
    Heartbeat,
}

impl ControlKind {
    pub fn event(self) -> &'static Event {
        match self {
            ControlKind::Startup => &STARTUP,
            ControlKind::Shutdown => &SHUTDOWN,
            ControlKind::Heartbeat => &HEARTBEAT,
        }
    }

    /// Classifies `event` as a control event, if its name is one of the three.
    pub fn of(event: &Event) -> Option<Self> {
        match event.name.as_str() {
            STARTUP_NAME => Some(ControlKind::Startup),
            SHUTDOWN_NAME => Some(ControlKind::Shutdown),
            HEARTBEAT_NAME => Some(ControlKind::Heartbeat),
            _ => None,
        }
    }
}
