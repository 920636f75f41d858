pub mod events;

pub use events::{NoScripts, ObjectEvent, ScriptHooks};
