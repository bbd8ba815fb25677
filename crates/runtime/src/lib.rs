pub mod event_bus;
pub mod event_loop;
pub mod timers;

pub use event_bus::*;
pub use event_loop::*;
pub use timers::*;
