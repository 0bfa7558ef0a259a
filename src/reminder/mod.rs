pub mod cancel;
pub mod platform;
pub mod queue;
pub mod scheduler;
pub mod store;
pub mod trigger;
