pub mod director;
pub mod event;
pub mod notifier;
pub mod resolver;
pub mod scheduler;
pub mod stepper;
pub mod store;
