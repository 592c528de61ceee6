//! Scenario Runtime — a headless engine for branching, stat-driven stories.
//!
//! Plays authored scenarios of scenes, dialogue lines, and choices:
//! steps through lines, applies stat effects with clamping, resolves
//! d20 dice checks, and stages timed outcome reveals, announcing every
//! observable change through a typed event notifier.

pub mod core;
pub mod schema;
pub mod testing;
