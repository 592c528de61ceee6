pub mod check;
pub mod scenario;
pub mod scene;
pub mod stats;
