// Application services: the scene loop, its command/output types, stage
// loading, and the disaster scheduler.

pub mod disasters;
pub mod leaderboard;
pub mod scene;
pub mod scheduler;
pub mod stage;
pub mod types;

pub use types::{DiffBatch, SceneCommand, SceneOutput, SceneSink, Target};
