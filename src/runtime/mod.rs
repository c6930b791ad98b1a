//! Runtime adapters for spawning consumer loops.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
