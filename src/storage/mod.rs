//! Persistent storage for generated feeding advice (Sled DB).

mod advice;

pub use advice::{AdviceStats, AdviceStorage, AdviceStorageError};
