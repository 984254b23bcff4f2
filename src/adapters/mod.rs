//! Out-of-process models used by the upload pipeline.

pub mod background;
pub mod classifier;

pub use background::{BackgroundRemover, RembgClient};
pub use classifier::{ClothingClassifier, OpenAiClassifier};
