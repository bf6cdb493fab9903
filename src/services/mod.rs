pub mod classifier;
pub mod image_cleaner;
pub mod llm_recognizer;
pub mod portal;
pub mod recognizer;

pub use classifier::ResponseClassifier;
pub use image_cleaner::clean;
pub use llm_recognizer::LlmRecognizer;
pub use portal::PortalSession;
pub use recognizer::{normalize_guess, Recognizer};
