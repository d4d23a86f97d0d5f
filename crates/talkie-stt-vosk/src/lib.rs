pub mod backend;
pub mod model;

pub use backend::{VoskModel, VoskRecognizer};
pub use model::{resolve_model_path, MODEL_ENV_VAR};
