pub mod backend;

pub use backend::{SherpaModel, SherpaStream};
