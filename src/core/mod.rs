pub mod chunker;
pub mod codegen;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod storage;
pub mod strategy;
pub mod transcript;

pub use codegen::*;
pub use pipeline::*;
pub use storage::*;
pub use strategy::*;
pub use transcript::*;
