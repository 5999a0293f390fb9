pub mod anthropic;

pub use anthropic::{AnthropicClient, AnthropicConfig};
