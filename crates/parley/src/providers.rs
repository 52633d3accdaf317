pub mod anthropic;
pub mod base;
pub mod codec;
pub mod configs;
pub mod factory;
pub mod http;
pub mod openai;
pub mod stream;
pub mod utils;

#[cfg(test)]
pub mod mock;
