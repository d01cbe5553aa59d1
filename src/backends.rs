//! Model client implementations.

pub mod openai;
