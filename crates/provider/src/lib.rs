//! # gloop Provider
//!
//! The streaming chat client behind the [`Provider`](gloop_core::Provider)
//! trait. One implementation covers the OpenAI-compatible surface that
//! OpenRouter, OpenAI, Ollama, and most proxies expose.

pub mod client;

pub use client::OpenAiCompatProvider;
