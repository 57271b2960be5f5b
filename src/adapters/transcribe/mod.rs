//! Speech-to-text adapters. Implement TranscriberPort.

pub mod http_transcriber;

pub use http_transcriber::HttpTranscriber;
