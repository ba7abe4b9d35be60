#![forbid(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod fetch;
pub mod formats;
pub mod logging;
pub mod merge;
pub mod persist;
pub mod pipeline;
pub mod plan;
pub mod retry;
pub mod sources;
pub mod split;
pub mod store;
pub mod text;
pub mod translit;
pub mod upload;
pub mod verse_number;
