pub mod cleanup;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod fs_util;
pub mod inventory;
pub mod manifest;
pub mod output;
pub mod plan;
pub mod snapshot;
pub mod workflow;
