//! The persisted configuration document: schema, defaults, and an atomic
//! load/merge/save store.
//!
//! One JSON file per managed project root (`skillink-config.json`). Unknown
//! top-level keys are preserved across read-modify-write cycles.

pub mod schema;
pub mod store;

pub use {
    schema::{AgentId, Config, DisabledScope, InstallSourceRecord, SelectionMode},
    store::{CONFIG_FILE, ConfigStore},
};
