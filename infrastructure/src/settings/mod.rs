//! Settings store adapters

mod json_file;
mod memory;

pub use json_file::JsonFileSettingsStore;
pub use memory::MemorySettingsStore;
