//! CLI command handlers, one per file.

mod checksum;
mod completions;
mod fetch;
mod probe;

pub use checksum::run_checksum;
pub use completions::run_completions;
pub use fetch::run_fetch;
pub use probe::run_probe;

#[cfg(test)]
pub(crate) use fetch::{build_options, default_file_name, filename_from_url_path};
