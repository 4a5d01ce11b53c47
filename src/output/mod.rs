pub mod paths;
pub mod summary;

use std::path::{Path, PathBuf};

use crate::models::CHECKPOINT_EXT;

pub use paths::increment_path;
pub use summary::{GridCaption, ScalarEvent, SummaryWriter};

pub const CONFIG_FILE: &str = "config.json";
pub const BEST_CHECKPOINT: &str = "best";
pub const LAST_CHECKPOINT: &str = "last";

/// `<dir>/<name>.json`
pub fn checkpoint_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{CHECKPOINT_EXT}"))
}
