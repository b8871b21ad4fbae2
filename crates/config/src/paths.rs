//! Filesystem locations

use std::path::PathBuf;

/// Data directory (~/.memagent), or `.memagent` when no home is known
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".memagent"))
        .unwrap_or_else(|| PathBuf::from(".memagent"))
}

/// Default config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// `.env` file read at startup, relative to the working directory
pub fn env_file_path() -> PathBuf {
    PathBuf::from(".env")
}

/// File stem for a thread id. Percent-encoding keeps distinct ids on
/// distinct files and leaves no path separators.
pub fn thread_file_stem(thread_id: &str) -> String {
    urlencoding::encode(thread_id).into_owned()
}
