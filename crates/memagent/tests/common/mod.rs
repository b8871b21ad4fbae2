//! Common test utilities for memagent integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Variables the binary reads that must not leak in from the host
const ISOLATED_VARS: &[&str] = &[
    "GOOGLE_API_KEY",
    "GEMINI_API_BASE",
    "GEMINI_MODEL",
    "AGENT_TEMPERATURE",
    "AGENT_MAX_ITERATIONS",
    "HOST",
    "PORT",
    "LOG_LEVEL",
    "RUST_LOG",
    "MEMAGENT_STORE_DIR",
];

/// Isolated home and working directory for running the binary
pub struct TestEnv {
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            temp_dir: tempdir()?,
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Command running in the temp dir, with no config file and no key
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_memagent"));
        cmd.current_dir(self.temp_dir.path());
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("MEMAGENT_CONFIG", self.path("missing-config.json"));
        for var in ISOLATED_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Write a JSON config file and point the command at it
    pub fn write_config(&self, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.path("config.json");
        std::fs::write(&path, content)?;
        Ok(path)
    }
}
