//! Housekeeping configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HkError, HkResult};
use crate::hex::parse_hex_strict;
use crate::logging::LogConfig;
use crate::registers::REGISTER_MAP;

/// Environment variable naming a YAML configuration file
pub const ENV_CONFIG: &str = "RP_HK_CONFIG";
/// Environment variable selecting the backend (`devmem`, `sim`, `auto`)
pub const ENV_BACKEND: &str = "RP_HK_BACKEND";
/// Environment variable overriding the device path
pub const ENV_DEV_MEM: &str = "RP_HK_DEV_MEM";
/// Environment variable overriding the physical base address (hex)
pub const ENV_BASE: &str = "RP_HK_BASE";

/// Register backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Map the physical block through the device file
    #[default]
    DevMem,
    /// Software register image
    #[serde(alias = "sim")]
    Simulated,
    /// `DevMem` when the board is detected, otherwise `Simulated`
    Auto,
}

impl std::str::FromStr for BackendKind {
    type Err = HkError;

    fn from_str(s: &str) -> HkResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devmem" | "dev_mem" | "hw" => Ok(BackendKind::DevMem),
            "sim" | "simulated" => Ok(BackendKind::Simulated),
            "auto" => Ok(BackendKind::Auto),
            other => Err(HkError::ConfigError(format!("unknown backend '{}'", other))),
        }
    }
}

/// Configuration for opening the housekeeping block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HkConfig {
    /// Backend to open
    pub backend: BackendKind,

    /// Path to device memory (usually /dev/mem)
    pub dev_mem_path: PathBuf,

    /// Physical base address of the block
    pub phys_base: usize,

    /// Declared block size in bytes
    pub block_size: usize,

    /// Identifier reported by the simulated backend
    pub sim_id: u32,

    /// Chip DNA reported by the simulated backend
    pub sim_dna: u64,

    /// Logging setup for programs using this configuration
    pub log: LogConfig,
}

impl Default for HkConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::DevMem,
            dev_mem_path: PathBuf::from("/dev/mem"),
            phys_base: REGISTER_MAP.base,
            block_size: REGISTER_MAP.size,
            sim_id: 0,
            sim_dna: 0,
            log: LogConfig::default(),
        }
    }
}

impl HkConfig {
    /// Configuration for the simulated backend
    pub fn simulated() -> Self {
        Self::default().with_backend(BackendKind::Simulated)
    }

    /// Parse YAML text; missing keys take their defaults
    pub fn from_yaml_str(text: &str) -> HkResult<Self> {
        serde_yaml::from_str(text).map_err(|e| HkError::ConfigError(e.to_string()))
    }

    /// Load a YAML configuration file
    pub fn load(path: impl AsRef<Path>) -> HkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            HkError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Build from the process environment
    ///
    /// `RP_HK_CONFIG` names an optional YAML file; `RP_HK_BACKEND`,
    /// `RP_HK_DEV_MEM` and `RP_HK_BASE` override individual settings.
    pub fn from_env() -> HkResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> HkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(backend) = lookup(ENV_BACKEND) {
            config.backend = backend.parse()?;
        }
        if let Some(path) = lookup(ENV_DEV_MEM) {
            config.dev_mem_path = PathBuf::from(path);
        }
        if let Some(base) = lookup(ENV_BASE) {
            config.phys_base = parse_hex_strict(&base)
                .map_err(|_| HkError::ConfigError(format!("invalid {} '{}'", ENV_BASE, base)))?
                as usize;
        }

        Ok(config)
    }

    /// Builder: select backend
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Builder: set device path
    pub fn dev_mem_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dev_mem_path = path.into();
        self
    }

    /// Builder: set physical base address
    pub fn phys_base(mut self, base: usize) -> Self {
        self.phys_base = base;
        self
    }

    /// Builder: set declared block size
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Builder: identity reported by the simulated backend
    pub fn sim_identity(mut self, id: u32, dna: u64) -> Self {
        self.sim_id = id;
        self.sim_dna = dna;
        self
    }

    /// Builder: logging setup
    pub fn log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HkConfig::default();
        assert_eq!(config.backend, BackendKind::DevMem);
        assert_eq!(config.dev_mem_path, PathBuf::from("/dev/mem"));
        assert_eq!(config.phys_base, 0);
        assert_eq!(config.block_size, 0x70);
        assert_eq!(config.phys_base, REGISTER_MAP.base);
        assert_eq!(config.block_size, REGISTER_MAP.size);
    }

    #[test]
    fn test_yaml_partial() {
        let config = HkConfig::from_yaml_str(
            "backend: sim\nphys_base: 1073741824\nlog:\n  level: trace\n",
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::Simulated);
        assert_eq!(config.phys_base, 0x4000_0000);
        assert_eq!(config.log.level, LogLevel::Trace);
        assert_eq!(config.block_size, 0x70);
    }

    #[test]
    fn test_yaml_invalid() {
        assert!(matches!(
            HkConfig::from_yaml_str("backend: fpga\n"),
            Err(HkError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hk.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "backend: auto\ndev_mem_path: /tmp/fake-mem").unwrap();

        let config = HkConfig::load(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Auto);
        assert_eq!(config.dev_mem_path, PathBuf::from("/tmp/fake-mem"));

        assert!(HkConfig::load(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = HkConfig::from_vars(vars(&[
            (ENV_BACKEND, "sim"),
            (ENV_DEV_MEM, "/dev/uio0"),
            (ENV_BASE, "0x40000000"),
        ]))
        .unwrap();
        assert_eq!(config.backend, BackendKind::Simulated);
        assert_eq!(config.dev_mem_path, PathBuf::from("/dev/uio0"));
        assert_eq!(config.phys_base, 0x4000_0000);
    }

    #[test]
    fn test_env_invalid_values() {
        assert!(HkConfig::from_vars(vars(&[(ENV_BACKEND, "fpga")])).is_err());
        assert!(HkConfig::from_vars(vars(&[(ENV_BASE, "4000zz")])).is_err());
    }

    #[test]
    fn test_builders() {
        let config = HkConfig::simulated()
            .phys_base(0x4000_0000)
            .block_size(0x80)
            .sim_identity(7, 0xABCD);
        assert_eq!(config.backend, BackendKind::Simulated);
        assert_eq!(config.block_size, 0x80);
        assert_eq!(config.sim_id, 7);
        assert_eq!(config.sim_dna, 0xABCD);
    }
}
