use anyhow::{Context, Result};
use nmeawave_core::{PipelineConfig, SerialConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options read from the JSON config file. Every field is optional; missing
/// ones fall back to the library defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub raw_capacity: Option<usize>,
    pub output_capacity: Option<usize>,
    pub chunk_mode: Option<String>,
    pub checksum_case: Option<String>,
    pub encoding: Option<String>,
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nmeawave").join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Loads the per-user config file if there is one.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut cfg = PipelineConfig::default();
        if let Some(n) = self.raw_capacity {
            cfg.raw_capacity = n;
        }
        if let Some(n) = self.output_capacity {
            cfg.output_capacity = n;
        }
        if let Some(mode) = &self.chunk_mode {
            cfg.chunk_mode = mode.parse()?;
        }
        if let Some(case) = &self.checksum_case {
            cfg.checksum_case = case.parse()?;
        }
        if let Some(enc) = &self.encoding {
            cfg.encoding = enc.parse()?;
        }
        Ok(cfg)
    }

    pub fn serial_config(&self) -> Option<SerialConfig> {
        let port_name = self.port.clone()?;
        let mut cfg = SerialConfig {
            port_name,
            ..Default::default()
        };
        if let Some(baud) = self.baud_rate {
            cfg.baud_rate = baud;
        }
        Some(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nmeawave_core::{ChecksumCase, ChunkMode, PayloadEncoding};

    #[test]
    fn empty_object_is_default() {
        let s: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, Settings::default());
        let cfg = s.pipeline_config().unwrap();
        assert_eq!(cfg.raw_capacity, 100);
        assert!(s.serial_config().is_none());
    }

    #[test]
    fn maps_every_option() {
        let s: Settings = serde_json::from_str(
            r#"{
                "port": "/dev/ttyUSB0",
                "baud_rate": 9600,
                "raw_capacity": 8,
                "output_capacity": 16,
                "chunk_mode": "carry-over",
                "checksum_case": "insensitive",
                "encoding": "ascii"
            }"#,
        )
        .unwrap();

        let cfg = s.pipeline_config().unwrap();
        assert_eq!(cfg.raw_capacity, 8);
        assert_eq!(cfg.output_capacity, 16);
        assert_eq!(cfg.chunk_mode, ChunkMode::CarryOver);
        assert_eq!(cfg.checksum_case, ChecksumCase::Insensitive);
        assert_eq!(cfg.encoding, PayloadEncoding::Ascii);

        let serial = s.serial_config().unwrap();
        assert_eq!(serial.port_name, "/dev/ttyUSB0");
        assert_eq!(serial.baud_rate, 9600);
    }

    #[test]
    fn bad_option_is_an_error() {
        let s = Settings {
            chunk_mode: Some("sideways".into()),
            ..Default::default()
        };
        assert!(s.pipeline_config().is_err());
    }
}
