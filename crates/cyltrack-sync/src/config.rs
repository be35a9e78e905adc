//! # Scanner Configuration
//!
//! Configuration management for the scan pipeline.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CYLTRACK_DEVICE_ID=abc-123                                         │
//! │     CYLTRACK_ORG_ID=org-42                                             │
//! │     CYLTRACK_SERIAL_PATTERN='^[0-9]{9}$'                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/cyltrack/scanner.toml (Linux)                            │
//! │     ~/Library/Application Support/com.cyltrack.scanner/... (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     2000ms window, 300ms hold, nine-digit serials                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanner.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Route Truck 7"
//!
//! [organization]
//! id = "org-42"
//! name = "Acme Gas & Welding"
//!
//! [scan]
//! debounce_window_ms = 2000
//! stability_hold_ms = 300
//! serial_pattern = "^[0-9]{9}$"
//!
//! [sync]
//! batch_size = 100
//! auto_sync_on_reconnect = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cyltrack_core::{
    BarcodeValidator, DebounceConfig, DEFAULT_DEBOUNCE_WINDOW_MS, DEFAULT_SERIAL_PATTERN,
    DEFAULT_STABILITY_HOLD_MS,
};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Identity
// =============================================================================

/// Configuration for this scanning device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name (e.g., "Route Truck 7").
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Scanner".to_string()
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        DeviceIdentity {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Organization Identity
// =============================================================================

/// Organization this device scans for. Every queued operation and remote
/// write is scoped to this id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationIdentity {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Scan Settings
// =============================================================================

/// Scan-loop behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Re-detections of the same code inside this window are camera noise.
    #[serde(default = "default_debounce_window")]
    pub debounce_window_ms: u64,

    /// A code must be seen continuously this long before committing.
    #[serde(default = "default_stability_hold")]
    pub stability_hold_ms: u64,

    /// Serial-number pattern for this organization's cylinder labels.
    #[serde(default = "default_serial_pattern")]
    pub serial_pattern: String,
}

fn default_debounce_window() -> u64 {
    DEFAULT_DEBOUNCE_WINDOW_MS
}

fn default_stability_hold() -> u64 {
    DEFAULT_STABILITY_HOLD_MS
}

fn default_serial_pattern() -> String {
    DEFAULT_SERIAL_PATTERN.to_string()
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            debounce_window_ms: default_debounce_window(),
            stability_hold_ms: default_stability_hold(),
            serial_pattern: default_serial_pattern(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Queue-drain behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Upper bound on operations drained per sync pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Run a sync pass automatically when connectivity returns.
    #[serde(default = "default_true")]
    pub auto_sync_on_reconnect: bool,
}

fn default_batch_size() -> usize {
    100
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            batch_size: default_batch_size(),
            auto_sync_on_reconnect: default_true(),
        }
    }
}

// =============================================================================
// Main Scanner Configuration
// =============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Device-specific configuration.
    #[serde(default)]
    pub device: DeviceIdentity,

    /// Organization scope.
    #[serde(default)]
    pub organization: OrganizationIdentity,

    /// Scan-loop settings.
    #[serde(default)]
    pub scan: ScanSettings,

    /// Queue-drain settings.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl ScannerConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scanner config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Scanner config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.is_empty() {
            return Err(SyncError::InvalidConfig(
                "device.id must not be empty".into(),
            ));
        }

        // A broken pattern must surface at load time, not on the first scan
        BarcodeValidator::new(&self.scan.serial_pattern)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        if self.sync.batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "sync.batch_size must be greater than 0".into(),
            ));
        }

        if self.scan.stability_hold_ms > self.scan.debounce_window_ms {
            return Err(SyncError::InvalidConfig(format!(
                "scan.stability_hold_ms ({}) must not exceed scan.debounce_window_ms ({})",
                self.scan.stability_hold_ms, self.scan.debounce_window_ms
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("CYLTRACK_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Ok(name) = std::env::var("CYLTRACK_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Ok(id) = std::env::var("CYLTRACK_ORG_ID") {
            debug!(organization_id = %id, "Overriding organization ID from environment");
            self.organization.id = id;
        }

        if let Ok(pattern) = std::env::var("CYLTRACK_SERIAL_PATTERN") {
            self.scan.serial_pattern = pattern;
        }

        if let Ok(window) = std::env::var("CYLTRACK_DEBOUNCE_WINDOW_MS") {
            if let Ok(ms) = window.parse::<u64>() {
                self.scan.debounce_window_ms = ms;
            }
        }

        if let Ok(hold) = std::env::var("CYLTRACK_STABILITY_HOLD_MS") {
            if let Ok(ms) = hold.parse::<u64>() {
                self.scan.stability_hold_ms = ms;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "cyltrack", "scanner")
            .map(|dirs| dirs.config_dir().join("scanner.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the device ID.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// Returns the organization ID.
    pub fn organization_id(&self) -> &str {
        &self.organization.id
    }

    /// Debounce tuning for the session controller.
    pub fn debounce(&self) -> DebounceConfig {
        DebounceConfig {
            window_ms: self.scan.debounce_window_ms,
            stability_hold_ms: self.scan.stability_hold_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert!(!config.device.id.is_empty()); // Auto-generated
        assert_eq!(config.scan.debounce_window_ms, 2000);
        assert_eq!(config.scan.stability_hold_ms, 300);
        assert_eq!(config.scan.serial_pattern, "^[0-9]{9}$");
        assert_eq!(config.sync.batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScannerConfig::default();

        // Empty device ID should fail
        config.device.id = String::new();
        assert!(config.validate().is_err());

        // Broken serial pattern should fail
        config.device.id = "device-1".to_string();
        config.scan.serial_pattern = "^[0-9{9}$".to_string();
        assert!(config.validate().is_err());

        // Hold longer than the window should fail
        config.scan.serial_pattern = DEFAULT_SERIAL_PATTERN.to_string();
        config.scan.stability_hold_ms = 5000;
        assert!(config.validate().is_err());

        config.scan.stability_hold_ms = 300;
        assert!(config.validate().is_ok());

        // Zero batch size should fail
        config.sync.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ScannerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("[scan]"));

        let back: ScannerConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.device.id, config.device.id);
        assert_eq!(back.scan.serial_pattern, config.scan.serial_pattern);
    }

    #[test]
    fn test_partial_file_gets_defaults() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [organization]
            id = "org-42"
            "#,
        )
        .unwrap();

        assert_eq!(config.organization.id, "org-42");
        assert_eq!(config.scan.debounce_window_ms, 2000);
        assert!(!config.device.id.is_empty());
    }

    #[test]
    fn test_debounce_projection() {
        let mut config = ScannerConfig::default();
        config.scan.debounce_window_ms = 1500;
        config.scan.stability_hold_ms = 200;

        let debounce = config.debounce();
        assert_eq!(debounce.window_ms, 1500);
        assert_eq!(debounce.stability_hold_ms, 200);
    }
}
