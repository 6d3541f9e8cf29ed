use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub regions: Vec<RegionConfig>,
    pub instance: InstanceSpec,
    pub discovery: DiscoveryConfig,
}

/// A target region, with an optional human-readable label for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub id: String,
    pub label: Option<String>,
}

/// The instance configuration whose price is being discovered.
///
/// Fixed for the whole run; every zone is priced against the same spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub instance_type: String,
    pub resource_type: String,
    pub spot_strategy: String,
    pub spot_duration: i32,
    pub system_disk_category: String,
    pub system_disk_size: i32,
    pub price_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Maximum number of price lookups in flight at once.
    pub max_concurrency: usize,
    /// Endpoint override. Accepts a bare host or a full URL; when unset the
    /// per-region default `ecs.<region>.aliyuncs.com` is used.
    pub endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            regions: vec![
                RegionConfig {
                    id: "ap-northeast-1".to_string(),
                    label: Some("Tokyo".to_string()),
                },
                RegionConfig {
                    id: "cn-hongkong".to_string(),
                    label: Some("Hong Kong".to_string()),
                },
                RegionConfig {
                    id: "ap-southeast-1".to_string(),
                    label: Some("Singapore".to_string()),
                },
                RegionConfig {
                    id: "us-west-1".to_string(),
                    label: Some("US West".to_string()),
                },
                RegionConfig {
                    id: "us-east-1".to_string(),
                    label: Some("US East".to_string()),
                },
            ],
            instance: InstanceSpec {
                instance_type: "ecs.e-c1m1.large".to_string(),
                resource_type: "instance".to_string(),
                spot_strategy: "SpotAsPriceGo".to_string(),
                spot_duration: 0,
                system_disk_category: "cloud_essd_entry".to_string(),
                system_disk_size: 20,
                price_unit: "Hour".to_string(),
            },
            discovery: DiscoveryConfig {
                max_concurrency: 10,
                endpoint: None,
            },
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .spotctl.toml in current dir, then ~/.config/spotctl/config.toml
            let local = PathBuf::from(".spotctl.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("spotctl").join("config.toml"))
                    .unwrap_or_else(|| PathBuf::from(".spotctl.toml"))
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            let config: Config = toml::from_str(&content).with_context(|| {
                format!(
                    "Failed to parse config: {}\n  Tip: Run 'spotctl init' to create a fresh config file",
                    config_path.display()
                )
            })?;
            Ok(config)
        } else {
            // Use defaults but warn if user explicitly provided a path
            if path.is_some() {
                eprintln!("WARNING: Config file not found: {}", config_path.display());
                eprintln!("   Using default configuration. Run 'spotctl init' to create a config file.");
            }
            Ok(Config::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Region id → display label, for report rendering. Regions without a
    /// label resolve to their own id downstream.
    pub fn region_labels(&self) -> HashMap<String, String> {
        self.regions
            .iter()
            .filter_map(|r| r.label.as_ref().map(|l| (r.id.clone(), l.clone())))
            .collect()
    }

    pub fn region_ids(&self) -> Vec<String> {
        self.regions.iter().map(|r| r.id.clone()).collect()
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}
