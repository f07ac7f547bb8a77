use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::registry::SoapCredentials;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub soap: SoapConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Reference files, relative to `dir` unless absolute.
#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_postal_codes")]
    pub postal_codes: PathBuf,
    #[serde(default = "default_terc")]
    pub terc: PathBuf,
    #[serde(default = "default_simc")]
    pub simc: PathBuf,
    #[serde(default = "default_ulic")]
    pub ulic: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_postal_codes() -> PathBuf {
    PathBuf::from("kody_pocztowe.csv")
}

fn default_terc() -> PathBuf {
    PathBuf::from("TERC_Adresowy_2025-04-08.csv")
}

fn default_simc() -> PathBuf {
    PathBuf::from("SIMC_Adresowy_2025-04-08.csv")
}

fn default_ulic() -> PathBuf {
    PathBuf::from("ULIC_Adresowy_2025-04-08.csv")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            postal_codes: default_postal_codes(),
            terc: default_terc(),
            simc: default_simc(),
            ulic: default_ulic(),
        }
    }
}

impl DataConfig {
    fn resolve(&self, file: &Path) -> PathBuf {
        self.dir.join(file)
    }

    pub fn postal_codes_path(&self) -> PathBuf {
        self.resolve(&self.postal_codes)
    }

    pub fn terc_path(&self) -> PathBuf {
        self.resolve(&self.terc)
    }

    pub fn simc_path(&self) -> PathBuf {
        self.resolve(&self.simc)
    }

    pub fn ulic_path(&self) -> PathBuf {
        self.resolve(&self.ulic)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-memory TERC/SIMC/ULIC snapshot
    #[default]
    Table,
    /// TERYT web service
    Soap,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RegistryConfig {
    #[serde(default)]
    pub backend: Backend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SoapConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://uslugaterytws1.stat.gov.pl/terytws1.svc".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SoapConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SoapConfig {
    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid SOAP endpoint '{}'", self.endpoint))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// UsernameToken credentials, when both parts are configured.
    pub fn credentials(&self) -> Option<SoapCredentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(SoapCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ResolverConfig {
    /// Registry snapshot date; today when unset
    pub as_of: Option<NaiveDate>,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry.backend == Backend::Soap {
            self.soap.endpoint_url()?;
            if self.soap.username.is_some() != self.soap.password.is_some() {
                bail!("SOAP username and password must be set together");
            }
        }
        if self.soap.timeout_secs == 0 {
            bail!("soap.timeout_secs must be positive");
        }
        Ok(())
    }
}
