use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "ranking.toml";
const ENV_PREFIX: &str = "RANKING";
const MAX_FETCH_RETRIES: u32 = 10;

/// Every tunable of a run. Defaults reproduce the print/Kindle/Audible setup;
/// a `ranking.toml` and `RANKING__*` environment variables override them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sheet_name: String,
    pub log_file: Option<PathBuf>,
    pub sources: Vec<SourceSpec>,
    pub extraction: ExtractionSettings,
    pub fetch: FetchSettings,
    pub clock: ClockSettings,
    pub local: LocalSettings,
    pub remote: RemoteSettings,
}

/// One product page and how many ranking columns it contributes.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceSpec {
    pub label: String,
    pub url: String,
    pub expected_len: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Highest priority first.
    pub markers: Vec<String>,
    pub terminator: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    pub utc_offset_hours: i32,
    pub round_to_hour: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    pub path: PathBuf,
    pub backup_path: PathBuf,
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub spreadsheet_id: Option<String>,
    pub default_rows: u32,
    pub default_cols: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            sheet_name: "Amazon 売れ筋ランキング".to_string(),
            log_file: Some(PathBuf::from("amazonranking_log.txt")),
            sources: vec![
                SourceSpec {
                    label: "紙書籍".to_string(),
                    url: "https://www.amazon.co.jp/dp/4798183180".to_string(),
                    expected_len: 4,
                },
                SourceSpec {
                    label: "Kindle".to_string(),
                    url: "https://www.amazon.co.jp/dp/B0CYPMKYM3".to_string(),
                    expected_len: 2,
                },
                SourceSpec {
                    label: "Audible".to_string(),
                    url: "https://www.amazon.co.jp/dp/B0G66DNXDH".to_string(),
                    expected_len: 2,
                },
            ],
            extraction: ExtractionSettings::default(),
            fetch: FetchSettings::default(),
            clock: ClockSettings::default(),
            local: LocalSettings::default(),
            remote: RemoteSettings::default(),
        }
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        ExtractionSettings {
            markers: vec![
                "Amazon 売れ筋ランキング:".to_string(),
                "売れ筋ランキング:".to_string(),
                "売れ筋ランキング：".to_string(),
            ],
            terminator: "カスタマーレビュー".to_string(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            timeout_secs: 15,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
                .to_string(),
            max_retries: 2,
            base_backoff_ms: 2000,
        }
    }
}

impl Default for ClockSettings {
    fn default() -> Self {
        ClockSettings {
            utc_offset_hours: 9,
            round_to_hour: true,
        }
    }
}

impl Default for LocalSettings {
    fn default() -> Self {
        LocalSettings {
            path: PathBuf::from("amazonranking_matome.xlsx"),
            backup_path: PathBuf::from("amazonranking_matome_backup.xlsx"),
            max_retries: 3,
            retry_backoff_secs: 5,
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            spreadsheet_id: None,
            default_rows: 10_000,
            default_cols: 20,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LocalSettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

impl Settings {
    /// Load settings: defaults, then the config file (required only when given
    /// explicitly), then `RANKING__SECTION__KEY` environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Settings> {
        let file = match explicit {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.sheet_name.trim().is_empty() {
            anyhow::bail!("sheet_name must not be empty");
        }
        if self.extraction.markers.iter().all(|m| m.is_empty()) {
            anyhow::bail!("extraction.markers must contain at least one marker");
        }
        if self.local.max_retries == 0 {
            anyhow::bail!("local.max_retries must be at least 1");
        }
        if self.fetch.max_retries > MAX_FETCH_RETRIES {
            anyhow::bail!("fetch.max_retries must be at most {}", MAX_FETCH_RETRIES);
        }
        Ok(())
    }

    /// The remote sink needs an id; a blank one counts as absent.
    pub fn spreadsheet_id(&self) -> Option<&str> {
        self.remote
            .spreadsheet_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
