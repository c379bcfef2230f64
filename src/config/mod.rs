use std::{
    env,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use dirs::home_dir;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{FormError, Result};

const DEFAULT_DIR_NAME: &str = ".cw_form";
const CONFIG_FILE: &str = "config.json";
const TMP_SUFFIX: &str = "tmp";
const HOME_ENV: &str = "CW_FORM_HOME";
const TOKEN_ENV: &str = "CW_FORM_ACCESS_TOKEN";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SEARCH_MIN_CHARS: usize = 5;

/// Connection settings of the form: where lookups are read and items created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Absolute URL of the web hosting the form.
    pub site_url: String,
    /// Items endpoint of the CDOA to DSM mapping list.
    pub lookup_list_url: String,
    /// Items endpoint of the destination list.
    pub form_list_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_search_min_chars")]
    pub people_search_min_chars: usize,
}

impl Config {
    pub fn new(
        site_url: impl Into<String>,
        lookup_list_url: impl Into<String>,
        form_list_url: impl Into<String>,
    ) -> Self {
        Self {
            site_url: site_url.into(),
            lookup_list_url: lookup_list_url.into(),
            form_list_url: form_list_url.into(),
            access_token: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            people_search_min_chars: DEFAULT_SEARCH_MIN_CHARS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let site = Url::parse(&self.site_url)
            .map_err(|err| FormError::Config(format!("site_url `{}`: {err}", self.site_url)))?;
        if !matches!(site.scheme(), "http" | "https") {
            return Err(FormError::Config(format!(
                "site_url must use http or https, got `{}`",
                site.scheme()
            )));
        }
        for (name, value) in [
            ("lookup_list_url", &self.lookup_list_url),
            ("form_list_url", &self.form_list_url),
        ] {
            if value.trim().is_empty() {
                return Err(FormError::Config(format!("{name} cannot be empty")));
            }
            let absolute = value.starts_with("http://") || value.starts_with("https://");
            if absolute {
                Url::parse(value)
                    .map_err(|err| FormError::Config(format!("{name} `{value}`: {err}")))?;
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(FormError::Config(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Applies overrides taken from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.access_token = Some(token);
            }
        }
        self
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_search_min_chars() -> usize {
    DEFAULT_SEARCH_MIN_CHARS
}

/// Returns the application data directory, defaulting to `~/.cw_form`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Loads and stores [`Config`] as JSON inside the application directory.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: base.join(CONFIG_FILE),
        })
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Err(FormError::Config(format!(
                "no configuration at {}; run `cw_form_cli config init` first",
                self.path.display()
            )));
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Config {
        Config::new(
            "https://contoso.example/sites/aa",
            "/_api/web/lists/getbytitle('CDOA to DSM')/items?$select=CDOA/Id,CDOA/Title,DSM/Id,DSM/Title&$expand=CDOA,DSM",
            "/_api/web/lists/getbytitle('Cancel Withdrawal')/items",
        )
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert!(!manager.exists());
        manager.save(&sample()).unwrap();
        assert!(manager.exists());
        assert_eq!(manager.load().unwrap(), sample());
        assert!(!tmp_path(manager.path()).exists());
    }

    #[test]
    fn missing_config_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().join("nested")).unwrap();
        assert!(matches!(manager.load(), Err(FormError::Config(_))));
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let raw = r#"{"site_url":"https://contoso.example","lookup_list_url":"/a","form_list_url":"/b"}"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.people_search_min_chars, 5);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn validate_rejects_bad_urls() {
        let mut config = sample();
        config.site_url = "ftp://contoso.example".into();
        assert!(config.validate().is_err());

        let mut config = sample();
        config.form_list_url = "  ".into();
        assert!(config.validate().is_err());

        let mut config = sample();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
