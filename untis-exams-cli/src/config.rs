use std::{
    collections::HashMap,
    fmt::Write,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use untis_exams_core::{Credentials, School, SubjectAliases};

const APP_NAME: &str = "untis-exams";
const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";
const DEFAULT_TIMEZONE: &str = "Europe/Vienna";

/// Settings read from `config.json`, every field optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WebUntis host, e.g. `neilo.webuntis.com`
    pub server: Option<String>,
    /// School login name
    pub school: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub calendar_id: Option<String>,
    /// chrono format used for `--from`/`--to` and printed dates
    pub date_format: String,
    pub timezone: String,
    pub aliases: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            school: None,
            username: None,
            password: None,
            calendar_id: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            aliases: HashMap::new(),
        }
    }
}

/// Values given on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub school: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub calendar_id: Option<String>,
    pub date_format: Option<String>,
    pub timezone: Option<String>,
}

impl Config {
    /// Reads `path`, or the default location when `path` is `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !explicit && !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        fn set(field: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *field = value;
            }
        }

        set(&mut self.server, overrides.server);
        set(&mut self.school, overrides.school);
        set(&mut self.username, overrides.username);
        set(&mut self.password, overrides.password);
        set(&mut self.calendar_id, overrides.calendar_id);
        if let Some(format) = overrides.date_format {
            self.date_format = format;
        }
        if let Some(timezone) = overrides.timezone {
            self.timezone = timezone;
        }
    }

    pub fn school(&self) -> Result<School> {
        Ok(School {
            server: required(self.server.as_deref(), "server")?,
            login_name: required(self.school.as_deref(), "school")?,
        })
    }

    pub fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials::new(
            required(self.username.as_deref(), "username")?,
            required(self.password.as_deref(), "password")?,
        ))
    }

    pub fn calendar_id(&self) -> Result<String> {
        required(self.calendar_id.as_deref(), "calendar_id")
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Unknown timezone {:?}: {}", self.timezone, e))
    }

    pub fn aliases(&self) -> SubjectAliases {
        SubjectAliases::from(self.aliases.clone())
    }

    pub fn parse_date(&self, value: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), &self.date_format).with_context(|| {
            format!(
                "Date {:?} does not match format {:?}",
                value, self.date_format
            )
        })
    }

    /// Renders `date` with the configured format, falling back to ISO 8601
    /// if the format cannot render a date.
    pub fn format_date(&self, date: NaiveDate) -> String {
        render_date(date, &self.date_format).unwrap_or_else(|| date.to_string())
    }

    /// Rejects a date format that cannot render a plain date and an unknown
    /// timezone.
    pub fn validate(&self) -> Result<()> {
        if render_date(NaiveDate::default(), &self.date_format).is_none() {
            return Err(anyhow!(
                "Invalid date_format {:?}: use date fields only, e.g. %d.%m.%Y",
                self.date_format
            ));
        }
        self.timezone()?;
        Ok(())
    }
}

/// `None` for unknown specifiers and for time fields, which a date lacks.
fn render_date(date: NaiveDate, format: &str) -> Option<String> {
    let mut rendered = String::new();
    write!(rendered, "{}", date.format(format)).ok()?;
    Some(rendered)
}

fn required(value: Option<&str>, name: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(anyhow!(
            "Missing `{name}`: set it in the config file or pass it as a flag"
        )),
    }
}

/// `$XDG_CONFIG_HOME/untis-exams/config.json`, falling back to `~/.config`.
pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(APP_NAME).join("config.json"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Vienna);
        assert!(config.aliases().is_empty());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::from_json(
            r#"{"server":"neilo.webuntis.com","school":"htl","username":"anna",
                "password":"pw","aliases":{"M":"Mathematics"}}"#,
        )
        .unwrap();
        config.apply(Overrides {
            username: Some("ben".to_string()),
            timezone: Some("Europe/Berlin".to_string()),
            ..Overrides::default()
        });

        assert_eq!(config.credentials().unwrap().username, "ben");
        assert_eq!(config.school().unwrap().server, "neilo.webuntis.com");
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(config.aliases().translate("M"), "Mathematics");
    }

    #[test]
    fn test_missing_values() {
        let config = Config {
            server: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(config.school().is_err());
        assert!(config.credentials().is_err());
        assert!(config.calendar_id().is_err());
    }

    #[test]
    fn test_date_format() {
        let mut config = Config::default();
        let date = NaiveDate::from_ymd_opt(2024, 9, 12).unwrap();
        assert_eq!(config.parse_date("12.09.2024").unwrap(), date);
        assert_eq!(config.format_date(date), "12.09.2024");
        assert!(config.parse_date("2024-09-12").is_err());

        config.date_format = "%Y-%m-%d".to_string();
        assert_eq!(config.parse_date("2024-09-12").unwrap(), date);
    }

    #[test]
    fn test_unknown_timezone() {
        let config = Config {
            timezone: "Mars/Olympus".to_string(),
            ..Config::default()
        };
        assert!(config.timezone().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unusable_date_format() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 12).unwrap();
        for format in ["%d.%m.%Y %H:%M", "%Q", "%d.%m.%Y %"] {
            let config = Config {
                date_format: format.to_string(),
                ..Config::default()
            };
            assert!(config.validate().is_err(), "{format} accepted");
            assert_eq!(config.format_date(date), "2024-09-12");
        }

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_apply_then_validate() {
        let mut config = Config::default();
        config.apply(Overrides {
            date_format: Some("%H:%M".to_string()),
            ..Overrides::default()
        });
        assert!(config.validate().is_err());
    }
}
