use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::paths::paths;
use crate::sync::SyncOptions;

pub const DEFAULT_OUTPUT: &str = "./repos";
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Optional `config.toml` in the repomirror home.
///
/// Every key may be omitted; command-line flags and the environment take
/// precedence over whatever is set here.
///
/// Example TOML:
/// ```toml
/// output       = "/srv/mirror"
/// token        = "ghp_..."
/// organization = "acme"
/// remote       = "origin"
/// fetch_tags   = true
/// ```
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub fetch_tags: Option<bool>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Parse the config file at `path`; a missing file is an empty config.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let txt = match fs::read_to_string(path) {
        Ok(txt) => txt,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("cannot read config: {}", path.display()));
        }
    };
    let cfg: Config = toml::from_str(&txt)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(cfg)
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub token: Option<String>,
    pub organization: Option<String>,
}

/// Effective settings after layering flags, environment, file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub output: PathBuf,
    pub token: Option<String>,
    pub organization: Option<String>,
    pub sync: SyncOptions,
    pub log_dir: PathBuf,
    pub api_url: String,
}

impl Settings {
    /// Flag > environment (`GITHUB_TOKEN`, `ORGANIZATION`) > file > default.
    ///
    /// `env` is the variable lookup; empty values count as unset.
    pub fn resolve(
        cfg: Config,
        cli: Overrides,
        env: impl Fn(&str) -> Option<String>,
        default_log_dir: PathBuf,
    ) -> Settings {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let defaults = SyncOptions::default();

        Settings {
            output: cli
                .output
                .or(cfg.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            token: cli.token.or_else(|| var("GITHUB_TOKEN")).or(cfg.token),
            organization: cli
                .organization
                .or_else(|| var("ORGANIZATION"))
                .or(cfg.organization),
            sync: SyncOptions {
                remote: cfg.remote.unwrap_or(defaults.remote),
                fetch_tags: cfg.fetch_tags.unwrap_or(defaults.fetch_tags),
            },
            log_dir: cfg.log_dir.unwrap_or(default_log_dir),
            api_url: cfg.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        }
    }

    /// Resolve against the real environment and the config file in the home.
    pub fn load(cli: Overrides) -> Result<Settings> {
        let p = paths()?;
        let cfg = load_config_from(&p.config)?;
        Ok(Settings::resolve(
            cfg,
            cli,
            |k| std::env::var(k).ok(),
            p.logs,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parses_full_config() {
        let cfg: Config = toml::from_str(
            r#"
            output = "/srv/mirror"
            token = "file-token"
            organization = "acme"
            remote = "upstream"
            fetch_tags = false
            log_dir = "/var/log/mirror"
            api_url = "http://ghe.local/api/v3"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.output, Some(PathBuf::from("/srv/mirror")));
        assert_eq!(cfg.remote.as_deref(), Some("upstream"));
        assert_eq!(cfg.fetch_tags, Some(false));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<Config>("outptu = \"x\"").is_err());
    }

    #[test]
    fn missing_file_is_empty_config() {
        let td = tempdir().unwrap();
        let cfg = load_config_from(&td.path().join("config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let td = tempdir().unwrap();
        let path = td.path().join("config.toml");
        fs::write(&path, "output = [").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse"));
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let s = Settings::resolve(
            Config::default(),
            Overrides::default(),
            no_env,
            PathBuf::from("/home/u/.config/repomirror/logs"),
        );
        assert_eq!(s.output, PathBuf::from("./repos"));
        assert_eq!(s.token, None);
        assert_eq!(s.sync, SyncOptions::default());
        assert_eq!(s.sync.remote, "origin");
        assert_eq!(s.log_dir, PathBuf::from("/home/u/.config/repomirror/logs"));
        assert_eq!(s.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn flag_beats_env_beats_file() {
        let env: HashMap<&str, &str> =
            HashMap::from([("GITHUB_TOKEN", "env-token"), ("ORGANIZATION", "env-org")]);
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());
        let file = || Config {
            token: Some("file-token".into()),
            organization: Some("file-org".into()),
            output: Some(PathBuf::from("/file/out")),
            ..Config::default()
        };

        let s = Settings::resolve(file(), Overrides::default(), lookup, PathBuf::new());
        assert_eq!(s.token.as_deref(), Some("env-token"));
        assert_eq!(s.organization.as_deref(), Some("env-org"));
        assert_eq!(s.output, PathBuf::from("/file/out"));

        let cli = Overrides {
            token: Some("cli-token".into()),
            organization: Some("cli-org".into()),
            output: Some(PathBuf::from("/cli/out")),
        };
        let s = Settings::resolve(file(), cli, lookup, PathBuf::new());
        assert_eq!(s.token.as_deref(), Some("cli-token"));
        assert_eq!(s.organization.as_deref(), Some("cli-org"));
        assert_eq!(s.output, PathBuf::from("/cli/out"));

        let s = Settings::resolve(file(), Overrides::default(), no_env, PathBuf::new());
        assert_eq!(s.token.as_deref(), Some("file-token"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let cfg = Config {
            token: Some("file-token".into()),
            ..Config::default()
        };
        let s = Settings::resolve(
            cfg,
            Overrides::default(),
            |_| Some(String::new()),
            PathBuf::new(),
        );
        assert_eq!(s.token.as_deref(), Some("file-token"));
    }
}
