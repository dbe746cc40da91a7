use anyhow::{Result, bail};
use std::{env, path::PathBuf};

#[derive(Clone, Debug)]
pub struct Paths {
    pub home: PathBuf,
    pub config: PathBuf,
    pub logs: PathBuf,
}

/// `$XDG_CONFIG_HOME/repomirror`, or `~/.config/repomirror` without XDG.
pub fn repomirror_home() -> Result<PathBuf> {
    let base = match env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => match env::var_os("HOME").filter(|v| !v.is_empty()) {
            Some(home) => PathBuf::from(home).join(".config"),
            None => bail!("neither XDG_CONFIG_HOME nor HOME is set"),
        },
    };
    Ok(base.join("repomirror"))
}

pub fn paths() -> Result<Paths> {
    let home = repomirror_home()?;
    Ok(Paths {
        config: home.join("config.toml"),
        logs: home.join("logs"),
        home,
    })
}
