//! Runtime settings.
//!
//! Resolution order is built-in defaults, then environment variables, then
//! command-line flags. The store lives in `~/.shopfloor/shopfloor.json`
//! unless `SHOP_DIR` or `--db` say otherwise.

use std::path::PathBuf;

use crate::error::ShopError;
use crate::workflow::DEFAULT_NEXT_STAGES;

pub const DIR_ENV: &str = "SHOP_DIR";
pub const LOG_ENV: &str = "SHOP_LOG";
pub const NEXT_STAGES_ENV: &str = "SHOP_NEXT_STAGES";

const STORE_FILE: &str = "shopfloor.json";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store_path: PathBuf,
    pub log_level: String,
    pub next_stages: usize,
}

impl Settings {
    /// Resolve settings from the process environment and CLI flags.
    pub fn resolve(db: Option<PathBuf>, verbose: bool) -> Result<Self, ShopError> {
        Self::resolve_with(|key| std::env::var(key).ok(), db, verbose)
    }

    /// Resolve settings with an injectable environment lookup.
    pub fn resolve_with<F>(env: F, db: Option<PathBuf>, verbose: bool) -> Result<Self, ShopError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_path = match db {
            Some(path) => path,
            None => {
                let dir = env(DIR_ENV).map(PathBuf::from).unwrap_or_else(|| {
                    let home = env("HOME").unwrap_or_else(|| ".".to_string());
                    PathBuf::from(home).join(".shopfloor")
                });
                dir.join(STORE_FILE)
            }
        };

        let log_level = if verbose {
            "debug".to_string()
        } else {
            env(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
        };

        let next_stages = match env(NEXT_STAGES_ENV) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ShopError::InvalidArgument(format!(
                    "{} must be a number, got '{}'",
                    NEXT_STAGES_ENV, raw
                ))
            })?,
            None => DEFAULT_NEXT_STAGES,
        };

        Ok(Settings {
            store_path,
            log_level,
            next_stages,
        })
    }

    /// Directory holding the store, created on demand.
    pub fn ensure_store_dir(&self) -> std::io::Result<()> {
        match self.store_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_use_home_directory() {
        let s = Settings::resolve_with(env_of(&[("HOME", "/home/sam")]), None, false).unwrap();
        assert_eq!(s.store_path, PathBuf::from("/home/sam/.shopfloor/shopfloor.json"));
        assert_eq!(s.log_level, "warn");
        assert_eq!(s.next_stages, DEFAULT_NEXT_STAGES);
    }

    #[test]
    fn env_overrides_defaults() {
        let env = env_of(&[
            ("SHOP_DIR", "/srv/shop"),
            ("SHOP_LOG", "info"),
            ("SHOP_NEXT_STAGES", "3"),
        ]);
        let s = Settings::resolve_with(env, None, false).unwrap();
        assert_eq!(s.store_path, PathBuf::from("/srv/shop/shopfloor.json"));
        assert_eq!(s.log_level, "info");
        assert_eq!(s.next_stages, 3);
    }

    #[test]
    fn flags_override_env() {
        let env = env_of(&[("SHOP_DIR", "/srv/shop"), ("SHOP_LOG", "info")]);
        let s = Settings::resolve_with(env, Some(PathBuf::from("local.json")), true).unwrap();
        assert_eq!(s.store_path, PathBuf::from("local.json"));
        assert_eq!(s.log_level, "debug");
    }

    #[test]
    fn bad_next_stages_is_rejected() {
        let env = env_of(&[("SHOP_NEXT_STAGES", "two")]);
        assert!(matches!(
            Settings::resolve_with(env, None, false),
            Err(ShopError::InvalidArgument(_))
        ));
    }
}
