//! User settings: `$XDG_CONFIG_HOME/histview/settings.json`, then `HISTVIEW_*`
//! environment overrides.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diff::DiffSettings;
use crate::theme::Theme;

pub const MAX_CONTEXT: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Commits per history page.
    pub page_size: usize,
    /// Load the next page when the selection is this close to the end.
    pub prefetch_threshold: usize,
    pub diff_context: u32,
    pub ignore_whitespace: bool,
    pub diff_cache_capacity: usize,
    /// Diffs fetched ahead of the search scan position.
    pub search_prefetch: usize,
    /// Commits the background search scan evaluates per tick.
    pub scan_budget: usize,
    pub jump_history_limit: usize,
    pub debug_log_capacity: usize,
    pub remote: String,
    pub status_ttl_ms: u64,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: 500,
            prefetch_threshold: 10,
            diff_context: 3,
            ignore_whitespace: false,
            diff_cache_capacity: 256,
            search_prefetch: 8,
            scan_budget: 2000,
            jump_history_limit: 100,
            debug_log_capacity: 1000,
            remote: "origin".to_string(),
            status_ttl_ms: 3000,
            theme: Theme::default(),
        }
    }
}

pub fn settings_file_path() -> Option<PathBuf> {
    let home = env::home_dir()?;
    let base = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".config"));
    Some(base.join("histview").join("settings.json"))
}

fn parse_into<T: FromStr>(slot: &mut T, key: &str, value: Option<String>) {
    let Some(value) = value else {
        return;
    };
    match value.trim().parse() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!("ignoring {}={:?}: not a valid value", key, value),
    }
}

impl Settings {
    /// Settings file plus process environment. Never fails; bad input falls
    /// back to defaults with a warning.
    pub fn load() -> Self {
        let mut settings = settings_file_path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default();
        settings.apply_env(|key| env::var(key).ok());
        settings.normalize();
        settings
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(data) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&data) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        parse_into(&mut self.page_size, "HISTVIEW_PAGE_SIZE", get("HISTVIEW_PAGE_SIZE"));
        parse_into(
            &mut self.prefetch_threshold,
            "HISTVIEW_PREFETCH_THRESHOLD",
            get("HISTVIEW_PREFETCH_THRESHOLD"),
        );
        parse_into(&mut self.diff_context, "HISTVIEW_DIFF_CONTEXT", get("HISTVIEW_DIFF_CONTEXT"));
        parse_into(
            &mut self.ignore_whitespace,
            "HISTVIEW_IGNORE_WHITESPACE",
            get("HISTVIEW_IGNORE_WHITESPACE"),
        );
        parse_into(
            &mut self.diff_cache_capacity,
            "HISTVIEW_DIFF_CACHE_CAPACITY",
            get("HISTVIEW_DIFF_CACHE_CAPACITY"),
        );
        parse_into(&mut self.search_prefetch, "HISTVIEW_SEARCH_PREFETCH", get("HISTVIEW_SEARCH_PREFETCH"));
        parse_into(&mut self.scan_budget, "HISTVIEW_SCAN_BUDGET", get("HISTVIEW_SCAN_BUDGET"));
        parse_into(
            &mut self.jump_history_limit,
            "HISTVIEW_JUMP_HISTORY_LIMIT",
            get("HISTVIEW_JUMP_HISTORY_LIMIT"),
        );
        parse_into(
            &mut self.debug_log_capacity,
            "HISTVIEW_DEBUG_LOG_CAPACITY",
            get("HISTVIEW_DEBUG_LOG_CAPACITY"),
        );
        parse_into(&mut self.status_ttl_ms, "HISTVIEW_STATUS_TTL_MS", get("HISTVIEW_STATUS_TTL_MS"));
        if let Some(remote) = get("HISTVIEW_REMOTE").filter(|r| !r.trim().is_empty()) {
            self.remote = remote.trim().to_string();
        }
        if let Some(name) = get("HISTVIEW_THEME") {
            match serde_json::from_value(serde_json::Value::String(name.trim().to_string())) {
                Ok(theme) => self.theme = theme,
                Err(_) => tracing::warn!("ignoring HISTVIEW_THEME={:?}: unknown theme", name),
            }
        }
    }

    fn normalize(&mut self) {
        self.page_size = self.page_size.max(1);
        self.diff_context = self.diff_context.min(MAX_CONTEXT);
        self.scan_budget = self.scan_budget.max(1);
        self.jump_history_limit = self.jump_history_limit.max(1);
        self.debug_log_capacity = self.debug_log_capacity.max(1);
    }

    pub fn diff_settings(&self) -> DiffSettings {
        DiffSettings {
            context: self.diff_context,
            ignore_whitespace: self.ignore_whitespace,
        }
    }

    pub fn set_diff_settings(&mut self, diff: DiffSettings) {
        self.diff_context = diff.context.min(MAX_CONTEXT);
        self.ignore_whitespace = diff.ignore_whitespace;
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_millis(self.status_ttl_ms)
    }

    /// Write through a temporary file so a crash never leaves a torn file.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        if let Err(e) = fs::write(&tmp, content).and_then(|_| fs::rename(&tmp, path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"page_size": 50, "theme": "nord"}"#).unwrap();
        let s = Settings::load_from(&path);
        assert_eq!(s.page_size, 50);
        assert_eq!(s.theme, Theme::Nord);
        assert_eq!(s.diff_context, 3);
        assert_eq!(s.remote, "origin");
    }

    #[test]
    fn test_garbage_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
        assert_eq!(Settings::load_from(&dir.path().join("absent.json")), Settings::default());
    }

    #[test]
    fn test_bad_settings_file_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ page_size: ").unwrap();
        let log = crate::logging::DebugLog::new(10);
        let subscriber = crate::logging::build_subscriber(log.clone(), None);
        tracing::subscriber::with_default(subscriber, || {
            Settings::load_from(&path);
        });
        let entry = log.get(0).expect("warning captured");
        assert_eq!(entry.level, tracing::Level::WARN);
        assert!(entry.message.starts_with("ignoring"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("HISTVIEW_PAGE_SIZE", "42"),
            ("HISTVIEW_IGNORE_WHITESPACE", "true"),
            ("HISTVIEW_DIFF_CONTEXT", "lots"),
            ("HISTVIEW_REMOTE", " upstream "),
            ("HISTVIEW_THEME", "dracula"),
        ]);
        let mut s = Settings::default();
        s.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.page_size, 42);
        assert!(s.ignore_whitespace);
        assert_eq!(s.diff_context, 3);
        assert_eq!(s.remote, "upstream");
        assert_eq!(s.theme, Theme::Dracula);
    }

    #[test]
    fn test_save_round_trips_through_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = Settings::default();
        s.set_diff_settings(DiffSettings {
            context: 500,
            ignore_whitespace: true,
        });
        s.save_to(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());
        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.diff_context, MAX_CONTEXT);
        assert!(loaded.ignore_whitespace);
    }
}
