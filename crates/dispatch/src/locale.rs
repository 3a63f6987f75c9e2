//! Locale prefixes are stripped from request paths before matching, so
//! `/hu/admin/users` and `/admin/users` reach the same route.

use micro_route::TranslatorConfig;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Supplies the locale codes known to the application.
pub trait LocaleSource: Send + Sync {
    fn locales(&self) -> Vec<String>;
}

/// A fixed list of locale codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticLocales {
    codes: Vec<String>,
}

impl StaticLocales {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { codes: codes.into_iter().map(Into::into).collect() }
    }
}

impl LocaleSource for StaticLocales {
    fn locales(&self) -> Vec<String> {
        self.codes.clone()
    }
}

/// Reads locale codes from a translation directory: one file per locale,
/// the file stem being the code (`en.json`, `hu.yaml`).
///
/// The directory is listed on every call so translations added at runtime
/// are picked up. An unreadable directory yields no locales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationDir {
    path: PathBuf,
}

impl TranslationDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl From<&TranslatorConfig> for TranslationDir {
    fn from(config: &TranslatorConfig) -> Self {
        Self::new(&config.path)
    }
}

impl LocaleSource for TranslationDir {
    fn locales(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), cause = %e, "cannot list translation directory");
                return vec![];
            }
        };

        let mut codes: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|file_type| file_type.is_file()))
            .filter_map(|entry| entry.path().file_stem().and_then(|stem| stem.to_str()).map(str::to_owned))
            .filter(|code| !code.is_empty() && !code.starts_with('.'))
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }
}

/// Removes every `/{code}/` occurrence of a known locale and maps a bare
/// `/{code}` to `/`, repeating until nothing changes.
pub fn normalize_path(path: &str, locales: &[String]) -> String {
    let mut current = path.to_owned();
    loop {
        let next = strip_once(&current, locales);
        // every strip shortens the path, so this terminates
        if next == current {
            return next;
        }
        current = next;
    }
}

fn strip_once(path: &str, locales: &[String]) -> String {
    let mut path = path.to_owned();
    for code in locales.iter().filter(|code| !code.is_empty()) {
        if path.strip_prefix('/') == Some(code.as_str()) {
            path = "/".to_owned();
        } else {
            path = path.replace(&format!("/{code}/"), "/");
        }
    }
    path
}
