//! Per-language rejection reasons, loaded once at startup.

use rand::seq::SliceRandom;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::{NaasError, Result};

/// Language served when a request does not ask for one.
pub const DEFAULT_LANGUAGE: &str = "en";

static LANGUAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}([-_][A-Za-z0-9]{2,8})*$").expect("language pattern is valid")
});

/// Read-only map from language code to its reasons.
#[derive(Debug, Clone)]
pub struct ReasonStore {
    reasons: HashMap<String, Vec<String>>,
    languages: Vec<String>,
}

impl ReasonStore {
    /// Load every `<lang>.txt` file in `dir`.
    ///
    /// Blank lines are skipped. Fails when the default language is missing
    /// or a language has no reasons at all.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut reasons = HashMap::new();

        let entries = fs::read_dir(dir).map_err(|e| {
            NaasError::ReasonStore(format!("Cannot read {}: {}", dir.display(), e))
        })?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !LANGUAGE_PATTERN.is_match(lang) {
                debug!(file = %path.display(), "Skipping file without a language name");
                continue;
            }

            let contents = fs::read_to_string(&path)?;
            let lines = contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>();
            debug!(lang = %lang, count = lines.len(), "Loaded reasons");
            reasons.insert(lang.to_string(), lines);
        }

        let store = Self::from_map(reasons)?;
        info!(
            dir = %dir.display(),
            languages = ?store.languages,
            "Reason store ready"
        );
        Ok(store)
    }

    /// Build a store from reasons already in memory.
    pub fn from_map(reasons: HashMap<String, Vec<String>>) -> Result<Self> {
        if !reasons.contains_key(DEFAULT_LANGUAGE) {
            return Err(NaasError::ReasonStore(format!(
                "The default language ({}) does not exist",
                DEFAULT_LANGUAGE
            )));
        }
        if let Some((lang, _)) = reasons.iter().find(|(_, lines)| lines.is_empty()) {
            return Err(NaasError::ReasonStore(format!(
                "Language '{}' has no reasons",
                lang
            )));
        }

        let mut languages = reasons.keys().cloned().collect::<Vec<_>>();
        languages.sort();

        Ok(Self { reasons, languages })
    }

    /// Language codes in ascending order.
    pub fn available_languages(&self) -> &[String] {
        &self.languages
    }

    pub fn contains(&self, lang: &str) -> bool {
        self.reasons.contains_key(lang)
    }

    pub fn reasons_for(&self, lang: &str) -> Option<&[String]> {
        self.reasons.get(lang).map(Vec::as_slice)
    }

    /// Pick a reason for `lang` uniformly at random.
    pub fn random_reason(&self, lang: &str) -> Result<&str> {
        let reasons = self
            .reasons_for(lang)
            .ok_or_else(|| NaasError::InvalidLanguage(lang.to_string()))?;

        // thread_rng is thread-local, so concurrent handlers never share it.
        reasons
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .ok_or_else(|| NaasError::ReasonStore(format!("Language '{}' has no reasons", lang)))
    }
}
