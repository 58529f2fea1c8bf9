//! Localized error messages.
//!
//! The gateway serves several locales, so every error that can reach a caller
//! carries its message in at least English and Spanish. On the wire the map is
//! serialized as `I18NErrorMessages: { "en": "...", "es": "..." }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Language code for English messages.
pub const LANG_EN: &str = "en";

/// Language code for Spanish messages.
pub const LANG_ES: &str = "es";

/// Human-readable messages keyed by language code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedMessages(BTreeMap<String, String>);

impl LocalizedMessages {
    /// Create an empty message set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message set with English and Spanish texts.
    pub fn bilingual(en: impl Into<String>, es: impl Into<String>) -> Self {
        Self::new().with(LANG_EN, en).with(LANG_ES, es)
    }

    /// Add (or replace) a message, builder style.
    pub fn with(mut self, lang: impl Into<String>, message: impl Into<String>) -> Self {
        self.insert(lang, message);
        self
    }

    /// Add (or replace) a message.
    pub fn insert(&mut self, lang: impl Into<String>, message: impl Into<String>) {
        self.0.insert(lang.into(), message.into());
    }

    /// Message for a language, if present.
    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.get(lang).map(String::as_str)
    }

    /// Message for a language, falling back to English.
    pub fn get_or_english(&self, lang: &str) -> Option<&str> {
        self.get(lang).or_else(|| self.get(LANG_EN))
    }

    /// Language codes present, in sorted order.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of languages present.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no messages are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Types that can describe themselves in several languages.
pub trait Localized {
    /// Messages for this value, at least in [`LANG_EN`] and [`LANG_ES`].
    fn localized(&self) -> LocalizedMessages;
}
