//! Supported source languages.

use std::path::Path;

use serde::Serialize;

use crate::Error;

/// A language supported by the Metastatic pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[derive(strum::Display, strum::EnumString, strum::VariantArray)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// The Python programming language.
    Python,
    /// The Elixir programming language.
    Elixir,
    /// The Erlang programming language.
    Erlang,
    /// The Ruby programming language.
    Ruby,
    /// The Haskell programming language.
    Haskell,
}

impl Language {
    /// Gets every supported language.
    pub fn all() -> &'static [Language] {
        use strum::VariantArray;
        Language::VARIANTS
    }

    /// Gets the file extensions recognized for the language.
    ///
    /// Extensions are lowercase and do not include the leading dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["py"],
            Self::Elixir => &["ex", "exs"],
            Self::Erlang => &["erl", "hrl"],
            Self::Ruby => &["rb"],
            Self::Haskell => &["hs"],
        }
    }

    /// Looks up a language by file extension (without the leading dot).
    ///
    /// The lookup is case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Language> {
        let ext = ext.to_ascii_lowercase();
        Language::all()
            .iter()
            .copied()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    /// Detects a language from a file path by its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Language> {
        let ext = path.as_ref().extension()?.to_str()?;
        Self::from_extension(ext)
    }

    /// Parses a language tag, surfacing [`Error::UnsupportedLanguage`] for
    /// unknown tags.
    pub fn parse_tag(tag: &str) -> Result<Language, Error> {
        tag.parse::<Language>()
            .map_err(|_| Error::UnsupportedLanguage(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_detects_languages_by_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("exs"), Some(Language::Elixir));
        assert_eq!(Language::from_extension("ERL"), Some(Language::Erlang));
        assert_eq!(Language::from_extension("xyz"), None);
    }

    #[test]
    fn it_detects_languages_by_path() {
        assert_eq!(Language::from_path("script.py"), Some(Language::Python));
        assert_eq!(Language::from_path("lib/app.ex"), Some(Language::Elixir));
        assert_eq!(Language::from_path("file.xyz"), None);
        assert_eq!(Language::from_path("noext"), None);
    }

    #[test]
    fn it_round_trips_tags() {
        for lang in Language::all() {
            assert_eq!(Language::parse_tag(&lang.to_string()).unwrap(), *lang);
        }

        assert!(matches!(
            Language::parse_tag("cobol"),
            Err(Error::UnsupportedLanguage(tag)) if tag == "cobol"
        ));
    }
}
