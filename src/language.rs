//! @ai:module:intent Recognize C-family source files by extension
//! @ai:module:layer domain
//! @ai:module:public_api Language, detect_language, is_supported_file
//! @ai:module:stateless true

use std::path::Path;

/// @ai:intent A source language whose files the transformer can rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    /// @ai:intent Get file extensions for this language
    /// @ai:effects pure
    pub fn extensions(&self) -> &[&str] {
        match self {
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        }
    }
}

/// @ai:intent Detect the language from a file path
/// @ai:example ("tests.c") -> Some(C)
/// @ai:example ("notes.txt") -> None
/// @ai:effects pure
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?;

    [Language::C, Language::Cpp]
        .into_iter()
        .find(|lang| lang.extensions().contains(&ext))
}

/// @ai:intent Check if a file should be transformed based on extension
/// @ai:effects pure
pub fn is_supported_file(path: &Path) -> bool {
    detect_language(path).is_some()
}
