use std::fmt;

/// Language label attached to every classified fragment
///
/// Each variant owns exactly one storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    English,
    Spanish,
    French,
    German,
    Unknown,
}

impl Language {
    /// The four languages with a known code
    pub const KNOWN: [Language; 4] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
    ];

    /// Parses an ISO 639-1 or 639-3 code or an English language name
    ///
    /// Returns `None` for anything outside the four known languages.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "eng" | "english" => Some(Self::English),
            "es" | "spa" | "spanish" => Some(Self::Spanish),
            "fr" | "fra" | "fre" | "french" => Some(Self::French),
            "de" | "deu" | "ger" | "german" => Some(Self::German),
            _ => None,
        }
    }

    /// ISO 639-1 code, or "und" for `Unknown`
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
            Self::French => "fr",
            Self::German => "de",
            Self::Unknown => "und",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Spanish => "spanish",
            Self::French => "french",
            Self::German => "german",
            Self::Unknown => "unknown",
        }
    }

    /// Name of the storage partition holding this language's proverbs
    pub fn partition(&self) -> &'static str {
        match self {
            Self::English => "english_proverbs",
            Self::Spanish => "spanish_proverbs",
            Self::French => "french_proverbs",
            Self::German => "german_proverbs",
            Self::Unknown => "unknown_proverbs",
        }
    }

    /// Every partition-bearing language, including `Unknown`
    pub fn all() -> [Language; 5] {
        [
            Self::English,
            Self::Spanish,
            Self::French,
            Self::German,
            Self::Unknown,
        ]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
