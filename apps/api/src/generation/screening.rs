//! Refuses job descriptions that require a security clearance or a
//! citizenship/residency status before any LLM call is made.

/// Phrases that mark a posting as ineligible.
pub const DEFAULT_CLEARANCE_KEYWORDS: &[&str] = &[
    "security clearance",
    "clearance required",
    "US citizen only",
    "US Citizen",
    "Permanent Resident",
];

/// Case-insensitive substring match against a fixed keyword list.
/// An empty list never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearanceGuard {
    keywords: Vec<String>,
}

impl ClearanceGuard {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns the first keyword found in `job_description`.
    pub fn find(&self, job_description: &str) -> Option<&str> {
        let haystack = job_description.to_lowercase();
        self.keywords
            .iter()
            .find(|k| haystack.contains(k.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_guard() -> ClearanceGuard {
        ClearanceGuard::new(DEFAULT_CLEARANCE_KEYWORDS.iter().copied())
    }

    #[test]
    fn test_matches_regardless_of_case() {
        let guard = default_guard();
        assert_eq!(
            guard.find("Applicants must hold an active SECURITY CLEARANCE."),
            Some("security clearance")
        );
        assert_eq!(guard.find("Must be a us citizen."), Some("us citizen"));
    }

    #[test]
    fn test_ordinary_posting_passes() {
        assert_eq!(default_guard().find("Senior Rust engineer, remote, Berlin"), None);
    }

    #[test]
    fn test_disabled_and_blank_keywords_never_match() {
        assert_eq!(ClearanceGuard::disabled().find("security clearance"), None);
        assert_eq!(ClearanceGuard::new([" ", ""]).find("anything at all"), None);
    }

    #[test]
    fn test_custom_keywords_are_trimmed() {
        let guard = ClearanceGuard::new(" TS/SCI ,polygraph".split(','));
        assert_eq!(guard.find("Requires TS/SCI with polygraph"), Some("ts/sci"));
    }
}
