use crate::config::SignalFlags;
use crate::core::language::LanguageLookup;
use crate::core::phash::Fingerprint;
use crate::core::title::{extract_chapter_bounds_with, simplify, ChapterInfo, ChapterRules};
use crate::database::models::CatalogEntry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Comparison-ready projection of a catalog entry.
///
/// Built once per entry per scan and never mutated afterwards. A disabled
/// signal leaves its field empty (`None`, an empty list, or an
/// [`Fingerprint::Undecodable`] cover) and costs nothing to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub id: i64,
    pub size: u64,
    pub cover_hash: Fingerprint,
    pub title: Option<String>,
    pub chapters: Option<ChapterInfo>,
    pub artists: Vec<String>,
    pub country_codes: Vec<String>,
}

impl DuplicateCandidate {
    pub fn builder<'a>(entry: &'a CatalogEntry, flags: &SignalFlags) -> CandidateBuilder<'a> {
        CandidateBuilder {
            entry,
            flags: *flags,
            forced_cover: None,
        }
    }

    pub fn title_cleanup(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn title_no_digits(&self) -> Option<&str> {
        self.chapters.as_ref().map(|c| c.title_no_digits.as_str())
    }

    pub fn min_chapter_bound(&self) -> i32 {
        self.chapters.as_ref().map_or(-1, |c| c.min_bound)
    }

    pub fn max_chapter_bound(&self) -> i32 {
        self.chapters.as_ref().map_or(-1, |c| c.max_bound)
    }
}

pub struct CandidateBuilder<'a> {
    entry: &'a CatalogEntry,
    flags: SignalFlags,
    forced_cover: Option<Fingerprint>,
}

impl<'a> CandidateBuilder<'a> {
    /// Use this fingerprint instead of the stored one. Ignored when the
    /// cover signal is off.
    pub fn force_cover_hash(mut self, hash: Fingerprint) -> Self {
        self.forced_cover = Some(hash);
        self
    }

    pub fn build(self, languages: &dyn LanguageLookup, rules: &ChapterRules) -> DuplicateCandidate {
        let entry = self.entry;
        let flags = self.flags;

        let cover_hash = if flags.use_cover {
            self.forced_cover.unwrap_or(entry.cover_hash)
        } else {
            Fingerprint::Undecodable
        };

        let title = flags.use_title.then(|| simplify(&entry.title));
        let chapters = match &title {
            Some(title) if flags.ignore_chapters => Some(extract_chapter_bounds_with(title, rules)),
            _ => None,
        };

        let artists = if flags.use_artist {
            entry
                .artists
                .iter()
                .map(|name| simplify(name))
                .filter(|name| !name.is_empty())
                .collect()
        } else {
            Vec::new()
        };

        let mut country_codes: Vec<String> = Vec::new();
        if flags.use_language {
            for code in entry.languages.iter().filter_map(|l| languages.country_code(l)) {
                if !country_codes.contains(&code) {
                    country_codes.push(code);
                }
            }
        }

        DuplicateCandidate {
            id: entry.id,
            size: entry.size,
            cover_hash,
            title,
            chapters,
            artists,
            country_codes,
        }
    }
}

/// Build candidates for a whole catalog, in entry order.
pub fn build_candidates(
    entries: &[CatalogEntry],
    flags: &SignalFlags,
    languages: &dyn LanguageLookup,
    rules: &ChapterRules,
) -> Vec<DuplicateCandidate> {
    entries
        .par_iter()
        .map(|entry| DuplicateCandidate::builder(entry, flags).build(languages, rules))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::BuiltinLanguages;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            id: 7,
            title: "The Lost Harbor: Chapter 3".to_string(),
            source: "example".to_string(),
            url: "/g/7".to_string(),
            size: 4096,
            page_count: 0,
            cover_path: None,
            cover_hash: Fingerprint::Value(0xF0F0),
            storage_dir: None,
            artists: vec!["Jane Doe".to_string(), "  ".to_string()],
            languages: vec![
                "English".to_string(),
                "english".to_string(),
                "Klingon".to_string(),
            ],
            pages: Vec::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_all_signals_enabled() {
        let entry = entry();
        let candidate = DuplicateCandidate::builder(&entry, &SignalFlags::default())
            .build(&BuiltinLanguages::new(), &ChapterRules::default());

        assert_eq!(candidate.id, 7);
        assert_eq!(candidate.size, 4096);
        assert_eq!(candidate.cover_hash, Fingerprint::Value(0xF0F0));
        assert_eq!(candidate.title_cleanup(), Some("the lost harbor chapter 3"));
        assert_eq!(candidate.min_chapter_bound(), 3);
        assert_eq!(candidate.max_chapter_bound(), 3);
        assert!(candidate.title_no_digits().is_some());
        assert_eq!(candidate.artists, vec!["jane doe"]);
        assert_eq!(candidate.country_codes, vec!["US"]);
    }

    #[test]
    fn test_disabled_signals_stay_empty() {
        let entry = entry();
        let flags = SignalFlags {
            use_title: false,
            use_cover: false,
            use_artist: false,
            use_language: false,
            ignore_chapters: true,
        };
        let candidate = DuplicateCandidate::builder(&entry, &flags)
            .force_cover_hash(Fingerprint::Value(1))
            .build(&BuiltinLanguages::new(), &ChapterRules::default());

        assert_eq!(candidate.cover_hash, Fingerprint::Undecodable);
        assert_eq!(candidate.title, None);
        assert_eq!(candidate.chapters, None);
        assert_eq!(candidate.min_chapter_bound(), -1);
        assert_eq!(candidate.max_chapter_bound(), -1);
        assert!(candidate.artists.is_empty());
        assert!(candidate.country_codes.is_empty());
    }

    #[test]
    fn test_chapters_skipped_when_not_ignored() {
        let entry = entry();
        let flags = SignalFlags {
            ignore_chapters: false,
            ..SignalFlags::default()
        };
        let candidate = DuplicateCandidate::builder(&entry, &flags)
            .build(&BuiltinLanguages::new(), &ChapterRules::default());

        assert!(candidate.title.is_some());
        assert_eq!(candidate.chapters, None);
    }

    #[test]
    fn test_forced_cover_hash() {
        let entry = entry();
        let candidate = DuplicateCandidate::builder(&entry, &SignalFlags::default())
            .force_cover_hash(Fingerprint::Value(99))
            .build(&BuiltinLanguages::new(), &ChapterRules::default());
        assert_eq!(candidate.cover_hash, Fingerprint::Value(99));
    }

    #[test]
    fn test_build_candidates_keeps_order() {
        let mut second = entry();
        second.id = 8;
        let entries = vec![entry(), second];

        let candidates = build_candidates(
            &entries,
            &SignalFlags::default(),
            &BuiltinLanguages::new(),
            &ChapterRules::default(),
        );
        assert_eq!(candidates.iter().map(|c| c.id).collect::<Vec<_>>(), vec![7, 8]);
    }
}
