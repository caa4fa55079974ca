//! Title cleanup and chapter-number extraction.
//!
//! Chapter and volume markers are the main reason two entries of the same
//! series look alike. Stripping them, while keeping the numeric range on the
//! side, lets the scorer tell "same book, different chapter" apart from
//! "same book, same chapter".

use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Share of the title, counted from its start, before which a number cannot
/// be the closing chapter number.
pub const DEFAULT_TAIL_RATIO: f64 = 0.8;

/// Maximum distance in characters between two chained chapter numbers.
pub const DEFAULT_MAX_GAP: usize = 5;

/// Largest gap a configuration may ask for.
pub const MAX_CHAPTER_GAP: usize = 1024;

/// Chapter and sequel vocabulary, removed in this order.
pub const TITLE_CHAPTER_WORDS: &[&str] = &[
    "chapter", "chap", "case", "after", "before", "prologue", "prelude", "final", "part",
    "update", "gaiden", "issue", "volume", "vol", "first", "second", "third", "fourth",
    "fifth", "1st", "2nd", "3rd", "4th", "5th", "zenpen", "全編", "chuuhen", "中編",
    "kouhen", "後編", "ex",
    // Circled numerals
    "①", "②", "③", "④", "⑤",
    // Roman numerals
    "i", "v", "x",
];

/// Tunables for [`extract_chapter_bounds_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterRules {
    pub tail_ratio: f64,
    pub max_gap: usize,
    pub case_sensitive: bool,
    pub vocabulary: Vec<String>,
}

impl Default for ChapterRules {
    fn default() -> Self {
        Self {
            tail_ratio: DEFAULT_TAIL_RATIO,
            max_gap: DEFAULT_MAX_GAP,
            case_sensitive: false,
            vocabulary: TITLE_CHAPTER_WORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Chapter-stripped title and the chapter range found in it.
///
/// Bounds are `-1` when the title carries no usable chapter number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    pub title_no_digits: String,
    pub min_bound: i32,
    pub max_bound: i32,
}

impl ChapterInfo {
    pub fn has_bounds(&self) -> bool {
        self.min_bound != -1 && self.max_bound != -1
    }

    /// True when either range starts inside the other one.
    pub fn overlaps(&self, other: &ChapterInfo) -> bool {
        (self.min_bound >= other.min_bound && self.min_bound <= other.max_bound)
            || (other.min_bound >= self.min_bound && other.min_bound <= self.max_bound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DigitRun {
    start: usize,
    end: usize,
    value: i32,
}

/// Lowercase, strip diacritics and punctuation, collapse whitespace.
///
/// Only the Combining Diacritical Marks block is dropped, so kana voicing
/// marks and Hangul survive the decomposition and are recomposed at the end.
pub fn simplify(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for ch in text.nfd() {
        if is_diacritic(ch) {
            continue;
        }
        if ch.is_alphanumeric() || is_combining_mark(ch) {
            cleaned.extend(ch.to_lowercase());
        } else {
            cleaned.push(' ');
        }
    }
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .nfc()
        .collect()
}

fn is_diacritic(ch: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&ch)
}

pub fn extract_chapter_bounds(title: &str) -> ChapterInfo {
    extract_chapter_bounds_with(title, &ChapterRules::default())
}

pub fn extract_chapter_bounds_with(title: &str, rules: &ChapterRules) -> ChapterInfo {
    let (min_bound, max_bound) = chapter_bounds(title, rules);

    let mut title_no_digits: String = title.chars().filter(|c| !c.is_ascii_digit()).collect();
    for word in &rules.vocabulary {
        title_no_digits = remove_all(&title_no_digits, word, rules.case_sensitive);
    }

    ChapterInfo {
        title_no_digits,
        min_bound,
        max_bound,
    }
}

fn chapter_bounds(title: &str, rules: &ChapterRules) -> (i32, i32) {
    let runs = locate_digits(title);
    let tail_start = title.chars().count() as f64 * rules.tail_ratio;

    let mut max: Option<DigitRun> = None;
    let mut min: Option<DigitRun> = None;
    for run in runs.into_iter().rev() {
        match max {
            None => {
                if run.end as f64 >= tail_start {
                    max = Some(run);
                }
            }
            Some(max_run) => {
                let lower = min.unwrap_or(max_run);
                if run.end.saturating_add(rules.max_gap) >= lower.start {
                    min = Some(run);
                } else {
                    break;
                }
            }
        }
    }

    match (min, max) {
        (Some(min), Some(max)) => (min.value, max.value),
        (None, Some(max)) => (max.value, max.value),
        _ => (-1, -1),
    }
}

/// Runs of ASCII digits with their char offsets; runs too large for an i32 are skipped.
fn locate_digits(text: &str) -> Vec<DigitRun> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    let mut flush = |current: &mut String, start: usize, end: usize| {
        if !current.is_empty() {
            if let Ok(value) = current.parse::<i32>() {
                runs.push(DigitRun { start, end, value });
            }
            current.clear();
        }
    };

    let mut length = 0;
    for (index, ch) in text.chars().enumerate() {
        if ch.is_ascii_digit() {
            if current.is_empty() {
                start = index;
            }
            current.push(ch);
        } else {
            flush(&mut current, start, index);
        }
        length = index + 1;
    }
    flush(&mut current, start, length);

    runs
}

fn remove_all(haystack: &str, needle: &str, case_sensitive: bool) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    if case_sensitive {
        return haystack.replace(needle, "");
    }

    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    let chars: Vec<char> = haystack.chars().collect();
    let mut result = String::with_capacity(haystack.len());
    let mut index = 0;
    while index < chars.len() {
        match match_ignore_case(&chars, index, &needle) {
            Some(consumed) => index += consumed,
            None => {
                result.push(chars[index]);
                index += 1;
            }
        }
    }
    result
}

/// Number of haystack chars matched by the lowercase `needle` at `at`.
fn match_ignore_case(chars: &[char], at: usize, needle: &[char]) -> Option<usize> {
    let mut consumed = 0;
    let mut matched = 0;
    while matched < needle.len() {
        let ch = *chars.get(at + consumed)?;
        for lower in ch.to_lowercase() {
            if needle.get(matched) != Some(&lower) {
                return None;
            }
            matched += 1;
        }
        consumed += 1;
    }
    Some(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chapter() {
        let info = extract_chapter_bounds("Chapter 5");

        assert_eq!(info.min_bound, 5);
        assert_eq!(info.max_bound, 5);
        assert!(!info.title_no_digits.to_lowercase().contains("chapter"));
        assert!(!info.title_no_digits.contains('5'));
        assert!(info.title_no_digits.trim().is_empty());
    }

    #[test]
    fn test_title_without_chapters_is_untouched() {
        let info = extract_chapter_bounds("My Story");

        assert_eq!(info.title_no_digits, "My Story");
        assert_eq!((info.min_bound, info.max_bound), (-1, -1));
        assert!(!info.has_bounds());
    }

    #[test]
    fn test_range_with_dash() {
        let info = extract_chapter_bounds("Series Vol 12-15");
        assert_eq!((info.min_bound, info.max_bound), (12, 15));
    }

    #[test]
    fn test_volume_and_chapter_markers_chain() {
        let info = extract_chapter_bounds("vol.3 ch.4");
        assert_eq!((info.min_bound, info.max_bound), (3, 4));

        let info = extract_chapter_bounds("story 10 11 12");
        assert_eq!((info.min_bound, info.max_bound), (10, 12));
    }

    #[test]
    fn test_leading_number_is_not_a_chapter() {
        let info = extract_chapter_bounds("2 guns in the night");
        assert_eq!((info.min_bound, info.max_bound), (-1, -1));
    }

    #[test]
    fn test_distant_number_does_not_join_range() {
        let info = extract_chapter_bounds("volume 3 the long awaited finale 9");
        assert_eq!((info.min_bound, info.max_bound), (9, 9));
    }

    #[test]
    fn test_custom_gap_and_tail() {
        let rules = ChapterRules {
            max_gap: 30,
            ..ChapterRules::default()
        };
        let info = extract_chapter_bounds_with("volume 3 the long awaited finale 9", &rules);
        assert_eq!((info.min_bound, info.max_bound), (3, 9));

        let rules = ChapterRules {
            tail_ratio: 0.0,
            ..ChapterRules::default()
        };
        let info = extract_chapter_bounds_with("2 guns in the night", &rules);
        assert_eq!((info.min_bound, info.max_bound), (2, 2));
    }

    #[test]
    fn test_unbounded_gap_chains_every_number() {
        let rules = ChapterRules {
            max_gap: usize::MAX,
            ..ChapterRules::default()
        };
        let info = extract_chapter_bounds_with("series 3 4", &rules);
        assert_eq!((info.min_bound, info.max_bound), (3, 4));

        let info = extract_chapter_bounds_with("volume 3 the long awaited finale 9", &rules);
        assert_eq!((info.min_bound, info.max_bound), (3, 9));
    }

    #[test]
    fn test_overflowing_number_is_ignored() {
        let info = extract_chapter_bounds("issue 99999999999");
        assert_eq!((info.min_bound, info.max_bound), (-1, -1));
    }

    #[test]
    fn test_vocabulary_removed_in_table_order() {
        // "chapter" goes before "chap", so nothing of the word survives
        assert_eq!(extract_chapter_bounds("chapter").title_no_digits, "");
        assert_eq!(extract_chapter_bounds("gaiden").title_no_digits, "");
    }

    #[test]
    fn test_digits_removed_before_vocabulary() {
        // "1st" can never match once digits are gone, only "st" remains
        assert_eq!(extract_chapter_bounds("1st").title_no_digits, "st");
    }

    #[test]
    fn test_case_sensitive_rules() {
        let rules = ChapterRules {
            case_sensitive: true,
            ..ChapterRules::default()
        };
        let info = extract_chapter_bounds_with("Chapter 5", &rules);
        assert_eq!(info.title_no_digits, "Chapter ");
        assert_eq!((info.min_bound, info.max_bound), (5, 5));
    }

    #[test]
    fn test_japanese_markers_and_circled_numerals() {
        let info = extract_chapter_bounds("物語 後編 ②");
        assert_eq!(info.title_no_digits, "物語  ");
    }

    #[test]
    fn test_simplify() {
        assert_eq!(simplify("Café Noir: Vol. 2!"), "cafe noir vol 2");
        assert_eq!(simplify("  The   LOST   Harbor "), "the lost harbor");
        assert_eq!(simplify("Series Vol 12-15"), "series vol 12 15");
        assert_eq!(simplify("物語 ①"), "物語 ①");
        assert_eq!(simplify("ガイド"), "ガイド");
        assert_eq!(simplify("한국어"), "한국어");
        assert_eq!(simplify(""), "");
    }

    #[test]
    fn test_overlap() {
        let range = |min, max| ChapterInfo {
            title_no_digits: String::new(),
            min_bound: min,
            max_bound: max,
        };
        assert!(range(3, 3).overlaps(&range(3, 3)));
        assert!(range(1, 5).overlaps(&range(4, 8)));
        assert!(range(4, 8).overlaps(&range(1, 5)));
        assert!(!range(3, 3).overlaps(&range(7, 7)));
        assert!(!range(1, 2).overlaps(&range(3, 4)));
    }
}
