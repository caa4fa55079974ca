use serde::{Deserialize, Serialize};

/// Normalized string similarity in `[0, 1]`.
///
/// Implementations must be symmetric and return `1.0` for equal strings.
pub trait TextSimilarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

impl<F> TextSimilarity for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn similarity(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// `strsim`-backed comparators selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextComparator {
    #[default]
    Levenshtein,
    JaroWinkler,
    SorensenDice,
}

impl TextSimilarity for TextComparator {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        let score = match self {
            TextComparator::Levenshtein => strsim::normalized_levenshtein(a, b),
            // jaro_winkler only rewards the prefix of its first argument; order
            // the inputs so the result stays symmetric
            TextComparator::JaroWinkler => {
                if a <= b {
                    strsim::jaro_winkler(a, b)
                } else {
                    strsim::jaro_winkler(b, a)
                }
            }
            TextComparator::SorensenDice => strsim::sorensen_dice(a, b),
        };
        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TextComparator; 3] = [
        TextComparator::Levenshtein,
        TextComparator::JaroWinkler,
        TextComparator::SorensenDice,
    ];

    #[test]
    fn test_identical_strings_score_one() {
        for comparator in ALL {
            assert_eq!(comparator.similarity("series chapter", "series chapter"), 1.0);
            assert_eq!(comparator.similarity("", ""), 1.0);
        }
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("the lost harbor", "lost harbor the"),
            ("abc", "abd"),
            ("series chapter 3", "series chapter 7"),
        ];
        for comparator in ALL {
            for (a, b) in pairs {
                assert_eq!(comparator.similarity(a, b), comparator.similarity(b, a));
            }
        }
    }

    #[test]
    fn test_range_and_ordering() {
        for comparator in ALL {
            let close = comparator.similarity("series chapter 3", "series chapter 7");
            let far = comparator.similarity("series chapter 3", "unrelated words");
            assert!((0.0..=1.0).contains(&close));
            assert!((0.0..=1.0).contains(&far));
            assert!(close > far);
        }
    }

    #[test]
    fn test_closure_comparator() {
        let exact = |a: &str, b: &str| if a == b { 1.0 } else { 0.0 };
        assert_eq!(exact.similarity("x", "x"), 1.0);
        assert_eq!(exact.similarity("x", "y"), 0.0);
    }

    #[test]
    fn test_config_names() {
        let parsed: TextComparator = serde_json::from_str("\"jaro_winkler\"").unwrap();
        assert_eq!(parsed, TextComparator::JaroWinkler);
        assert_eq!(TextComparator::default(), TextComparator::Levenshtein);
    }
}
