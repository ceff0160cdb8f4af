//! Flesch readability scoring.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Score reported when the text has no words or no sentences.
pub const READABILITY_SENTINEL: f64 = 0.0;

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| {
        Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}]+)*").expect("word pattern is valid")
    })
}

fn sentence_break_regex() -> &'static Regex {
    static BREAK: OnceLock<Regex> = OnceLock::new();
    BREAK.get_or_init(|| Regex::new(r"[.!?]+").expect("sentence pattern is valid"))
}

fn vowel_group_regex() -> &'static Regex {
    static VOWELS: OnceLock<Regex> = OnceLock::new();
    VOWELS.get_or_init(|| Regex::new(r"[aeiouy]+").expect("vowel pattern is valid"))
}

/// Interpretation band of a Flesch Reading Ease score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadabilityBand {
    VeryEasy,
    Easy,
    FairlyEasy,
    Standard,
    FairlyDifficult,
    Difficult,
    VeryDifficult,
}

impl ReadabilityBand {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => ReadabilityBand::VeryEasy,
            s if s >= 80.0 => ReadabilityBand::Easy,
            s if s >= 70.0 => ReadabilityBand::FairlyEasy,
            s if s >= 60.0 => ReadabilityBand::Standard,
            s if s >= 50.0 => ReadabilityBand::FairlyDifficult,
            s if s >= 30.0 => ReadabilityBand::Difficult,
            _ => ReadabilityBand::VeryDifficult,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReadabilityBand::VeryEasy => "Very Easy (5th grade)",
            ReadabilityBand::Easy => "Easy (6th grade)",
            ReadabilityBand::FairlyEasy => "Fairly Easy (7th grade)",
            ReadabilityBand::Standard => "Standard (8th-9th grade)",
            ReadabilityBand::FairlyDifficult => "Fairly Difficult (10th-12th grade)",
            ReadabilityBand::Difficult => "Difficult (College)",
            ReadabilityBand::VeryDifficult => "Very Difficult (College graduate)",
        }
    }
}

/// Readability metrics for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readability {
    pub word_count: usize,
    pub sentence_count: usize,
    pub syllable_count: usize,
    pub flesch_reading_ease: f64,
    pub flesch_kincaid_grade: f64,
    pub band: ReadabilityBand,
}

/// Syllables in one word: vowel groups, minus a silent final "e", never below one.
pub fn count_syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let mut count = vowel_group_regex().find_iter(&lower).count();
    if count > 1 && lower.ends_with('e') && !lower.ends_with("le") && !lower.ends_with("ee") {
        count -= 1;
    }
    count.max(1)
}

fn count_sentences(text: &str) -> usize {
    sentence_break_regex()
        .split(text)
        .filter(|segment| word_regex().is_match(segment))
        .count()
}

/// Compute every readability metric for `text`.
pub fn readability(text: &str) -> Readability {
    let words: Vec<&str> = word_regex().find_iter(text).map(|m| m.as_str()).collect();
    let word_count = words.len();
    let sentence_count = count_sentences(text);
    let syllable_count: usize = words.iter().map(|w| count_syllables(w)).sum();

    let (flesch_reading_ease, flesch_kincaid_grade) = if word_count == 0 || sentence_count == 0 {
        (READABILITY_SENTINEL, READABILITY_SENTINEL)
    } else {
        let words_per_sentence = word_count as f64 / sentence_count as f64;
        let syllables_per_word = syllable_count as f64 / word_count as f64;
        (
            206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word,
            0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59,
        )
    };

    Readability {
        word_count,
        sentence_count,
        syllable_count,
        flesch_reading_ease,
        flesch_kincaid_grade,
        band: ReadabilityBand::from_score(flesch_reading_ease),
    }
}

/// Flesch Reading Ease of `text`. Unclamped; [`READABILITY_SENTINEL`] for empty text.
pub fn readability_score(text: &str) -> f64 {
    readability(text).flesch_reading_ease
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_returns_sentinel() {
        let score = readability_score("");
        assert_eq!(score, READABILITY_SENTINEL);
        assert!(score.is_finite());
    }

    #[test]
    fn test_punctuation_only_returns_sentinel() {
        assert_eq!(readability_score("?!... --"), READABILITY_SENTINEL);
    }

    #[test]
    fn test_deterministic() {
        let text = "Exercise improves mood. It also strengthens the heart!";
        assert_eq!(readability_score(text), readability_score(text));
    }

    #[test]
    fn test_simple_sentence_formula() {
        // 4 words, 1 sentence, 4 syllables
        let r = readability("The cat sat down.");
        assert_eq!(r.word_count, 4);
        assert_eq!(r.sentence_count, 1);
        assert_eq!(r.syllable_count, 4);
        let expected = 206.835 - 1.015 * 4.0 - 84.6 * 1.0;
        assert!((r.flesch_reading_ease - expected).abs() < 1e-9);
        assert_eq!(r.band, ReadabilityBand::VeryEasy);
    }

    #[test]
    fn test_text_without_terminator_is_one_sentence() {
        assert_eq!(readability("no full stop here").sentence_count, 1);
        assert_eq!(readability("One. Two").sentence_count, 2);
        assert_eq!(readability("Wait... what?!").sentence_count, 2);
    }

    #[test]
    fn test_syllables_never_zero() {
        assert_eq!(count_syllables("rhythm"), 1);
        assert_eq!(count_syllables("hmm"), 1);
        assert_eq!(count_syllables("2024"), 1);
        assert_eq!(count_syllables("psst"), 1);
    }

    #[test]
    fn test_syllable_heuristic() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("water"), 2);
        assert_eq!(count_syllables("cardiovascular"), 5);
    }

    #[test]
    fn test_complex_text_scores_lower() {
        let simple = "Walk every day. It is good for you. You will feel fine.";
        let complex = "Cardiovascular conditioning substantially ameliorates physiological \
                       resilience, particularly regarding metabolic regulation.";
        assert!(readability_score(simple) > readability_score(complex));
    }

    #[test]
    fn test_score_is_not_clamped() {
        let score = readability_score(
            "Incomprehensibility characterizes institutionalized bureaucratization.",
        );
        assert!(score < 0.0);
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(ReadabilityBand::from_score(90.0), ReadabilityBand::VeryEasy);
        assert_eq!(ReadabilityBand::from_score(89.99), ReadabilityBand::Easy);
        assert_eq!(ReadabilityBand::from_score(60.0), ReadabilityBand::Standard);
        assert_eq!(ReadabilityBand::from_score(30.0), ReadabilityBand::Difficult);
        assert_eq!(ReadabilityBand::from_score(-20.0), ReadabilityBand::VeryDifficult);
    }
}
