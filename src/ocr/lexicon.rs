//! Word lists and lemmatization
//!
//! Stopwords and a base-form dictionary are compiled in; a plain word list
//! from disk replaces the dictionary when configured. Lemmas are found by
//! suffix rules whose candidates are checked against the dictionary, plus a
//! table of irregular forms.

use std::collections::HashSet;
use std::path::Path;

use crate::error::AppError;

const STOPWORDS: &str = include_str!("stopwords.txt");
const BUILTIN_WORDS: &str = include_str!("words.txt");

const IRREGULAR_NOUNS: &[(&str, &str)] = &[
    ("children", "child"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("men", "man"),
    ("mice", "mouse"),
    ("oxen", "ox"),
    ("people", "person"),
    ("teeth", "tooth"),
    ("women", "woman"),
];

const IRREGULAR_VERBS: &[(&str, &str)] = &[
    ("ate", "eat"),
    ("became", "become"),
    ("began", "begin"),
    ("begun", "begin"),
    ("bought", "buy"),
    ("broke", "break"),
    ("broken", "break"),
    ("brought", "bring"),
    ("built", "build"),
    ("came", "come"),
    ("caught", "catch"),
    ("chose", "choose"),
    ("chosen", "choose"),
    ("done", "do"),
    ("drew", "draw"),
    ("drawn", "draw"),
    ("driven", "drive"),
    ("drove", "drive"),
    ("eaten", "eat"),
    ("fell", "fall"),
    ("fallen", "fall"),
    ("felt", "feel"),
    ("flew", "fly"),
    ("flown", "fly"),
    ("fought", "fight"),
    ("forgot", "forget"),
    ("forgotten", "forget"),
    ("found", "find"),
    ("gave", "give"),
    ("given", "give"),
    ("gone", "go"),
    ("got", "get"),
    ("gotten", "get"),
    ("grew", "grow"),
    ("grown", "grow"),
    ("heard", "hear"),
    ("held", "hold"),
    ("hidden", "hide"),
    ("kept", "keep"),
    ("knew", "know"),
    ("known", "know"),
    ("led", "lead"),
    ("left", "leave"),
    ("lost", "lose"),
    ("made", "make"),
    ("meant", "mean"),
    ("met", "meet"),
    ("paid", "pay"),
    ("ran", "run"),
    ("risen", "rise"),
    ("rose", "rise"),
    ("said", "say"),
    ("sat", "sit"),
    ("saw", "see"),
    ("seen", "see"),
    ("sent", "send"),
    ("slept", "sleep"),
    ("sold", "sell"),
    ("sought", "seek"),
    ("spent", "spend"),
    ("spoke", "speak"),
    ("spoken", "speak"),
    ("stood", "stand"),
    ("taken", "take"),
    ("taught", "teach"),
    ("thought", "think"),
    ("threw", "throw"),
    ("thrown", "throw"),
    ("told", "tell"),
    ("took", "take"),
    ("understood", "understand"),
    ("went", "go"),
    ("wore", "wear"),
    ("worn", "wear"),
    ("wrote", "write"),
    ("written", "write"),
];

/// (suffix, replacement), tried in order
const NOUN_RULES: &[(&str, &str)] = &[
    ("ies", "y"),
    ("ves", "f"),
    ("ves", "fe"),
    ("ses", "s"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("s", ""),
];

const VERB_RULES: &[(&str, &str)] = &[
    ("ies", "y"),
    ("es", "e"),
    ("es", ""),
    ("ed", ""),
    ("ed", "e"),
    ("ing", ""),
    ("ing", "e"),
    ("s", ""),
];

/// Dictionary, stopwords and lemmatizer
#[derive(Debug, Clone)]
pub struct Lexicon {
    dictionary: HashSet<String>,
    stopwords: HashSet<String>,
}

impl Lexicon {
    /// Load the configured word list, or the built-in one
    ///
    /// # Errors
    /// Returns `Config` if the file cannot be read or holds no words
    pub fn load(dictionary_path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = dictionary_path else {
            let lexicon = Self::builtin();
            tracing::info!(words = lexicon.dictionary_len(), "Built-in dictionary loaded");
            return Ok(lexicon);
        };

        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("failed to read dictionary {}: {}", path.display(), e))
        })?;
        let lexicon = Self::with_dictionary(contents.lines());
        if lexicon.dictionary_len() == 0 {
            return Err(AppError::Config(format!(
                "dictionary {} holds no words",
                path.display()
            )));
        }
        tracing::info!(
            path = %path.display(),
            words = lexicon.dictionary_len(),
            "Dictionary loaded"
        );
        Ok(lexicon)
    }

    pub fn builtin() -> Self {
        Self::with_dictionary(BUILTIN_WORDS.lines())
    }

    pub fn with_dictionary<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            dictionary: word_set(words),
            stopwords: word_set(STOPWORDS.lines()),
        }
    }

    pub fn dictionary_len(&self) -> usize {
        self.dictionary.len()
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    pub fn is_known(&self, word: &str) -> bool {
        self.dictionary.contains(word)
    }

    /// Noun lemma if it differs from the word, else the verb lemma
    pub fn lemma(&self, word: &str) -> String {
        let noun = self.noun_lemma(word);
        if noun != word {
            noun
        } else {
            self.verb_lemma(word)
        }
    }

    pub fn noun_lemma(&self, word: &str) -> String {
        self.lemmatize(word, IRREGULAR_NOUNS, NOUN_RULES, false)
    }

    pub fn verb_lemma(&self, word: &str) -> String {
        self.lemmatize(word, IRREGULAR_VERBS, VERB_RULES, true)
    }

    fn lemmatize(
        &self,
        word: &str,
        irregular: &[(&str, &str)],
        rules: &[(&str, &str)],
        undouble: bool,
    ) -> String {
        if let Some((_, base)) = irregular.iter().find(|(form, _)| *form == word) {
            return (*base).to_string();
        }

        for (suffix, replacement) in rules {
            let Some(stem) = word.strip_suffix(suffix) else {
                continue;
            };
            if stem.is_empty() {
                continue;
            }
            let candidate = format!("{stem}{replacement}");
            if self.is_base_form(&candidate) {
                return candidate;
            }
            // running -> run, stopped -> stop
            if undouble && replacement.is_empty() && (*suffix == "ing" || *suffix == "ed") {
                if let Some(single) = undoubled(stem) {
                    if self.is_base_form(single) {
                        return single.to_string();
                    }
                }
            }
        }
        word.to_string()
    }

    /// Rule candidates must be dictionary words
    fn is_base_form(&self, candidate: &str) -> bool {
        candidate.len() > 1 && !self.is_stopword(candidate) && self.is_known(candidate)
    }
}

fn word_set<'a>(words: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    words
        .into_iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty() && !w.starts_with('#'))
        .collect()
}

/// "runn" -> "run"
fn undoubled(stem: &str) -> Option<&str> {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    (n >= 3 && bytes[n - 1] == bytes[n - 2] && !b"aeiou".contains(&bytes[n - 1]))
        .then(|| &stem[..n - 1])
}
