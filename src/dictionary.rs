//! Dictionary and Tokens
//!
//! The classifier never sees raw text. Each token of an input sequence is
//! resolved against a [`Dictionary`] to an integer id, and the embedding layer
//! turns ids into vectors.
//!
//! ## Id Convention
//!
//! ```text
//! Token::Unknown   → embedding column 0   (out-of-vocabulary / padding)
//! Token::Word(id)  → embedding column id + 1
//! ```
//!
//! The embedding table therefore has `num_words() + 1` columns. Column 0 is
//! trained like any other column whenever an unknown token is seen.
//!
//! ## Example
//!
//! ```rust
//! use rnn_classifier::{Dictionary, Token, Vocabulary};
//!
//! let vocab = Vocabulary::from_corpus("the cat sat on the mat".split_whitespace(), 1);
//! assert_eq!(vocab.num_words(), 5);
//! assert_eq!(vocab.encode("the dog".split_whitespace()), vec![Token::Word(0), Token::Unknown]);
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Read-only mapping from token strings to ids in `[0, num_words())`
///
/// The embedding layer borrows a dictionary; its lifetime belongs to the
/// surrounding application.
pub trait Dictionary: Sync {
    /// Number of known words (ids are `0..num_words()`)
    fn num_words(&self) -> usize;

    /// Id of a token, or `None` when it is out of vocabulary
    fn lookup(&self, token: &str) -> Option<usize>;
}

/// One input position of a sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    /// Out-of-vocabulary sentinel
    Unknown,
    /// A dictionary id
    Word(usize),
}

impl Token {
    /// Column of the embedding table this token reads from
    pub fn column(self) -> usize {
        match self {
            Token::Unknown => 0,
            Token::Word(id) => id + 1,
        }
    }
}

/// Word-level vocabulary built from a training corpus
///
/// Ids are assigned in first-seen order, which keeps them stable for a given
/// corpus regardless of hash ordering.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Words by id
    words: Vec<String>,
    /// Maps words to their ids
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Create an empty vocabulary
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vocabulary from a token stream
    ///
    /// # Arguments
    ///
    /// * `tokens` - Corpus tokens, in corpus order
    /// * `min_count` - Words seen fewer times than this stay out of vocabulary
    pub fn from_corpus<'a, I>(tokens: I, min_count: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<&'a str, usize> = HashMap::new();
        let mut order = Vec::new();
        for token in tokens {
            let count = counts.entry(token).or_insert(0);
            if *count == 0 {
                order.push(token);
            }
            *count += 1;
        }

        let mut vocab = Self::new();
        for word in order {
            if counts[word] >= min_count {
                vocab.insert(word);
            }
        }
        vocab
    }

    /// Add a word, returning its id (existing words keep their id)
    pub fn insert(&mut self, word: &str) -> usize {
        if let Some(&id) = self.index.get(word) {
            return id;
        }
        let id = self.words.len();
        self.words.push(word.to_string());
        self.index.insert(word.to_string(), id);
        id
    }

    /// Word stored under an id
    pub fn word(&self, id: usize) -> Option<&str> {
        self.words.get(id).map(String::as_str)
    }

    /// Resolve tokens to [`Token`]s, mapping unknown words to [`Token::Unknown`]
    pub fn encode<'a, I>(&self, tokens: I) -> Vec<Token>
    where
        I: IntoIterator<Item = &'a str>,
    {
        tokens
            .into_iter()
            .map(|t| self.lookup(t).map_or(Token::Unknown, Token::Word))
            .collect()
    }

    /// Save vocabulary to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load vocabulary from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Dictionary for Vocabulary {
    fn num_words(&self) -> usize {
        self.words.len()
    }

    fn lookup(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }
}
