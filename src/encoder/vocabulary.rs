use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Index reserved for categorical values never seen during training.
pub const UNSEEN_INDEX: usize = 0;

/// Stable value-to-index mapping for one categorical field.
///
/// Values are stored sorted, so fitting the same corpus twice reproduces the
/// same assignment regardless of row order. Value `values[i]` maps to `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    pub field: String,
    pub values: Vec<String>,
}

impl CategoryVocabulary {
    /// Build the vocabulary from every value observed in the training set.
    pub fn fit<'a, I>(field: &str, observed: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let values: BTreeSet<&str> = observed.into_iter().collect();
        Self {
            field: field.to_string(),
            values: values.into_iter().map(str::to_string).collect(),
        }
    }

    /// Index of `value`, or [`UNSEEN_INDEX`] when it was not in the training set.
    pub fn index_of(&self, value: &str) -> usize {
        match self.values.binary_search_by(|known| known.as_str().cmp(value)) {
            Ok(pos) => pos + 1,
            Err(_) => UNSEEN_INDEX,
        }
    }

    /// Reverse lookup; `None` for the unseen slot or an out-of-range index.
    pub fn value_at(&self, index: usize) -> Option<&str> {
        if index == UNSEEN_INDEX {
            return None;
        }
        self.values.get(index - 1).map(String::as_str)
    }

    /// One-hot width including the reserved unseen slot.
    pub fn width(&self) -> usize {
        self.values.len() + 1
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sorted and duplicate-free, as `index_of` relies on binary search.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.values.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(format!(
                "Vocabulary for {} is not sorted and unique",
                self.field
            ));
        }
        Ok(())
    }

    pub(crate) fn column_names(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(format!("{}=<unseen>", self.field))
            .chain(self.values.iter().map(|value| format!("{}={value}", self.field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_lexicographic_and_order_independent() {
        let a = CategoryVocabulary::fit("industry", ["IT", "Healthcare", "IT", "Fintech"]);
        let b = CategoryVocabulary::fit("industry", ["Fintech", "IT", "Healthcare"]);
        assert_eq!(a, b);
        assert_eq!(a.index_of("Fintech"), 1);
        assert_eq!(a.index_of("Healthcare"), 2);
        assert_eq!(a.index_of("IT"), 3);
        assert_eq!(a.width(), 4);
    }

    #[test]
    fn unknown_values_use_reserved_slot() {
        let vocab = CategoryVocabulary::fit("industry", ["IT", "Healthcare"]);
        assert_eq!(vocab.index_of("Space"), UNSEEN_INDEX);
        assert_eq!(vocab.value_at(UNSEEN_INDEX), None);
        assert_eq!(vocab.value_at(2), Some("IT"));
        assert_eq!(vocab.value_at(9), None);
    }

    #[test]
    fn unsorted_vocabulary_is_rejected() {
        let vocab = CategoryVocabulary {
            field: "country".into(),
            values: vec!["USA".into(), "India".into()],
        };
        assert!(vocab.validate().is_err());
    }
}
