pub mod matcher;
pub mod merge;
pub mod refine;


/// Opaque identifier of an n-gram type.
pub type NgramId = u32;

/// One occurrence of an n-gram in a document.
///
/// `index` is the ordinal position in the tokenized document and is the only
/// field used for ordering; the byte fields locate the n-gram in the original
/// text file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NgramPos {
    pub index: u32,
    pub start_byte: u32,
    pub end_byte: u32,
}

/// A contiguous byte range in an original text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_byte: u32,
    pub end_byte: u32,
}

/// A pair of byte ranges supported by a dense cluster of shared n-grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub source: Span,
    pub target: Span,
}

/// One (source occurrence, target occurrence) combination of a shared n-gram.
#[derive(Debug, Clone, Copy)]
pub struct NgramMatch {
    pub source: NgramPos,
    pub target: NgramPos,
    pub ngram: NgramId,
}

#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub matching_window_size: u32,
    pub max_gap: u32,
    pub minimum_matching_ngrams: u32,
    pub minimum_matching_ngrams_in_window: u32,
    pub common_ngrams_limit: f32,
    pub minimum_matching_ngrams_in_docs: usize,
    pub context_size: u32,
    pub banal_ngrams: usize,
    pub merge_on_byte_distance: bool,
    pub passage_distance_multiplier: f32,
    pub two_way_matching: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            matching_window_size: 20,
            max_gap: 10,
            minimum_matching_ngrams: 4,
            minimum_matching_ngrams_in_window: 4,
            common_ngrams_limit: 0.75,
            minimum_matching_ngrams_in_docs: 4,
            context_size: 300,
            banal_ngrams: 25,
            merge_on_byte_distance: true,
            passage_distance_multiplier: 0.05,
            two_way_matching: false,
        }
    }
}
