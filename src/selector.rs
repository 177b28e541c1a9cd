use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};

use crate::corpus::Corpus;

/// Characters of story text shown on a slot label
pub const DEFAULT_PREVIEW_CHARS: usize = 14;

/// A story drawn for this round, with its short label text
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedStory {
    pub index: usize,
    pub emotion: String,
    pub preview: String,
}

/// Draws distinct story indices for a round
pub struct StorySelector<R: Rng = StdRng> {
    corpus_size: usize,
    rng: R,
}

impl StorySelector<StdRng> {
    pub fn new(corpus_size: usize) -> Self {
        Self::with_rng(corpus_size, StdRng::from_entropy())
    }

    pub fn seeded(corpus_size: usize, seed: u64) -> Self {
        Self::with_rng(corpus_size, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> StorySelector<R> {
    pub fn with_rng(corpus_size: usize, rng: R) -> Self {
        Self { corpus_size, rng }
    }

    pub fn corpus_size(&self) -> usize {
        self.corpus_size
    }

    /// `n` distinct indices in `[0, corpus_size)`, in random order.
    /// Asking for more than the corpus holds returns all of it, shuffled.
    pub fn sample(&mut self, n: usize) -> Vec<usize> {
        let amount = n.min(self.corpus_size);
        let mut picked = index::sample(&mut self.rng, self.corpus_size, amount).into_vec();
        picked.shuffle(&mut self.rng);
        picked
    }

    /// Samples `n` stories and prepares their slot labels
    pub fn pick(&mut self, corpus: &Corpus, n: usize, preview_chars: usize) -> Vec<SelectedStory> {
        self.sample(n)
            .into_iter()
            .filter_map(|index| {
                corpus.get(index).map(|note| SelectedStory {
                    index,
                    emotion: note.emotion.clone(),
                    preview: preview(&note.content, preview_chars),
                })
            })
            .collect()
    }
}

/// First `chars` characters of `content`, with an ellipsis when cut
pub fn preview(content: &str, chars: usize) -> String {
    let content = content.trim();
    let mut cut = content.chars();
    let head: String = cut.by_ref().take(chars).collect();
    if cut.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
