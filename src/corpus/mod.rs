use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use serde_json::from_str;

use crate::error::CorpusError;
use crate::map_feed::GeoPoint;

static CORPUS_DIR: Dir = include_dir!("src/corpus");

pub const BUNDLED_FILE: &str = "stories.json";

/// One pre-seeded story note. Read-only.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct StoryNote {
    pub date: String,
    pub weekday: String,
    pub author: String,
    pub location: String,
    pub label: String,
    pub emotion: String,
    pub content: String,
    /// `[lng, lat]`
    pub coordinates: [f64; 2],
}

impl StoryNote {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.coordinates[0], self.coordinates[1])
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Corpus {
    pub name: String,
    pub stories: Vec<StoryNote>,
}

impl Corpus {
    /// The stories shipped inside the binary
    pub fn bundled() -> Result<Self, CorpusError> {
        read_corpus_from_file(BUNDLED_FILE)
    }

    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        Ok(from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StoryNote> {
        self.stories.get(index)
    }

    /// Detail-view lookup: unknown indices show the first story
    pub fn get_or_first(&self, index: usize) -> Option<&StoryNote> {
        self.get(index).or_else(|| self.stories.first())
    }

    pub fn points(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        self.stories.iter().map(StoryNote::point)
    }
}

fn read_corpus_from_file(file_name: &str) -> Result<Corpus, CorpusError> {
    let file = CORPUS_DIR
        .get_file(file_name)
        .ok_or_else(|| CorpusError::Missing(file_name.to_string()))?;

    let file_as_str = file
        .contents_utf8()
        .ok_or_else(|| CorpusError::NotUtf8(file_name.to_string()))?;

    Corpus::from_json(file_as_str)
}
