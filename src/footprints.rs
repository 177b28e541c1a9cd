//! The reader's collection of stories they have unlocked this run.
//! Lives in memory only.

use chrono::{DateTime, Local};
use itertools::Itertools;
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::corpus::{Corpus, StoryNote};
use crate::map_feed::GeoPoint;

#[derive(Clone, Debug, PartialEq)]
pub struct Footprint {
    pub story_index: usize,
    pub unlocked_at: DateTime<Local>,
}

impl Footprint {
    /// "5 minutes ago", relative to `now`
    pub fn unlocked_ago(&self, now: DateTime<Local>) -> String {
        let secs = (now - self.unlocked_at).num_seconds().max(0);
        HumanTime::from_seconds(secs).to_text_en(Accuracy::Rough, Tense::Past)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Footprints {
    entries: Vec<Footprint>,
}

impl Footprints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a story; unlocking the same story twice keeps the first time
    pub fn record(&mut self, story_index: usize, at: DateTime<Local>) -> bool {
        if self.contains(story_index) {
            return false;
        }
        self.entries.push(Footprint {
            story_index,
            unlocked_at: at,
        });
        true
    }

    pub fn contains(&self, story_index: usize) -> bool {
        self.entries.iter().any(|f| f.story_index == story_index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Footprint> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Footprint> {
        self.entries.last()
    }

    pub fn notes<'c>(
        &'c self,
        corpus: &'c Corpus,
    ) -> impl Iterator<Item = (&'c Footprint, &'c StoryNote)> {
        self.entries
            .iter()
            .filter_map(|f| corpus.get(f.story_index).map(|note| (f, note)))
    }

    /// Unlocked stories per emotion tag, most frequent first
    pub fn emotion_tally(&self, corpus: &Corpus) -> Vec<(String, usize)> {
        self.notes(corpus)
            .map(|(_, note)| note.emotion.clone())
            .counts()
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
            .collect()
    }

    pub fn map_points(&self, corpus: &Corpus) -> Vec<GeoPoint> {
        self.notes(corpus).map(|(_, note)| note.point()).collect()
    }

    pub fn summary(&self) -> String {
        match self.len() {
            0 => "No stories collected yet".to_string(),
            1 => "You have collected 1 story".to_string(),
            n => format!("You have collected {n} stories"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn corpus() -> Corpus {
        Corpus::bundled().unwrap()
    }

    #[test]
    fn record_deduplicates_by_story() {
        let mut footprints = Footprints::new();
        let t0 = Local::now();
        assert!(footprints.record(3, t0));
        assert!(!footprints.record(3, t0 + Duration::minutes(5)));
        assert!(footprints.record(1, t0 + Duration::minutes(6)));

        assert_eq!(footprints.len(), 2);
        assert_eq!(footprints.iter().next().unwrap().unlocked_at, t0);
        assert_eq!(footprints.latest().unwrap().story_index, 1);
    }

    #[test]
    fn summary_counts_stories() {
        let mut footprints = Footprints::new();
        assert_eq!(footprints.summary(), "No stories collected yet");
        footprints.record(0, Local::now());
        assert_eq!(footprints.summary(), "You have collected 1 story");
        footprints.record(4, Local::now());
        assert_eq!(footprints.summary(), "You have collected 2 stories");
    }

    #[test]
    fn emotion_tally_orders_by_frequency() {
        let corpus = corpus();
        let mut footprints = Footprints::new();
        // Stories 1 and 2 share an emotion, story 0 has another
        for i in [0, 1, 2] {
            footprints.record(i, Local::now());
        }
        let tally = footprints.emotion_tally(&corpus);
        assert_eq!(tally[0], (corpus.get(1).unwrap().emotion.clone(), 2));
        assert_eq!(tally[1], (corpus.get(0).unwrap().emotion.clone(), 1));
    }

    #[test]
    fn map_points_follow_unlock_order() {
        let corpus = corpus();
        let mut footprints = Footprints::new();
        footprints.record(5, Local::now());
        footprints.record(2, Local::now());
        footprints.record(999, Local::now());

        assert_eq!(
            footprints.map_points(&corpus),
            vec![corpus.get(5).unwrap().point(), corpus.get(2).unwrap().point()]
        );
    }

    #[test]
    fn unlocked_ago_is_in_the_past() {
        let now = Local::now();
        let print = Footprint {
            story_index: 0,
            unlocked_at: now - Duration::hours(2),
        };
        assert!(print.unlocked_ago(now).ends_with("ago"));
    }
}
