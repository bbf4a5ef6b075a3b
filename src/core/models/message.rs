//! Synthesis progress of the message currently being spoken on a stream.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress of one synthesis message.
///
/// Every `push_text` call queues one play unit. Played text is fed from the
/// vendor's character alignment; a unit counts as played once the alignment has
/// covered all of its characters. Only alphanumeric characters are compared
/// because vendors normalize whitespace and punctuation in alignment data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub streaming_id: Uuid,

    pub total_text: String,
    pub played_text: String,

    pub total_count: u32,
    pub played_count: u32,

    pub finished: bool,

    /// Per queued unit: cumulative spoken length and byte offset in `total_text` at its end.
    #[serde(skip)]
    boundaries: Vec<(usize, usize)>,
}

fn spoken_len(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

impl Message {
    pub fn new(streaming_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            streaming_id,
            ..Default::default()
        }
    }

    /// Queues a unit of text.
    pub fn push_text(&mut self, text: &str) {
        self.total_text.push_str(text);
        self.total_count += 1;
        self.boundaries
            .push((spoken_len(&self.total_text), self.total_text.len()));
    }

    /// Records characters the vendor reported as rendered.
    ///
    /// Returns how many units completed because of this update.
    pub fn advance(&mut self, chars: &str) -> u32 {
        self.played_text.push_str(chars);
        let played = spoken_len(&self.played_text);

        let before = self.played_count;
        self.played_count = self
            .boundaries
            .iter()
            .filter(|(spoken, _)| *spoken <= played)
            .count() as u32;
        self.played_count.saturating_sub(before)
    }

    /// Drops every unit that has not been played yet, including alignment
    /// already received for a partially played unit.
    pub fn discard_pending(&mut self) {
        self.boundaries.truncate(self.played_count as usize);
        let end = self.boundaries.last().map_or(0, |(_, end)| *end);
        self.total_text.truncate(end);
        self.total_count = self.played_count;
        self.played_text = self.total_text.clone();
    }

    pub fn has_pending(&self) -> bool {
        self.played_count < self.total_count
    }

    /// True once the caller declared the end of input and everything queued was played.
    pub fn is_complete(&self) -> bool {
        self.finished && !self.has_pending()
    }
}
