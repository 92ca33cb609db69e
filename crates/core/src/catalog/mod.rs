use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    seed::{SeedKey, SeedPurpose},
    FeedError, Result,
};

/// Explicit clip boundaries, in seconds, into a recording's full track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipOffsets {
    pub start: f64,
    pub end: f64,
}

/// A short curated highlight drawn from a recording's full track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub recording_id: String,
    /// Reference to the standalone clip audio.
    pub audio: String,
    pub summary: String,
    #[serde(default)]
    pub themes: BTreeSet<String>,
    /// When absent the planner derives the window from the snippet's seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsets: Option<ClipOffsets>,
}

/// One speaker's full testimony: ordered snippets plus the full track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub speaker_id: String,
    pub speaker_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Authored full track length in seconds, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Display order is the order of this list.
    #[serde(default)]
    pub snippets: Vec<Snippet>,
    pub full_track: String,
}

impl Recording {
    pub fn snippet_count(&self) -> usize {
        self.snippets.len()
    }

    pub fn last_snippet_index(&self) -> Option<usize> {
        self.snippets.len().checked_sub(1)
    }

    fn validate(&self) -> Result<()> {
        for snippet in &self.snippets {
            if snippet.recording_id != self.id {
                return Err(FeedError::msg(format!(
                    "snippet `{}` claims recording `{}` but is listed under `{}`",
                    snippet.id, snippet.recording_id, self.id
                )));
            }
            if let Some(offsets) = snippet.offsets {
                if !(offsets.start >= 0.0 && offsets.start < offsets.end) {
                    return Err(FeedError::msg(format!(
                        "snippet `{}` has invalid offsets {}..{}",
                        snippet.id, offsets.start, offsets.end
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Ordered, read-only list of recordings backing one feed session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    recordings: Vec<Recording>,
}

impl Catalog {
    pub fn new(recordings: Vec<Recording>) -> Result<Self> {
        for recording in &recordings {
            recording.validate()?;
        }
        Ok(Self { recordings })
    }

    /// Parses a JSON array of recordings.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let recordings: Vec<Recording> = serde_json::from_str(raw)?;
        Self::new(recordings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.recordings)?)
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Recording> {
        self.recordings.get(index)
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    pub fn position(&self, id: &str) -> Result<usize> {
        self.recordings
            .iter()
            .position(|recording| recording.id == id)
            .ok_or_else(|| FeedError::UnknownRecording(id.to_string()))
    }

    /// Appends recordings to the end of the feed. Existing indices are kept.
    pub fn extend(&mut self, recordings: Vec<Recording>) -> Result<()> {
        for recording in &recordings {
            recording.validate()?;
        }
        self.recordings.extend(recordings);
        Ok(())
    }

    /// Fabricates a deterministic demo dataset. The same `seed` and `count`
    /// always produce the same catalog.
    pub fn sample(seed: &str, count: usize) -> Self {
        let recordings = (0..count)
            .map(|index| sample_recording(seed, index))
            .collect();
        Self { recordings }
    }
}

const SAMPLE_NAMES: &[&str] = &[
    "Amara", "Benedikt", "Chiara", "Dmitri", "Esther", "Farid", "Grace", "Hiro", "Ines",
    "Jonah", "Keziah", "Lorenzo",
];
const SAMPLE_RELATIONSHIPS: &[&str] = &[
    "daughter", "neighbour", "grandson", "colleague", "old friend", "sister",
];
const SAMPLE_TOPICS: &[&str] = &[
    "the year the river flooded",
    "leaving home",
    "the first shop on the corner",
    "learning a trade",
    "the night the lights went out",
];
const SAMPLE_THEMES: &[&str] = &[
    "family", "work", "migration", "loss", "humour", "community", "resilience", "faith",
];
const SAMPLE_SUMMARIES: &[&str] = &[
    "We carried everything we owned up the stairs, one box at a time.",
    "Nobody told us how long it would take, so we simply kept going.",
    "My father laughed when he saw it, and then we all laughed with him.",
    "The street was silent except for the radio in the baker's window.",
    "I remember the smell of the bread more than anything else.",
    "She said the door would always be open, and it always was.",
];

fn sample_recording(seed: &str, index: usize) -> Recording {
    let ordinal = index.to_string();
    let mut stream = SeedKey::new([seed, ordinal.as_str()], SeedPurpose::Sample).stream();

    let id = format!("rec-{}", index + 1);
    let speaker_name = stream.pick(SAMPLE_NAMES).copied().unwrap_or("Speaker");
    let relationship = if stream.chance(0.7) {
        stream.pick(SAMPLE_RELATIONSHIPS).map(|r| r.to_string())
    } else {
        None
    };
    let topic = stream.pick(SAMPLE_TOPICS).map(|t| t.to_string());
    let duration_secs = if stream.chance(0.5) {
        Some(stream.range(600.0, 1200.0).round())
    } else {
        None
    };
    let snippet_count = stream.int_range(2, 5) as usize;

    let snippets = (0..snippet_count)
        .map(|n| {
            let snippet_id = format!("sn-{}", n + 1);
            let theme_count = stream.int_range(1, 3);
            let themes = (0..theme_count)
                .filter_map(|_| stream.pick(SAMPLE_THEMES).map(|t| t.to_string()))
                .collect();
            Snippet {
                audio: format!("audio/{id}/{snippet_id}.mp3"),
                summary: stream
                    .pick(SAMPLE_SUMMARIES)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
                id: snippet_id,
                recording_id: id.clone(),
                themes,
                offsets: None,
            }
        })
        .collect();

    Recording {
        full_track: format!("audio/{id}/full.mp3"),
        speaker_id: format!("speaker-{}", index + 1),
        speaker_name: speaker_name.to_string(),
        relationship,
        topic,
        duration_secs,
        snippets,
        id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_JSON: &str = r#"[
        {
            "id": "rec-1",
            "speaker_id": "sp-1",
            "speaker_name": "Amara",
            "relationship": "daughter",
            "duration_secs": 900,
            "full_track": "audio/rec-1/full.mp3",
            "snippets": [
                { "id": "sn-1", "recording_id": "rec-1", "audio": "a.mp3", "summary": "One",
                  "themes": ["family"], "offsets": { "start": 12.0, "end": 48.0 } },
                { "id": "sn-2", "recording_id": "rec-1", "audio": "b.mp3", "summary": "Two" }
            ]
        }
    ]"#;

    #[test]
    fn parses_catalog_json() {
        let catalog = Catalog::from_json_str(CATALOG_JSON).expect("catalog should parse");
        assert_eq!(catalog.len(), 1);
        let recording = catalog.get(0).unwrap();
        assert_eq!(recording.snippet_count(), 2);
        assert_eq!(recording.last_snippet_index(), Some(1));
        assert!(recording.snippets[1].offsets.is_none());
        assert_eq!(catalog.position("rec-1").unwrap(), 0);
        assert!(matches!(
            catalog.position("missing"),
            Err(FeedError::UnknownRecording(_))
        ));
    }

    #[test]
    fn rejects_inverted_offsets() {
        let raw = CATALOG_JSON.replace("\"end\": 48.0", "\"end\": 2.0");
        let err = Catalog::from_json_str(&raw).unwrap_err();
        assert!(format!("{err}").contains("sn-1"));
    }

    #[test]
    fn sample_catalog_is_reproducible() {
        let a = Catalog::sample("demo", 4);
        let b = Catalog::sample("demo", 4);
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
        assert_ne!(a, Catalog::sample("other", 4));

        for recording in a.recordings() {
            assert!((2..=5).contains(&recording.snippet_count()));
            assert!(recording
                .snippets
                .iter()
                .all(|s| s.recording_id == recording.id));
        }
    }

    #[test]
    fn sample_catalog_round_trips_through_json() {
        let catalog = Catalog::sample("demo", 2);
        let json = catalog.to_json_pretty().unwrap();
        assert_eq!(Catalog::from_json_str(&json).unwrap(), catalog);
    }
}
