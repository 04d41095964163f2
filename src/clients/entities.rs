/// A track as read from the source catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub title: String,
    pub artists: Vec<String>, // never empty, the source adapter drops artist-less items
    pub album: String,
    pub duration_ms: u64,
    pub isrc: Option<String>,
    pub source_id: Option<String>, // local files carry no catalog id
}

impl TrackDescriptor {
    /// Human readable "Artist - Title" label used in logs and reports
    pub fn label(&self) -> String {
        let artist = self.artists.first().map_or("Unknown", String::as_str);
        format!("{artist} - {}", self.title)
    }
}

/// A source playlist with its full, ordered track list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDescriptor {
    pub name: String,
    pub description: String,
    pub tracks: Vec<TrackDescriptor>,
    pub total_tracks: usize,
    pub skipped_items: usize,
}

/// A destination catalog track returned by a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
}

/// Reference to a playlist created in the destination catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistHandle {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_uses_first_artist() {
        let track = TrackDescriptor {
            title: "One More Time".into(),
            artists: vec!["Daft Punk".into(), "Romanthony".into()],
            album: "Discovery".into(),
            duration_ms: 320_000,
            isrc: None,
            source_id: None,
        };
        assert_eq!(track.label(), "Daft Punk - One More Time");
    }
}
