//! Resolution of a source track to its counterpart in the destination catalog.

use log::{debug, warn};

use crate::clients::{
    catalog::DestinationCatalog,
    entities::{MatchCandidate, TrackDescriptor},
};

/// Result limit for ISRC lookups, an exact code rarely needs more than one hit
pub const DEFAULT_ISRC_SEARCH_LIMIT: usize = 5;
/// Result limit for free text lookups
pub const DEFAULT_TEXT_SEARCH_LIMIT: usize = 10;

/// True when any source artist, case-insensitively, appears in the candidate's
/// space-joined artist names.
pub fn artists_overlap(source_artists: &[String], candidate_artists: &[String]) -> bool {
    let candidate = candidate_artists
        .iter()
        .map(|a| a.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    source_artists
        .iter()
        .any(|artist| candidate.contains(&artist.to_lowercase()))
}

/// Picks the best destination candidate for a source track.
///
/// ISRC search first, its top hit is taken as is. Otherwise a free text search on
/// artists and title, preferring the first candidate sharing an artist and
/// falling back to the catalog's top ranked result.
pub struct TrackMatcher<'a> {
    destination: &'a dyn DestinationCatalog,
    isrc_search_limit: usize,
    text_search_limit: usize,
}

impl<'a> TrackMatcher<'a> {
    /// Matcher with the default search limits
    pub fn new(destination: &'a dyn DestinationCatalog) -> Self {
        Self::with_limits(
            destination,
            DEFAULT_ISRC_SEARCH_LIMIT,
            DEFAULT_TEXT_SEARCH_LIMIT,
        )
    }

    /// Matcher with explicit result limits for both searches
    pub fn with_limits(
        destination: &'a dyn DestinationCatalog,
        isrc_search_limit: usize,
        text_search_limit: usize,
    ) -> Self {
        TrackMatcher {
            destination,
            isrc_search_limit,
            text_search_limit,
        }
    }

    /// Search failures are logged and reported as no match.
    pub async fn find_match(&self, track: &TrackDescriptor) -> Option<MatchCandidate> {
        if let Some(isrc) = track.isrc.as_deref() {
            match self.destination.search(isrc, self.isrc_search_limit).await {
                Ok(candidates) => {
                    if let Some(candidate) = candidates.into_iter().next() {
                        debug!("Matched '{}' by ISRC {isrc}", track.label());
                        return Some(candidate);
                    }
                }
                Err(e) => {
                    warn!("Error searching for track '{}': {e}", track.label());
                    return None;
                }
            }
        }

        let query = format!("{} {}", track.artists.join(" "), track.title);
        let candidates = match self.destination.search(&query, self.text_search_limit).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Error searching for track '{}': {e}", track.label());
                return None;
            }
        };

        let overlap = candidates
            .iter()
            .position(|c| artists_overlap(&track.artists, &c.artists));
        match overlap {
            Some(index) => {
                debug!("Matched '{}' by artist overlap", track.label());
                candidates.into_iter().nth(index)
            }
            None => {
                let top = candidates.into_iter().next();
                if top.is_some() {
                    debug!(
                        "No artist overlap for '{}', using top ranked result",
                        track.label()
                    );
                }
                top
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::catalog::MockDestinationCatalog;
    use crate::clients::errors::Error;

    fn track(isrc: Option<&str>) -> TrackDescriptor {
        TrackDescriptor {
            title: "Get Lucky".into(),
            artists: vec!["Daft Punk".into(), "Pharrell Williams".into()],
            album: "Random Access Memories".into(),
            duration_ms: 369_000,
            isrc: isrc.map(String::from),
            source_id: Some("69kOkLUCkxIZYexIgSG8rq".into()),
        }
    }

    fn candidate(id: &str, artists: &[&str]) -> MatchCandidate {
        MatchCandidate {
            id: id.into(),
            title: "Get Lucky".into(),
            artists: artists.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    #[test]
    fn overlap_ignores_case() {
        let source = vec!["Daft Punk".to_string()];
        assert!(artists_overlap(&source, &["DAFT PUNK".to_string()]));
        assert!(artists_overlap(
            &source,
            &["Pharrell".to_string(), "daft punk".to_string()]
        ));
        assert!(!artists_overlap(&source, &["Justice".to_string()]));
        assert!(!artists_overlap(&source, &[]));
    }

    #[tokio::test]
    async fn isrc_hit_skips_text_search() {
        let mut destination = MockDestinationCatalog::new();
        destination
            .expect_search()
            .withf(|query, limit| query == "USQX91300108" && *limit == DEFAULT_ISRC_SEARCH_LIMIT)
            .times(1)
            .returning(|_, _| Ok(vec![candidate("1", &["Someone Else"]), candidate("2", &["Daft Punk"])]));

        let matcher = TrackMatcher::new(&destination);
        let found = matcher.find_match(&track(Some("USQX91300108"))).await;
        assert_eq!(found.map(|c| c.id), Some("1".to_string()));
    }

    #[tokio::test]
    async fn empty_isrc_result_falls_back_to_text_search() {
        let mut destination = MockDestinationCatalog::new();
        destination
            .expect_search()
            .withf(|query, limit| query == "USQX91300108" && *limit == 5)
            .times(1)
            .returning(|_, _| Ok(vec![]));
        destination
            .expect_search()
            .withf(|query, limit| query == "Daft Punk Pharrell Williams Get Lucky" && *limit == 10)
            .times(1)
            .returning(|_, _| Ok(vec![candidate("7", &["Daft Punk"])]));

        let matcher = TrackMatcher::new(&destination);
        let found = matcher.find_match(&track(Some("USQX91300108"))).await;
        assert_eq!(found.map(|c| c.id), Some("7".to_string()));
    }

    #[tokio::test]
    async fn text_search_prefers_artist_overlap() {
        let mut destination = MockDestinationCatalog::new();
        destination.expect_search().times(1).returning(|_, _| {
            Ok(vec![
                candidate("cover", &["Karaoke Kings"]),
                candidate("original", &["DAFT PUNK", "Nile Rodgers"]),
            ])
        });

        let matcher = TrackMatcher::new(&destination);
        let found = matcher.find_match(&track(None)).await;
        assert_eq!(found.map(|c| c.id), Some("original".to_string()));
    }

    #[tokio::test]
    async fn no_overlap_returns_top_ranked() {
        let mut destination = MockDestinationCatalog::new();
        destination.expect_search().times(1).returning(|_, _| {
            Ok(vec![
                candidate("first", &["Karaoke Kings"]),
                candidate("second", &["Tribute Band"]),
            ])
        });

        let matcher = TrackMatcher::new(&destination);
        let found = matcher.find_match(&track(None)).await;
        assert_eq!(found.map(|c| c.id), Some("first".to_string()));
    }

    #[tokio::test]
    async fn no_results_is_no_match() {
        let mut destination = MockDestinationCatalog::new();
        destination.expect_search().times(1).returning(|_, _| Ok(vec![]));

        let matcher = TrackMatcher::new(&destination);
        assert!(matcher.find_match(&track(None)).await.is_none());
    }

    #[tokio::test]
    async fn search_error_is_no_match() {
        let mut destination = MockDestinationCatalog::new();
        destination
            .expect_search()
            .times(1)
            .returning(|_, _| Err(Error::SearchError("429 Too Many Requests".into())));

        let matcher = TrackMatcher::new(&destination);
        assert!(matcher.find_match(&track(Some("USQX91300108"))).await.is_none());
    }

    #[tokio::test]
    async fn custom_limits_are_used() {
        let mut destination = MockDestinationCatalog::new();
        destination
            .expect_search()
            .withf(|query, limit| query == "Daft Punk Pharrell Williams Get Lucky" && *limit == 3)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let matcher = TrackMatcher::with_limits(&destination, 1, 3);
        assert!(matcher.find_match(&track(None)).await.is_none());
    }
}
