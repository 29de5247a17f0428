//! Lazy depth-first traversal of the pipeline
//!
//! Both flavours drive the same private step machine: it decides the next stage to
//! fetch, the caller performs the fetch and feeds the result back. One item
//! is produced per video, and no stage is fetched before the consumer asks
//! for an item that needs it.

use crate::core::pipeline::{Episode, Listing, Source, Title};
use crate::core::video::Video;
use crate::error::ResolveError;
use crate::platform::session::{AsyncSession, Session};
use futures::stream::{self, Stream};
use std::collections::VecDeque;
use tracing::debug;

/// One resolved video together with the path that led to it
#[derive(Debug, Clone)]
pub struct WalkItem {
    pub listing: Listing,
    pub title: Title,
    pub episode: Episode,
    pub source: Source,
    pub video: Video,
}

enum Step {
    Yield(Box<WalkItem>),
    FetchTitle(Listing),
    FetchEpisodes(Title),
    FetchSources(Episode),
    FetchVideos(Source),
    Done,
}

#[derive(Default)]
struct WalkState {
    listings: VecDeque<Listing>,
    pending_title: Option<Title>,
    episodes: VecDeque<Episode>,
    sources: VecDeque<Source>,
    videos: VecDeque<Video>,

    listing: Option<Listing>,
    title: Option<Title>,
    episode: Option<Episode>,
    source: Option<Source>,
    done: bool,
}

impl WalkState {
    fn new(roots: impl IntoIterator<Item = Listing>) -> Self {
        Self {
            listings: roots.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Deepest pending work first
    fn next_step(&mut self) -> Step {
        if self.done {
            return Step::Done;
        }

        if let Some(video) = self.videos.pop_front() {
            let (Some(listing), Some(title), Some(episode), Some(source)) = (
                self.listing.clone(),
                self.title.clone(),
                self.episode.clone(),
                self.source.clone(),
            ) else {
                self.done = true;
                return Step::Done;
            };
            return Step::Yield(Box::new(WalkItem {
                listing,
                title,
                episode,
                source,
                video,
            }));
        }

        if let Some(source) = self.sources.pop_front() {
            self.source = Some(source.clone());
            return Step::FetchVideos(source);
        }

        if let Some(episode) = self.episodes.pop_front() {
            self.episode = Some(episode.clone());
            return Step::FetchSources(episode);
        }

        if let Some(title) = self.pending_title.take() {
            self.title = Some(title.clone());
            return Step::FetchEpisodes(title);
        }

        if let Some(listing) = self.listings.pop_front() {
            self.listing = Some(listing.clone());
            return Step::FetchTitle(listing);
        }

        self.done = true;
        Step::Done
    }

    fn title_fetched(&mut self, title: Title) {
        self.pending_title = Some(title);
    }

    fn episodes_fetched(&mut self, episodes: Vec<Episode>) {
        self.episodes = episodes.into();
    }

    fn sources_fetched(&mut self, sources: Vec<Source>) {
        self.sources = sources.into();
    }

    fn videos_fetched(&mut self, videos: Vec<Video>) {
        self.videos = videos.into();
    }

    fn fail(&mut self, err: &ResolveError) {
        debug!("Walk stopped: {}", err);
        self.done = true;
    }
}

/// Blocking walk over every video reachable from `roots`.
///
/// The first failing stage is yielded as an error and ends the walk.
pub struct Walk {
    session: Session,
    state: WalkState,
}

/// Start a blocking walk
pub fn walk(session: &Session, roots: impl IntoIterator<Item = Listing>) -> Walk {
    Walk {
        session: session.clone(),
        state: WalkState::new(roots),
    }
}

impl Iterator for Walk {
    type Item = Result<WalkItem, ResolveError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let fetched = match self.state.next_step() {
                Step::Yield(item) => return Some(Ok(*item)),
                Step::Done => return None,
                Step::FetchTitle(listing) => listing
                    .get_title(&self.session)
                    .map(|title| self.state.title_fetched(title)),
                Step::FetchEpisodes(title) => title
                    .get_episodes(&self.session)
                    .map(|episodes| self.state.episodes_fetched(episodes)),
                Step::FetchSources(episode) => episode
                    .get_sources(&self.session)
                    .map(|sources| self.state.sources_fetched(sources)),
                Step::FetchVideos(source) => source
                    .get_videos(&self.session)
                    .map(|videos| self.state.videos_fetched(videos)),
            };

            if let Err(err) = fetched {
                self.state.fail(&err);
                return Some(Err(err));
            }
        }
    }
}

impl std::fmt::Debug for Walk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walk")
            .field("done", &self.state.done)
            .finish_non_exhaustive()
    }
}

/// Async walk; same order and laziness as [`walk`]
pub fn walk_async(
    session: &AsyncSession,
    roots: impl IntoIterator<Item = Listing>,
) -> impl Stream<Item = Result<WalkItem, ResolveError>> + Send {
    let seed = Some((session.clone(), WalkState::new(roots)));

    stream::unfold(seed, |seed| async move {
        let (session, mut state) = seed?;
        loop {
            let fetched = match state.next_step() {
                Step::Yield(item) => return Some((Ok(*item), Some((session, state)))),
                Step::Done => return None,
                Step::FetchTitle(listing) => listing
                    .get_title_async(&session)
                    .await
                    .map(|title| state.title_fetched(title)),
                Step::FetchEpisodes(title) => title
                    .get_episodes_async(&session)
                    .await
                    .map(|episodes| state.episodes_fetched(episodes)),
                Step::FetchSources(episode) => episode
                    .get_sources_async(&session)
                    .await
                    .map(|sources| state.sources_fetched(sources)),
                Step::FetchVideos(source) => source
                    .get_videos_async(&session)
                    .await
                    .map(|videos| state.videos_fetched(videos)),
            };

            if let Err(err) = fetched {
                state.fail(&err);
                return Some((Err(err), None));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::tests::{catalog, sessions, CatalogProvider};
    use crate::core::pipeline::{Entry, Extractor, ListingKind};
    use crate::utils::testing::StubTransport;
    use futures::StreamExt;
    use std::sync::Arc;

    fn extractor() -> Extractor {
        Extractor::new(Arc::new(CatalogProvider))
    }

    fn paths(items: &[WalkItem]) -> Vec<(String, String, String)> {
        items
            .iter()
            .map(|item| {
                (
                    item.title.title.clone(),
                    item.episode.title.clone(),
                    item.video.url.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn test_walk_is_lazy() {
        let http = Arc::new(catalog());
        let (session, _) = sessions(&http);
        let roots = extractor().ongoing(&session).unwrap();
        assert_eq!(http.calls(), 1);

        let mut walk = walk(&session, roots);
        assert_eq!(http.calls(), 1);

        // Show A title, its episodes, episode 1 sources, kodik embed,
        // player script, kodik links
        let first = walk.next().unwrap().unwrap();
        assert_eq!(first.listing.kind, ListingKind::Ongoing);
        assert_eq!(first.source.title, "Kodik");
        assert_eq!(http.calls(), 7);

        // Remaining kodik qualities come from the already fetched stage
        walk.next().unwrap().unwrap();
        walk.next().unwrap().unwrap();
        assert_eq!(http.calls(), 7);
    }

    #[test]
    fn test_walk_visits_everything_depth_first() {
        let http = Arc::new(catalog());
        let (session, _) = sessions(&http);
        let roots = extractor().ongoing(&session).unwrap();

        let items: Vec<WalkItem> = walk(&session, roots).collect::<Result<_, _>>().unwrap();
        let paths = paths(&items);
        assert_eq!(items.len(), 3 + 1 + 1 + 1 + 1);
        assert_eq!(
            paths[3..],
            [
                ("Show A".to_string(), "1".to_string(), "https://hls.example/a/1.m3u8".to_string()),
                ("Show A".to_string(), "2".to_string(), "https://hls.example/a/2.m3u8".to_string()),
                ("Show B".to_string(), "1".to_string(), "https://hls.example/b/1.m3u8".to_string()),
                ("Show B".to_string(), "2".to_string(), "https://hls.example/b/2.m3u8".to_string()),
            ]
        );
        assert!(items[..3].iter().all(|item| item.source.title == "Kodik"));
    }

    #[test]
    fn test_walk_stops_after_first_error() {
        let http = Arc::new(StubTransport::new());
        let (session, _) = sessions(&http);
        let roots = vec![
            Listing::new(
                ListingKind::Search,
                Entry::new("Gone", "https://catalog.example/gone"),
                Arc::new(CatalogProvider),
            ),
            Listing::new(
                ListingKind::Search,
                Entry::new("Also gone", "https://catalog.example/gone-too"),
                Arc::new(CatalogProvider),
            ),
        ];

        let mut walk = walk(&session, roots);
        let err = walk.next().unwrap().unwrap_err();
        assert!(err.is_unavailable());
        assert!(walk.next().is_none());
        assert_eq!(http.calls(), 1);
    }

    #[test]
    fn test_empty_roots() {
        let http = Arc::new(StubTransport::new());
        let (session, _) = sessions(&http);
        assert_eq!(walk(&session, Vec::new()).count(), 0);
        assert_eq!(http.calls(), 0);
    }

    #[test]
    fn test_async_walk_empty_roots() {
        let http = Arc::new(StubTransport::new());
        let (_, async_session) = sessions(&http);
        let items: Vec<_> = tokio_test::block_on(walk_async(&async_session, Vec::new()).collect());
        assert!(items.is_empty());
        assert_eq!(http.calls(), 0);
    }

    #[tokio::test]
    async fn test_async_walk_matches_blocking() {
        let http = Arc::new(catalog());
        let (session, async_session) = sessions(&http);
        let roots = extractor().ongoing(&session).unwrap();

        let blocking: Vec<WalkItem> = walk(&session, roots.clone())
            .collect::<Result<_, _>>()
            .unwrap();
        let concurrent: Vec<WalkItem> = walk_async(&async_session, roots)
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(paths(&blocking), paths(&concurrent));
        assert_eq!(
            blocking.iter().map(|i| &i.video).collect::<Vec<_>>(),
            concurrent.iter().map(|i| &i.video).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_async_walk_is_lazy_and_stops_on_error() {
        let http = Arc::new(catalog());
        let (_, async_session) = sessions(&http);
        let roots = vec![
            Listing::new(
                ListingKind::Search,
                Entry::new("Show B", "https://catalog.example/b"),
                Arc::new(CatalogProvider),
            ),
            Listing::new(
                ListingKind::Search,
                Entry::new("Gone", "https://catalog.example/gone"),
                Arc::new(CatalogProvider),
            ),
        ];

        let stream = walk_async(&async_session, roots);
        futures::pin_mut!(stream);
        assert_eq!(http.calls(), 0);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.video.url, "https://hls.example/b/1.m3u8");
        assert_eq!(http.calls(), 3);

        stream.next().await.unwrap().unwrap();
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }
}
