//! Five-stage resolution pipeline
//!
//! `Extractor -> Listing -> Title -> Episode -> Source -> Video`. Every
//! entity is a plain record plus a handle to the [`Provider`] that produced
//! it; nothing is fetched until a stage method is called, and every stage
//! method takes the session explicitly.

use crate::core::video::Video;
use crate::error::ResolveError;
use crate::platform::session::{AsyncSession, Session};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Fields a provider scrapes for any stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            thumbnail: None,
            meta: BTreeMap::new(),
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// A catalog site scraper.
///
/// Only the stage hooks live here; the entities wrap their results and keep
/// the provider handle for the next stage.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    fn search(&self, session: &Session, query: &str) -> Result<Vec<Entry>, ResolveError>;

    async fn search_async(
        &self,
        session: &AsyncSession,
        query: &str,
    ) -> Result<Vec<Entry>, ResolveError>;

    fn ongoing(&self, session: &Session) -> Result<Vec<Entry>, ResolveError>;

    async fn ongoing_async(&self, session: &AsyncSession) -> Result<Vec<Entry>, ResolveError>;

    fn title(&self, session: &Session, listing: &Listing) -> Result<Entry, ResolveError>;

    async fn title_async(
        &self,
        session: &AsyncSession,
        listing: &Listing,
    ) -> Result<Entry, ResolveError>;

    fn episodes(&self, session: &Session, title: &Title) -> Result<Vec<Entry>, ResolveError>;

    async fn episodes_async(
        &self,
        session: &AsyncSession,
        title: &Title,
    ) -> Result<Vec<Entry>, ResolveError>;

    fn sources(&self, session: &Session, episode: &Episode) -> Result<Vec<Entry>, ResolveError>;

    async fn sources_async(
        &self,
        session: &AsyncSession,
        episode: &Episode,
    ) -> Result<Vec<Entry>, ResolveError>;

    /// Dispatch the source URL through the session's decoder registry
    fn videos(&self, session: &Session, source: &Source) -> Result<Vec<Video>, ResolveError> {
        session.resolve_videos(&source.url)
    }

    async fn videos_async(
        &self,
        session: &AsyncSession,
        source: &Source,
    ) -> Result<Vec<Video>, ResolveError> {
        session.resolve_videos(&source.url).await
    }
}

/// Which entry point produced a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Search,
    Ongoing,
}

/// A search hit or an ongoing-list item
#[derive(Clone)]
pub struct Listing {
    pub kind: ListingKind,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub meta: BTreeMap<String, String>,
    provider: Arc<dyn Provider>,
}

impl Listing {
    pub fn new(kind: ListingKind, entry: Entry, provider: Arc<dyn Provider>) -> Self {
        Self {
            kind,
            title: entry.title,
            url: entry.url,
            thumbnail: entry.thumbnail,
            meta: entry.meta,
            provider,
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn get_title(&self, session: &Session) -> Result<Title, ResolveError> {
        debug!("{}: title for {}", self.provider.name(), self.url);
        let entry = self.provider.title(session, self)?;
        Ok(Title::new(entry, self.provider.clone()))
    }

    pub async fn get_title_async(&self, session: &AsyncSession) -> Result<Title, ResolveError> {
        debug!("{}: title for {}", self.provider.name(), self.url);
        let entry = self.provider.title_async(session, self).await?;
        Ok(Title::new(entry, self.provider.clone()))
    }
}

/// A show or film page
#[derive(Clone)]
pub struct Title {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub meta: BTreeMap<String, String>,
    provider: Arc<dyn Provider>,
}

impl Title {
    pub fn new(entry: Entry, provider: Arc<dyn Provider>) -> Self {
        Self {
            title: entry.title,
            url: entry.url,
            thumbnail: entry.thumbnail,
            meta: entry.meta,
            provider,
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn get_episodes(&self, session: &Session) -> Result<Vec<Episode>, ResolveError> {
        debug!("{}: episodes of {}", self.provider.name(), self.url);
        let entries = self.provider.episodes(session, self)?;
        Ok(wrap(entries, &self.provider, Episode::new))
    }

    pub async fn get_episodes_async(
        &self,
        session: &AsyncSession,
    ) -> Result<Vec<Episode>, ResolveError> {
        debug!("{}: episodes of {}", self.provider.name(), self.url);
        let entries = self.provider.episodes_async(session, self).await?;
        Ok(wrap(entries, &self.provider, Episode::new))
    }
}

/// One episode of a title
#[derive(Clone)]
pub struct Episode {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub meta: BTreeMap<String, String>,
    provider: Arc<dyn Provider>,
}

impl Episode {
    pub fn new(entry: Entry, provider: Arc<dyn Provider>) -> Self {
        Self {
            title: entry.title,
            url: entry.url,
            thumbnail: entry.thumbnail,
            meta: entry.meta,
            provider,
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn get_sources(&self, session: &Session) -> Result<Vec<Source>, ResolveError> {
        debug!("{}: sources of {}", self.provider.name(), self.url);
        let entries = self.provider.sources(session, self)?;
        Ok(wrap(entries, &self.provider, Source::new))
    }

    pub async fn get_sources_async(
        &self,
        session: &AsyncSession,
    ) -> Result<Vec<Source>, ResolveError> {
        debug!("{}: sources of {}", self.provider.name(), self.url);
        let entries = self.provider.sources_async(session, self).await?;
        Ok(wrap(entries, &self.provider, Source::new))
    }
}

/// A player embed offered for an episode
#[derive(Clone)]
pub struct Source {
    pub title: String,
    /// Embed URL handed to the decoder registry
    pub url: String,
    pub thumbnail: Option<String>,
    pub meta: BTreeMap<String, String>,
    provider: Arc<dyn Provider>,
}

impl Source {
    pub fn new(entry: Entry, provider: Arc<dyn Provider>) -> Self {
        Self {
            title: entry.title,
            url: entry.url,
            thumbnail: entry.thumbnail,
            meta: entry.meta,
            provider,
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn get_videos(&self, session: &Session) -> Result<Vec<Video>, ResolveError> {
        debug!("{}: videos of {}", self.provider.name(), self.url);
        self.provider.videos(session, self)
    }

    pub async fn get_videos_async(&self, session: &AsyncSession) -> Result<Vec<Video>, ResolveError> {
        debug!("{}: videos of {}", self.provider.name(), self.url);
        self.provider.videos_async(session, self).await
    }
}

fn wrap<T>(
    entries: Vec<Entry>,
    provider: &Arc<dyn Provider>,
    build: fn(Entry, Arc<dyn Provider>) -> T,
) -> Vec<T> {
    entries
        .into_iter()
        .map(|entry| build(entry, provider.clone()))
        .collect()
}

macro_rules! impl_entity_debug {
    ($($name:ident),*) => {
        $(
            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($name))
                        .field("title", &self.title)
                        .field("url", &self.url)
                        .field("provider", &self.provider.name())
                        .finish_non_exhaustive()
                }
            }
        )*
    };
}

impl_entity_debug!(Listing, Title, Episode, Source);

/// Pipeline entry point for one provider
#[derive(Clone)]
pub struct Extractor {
    provider: Arc<dyn Provider>,
}

impl Extractor {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn search(&self, session: &Session, query: &str) -> Result<Vec<Listing>, ResolveError> {
        let entries = self.provider.search(session, query)?;
        Ok(self.listings(ListingKind::Search, entries))
    }

    pub async fn search_async(
        &self,
        session: &AsyncSession,
        query: &str,
    ) -> Result<Vec<Listing>, ResolveError> {
        let entries = self.provider.search_async(session, query).await?;
        Ok(self.listings(ListingKind::Search, entries))
    }

    pub fn ongoing(&self, session: &Session) -> Result<Vec<Listing>, ResolveError> {
        let entries = self.provider.ongoing(session)?;
        Ok(self.listings(ListingKind::Ongoing, entries))
    }

    pub async fn ongoing_async(&self, session: &AsyncSession) -> Result<Vec<Listing>, ResolveError> {
        let entries = self.provider.ongoing_async(session).await?;
        Ok(self.listings(ListingKind::Ongoing, entries))
    }

    fn listings(&self, kind: ListingKind, entries: Vec<Entry>) -> Vec<Listing> {
        entries
            .into_iter()
            .map(|entry| Listing::new(kind, entry, self.provider.clone()))
            .collect()
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("provider", &self.provider.name())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::video::VideoType;
    use crate::decoders::kodik::tests as kodik;
    use crate::decoders::Registry;
    use crate::platform::client::{AsyncTransport, HttpRequest, Transport};
    use crate::utils::testing::StubTransport;

    pub(crate) const SEARCH: &str = "https://catalog.example/search";
    pub(crate) const ONGOING: &str = "https://catalog.example/ongoing";

    /// Catalog serving JSON pages
    pub(crate) struct CatalogProvider;

    fn entries(body: &str) -> Result<Vec<Entry>, ResolveError> {
        Ok(serde_json::from_str(body)?)
    }

    fn entry(body: &str) -> Result<Entry, ResolveError> {
        Ok(serde_json::from_str(body)?)
    }

    fn search_request(query: &str) -> HttpRequest {
        HttpRequest::get(SEARCH).param("q", query)
    }

    #[async_trait]
    impl Provider for CatalogProvider {
        fn name(&self) -> &'static str {
            "catalog"
        }

        fn search(&self, session: &Session, query: &str) -> Result<Vec<Entry>, ResolveError> {
            entries(session.http().execute(&search_request(query))?.ensure_success()?.text())
        }

        async fn search_async(
            &self,
            session: &AsyncSession,
            query: &str,
        ) -> Result<Vec<Entry>, ResolveError> {
            let response = session.http().execute(&search_request(query)).await?;
            entries(response.ensure_success()?.text())
        }

        fn ongoing(&self, session: &Session) -> Result<Vec<Entry>, ResolveError> {
            entries(session.http().execute(&HttpRequest::get(ONGOING))?.ensure_success()?.text())
        }

        async fn ongoing_async(&self, session: &AsyncSession) -> Result<Vec<Entry>, ResolveError> {
            let response = session.http().execute(&HttpRequest::get(ONGOING)).await?;
            entries(response.ensure_success()?.text())
        }

        fn title(&self, session: &Session, listing: &Listing) -> Result<Entry, ResolveError> {
            let request = HttpRequest::get(&listing.url);
            entry(session.http().execute(&request)?.ensure_success()?.text())
        }

        async fn title_async(
            &self,
            session: &AsyncSession,
            listing: &Listing,
        ) -> Result<Entry, ResolveError> {
            let request = HttpRequest::get(&listing.url);
            entry(session.http().execute(&request).await?.ensure_success()?.text())
        }

        fn episodes(&self, session: &Session, title: &Title) -> Result<Vec<Entry>, ResolveError> {
            let request = HttpRequest::get(format!("{}/episodes", title.url));
            entries(session.http().execute(&request)?.ensure_success()?.text())
        }

        async fn episodes_async(
            &self,
            session: &AsyncSession,
            title: &Title,
        ) -> Result<Vec<Entry>, ResolveError> {
            let request = HttpRequest::get(format!("{}/episodes", title.url));
            entries(session.http().execute(&request).await?.ensure_success()?.text())
        }

        fn sources(&self, session: &Session, episode: &Episode) -> Result<Vec<Entry>, ResolveError> {
            let request = HttpRequest::get(format!("{}/sources", episode.url));
            entries(session.http().execute(&request)?.ensure_success()?.text())
        }

        async fn sources_async(
            &self,
            session: &AsyncSession,
            episode: &Episode,
        ) -> Result<Vec<Entry>, ResolveError> {
            let request = HttpRequest::get(format!("{}/sources", episode.url));
            entries(session.http().execute(&request).await?.ensure_success()?.text())
        }
    }

    /// Two shows with two episodes each; every episode has one direct HLS
    /// source, episode 1 of show A additionally a Kodik embed.
    pub(crate) fn catalog() -> StubTransport {
        kodik::stub()
            .get(
                SEARCH,
                r#"[{"title":"Show A","url":"https://catalog.example/a"}]"#,
            )
            .get(
                ONGOING,
                r#"[{"title":"Show A","url":"https://catalog.example/a"},
                    {"title":"Show B","url":"https://catalog.example/b"}]"#,
            )
            .get(
                "https://catalog.example/a",
                r#"{"title":"Show A","url":"https://catalog.example/a","meta":{"year":"2023"}}"#,
            )
            .get(
                "https://catalog.example/b",
                r#"{"title":"Show B","url":"https://catalog.example/b"}"#,
            )
            .get(
                "https://catalog.example/a/episodes",
                r#"[{"title":"1","url":"https://catalog.example/a/1"},{"title":"2","url":"https://catalog.example/a/2"}]"#,
            )
            .get(
                "https://catalog.example/b/episodes",
                r#"[{"title":"1","url":"https://catalog.example/b/1"},{"title":"2","url":"https://catalog.example/b/2"}]"#,
            )
            .get(
                "https://catalog.example/a/1/sources",
                &format!(
                    r#"[{{"title":"Kodik","url":"{}"}},{{"title":"Direct","url":"https://hls.example/a/1.m3u8"}}]"#,
                    kodik::EMBED
                ),
            )
            .get(
                "https://catalog.example/a/2/sources",
                r#"[{"title":"Direct","url":"https://hls.example/a/2.m3u8"}]"#,
            )
            .get(
                "https://catalog.example/b/1/sources",
                r#"[{"title":"Direct","url":"https://hls.example/b/1.m3u8"}]"#,
            )
            .get(
                "https://catalog.example/b/2/sources",
                r#"[{"title":"Direct","url":"https://hls.example/b/2.m3u8"}]"#,
            )
    }

    pub(crate) fn sessions(http: &Arc<StubTransport>) -> (Session, AsyncSession) {
        let registry = Arc::new(Registry::builtin());
        (
            Session::with_transport(http.clone(), registry.clone()),
            AsyncSession::with_transport(http.clone(), registry),
        )
    }

    fn provider() -> Arc<dyn Provider> {
        Arc::new(CatalogProvider)
    }

    #[test]
    fn test_construction_performs_no_requests() {
        let http = Arc::new(catalog());
        let (session, _) = sessions(&http);

        let extractor = Extractor::new(provider());
        let title = Title::new(Entry::new("Show A", "https://catalog.example/a"), provider());
        let listing = Listing::new(ListingKind::Search, Entry::new("A", "https://catalog.example/a"), provider());
        assert_eq!(http.calls(), 0);

        let episodes = title.get_episodes(&session).unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(http.calls(), 1);

        drop((extractor, listing));
        assert_eq!(http.calls(), 1);
    }

    #[test]
    fn test_full_chain() {
        let http = Arc::new(catalog());
        let (session, _) = sessions(&http);
        let extractor = Extractor::new(provider());

        let listings = extractor.search(&session, "show").unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].kind, ListingKind::Search);
        assert_eq!(http.requests()[0].params, vec![("q".to_string(), "show".to_string())]);

        let title = listings[0].get_title(&session).unwrap();
        assert_eq!(title.meta["year"], "2023");

        let episodes = title.get_episodes(&session).unwrap();
        let sources = episodes[0].get_sources(&session).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].url, kodik::EMBED);

        let kodik_videos = sources[0].get_videos(&session).unwrap();
        assert_eq!(kodik_videos.len(), 3);

        let direct = sources[1].get_videos(&session).unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].kind, VideoType::M3u8);
        assert_eq!(direct[0].url, "https://hls.example/a/1.m3u8");
    }

    #[tokio::test]
    async fn test_async_chain_matches_blocking() {
        let http = Arc::new(catalog());
        let (session, async_session) = sessions(&http);
        let extractor = Extractor::new(provider());

        let listings = extractor.ongoing(&session).unwrap();
        let async_listings = extractor.ongoing_async(&async_session).await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(async_listings.len(), 2);
        assert!(async_listings.iter().all(|l| l.kind == ListingKind::Ongoing));

        let title = listings[1].get_title(&session).unwrap();
        let async_title = async_listings[1].get_title_async(&async_session).await.unwrap();
        assert_eq!(title.url, async_title.url);

        let episodes = title.get_episodes(&session).unwrap();
        let async_episodes = async_title.get_episodes_async(&async_session).await.unwrap();
        assert_eq!(
            episodes.iter().map(|e| &e.url).collect::<Vec<_>>(),
            async_episodes.iter().map(|e| &e.url).collect::<Vec<_>>()
        );

        let sources = episodes[0].get_sources(&session).unwrap();
        let async_sources = async_episodes[0].get_sources_async(&async_session).await.unwrap();
        let videos = sources[0].get_videos(&session).unwrap();
        let async_videos = async_sources[0].get_videos_async(&async_session).await.unwrap();
        assert_eq!(videos, async_videos);

        let search = extractor.search_async(&async_session, "show").await.unwrap();
        assert_eq!(search[0].kind, ListingKind::Search);
    }

    #[test]
    fn test_stage_failure_is_not_swallowed() {
        let http = Arc::new(StubTransport::new());
        let (session, _) = sessions(&http);
        let title = Title::new(Entry::new("Gone", "https://catalog.example/gone"), provider());
        let err = title.get_episodes(&session).unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_entity_debug() {
        let listing = Listing::new(
            ListingKind::Ongoing,
            Entry::new("Show A", "https://catalog.example/a").with_thumbnail("https://catalog.example/a.jpg"),
            provider(),
        );
        let debug = format!("{:?}", listing);
        assert!(debug.contains("Listing"));
        assert!(debug.contains("catalog"));
        assert_eq!(listing.thumbnail.as_deref(), Some("https://catalog.example/a.jpg"));
    }
}
