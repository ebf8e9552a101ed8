//! [`Feed`] definitions.

use std::{collections::HashSet, fmt::Display};

use tracing as log;

use crate::{query::listings::Browse, Query};

use super::list;

/// Accumulated [`list::Item`]s browsed page by page.
///
/// The first page replaces everything, the next ones are appended.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Feed {
    /// Accumulated [`list::Item`]s without duplicates.
    items: Vec<list::Item>,

    /// Number of the last applied [`list::Page`].
    page: list::PageNumber,

    /// Total number of pages reported by the last applied [`list::Page`].
    total_pages: u32,

    /// [`Loading`] currently in progress, if any.
    loading: Option<Loading>,

    /// Message of the last failure, if any.
    error: Option<String>,
}

/// Kind of [`Feed`] loading in progress.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Loading {
    /// Loading of the first page.
    Initial,

    /// Loading of a subsequent page.
    More,
}

impl Feed {
    /// Fetches the [`list::Page`] requested by the provided [`Browse`] and
    /// applies it to this [`Feed`].
    ///
    /// Shortcut for [`Feed::begin()`] and [`Feed::complete()`] around a
    /// single [`Query`] execution.
    ///
    /// # Errors
    ///
    /// If the [`Browse`] query fails. This [`Feed`] is reset to nothing in
    /// such case, keeping the error message.
    pub async fn fetch<Q>(&mut self, q: &Q, browse: Browse) -> Result<(), Q::Err>
    where
        Q: Query<Browse, Ok = list::Page>,
        Q::Err: Display,
    {
        let browse = self.begin(browse);
        self.complete(q.execute(browse).await)
    }

    /// Marks the provided [`Browse`] as being loaded by this [`Feed`],
    /// returning it back for execution.
    ///
    /// Requesting the first page is an initial [`Loading`], any other page
    /// is loading more.
    pub fn begin(&mut self, browse: Browse) -> Browse {
        self.loading = Some(if browse.page.is_first() {
            Loading::Initial
        } else {
            Loading::More
        });
        browse
    }

    /// Completes the [`Loading`] started with [`Feed::begin()`] with the
    /// provided [`Browse`] result.
    ///
    /// # Errors
    ///
    /// Returns the provided error back, after this [`Feed`] is reset to
    /// nothing, keeping the error message.
    pub fn complete<E: Display>(
        &mut self,
        res: Result<list::Page, E>,
    ) -> Result<(), E> {
        self.loading = None;
        match res {
            Ok(page) => {
                self.apply(page);
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Applies the provided [`list::Page`] to this [`Feed`].
    pub fn apply(&mut self, page: list::Page) {
        let list::Page {
            items,
            number,
            total_pages,
            ..
        } = page;

        if number.is_first() {
            self.items.clear();
        }
        let mut seen =
            self.items.iter().map(list::Item::id).collect::<HashSet<_>>();
        self.items
            .extend(items.into_iter().filter(|i| seen.insert(i.id())));

        self.page = number;
        self.total_pages = total_pages;
        self.error = None;
    }

    /// Resets this [`Feed`] because of the provided error.
    fn fail(&mut self, err: &impl Display) {
        log::error!("failed to browse `Listing`s: {err}");

        self.items.clear();
        self.page = list::PageNumber::FIRST;
        self.total_pages = 0;
        self.error = Some(err.to_string());
    }

    /// Returns the accumulated [`list::Item`]s.
    #[must_use]
    pub fn items(&self) -> &[list::Item] {
        &self.items
    }

    /// Returns the number of the last applied [`list::Page`].
    #[must_use]
    pub const fn page(&self) -> list::PageNumber {
        self.page
    }

    /// Returns the total number of pages.
    #[must_use]
    pub const fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Indicates whether the first page is being loaded.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading == Some(Loading::Initial)
    }

    /// Indicates whether a subsequent page is being loaded.
    #[must_use]
    pub fn is_loading_more(&self) -> bool {
        self.loading == Some(Loading::More)
    }

    /// Returns the message of the last failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Indicates whether there is a page after the last applied one.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.page.get() < self.total_pages
    }

    /// Returns the number of the page to fetch next, if any.
    #[must_use]
    pub const fn next_page(&self) -> Option<list::PageNumber> {
        if self.has_more() {
            Some(self.page.next())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::{
        domain::listing::Price,
        infra::database::memory::{fixture, Failure, Memory},
        query::listings::Browse,
        read::listing::list::{self, Filter, Sort},
        Config, Query as _, Service,
    };

    use super::Feed;

    fn seeded(count: i64) -> Service<Memory> {
        let db = Memory::default();
        let dealer = fixture::dealership("Auto Hub");
        db.insert_dealership(dealer.clone());
        for i in 0..count {
            let mut l = fixture::listing(dealer.id, "Skoda", "Octavia");
            l.price = Price::new(Decimal::from(1000 + i)).unwrap();
            db.insert_listing(l);
        }
        Service::new(Config::default(), db)
    }

    fn browse(page: list::PageNumber) -> Browse {
        Browse {
            filter: Filter::default(),
            page,
            sort: Some(Sort::PriceAsc),
        }
    }

    #[tokio::test]
    async fn appends_next_pages() {
        let svc = seeded(20);
        let mut feed = Feed::default();

        feed.fetch(&svc, browse(list::PageNumber::FIRST)).await.unwrap();
        assert_eq!(feed.items().len(), 9);
        assert_eq!(feed.total_pages(), 3);
        assert!(feed.has_more());
        assert!(!feed.is_loading());

        while let Some(next) = feed.next_page() {
            feed.fetch(&svc, browse(next)).await.unwrap();
        }

        assert_eq!(feed.items().len(), 20);
        assert!(!feed.has_more());
        assert!(feed
            .items()
            .windows(2)
            .all(|w| w[0].listing.price <= w[1].listing.price));
    }

    #[tokio::test]
    async fn first_page_replaces_items() {
        let svc = seeded(12);
        let mut feed = Feed::default();

        feed.fetch(&svc, browse(list::PageNumber::FIRST)).await.unwrap();
        feed.fetch(&svc, browse(feed.page().next())).await.unwrap();
        assert_eq!(feed.items().len(), 12);

        feed.fetch(&svc, browse(list::PageNumber::FIRST)).await.unwrap();
        assert_eq!(feed.items().len(), 9);
        assert_eq!(feed.page(), list::PageNumber::FIRST);
    }

    #[tokio::test]
    async fn deduplicates_refetched_pages() {
        let svc = seeded(12);
        let mut feed = Feed::default();

        feed.fetch(&svc, browse(list::PageNumber::FIRST)).await.unwrap();
        let second = feed.page().next();
        feed.fetch(&svc, browse(second)).await.unwrap();
        feed.fetch(&svc, browse(second)).await.unwrap();

        assert_eq!(feed.items().len(), 12);
    }

    #[tokio::test]
    async fn resets_on_failure() {
        let svc = seeded(12);
        let mut feed = Feed::default();
        feed.fetch(&svc, browse(list::PageNumber::FIRST)).await.unwrap();

        svc.database().fail_on(Some(Failure::Count));
        let res = feed.fetch(&svc, browse(feed.page().next())).await;

        assert!(res.is_err());
        assert!(feed.items().is_empty());
        assert_eq!(feed.page(), list::PageNumber::FIRST);
        assert_eq!(feed.total_pages(), 0);
        assert!(feed.error().is_some());
        assert!(!feed.is_loading_more());

        svc.database().fail_on(None);
        feed.fetch(&svc, browse(list::PageNumber::FIRST)).await.unwrap();
        assert_eq!(feed.error(), None);
    }

    #[tokio::test]
    async fn empty_result_clears_items() {
        let svc = seeded(3);
        let mut feed = Feed::default();
        feed.fetch(&svc, browse(list::PageNumber::FIRST)).await.unwrap();

        let filter = Filter {
            makes: vec!["Tatra".parse().unwrap()],
            ..Filter::default()
        };
        feed.fetch(
            &svc,
            Browse {
                filter,
                page: list::PageNumber::FIRST,
                sort: None,
            },
        )
        .await
        .unwrap();

        assert!(feed.items().is_empty());
        assert_eq!(feed.total_pages(), 0);
        assert!(!feed.has_more());
    }

    #[tokio::test]
    async fn tracks_loading_kind() {
        let svc = seeded(12);
        let mut feed = Feed::default();

        let initial = feed.begin(browse(list::PageNumber::FIRST));
        assert!(feed.is_loading());
        assert!(!feed.is_loading_more());
        let res = svc.execute(initial).await;
        feed.complete(res).unwrap();
        assert!(!feed.is_loading());

        let more = feed.begin(browse(feed.page().next()));
        assert!(feed.is_loading_more());
        assert!(!feed.is_loading());
        assert_eq!(feed.items().len(), 9);

        let res = svc.execute(more).await;
        feed.complete(res).unwrap();
        assert!(!feed.is_loading_more());
        assert_eq!(feed.items().len(), 12);
    }

    #[tokio::test]
    async fn failed_load_more_stops_loading() {
        let svc = seeded(12);
        let mut feed = Feed::default();
        feed.fetch(&svc, browse(list::PageNumber::FIRST)).await.unwrap();

        svc.database().fail_on(Some(Failure::Page));
        let more = feed.begin(browse(feed.page().next()));
        assert!(feed.is_loading_more());

        let res = svc.execute(more).await;
        assert!(feed.complete(res).is_err());
        assert!(!feed.is_loading_more());
        assert!(feed.items().is_empty());
    }
}
