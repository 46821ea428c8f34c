use tracing::debug;

use super::normalize::{normalize, Normalize};
use super::types::Page;
use super::PrError;
use crate::transport::{Method, RequestOptions, Transport};

/// Forward-only walk over a paginated listing.
///
/// Starts from an already fetched first page and follows each page's `next`
/// cursor until a page comes back with an empty one. A walker cannot be
/// rewound; re-issue the original request to start over.
pub struct PageWalker<'a, R: Transport + ?Sized, T> {
    transport: &'a R,
    path: String,
    options: RequestOptions,
    first: Option<Page<T>>,
    cursor: Option<String>,
    pages_fetched: usize,
}

impl<'a, R, T> PageWalker<'a, R, T>
where
    R: Transport + ?Sized,
    T: Normalize,
{
    /// `path` and `options` describe the request that produced `first`.
    pub fn new(transport: &'a R, path: &str, options: RequestOptions, first: Page<T>) -> Self {
        Self {
            transport,
            path: path.to_string(),
            options,
            first: Some(first),
            cursor: None,
            pages_fetched: 0,
        }
    }

    /// Number of continuation pages requested so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Yield the next page, or `None` once the listing is exhausted.
    ///
    /// A failed fetch is yielded once as `Some(Err(_))`; the walk ends there.
    pub async fn next_page(&mut self) -> Option<Result<Page<T>, PrError>> {
        if let Some(first) = self.first.take() {
            self.cursor = Some(first.next.clone()).filter(|c| !c.is_empty());
            return Some(Ok(first));
        }

        let cursor = self.cursor.take()?;
        debug!(cursor = %cursor, "fetching next page");
        self.pages_fetched += 1;

        let options = self.options.with_cursor(&cursor);
        let page = match self.transport.request(Method::Get, &self.path, &options).await {
            Ok(raw) => normalize::<Page<T>>(&raw).map_err(PrError::from),
            Err(e) => Err(PrError::from(e)),
        };

        if let Ok(page) = &page {
            self.cursor = Some(page.next.clone()).filter(|c| !c.is_empty());
        }
        Some(page)
    }

    /// Concatenate the values of every remaining page, in page order.
    ///
    /// The first error aborts the walk; values gathered so far are dropped.
    pub async fn collect_values(mut self) -> Result<Vec<T>, PrError> {
        let mut values = Vec::new();
        while let Some(page) = self.next_page().await {
            values.extend(page?.values);
        }
        debug!(total = values.len(), pages = self.pages_fetched() + 1, "collected all pages");
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::types::{Commit, Commits};
    use crate::transport::fake::FakeTransport;
    use serde_json::json;

    const P2: &str = "https://api.bitbucket.org/2.0/repositories/team/widgets/commits?page=2";
    const P3: &str = "https://api.bitbucket.org/2.0/repositories/team/widgets/commits?page=3";

    fn first_page() -> Commits {
        Commits {
            next: P2.to_string(),
            values: vec![
                Commit {
                    hash: "a".to_string(),
                    ..Commit::default()
                },
                Commit {
                    hash: "b".to_string(),
                    ..Commit::default()
                },
            ],
            ..Commits::default()
        }
    }

    fn three_page_transport() -> FakeTransport {
        FakeTransport::new()
            .respond(P2, json!({ "next": P3, "values": [{ "hash": "c" }] }))
            .respond(P3, json!({ "next": "", "values": [{ "hash": "d" }, { "hash": "e" }] }))
    }

    #[tokio::test]
    async fn test_collects_three_pages_in_order() {
        let transport = three_page_transport();
        let opts = RequestOptions::for_repo("team", "widgets");
        let walker = PageWalker::new(&transport, "commits", opts, first_page());
        let values = walker.collect_values().await.unwrap();

        let hashes: Vec<&str> = values.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec!["a", "b", "c", "d", "e"]);

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].options.cursor.as_deref(), Some(P2));
        assert_eq!(calls[1].options.cursor.as_deref(), Some(P3));
        assert_eq!(calls[1].path, "commits");
    }

    #[tokio::test]
    async fn test_single_page_makes_no_requests() {
        let transport = FakeTransport::new();
        let mut first = first_page();
        first.next.clear();
        let mut walker =
            PageWalker::new(&transport, "commits", RequestOptions::default(), first.clone());

        assert_eq!(walker.next_page().await.unwrap().unwrap(), first);
        assert!(walker.next_page().await.is_none());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_lazy_walk_fetches_on_demand() {
        let transport = three_page_transport();
        let mut walker =
            PageWalker::new(&transport, "commits", RequestOptions::default(), first_page());

        walker.next_page().await.unwrap().unwrap();
        assert!(transport.calls().is_empty());
        walker.next_page().await.unwrap().unwrap();
        assert_eq!(walker.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_failed_continuation_surfaces_error() {
        let transport = FakeTransport::new()
            .respond(P2, json!({ "next": P3, "values": [{ "hash": "c" }] }))
            .fail(P3, 500);
        let mut walker =
            PageWalker::new(&transport, "commits", RequestOptions::default(), first_page());

        assert!(walker.next_page().await.unwrap().is_ok());
        assert!(walker.next_page().await.unwrap().is_ok());
        assert!(matches!(
            walker.next_page().await,
            Some(Err(PrError::Transport(_)))
        ));
        assert!(walker.next_page().await.is_none());
    }

    #[tokio::test]
    async fn test_collect_stops_at_decode_error() {
        let transport = FakeTransport::new().respond(P2, json!({ "values": "nope" }));
        let walker =
            PageWalker::new(&transport, "commits", RequestOptions::default(), first_page());
        let err = walker.collect_values().await.unwrap_err();
        assert!(matches!(err, PrError::Decode(_)));
    }
}
