//! Pagination cursor engine.
//!
//! Drives successive page requests against a [`PageTransport`],
//! tracking the opaque continuation token. The request template is
//! fixed for the whole run; only the `cursor` field changes between
//! pages. Token absence is the one and only terminal condition — an
//! empty page that still carries a token keeps the run going.

use serde_json::Value;
use tracetap_types::wire::{ContinuationToken, PageRequest};

use crate::error::Result;
use crate::transport::PageTransport;

/// Pagination state machine: `Start -> (More -> )* Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// No page fetched yet; the first request carries no token.
    Start,
    /// The API returned a token; at least one more page exists.
    More(ContinuationToken),
    /// The API omitted or nulled the token; the stream is exhausted.
    Done,
}

/// Walks the pages of one run.
pub struct Paginator<'a, T: PageTransport> {
    transport: &'a T,
    template: PageRequest,
    state: PageState,
    pages_fetched: u64,
}

impl<'a, T: PageTransport> Paginator<'a, T> {
    /// Create a paginator from the per-run request template.
    ///
    /// Any token on the template is cleared; the paginator owns cursor
    /// placement from here on.
    #[must_use]
    pub fn new(transport: &'a T, mut template: PageRequest) -> Self {
        template.cursor = None;
        Self {
            transport,
            template,
            state: PageState::Start,
            pages_fetched: 0,
        }
    }

    /// Current pagination state.
    #[must_use]
    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Whether the stream is exhausted.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == PageState::Done
    }

    /// Pages fetched so far.
    #[must_use]
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Fetch the next page of raw records.
    ///
    /// Returns `Ok(Some(records))` for every fetched page, including
    /// empty ones, and `Ok(None)` once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates transport failures as
    /// [`ExtractError::PageFetch`](crate::error::ExtractError::PageFetch);
    /// there is no retry at this layer.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        let cursor = match &self.state {
            PageState::Done => return Ok(None),
            PageState::Start => None,
            PageState::More(token) => Some(token.clone()),
        };

        let mut request = self.template.clone();
        request.cursor = cursor;

        let response = self.transport.fetch_page(&request).await?;
        self.pages_fetched += 1;

        self.state = match response.next_token() {
            Some(token) => PageState::More(token.clone()),
            None => PageState::Done,
        };
        tracing::debug!(
            page = self.pages_fetched,
            records = response.runs.len(),
            done = self.is_done(),
            "Fetched page"
        );

        Ok(Some(response.runs))
    }
}
