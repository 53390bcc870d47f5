//! Offset pagination with the Stream API
//!
//! Turns a page-fetching function into a stream of pages or items, hiding
//! page arithmetic from callers. Used by the aggregation layer to pull a full
//! scoped row set in fixed batches.
//!
//! # Example
//!
//! ```rust,ignore
//! use fleetdesk_sdk::pager::ItemsPager;
//! use futures_util::TryStreamExt;
//!
//! let licenses: Vec<License> = ItemsPager::new(1000, |req| async move {
//!     client.list_licenses(&ctx, &filter, req).await
//! })
//! .try_collect()
//! .await?;
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use fleetdesk_query::{Page, PageRequest};
use futures_core::Stream;
use pin_project_lite::pin_project;

/// Whether `page` was the last one, judged by the reported total only. A
/// page may come back short or empty when the fetcher filters rows, and
/// paging still has to continue past it.
fn is_last<T>(page: &Page<T>) -> bool {
    !page.has_next()
}

pin_project! {
    /// Yields every item of every page, fetching pages on demand.
    pub struct ItemsPager<T, E, F, Fut>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
    {
        next: PageRequest,
        buffer: VecDeque<T>,
        done: bool,
        fetcher: F,
        #[pin]
        current_fetch: Option<Fut>,
    }
}

impl<T, E, F, Fut> ItemsPager<T, E, F, Fut>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    /// Start at page 1 with `batch` items per request.
    pub fn new(batch: u64, fetcher: F) -> Self {
        Self {
            next: PageRequest::new(1, batch.max(1)),
            buffer: VecDeque::new(),
            done: false,
            fetcher,
            current_fetch: None,
        }
    }
}

impl<T, E, F, Fut> Stream for ItemsPager<T, E, F, Fut>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(item) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if *this.done {
                return Poll::Ready(None);
            }

            if let Some(fut) = this.current_fetch.as_mut().as_pin_mut() {
                match fut.poll(cx) {
                    Poll::Ready(Ok(page)) => {
                        this.current_fetch.set(None);
                        *this.done = is_last(&page);
                        this.next.page += 1;
                        this.buffer.extend(page.items);
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        this.current_fetch.set(None);
                        *this.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            let fut = (this.fetcher)(*this.next);
            this.current_fetch.set(Some(fut));
        }
    }
}

pin_project! {
    /// Yields whole pages instead of individual items.
    pub struct PagesPager<T, E, F, Fut>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
    {
        next: PageRequest,
        done: bool,
        fetcher: F,
        #[pin]
        current_fetch: Option<Fut>,
    }
}

impl<T, E, F, Fut> PagesPager<T, E, F, Fut>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    /// Start at `first` (clamped to page 1 at least).
    pub fn new(first: PageRequest, fetcher: F) -> Self {
        Self {
            next: PageRequest::new(first.page.max(1), first.limit.max(1)),
            done: false,
            fetcher,
            current_fetch: None,
        }
    }
}

impl<T, E, F, Fut> Stream for PagesPager<T, E, F, Fut>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    type Item = Result<Page<T>, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.done {
            return Poll::Ready(None);
        }

        if this.current_fetch.is_none() {
            let fut = (this.fetcher)(*this.next);
            this.current_fetch.set(Some(fut));
        }

        let Some(fut) = this.current_fetch.as_mut().as_pin_mut() else {
            return Poll::Ready(None);
        };
        match fut.poll(cx) {
            Poll::Ready(Ok(page)) => {
                this.current_fetch.set(None);
                *this.done = is_last(&page);
                this.next.page += 1;
                Poll::Ready(Some(Ok(page)))
            }
            Poll::Ready(Err(e)) => {
                this.current_fetch.set(None);
                *this.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
