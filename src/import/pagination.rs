use super::{Page, ProviderError};
use std::future::Future;
use tracing::debug;

/// Page size used for every provider listing.
pub const PAGE_SIZE: usize = 50;

/// Walks a paginated listing to the end, concatenating pages in arrival order.
///
/// `fetch_page` receives `(offset, limit)`. Pages are requested strictly one
/// after another. The first failing page aborts the walk and its error is
/// returned; items gathered so far are dropped.
pub async fn fetch_all<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut items = Vec::new();
    let mut offset = 0;

    loop {
        let page = fetch_page(offset, PAGE_SIZE).await?;
        debug!(
            "Fetched page at offset {}: {} entries, {} usable, {} total",
            offset,
            page.fetched,
            page.items.len(),
            page.total
        );

        let fetched = page.fetched;
        let total = page.total;
        items.extend(page.items);

        // An empty page ends the walk even if the reported total says otherwise.
        if fetched == 0 || offset + fetched >= total {
            break;
        }
        offset += fetched;
    }

    Ok(items)
}
