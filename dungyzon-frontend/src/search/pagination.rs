use dungyzon_common::PaginationState;

/// Page count reported when the server gives no total but the page was full
pub const ASSUMED_MIN_PAGES: u32 = 10;

/// Derives pagination for `page` from one result page.
///
/// With a server total, `total_pages = ceil(total / items_per_page)`.
/// Without one, the page's own size stands in for the total: a full page
/// assumes more pages exist (`max(10, page + 1)`), a short page is the last.
pub fn derive_pagination(page: u32, item_count: usize, total: Option<u64>, items_per_page: u32) -> PaginationState {
    let items_per_page = items_per_page.max(1);

    let (total, total_pages) = match total {
        Some(total) => {
            let pages = total.div_ceil(u64::from(items_per_page));
            (total, u32::try_from(pages).unwrap_or(u32::MAX))
        }
        None => {
            let pages = if item_count >= items_per_page as usize {
                ASSUMED_MIN_PAGES.max(page.saturating_add(1))
            } else {
                page
            };
            (item_count as u64, pages)
        }
    };

    PaginationState {
        page,
        total_pages,
        total,
        has_more: page < total_pages,
        items_per_page,
    }
}
