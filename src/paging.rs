/// One page window over the filtered/sorted view, plus the 1-based display
/// bounds for the "Showing X-Y of Z records" line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a> {
    pub items: &'a [usize],
    pub page_index: usize,
    pub page_count: usize,
    pub start_record: usize,
    pub end_record: usize,
}

/// Slices the view into a fixed-size page. `page_index` is 1-based and gets
/// clamped into `[1, page_count]` before slicing; an empty view yields one
/// empty page with 0-0 bounds.
pub fn paginate<'a>(view: &'a [usize], page_index: usize, page_size: usize) -> Page<'a> {
    let page_size = page_size.max(1);
    let page_count = view.len().div_ceil(page_size).max(1);
    let page_index = page_index.clamp(1, page_count);

    let start = (page_index - 1) * page_size;
    let end = (start + page_size).min(view.len());
    let start = start.min(view.len());

    Page {
        items: &view[start..end],
        page_index,
        page_count,
        start_record: (start + 1).min(view.len()),
        end_record: end,
    }
}

/// Page numbers for rendering: all of them when at most five exist, else
/// first and last with a window around the current page. `None` marks an
/// ellipsis gap.
pub fn page_numbers(page_count: usize, current: usize) -> Vec<Option<usize>> {
    const MAX_VISIBLE: usize = 5;
    if page_count <= MAX_VISIBLE {
        return (1..=page_count).map(Some).collect();
    }
    let current = current.clamp(1, page_count);
    let left = current.saturating_sub(1).max(2);
    let right = (current + 1).min(page_count - 1);

    let mut pages = vec![Some(1)];
    if left > 2 {
        pages.push(None);
    }
    pages.extend((left..=right).map(Some));
    if right < page_count - 1 {
        pages.push(None);
    }
    pages.push(Some(page_count));
    pages
}
