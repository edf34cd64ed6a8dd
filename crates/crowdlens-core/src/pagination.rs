//! Page-number windowing for paged record views.

use std::fmt;

use serde::{Serialize, Serializer};

/// Above this many pages the window collapses with ellipses.
const FULL_WINDOW: u32 = 7;

/// One slot in a rendered page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMarker {
    Page(u32),
    Ellipsis,
}

impl fmt::Display for PageMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(n) => write!(f, "{n}"),
            Self::Ellipsis => f.write_str("..."),
        }
    }
}

impl Serialize for PageMarker {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Page(n) => ser.serialize_u32(*n),
            Self::Ellipsis => ser.serialize_str("..."),
        }
    }
}

/// Window of page markers around `current` out of `total` pages.
///
/// At most seven pages are listed in full. Beyond that the first and last
/// page are always shown along with `current` and its neighbours.
pub fn page_window(total: u32, current: u32) -> Vec<PageMarker> {
    if total <= FULL_WINDOW {
        return (1..=total).map(PageMarker::Page).collect();
    }

    let mut window = vec![PageMarker::Page(1)];
    if current > 3 {
        window.push(PageMarker::Ellipsis);
    }

    let start = current.saturating_sub(1).max(2);
    let end = current.saturating_add(1).min(total - 1);
    window.extend((start..=end).map(PageMarker::Page));

    if current < total.saturating_sub(2) {
        window.push(PageMarker::Ellipsis);
    }
    window.push(PageMarker::Page(total));
    window
}

/// Render a window as `1 2 ... 10`, marking `current` with brackets.
pub fn render_window(window: &[PageMarker], current: u32) -> String {
    window
        .iter()
        .map(|m| match m {
            PageMarker::Page(n) if *n == current => format!("[{n}]"),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pagination state for one paged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pager {
    current_page: u32,
    total_pages: u32,
    page_size: u32,
    total_records: u64,
}

impl Pager {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
            page_size: page_size.max(1),
            total_records: 0,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    /// Move to `page` if it lies in `[1, total_pages]`.
    pub fn go_to_page(&mut self, page: u32) -> bool {
        if page < 1 || page > self.total_pages {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    /// Apply totals from a fetched page, keeping the current page in range.
    pub fn update_totals(&mut self, total_records: u64, total_pages: u32) {
        self.total_records = total_records;
        self.total_pages = total_pages;
        self.current_page = self.current_page.clamp(1, total_pages.max(1));
    }

    pub fn window(&self) -> Vec<PageMarker> {
        page_window(self.total_pages, self.current_page)
    }

    /// 1-based record range shown on the current page, or `None` when empty.
    pub fn showing(&self) -> Option<(u64, u64)> {
        if self.total_records == 0 {
            return None;
        }
        let size = u64::from(self.page_size);
        let first = u64::from(self.current_page - 1) * size + 1;
        let last = (first + size - 1).min(self.total_records);
        Some((first, last))
    }
}
