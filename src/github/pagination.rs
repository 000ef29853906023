//! Pagination state for GitHub API responses.
//!
//! REST listings are numbered pages described by [`PageInfo`]. GraphQL
//! connections are walked with an opaque continuation cursor tracked by
//! [`CursorState`].

/// Current page state for numbered REST results.
///
/// # Example
///
/// ```
/// use prharvest::github::pagination::PageInfo;
///
/// let info = PageInfo::new(2, 50).with_has_next(true);
/// assert!(!info.is_first_page());
/// assert!(!info.is_last_page());
/// assert_eq!(info.next_page(), Some(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// Current page number (1-based).
    current_page: u32,
    /// Items per page.
    per_page: u8,
    /// Whether more pages exist after the current one.
    has_next: bool,
}

impl PageInfo {
    /// Creates a new page info instance with no following page.
    #[must_use]
    pub const fn new(current_page: u32, per_page: u8) -> Self {
        Self {
            current_page,
            per_page,
            has_next: false,
        }
    }

    /// Sets whether there is a next page.
    #[must_use]
    pub const fn with_has_next(mut self, has_next: bool) -> Self {
        self.has_next = has_next;
        self
    }

    /// Returns the current page number (1-based).
    #[must_use]
    pub const fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Returns the number of items per page.
    #[must_use]
    pub const fn per_page(&self) -> u8 {
        self.per_page
    }

    /// Returns true if more pages exist after the current one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.has_next
    }

    /// Returns true if this is the first page.
    #[must_use]
    pub const fn is_first_page(&self) -> bool {
        self.current_page == 1
    }

    /// Returns true if this is the last page.
    #[must_use]
    pub const fn is_last_page(&self) -> bool {
        !self.has_next
    }

    /// Page number to request next, if any.
    #[must_use]
    pub const fn next_page(&self) -> Option<u32> {
        if self.has_next {
            self.current_page.checked_add(1)
        } else {
            None
        }
    }
}

impl Default for PageInfo {
    fn default() -> Self {
        Self::new(1, 30)
    }
}

/// Position within a cursor-paginated GraphQL connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CursorState {
    /// No page has been requested yet.
    #[default]
    Start,
    /// More pages follow; resume after this cursor.
    After(String),
    /// The connection has been fully walked.
    Exhausted,
}

impl CursorState {
    /// Builds the next state from a page's `hasNextPage` / `endCursor`.
    ///
    /// A page that claims more results but omits its cursor is treated as
    /// the end of the connection so the caller cannot loop forever.
    #[must_use]
    pub fn advance(has_next_page: bool, end_cursor: Option<String>) -> Self {
        match (has_next_page, end_cursor) {
            (true, Some(cursor)) => Self::After(cursor),
            _ => Self::Exhausted,
        }
    }

    /// The `after:` argument for the next request.
    #[must_use]
    pub fn as_after(&self) -> Option<&str> {
        match self {
            Self::After(cursor) => Some(cursor.as_str()),
            Self::Start | Self::Exhausted => None,
        }
    }

    /// Returns true once no further pages remain.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}
