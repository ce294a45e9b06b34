//! Navigation seam between the client logic and whatever view layer hosts it.
//!
//! The poller and app flow drive navigation through the `Navigator` trait;
//! the view layer supplies the implementation. `MemoryRouter` is the
//! in-process implementation used by tests and headless consumers.

use parking_lot::Mutex;

/// Logical pages of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Entry page; triggers a best-effort server reset.
    Home,
    /// File selection, upload, and run trigger.
    Upload,
    /// Poll progress; auto-navigates to `Result` on completion.
    Analysis,
    /// Terminal display of the finished analysis.
    Result,
}

impl Page {
    /// Route path for this page.
    pub fn path(&self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::Upload => "/upload",
            Page::Analysis => "/analysis",
            Page::Result => "/result",
        }
    }
}

/// Trait for driving page navigation.
pub trait Navigator: Send + Sync {
    /// Transition to the given page.
    fn navigate(&self, page: Page);

    /// The page currently shown.
    fn current(&self) -> Page;
}

/// In-memory router.
///
/// Records the full navigation history so tests can assert transition counts
/// (e.g., that the results page was reached exactly once).
pub struct MemoryRouter {
    current: Mutex<Page>,
    history: Mutex<Vec<Page>>,
}

impl MemoryRouter {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Page::Home),
            history: Mutex::new(vec![Page::Home]),
        }
    }

    /// Every page visited, in order, starting with `Home`.
    pub fn history(&self) -> Vec<Page> {
        self.history.lock().clone()
    }

    /// How many times a page has been navigated to.
    pub fn visits(&self, page: Page) -> usize {
        self.history.lock().iter().filter(|p| **p == page).count()
    }
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for MemoryRouter {
    fn navigate(&self, page: Page) {
        tracing::info!(path = page.path(), "Navigating");
        *self.current.lock() = page;
        self.history.lock().push(page);
    }

    fn current(&self) -> Page {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_tracks_current_and_history() {
        let router = MemoryRouter::new();
        assert_eq!(router.current(), Page::Home);

        router.navigate(Page::Upload);
        router.navigate(Page::Analysis);
        router.navigate(Page::Result);

        assert_eq!(router.current(), Page::Result);
        assert_eq!(
            router.history(),
            vec![Page::Home, Page::Upload, Page::Analysis, Page::Result]
        );
        assert_eq!(router.visits(Page::Result), 1);
    }
}
