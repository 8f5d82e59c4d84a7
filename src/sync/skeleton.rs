use tokio::sync::watch;

/// UI surfaces that render a loading skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Feeds,
    Tags,
    Articles,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkeletonFlags {
    pub feeds: bool,
    pub tags: bool,
    pub articles: bool,
}

impl SkeletonFlags {
    pub const ALL: Self = Self {
        feeds: true,
        tags: true,
        articles: true,
    };

    pub const NONE: Self = Self {
        feeds: false,
        tags: false,
        articles: false,
    };

    pub fn is_refreshing(&self) -> bool {
        self.feeds || self.tags || self.articles
    }

    fn slot(&mut self, surface: Surface) -> &mut bool {
        match surface {
            Surface::Feeds => &mut self.feeds,
            Surface::Tags => &mut self.tags,
            Surface::Articles => &mut self.articles,
        }
    }
}

/// Owns the skeleton flags; front ends observe them through [`subscribe`].
///
/// Every call publishes at most one change, so `show_all` and `hide_all`
/// never expose an intermediate state where only some surfaces flipped.
///
/// [`subscribe`]: SkeletonStateManager::subscribe
#[derive(Debug)]
pub struct SkeletonStateManager {
    tx: watch::Sender<SkeletonFlags>,
}

impl SkeletonStateManager {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SkeletonFlags::NONE);
        Self { tx }
    }

    fn set(&self, next: SkeletonFlags) {
        self.tx.send_if_modified(|flags| {
            if *flags == next {
                return false;
            }
            *flags = next;
            true
        });
    }

    fn update_surface(&self, surface: Surface, visible: bool) {
        self.tx.send_if_modified(|flags| {
            let slot = flags.slot(surface);
            if *slot == visible {
                return false;
            }
            *slot = visible;
            true
        });
    }

    pub fn show_all(&self) {
        self.set(SkeletonFlags::ALL);
    }

    pub fn hide_all(&self) {
        self.set(SkeletonFlags::NONE);
    }

    pub fn show_surface(&self, surface: Surface) {
        self.update_surface(surface, true);
    }

    pub fn hide_surface(&self, surface: Surface) {
        self.update_surface(surface, false);
    }

    pub fn flags(&self) -> SkeletonFlags {
        *self.tx.borrow()
    }

    pub fn is_any_visible(&self) -> bool {
        self.flags().is_refreshing()
    }

    pub fn subscribe(&self) -> watch::Receiver<SkeletonFlags> {
        self.tx.subscribe()
    }
}

impl Default for SkeletonStateManager {
    fn default() -> Self {
        Self::new()
    }
}
