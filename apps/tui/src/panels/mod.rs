//! TUI panels.
//!
//! Each panel owns its own selection state, rendering and key handling;
//! the app routes keys to whichever panel has focus.

pub(crate) mod history;
pub(crate) mod input;
pub(crate) mod sidebar;

/// Panel that receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Focus {
    Input,
    Sidebar,
    History,
}

impl Focus {
    /// Next panel in Tab order.
    pub(crate) fn next(self) -> Self {
        match self {
            Self::Input => Self::Sidebar,
            Self::Sidebar => Self::History,
            Self::History => Self::Input,
        }
    }

    /// Previous panel in Tab order.
    pub(crate) fn prev(self) -> Self {
        match self {
            Self::Input => Self::History,
            Self::Sidebar => Self::Input,
            Self::History => Self::Sidebar,
        }
    }
}
