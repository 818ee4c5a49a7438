//! Parameters controlling one load attempt.

use bitflags::bitflags;

bitflags! {
    /// Parts of the archive the caller wants skipped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SkipFlags: u32 {
        /// Do not apply user preferences embedded in the archive.
        const USERDEF = 1 << 0;
        /// Skip scene data entirely (header/UI probing only).
        const DATA = 1 << 1;
        /// On undo reloads, do not reuse records from the previous document.
        const NO_REUSE_OLD_IDS = 1 << 2;
    }
}

/// Options for one load attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadParams {
    pub skip: SkipFlags,
    /// Loading the built-in startup content rather than a user file.
    pub is_startup: bool,
    /// Keep the currently running interface instead of adopting the
    /// archive's window layout.
    pub keep_ui: bool,
}

impl LoadParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_skip(mut self, skip: SkipFlags) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub fn keep_ui(mut self, keep: bool) -> Self {
        self.keep_ui = keep;
        self
    }

    #[must_use]
    pub fn startup(mut self) -> Self {
        self.is_startup = true;
        self
    }
}
