//! Built-in startup content.

use scar_archive::{ArchiveBuilder, WindowSpec};
use scar_model::WindowId;

/// The default startup archive, loaded when no file is given (and as the
/// fallback content for a fresh session).
///
/// One workspace with a single layout, shown by one active window.
pub fn startup_archive() -> Vec<u8> {
    ArchiveBuilder::new()
        .global(0)
        .user_prefs(100, "default")
        .screen("Layout", 3, Some(WindowId(1)))
        .workspace("General", &[("Layout", 0)], &[(WindowId(1), 0)])
        .window_manager(
            "Main",
            &[WindowSpec::new(WindowId(1)).showing(0, 0).active()],
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scar_archive::header::MAGIC;

    #[test]
    fn test_startup_archive_carries_format_tag() {
        let bytes = startup_archive();
        assert_eq!(&bytes[..6], &MAGIC);
    }
}
