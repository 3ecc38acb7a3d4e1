//! Keyboard shortcuts

use iced::keyboard::key::Named;
use iced::keyboard::{Key, Modifiers};

use raw_culler::Score;

/// What a key press asks the application to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    OpenFolder,
    Save,
    Next,
    Prev,
    Rate(Score),
    ToggleAccept,
    ShowViewer,
    ShowGallery,
    ShowProjects,
    RetryThumbnail,
    ZoomIn,
    ZoomOut,
    ToggleFullscreen,
    ToggleHelp,
    /// Escape backs out one level
    Back,
}

/// What a [`Command::Back`] undoes, innermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackStep {
    ExitFullscreen,
    CloseHelp,
    /// Drop the multi-selection and show the grid
    Gallery,
}

impl BackStep {
    pub fn next(fullscreen: bool, help_open: bool) -> Self {
        if fullscreen {
            BackStep::ExitFullscreen
        } else if help_open {
            BackStep::CloseHelp
        } else {
            BackStep::Gallery
        }
    }
}

/// Rows of the keyboard help overlay
pub const SHORTCUTS: &[(&str, &str)] = &[
    ("Ctrl/Cmd+O", "Open folder"),
    ("Ctrl/Cmd+S", "Save ratings"),
    ("Left / Right", "Previous / next image"),
    ("1-5", "Rate"),
    ("N", "Reject"),
    ("U", "Clear rating"),
    ("Space", "Quick accept"),
    ("Enter / V", "Viewer"),
    ("G", "Gallery"),
    ("P", "Projects"),
    ("R", "Retry thumbnail"),
    ("Z / X", "Zoom in / out"),
    ("F11", "Fullscreen"),
    ("Esc", "Exit fullscreen, close help or back to gallery"),
    ("?", "This help"),
];

/// Map a key press to a command. Letters match regardless of case.
///
/// - Ctrl/Cmd+O open, Ctrl/Cmd+S save
/// - Left/Right navigate
/// - 1-5 rate, `n` reject, `u` clear, Space toggles a quick accept
/// - Enter/`v` viewer, `g` gallery, `p` projects, `r` retry thumbnail
/// - `z`/`x` zoom, F11 fullscreen, `?` help, Escape backs out
pub fn command(key: Key<&str>, modifiers: Modifiers) -> Option<Command> {
    let lowered;
    let key = match key {
        Key::Character(c) => {
            lowered = c.to_lowercase();
            Key::Character(lowered.as_str())
        }
        other => other,
    };

    if modifiers.command() {
        return match key {
            Key::Character("o") => Some(Command::OpenFolder),
            Key::Character("s") => Some(Command::Save),
            _ => None,
        };
    }

    match key {
        Key::Named(Named::ArrowRight) => Some(Command::Next),
        Key::Named(Named::ArrowLeft) => Some(Command::Prev),
        Key::Named(Named::Space) => Some(Command::ToggleAccept),
        Key::Named(Named::Enter) => Some(Command::ShowViewer),
        Key::Named(Named::Escape) => Some(Command::Back),
        Key::Named(Named::F11) => Some(Command::ToggleFullscreen),
        Key::Character(c) => match c {
            "1" | "2" | "3" | "4" | "5" => c.parse::<u8>().ok().map(|n| Command::Rate(Score::stars(n))),
            "n" => Some(Command::Rate(Score::REJECTED)),
            "u" => Some(Command::Rate(Score::UNSCORED)),
            "v" => Some(Command::ShowViewer),
            "g" => Some(Command::ShowGallery),
            "p" => Some(Command::ShowProjects),
            "r" => Some(Command::RetryThumbnail),
            "z" => Some(Command::ZoomIn),
            "x" => Some(Command::ZoomOut),
            "?" => Some(Command::ToggleHelp),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_keys() {
        let none = Modifiers::empty();
        assert_eq!(command(Key::Character("3"), none), Some(Command::Rate(Score::stars(3))));
        assert_eq!(command(Key::Character("n"), none), Some(Command::Rate(Score::REJECTED)));
        assert_eq!(command(Key::Character("u"), none), Some(Command::Rate(Score::UNSCORED)));
        assert_eq!(command(Key::Named(Named::Space), none), Some(Command::ToggleAccept));
        assert_eq!(command(Key::Character("0"), none), None);
    }

    #[test]
    fn test_modified_keys() {
        assert_eq!(command(Key::Character("s"), Modifiers::COMMAND), Some(Command::Save));
        assert_eq!(command(Key::Character("o"), Modifiers::COMMAND), Some(Command::OpenFolder));
        // Modified digits are not ratings
        assert_eq!(command(Key::Character("3"), Modifiers::COMMAND), None);
        assert_eq!(command(Key::Character("s"), Modifiers::empty()), None);
    }

    #[test]
    fn test_navigation_keys() {
        let none = Modifiers::empty();
        assert_eq!(command(Key::Named(Named::ArrowLeft), none), Some(Command::Prev));
        assert_eq!(command(Key::Named(Named::Escape), none), Some(Command::Back));
        assert_eq!(command(Key::Character("v"), none), Some(Command::ShowViewer));
    }

    #[test]
    fn test_letters_ignore_case() {
        let shift = Modifiers::SHIFT;
        assert_eq!(command(Key::Character("N"), shift), Some(Command::Rate(Score::REJECTED)));
        assert_eq!(command(Key::Character("G"), shift), Some(Command::ShowGallery));
        assert_eq!(command(Key::Character("V"), shift), Some(Command::ShowViewer));
        assert_eq!(command(Key::Character("Z"), shift), Some(Command::ZoomIn));
        assert_eq!(command(Key::Character("S"), Modifiers::COMMAND | shift), Some(Command::Save));
    }

    #[test]
    fn test_viewer_keys() {
        let none = Modifiers::empty();
        assert_eq!(command(Key::Character("z"), none), Some(Command::ZoomIn));
        assert_eq!(command(Key::Character("x"), none), Some(Command::ZoomOut));
        assert_eq!(command(Key::Named(Named::F11), none), Some(Command::ToggleFullscreen));
        assert_eq!(command(Key::Character("?"), Modifiers::SHIFT), Some(Command::ToggleHelp));
        assert_eq!(command(Key::Character("?"), Modifiers::COMMAND), None);
    }

    #[test]
    fn test_back_unwinds_innermost_first() {
        assert_eq!(BackStep::next(true, true), BackStep::ExitFullscreen);
        assert_eq!(BackStep::next(false, true), BackStep::CloseHelp);
        assert_eq!(BackStep::next(false, false), BackStep::Gallery);
    }

    #[test]
    fn test_help_lists_every_binding_once() {
        let keys: Vec<_> = SHORTCUTS.iter().map(|(key, _)| *key).collect();
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
        assert!(keys.contains(&"F11"));
        assert!(keys.contains(&"Z / X"));
    }
}
