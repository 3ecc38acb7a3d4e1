//! Desktop collaborators: folder picker, file manager and dialogs

use std::io;
use std::path::{Path, PathBuf};

use rfd::{AsyncFileDialog, MessageDialog, MessageLevel};

/// Ask the user for a folder. `None` when the dialog is cancelled.
pub async fn pick_folder() -> Option<PathBuf> {
    AsyncFileDialog::new()
        .set_title("Open folder")
        .pick_folder()
        .await
        .map(|handle| handle.path().to_path_buf())
}

/// Show `path` in the platform file manager. Folders are opened, files are
/// revealed inside their parent folder.
pub fn reveal(path: &Path) -> io::Result<()> {
    let result = if path.is_dir() {
        opener::open(path)
    } else {
        opener::reveal(path)
    };
    result.map_err(io::Error::other)
}

/// Blocking native error dialog
pub fn show_error(title: &str, description: &str) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_description(description)
        .show();
}
