use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::error::CatalogError;

/// A folder from the "recently opened" list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentFolder {
    pub path: PathBuf,
    pub last_opened: DateTime<Utc>,
}

/// A named group of folders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub folders: Vec<PathBuf>,
}

/// The Catalog manages the SQLite database behind the home screen.
/// It remembers opened folders and user-defined projects; ratings never
/// live here, they stay in each folder's sidecar.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open the catalog in the user's data directory:
    /// - Linux: ~/.local/share/raw-culler/catalog.db
    /// - macOS: ~/Library/Application Support/raw-culler/catalog.db
    /// - Windows: %APPDATA%\raw-culler\catalog.db
    pub fn open_default() -> Result<Self, CatalogError> {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(CatalogError::NoDataDir)?;
        path.push("raw-culler");
        path.push("catalog.db");
        Self::open(&path)
    }

    pub fn open(db_path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        tracing::info!("📁 Catalog opened at: {}", db_path.display());

        let catalog = Catalog { conn };
        catalog.init_schema()?;
        Ok(catalog)
    }

    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let catalog = Catalog {
            conn: Connection::open_in_memory()?,
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Create all tables if they don't exist
    fn init_schema(&self) -> Result<(), CatalogError> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS folders (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                path            TEXT NOT NULL UNIQUE,
                last_opened     INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS project_folders (
                project_id      INTEGER NOT NULL,
                path            TEXT NOT NULL,
                added_at        INTEGER NOT NULL,
                PRIMARY KEY (project_id, path),
                FOREIGN KEY(project_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_folders_last_opened
            ON folders(last_opened DESC);",
        )?;
        Ok(())
    }

    /// Remember that `folder` was just opened
    pub fn record_folder_opened(&self, folder: &Path) -> Result<(), CatalogError> {
        // Strictly increasing so that opens within the same millisecond
        // still order correctly
        let latest: Option<i64> = self
            .conn
            .query_row("SELECT MAX(last_opened) FROM folders", [], |row| row.get(0))?;
        let now = Utc::now()
            .timestamp_millis()
            .max(latest.map_or(i64::MIN, |t| t + 1));

        self.conn.execute(
            "INSERT INTO folders (path, last_opened) VALUES (?1, ?2)
             ON CONFLICT(path) DO UPDATE SET last_opened = excluded.last_opened",
            params![path_text(folder), now],
        )?;
        Ok(())
    }

    /// Most recently opened folders first
    pub fn recent_folders(&self, limit: usize) -> Result<Vec<RecentFolder>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, last_opened FROM folders ORDER BY last_opened DESC LIMIT ?1")?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(RecentFolder {
                path: PathBuf::from(row.get::<_, String>(0)?),
                last_opened: timestamp(row.get(1)?),
            })
        })?;

        let mut folders = Vec::new();
        for folder in rows {
            folders.push(folder?);
        }
        Ok(folders)
    }

    pub fn forget_folder(&self, folder: &Path) -> Result<(), CatalogError> {
        self.conn
            .execute("DELETE FROM folders WHERE path = ?1", [path_text(folder)])?;
        Ok(())
    }

    /// Create a project; returns its id
    pub fn add_project(&self, name: &str) -> Result<i64, CatalogError> {
        let name = valid_name(name)?;
        self.conn.execute(
            "INSERT INTO projects (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().timestamp_millis()],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!("🗂️  Created project {} ({})", name, id);
        Ok(id)
    }

    pub fn rename_project(&self, id: i64, name: &str) -> Result<(), CatalogError> {
        let name = valid_name(name)?;
        let changed = self
            .conn
            .execute("UPDATE projects SET name = ?1 WHERE id = ?2", params![name, id])?;
        if changed == 0 {
            return Err(CatalogError::UnknownProject(id));
        }
        Ok(())
    }

    pub fn delete_project(&self, id: i64) -> Result<(), CatalogError> {
        let changed = self.conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(CatalogError::UnknownProject(id));
        }
        Ok(())
    }

    /// Attach `folder` to a project. Returns `false` if it was already there.
    pub fn add_folder_to_project(&self, id: i64, folder: &Path) -> Result<bool, CatalogError> {
        let exists = self
            .conn
            .query_row("SELECT 1 FROM projects WHERE id = ?1", [id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Err(CatalogError::UnknownProject(id));
        }

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO project_folders (project_id, path, added_at) VALUES (?1, ?2, ?3)",
            params![id, path_text(folder), Utc::now().timestamp_millis()],
        )?;
        Ok(inserted > 0)
    }

    /// All projects with their folders, oldest project first
    pub fn projects(&self) -> Result<Vec<Project>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM projects ORDER BY created_at, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Project {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: timestamp(row.get(2)?),
                folders: Vec::new(),
            })
        })?;

        let mut projects = Vec::new();
        for project in rows {
            projects.push(project?);
        }

        let mut folder_stmt = self.conn.prepare(
            "SELECT path FROM project_folders WHERE project_id = ?1 ORDER BY added_at, path",
        )?;
        for project in &mut projects {
            let folders = folder_stmt.query_map([project.id], |row| row.get::<_, String>(0))?;
            for folder in folders {
                project.folders.push(PathBuf::from(folder?));
            }
        }

        Ok(projects)
    }
}

fn valid_name(name: &str) -> Result<&str, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        Err(CatalogError::EmptyName)
    } else {
        Ok(name)
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_recent_folders_newest_first() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.record_folder_opened(Path::new("/photos/a")).unwrap();
        catalog.record_folder_opened(Path::new("/photos/b")).unwrap();
        catalog.record_folder_opened(Path::new("/photos/a")).unwrap();

        let recent = catalog.recent_folders(10).unwrap();
        let paths: Vec<_> = recent.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/photos/a"), PathBuf::from("/photos/b")]);
        assert_eq!(catalog.recent_folders(1).unwrap().len(), 1);

        catalog.forget_folder(Path::new("/photos/a")).unwrap();
        assert_eq!(catalog.recent_folders(10).unwrap().len(), 1);
    }

    #[test]
    fn test_projects() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.add_project("  Wedding  ").unwrap();
        assert!(catalog.add_folder_to_project(id, Path::new("/photos/ceremony")).unwrap());
        assert!(!catalog.add_folder_to_project(id, Path::new("/photos/ceremony")).unwrap());
        assert!(catalog.add_folder_to_project(id, Path::new("/photos/party")).unwrap());
        catalog.rename_project(id, "Wedding 2024").unwrap();

        let projects = catalog.projects().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Wedding 2024");
        assert_eq!(projects[0].folders.len(), 2);

        catalog.delete_project(id).unwrap();
        assert!(catalog.projects().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_project_operations() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert!(matches!(catalog.add_project("   "), Err(CatalogError::EmptyName)));
        let id = catalog.add_project("Trip").unwrap();
        assert!(matches!(catalog.rename_project(id, ""), Err(CatalogError::EmptyName)));
        assert!(matches!(
            catalog.rename_project(id + 1, "x"),
            Err(CatalogError::UnknownProject(_))
        ));
        assert!(matches!(
            catalog.add_folder_to_project(id + 1, Path::new("/x")),
            Err(CatalogError::UnknownProject(_))
        ));
    }

    #[test]
    fn test_catalog_persists_on_disk() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("nested").join("catalog.db");
        {
            let catalog = Catalog::open(&db).unwrap();
            catalog.record_folder_opened(Path::new("/photos/a")).unwrap();
        }
        let catalog = Catalog::open(&db).unwrap();
        assert!(db.is_file());
        assert_eq!(catalog.recent_folders(5).unwrap().len(), 1);
    }
}
