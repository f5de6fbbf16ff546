use rusqlite::{Connection, OpenFlags, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Handle on the media store.
///
/// In read/write mode every mutation happens inside an open transaction; nothing is
/// visible to other handles until `commit_and_renew` (or `close`) is called. Dropping
/// the handle without either discards pending writes.
pub struct Database {
    conn: Connection,
    location: Location,
    mode: OpenMode,
    pub(super) duplicate_files: u64,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn, Location::File(path.to_path_buf()), OpenMode::ReadWrite)
    }

    /// Open without taking a write lock. Falls back to a read/write open (which creates
    /// the file and schema) when the store does not exist yet.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("{} does not exist, creating it", path.display());
            return Self::open(path);
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::init(conn, Location::File(path.to_path_buf()), OpenMode::ReadOnly)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, Location::Memory, OpenMode::ReadWrite)
    }

    fn init(conn: Connection, location: Location, mode: OpenMode) -> Result<Self> {
        let db = Database {
            conn,
            location,
            mode,
            duplicate_files: 0,
        };
        if mode == OpenMode::ReadWrite {
            db.configure_pragmas()?;
            db.create_schema()?;
            db.begin()?;
        }
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured");
        Ok(())
    }

    pub(super) fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))
    }

    fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")
    }

    fn commit(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Duplicates seen by `insert_media` since this session started.
    pub fn duplicate_files(&self) -> u64 {
        self.duplicate_files
    }

    /// Flush pending writes, reopen a fresh handle and start a new session.
    pub fn commit_and_renew(&mut self) -> Result<()> {
        self.commit()?;
        match (&self.location, self.mode) {
            (Location::File(path), OpenMode::ReadWrite) => {
                self.conn = Connection::open(path)?;
                self.configure_pragmas()?;
                self.begin()?;
            }
            (Location::File(path), OpenMode::ReadOnly) => {
                self.conn = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
            }
            (Location::Memory, _) => self.begin()?,
        }
        self.duplicate_files = 0;
        debug!("Store committed and renewed");
        Ok(())
    }

    /// Commit pending writes and close the handle.
    pub fn close(self) -> Result<()> {
        self.commit()
    }
}
