pub mod extensions;
pub mod pairing;
pub mod walk;

pub use extensions::{ExtensionSet, FileKind, SUBTITLE_CONTAINER_EXTENSIONS};
pub use pairing::{MediaPairing, ScanFile, ScanFolder};
pub use walk::{count_files, walk, DirWalk, DirectoryBatch};
