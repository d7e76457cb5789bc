pub mod packager;
pub mod workdir;

pub use packager::ArchivePackager;
pub use workdir::WorkingDirectory;
