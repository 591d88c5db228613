//! Archive reader
//!
//! Source archives come as tarballs (optionally gzip, bzip2 or xz
//! compressed) or zip containers (`.zip`, `.egg`). [`Archive`] gives both a
//! uniform "list entries / read entry" view. The container family is chosen
//! once, at open time, from the file name.
//!
//! Underlying file handles are owned by the values created here and are
//! closed when they are dropped, including on early error returns.

use crate::MirrorError;
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use xz2::read::XzDecoder;
use zip::ZipArchive;

/// Compression applied to a tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

/// Container family of an archive file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar(TarCompression),
    Zip,
}

impl ArchiveFormat {
    /// Detects the container format from a file name
    ///
    /// Returns `None` for anything that is neither a zip-family file
    /// (`.zip`, `.egg`) nor a tar-family file (`.tar` anywhere in the name,
    /// or `.tgz`/`.tbz`/`.tbz2`/`.txz`) with a supported compression.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();

        if name.ends_with(".zip") || name.ends_with(".egg") {
            return Some(Self::Zip);
        }

        let extension = name.rsplit('.').next()?;
        match extension {
            "tgz" => return Some(Self::Tar(TarCompression::Gzip)),
            "tbz" | "tbz2" => return Some(Self::Tar(TarCompression::Bzip2)),
            "txz" => return Some(Self::Tar(TarCompression::Xz)),
            _ => {}
        }

        if !name.contains(".tar") {
            return None;
        }

        let compression = match extension {
            "tar" => TarCompression::None,
            "gz" => TarCompression::Gzip,
            "bz2" => TarCompression::Bzip2,
            "xz" => TarCompression::Xz,
            _ => return None,
        };
        Some(Self::Tar(compression))
    }
}

/// One entry of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    /// Path of the entry inside the archive
    pub name: String,

    /// Whether the entry is a directory
    pub is_dir: bool,

    /// Position of the entry in the archive
    index: usize,
}

/// An open archive of either container family
pub enum Archive {
    /// Tar entries can only be reached by streaming, so the reader reopens
    /// the file for each pass.
    Tar {
        path: PathBuf,
        compression: TarCompression,
    },
    Zip {
        path: PathBuf,
        archive: ZipArchive<File>,
    },
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tar { path, compression } => f
                .debug_struct("Tar")
                .field("path", path)
                .field("compression", compression)
                .finish(),
            Self::Zip { path, .. } => f.debug_struct("Zip").field("path", path).finish(),
        }
    }
}

impl Archive {
    /// Opens an archive, choosing the reader from the file name
    ///
    /// # Returns
    ///
    /// * `Ok(Archive)` - The archive is open and readable
    /// * `Err(MirrorError::UnsupportedFormat)` - The name matches no known container
    /// * `Err(MirrorError::ExtractionFailed)` - The file could not be opened
    pub fn open(path: &Path) -> Result<Self, MirrorError> {
        let format = ArchiveFormat::from_path(path).ok_or_else(|| MirrorError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;

        match format {
            ArchiveFormat::Tar(compression) => {
                // Unreadable files fail at open time for both families.
                File::open(path).map_err(|e| extraction_failed(path, e))?;
                Ok(Self::Tar {
                    path: path.to_path_buf(),
                    compression,
                })
            }
            ArchiveFormat::Zip => {
                let file = File::open(path).map_err(|e| extraction_failed(path, e))?;
                let archive = ZipArchive::new(file).map_err(|e| extraction_failed(path, e))?;
                Ok(Self::Zip {
                    path: path.to_path_buf(),
                    archive,
                })
            }
        }
    }

    /// Path of the archive file
    pub fn path(&self) -> &Path {
        match self {
            Self::Tar { path, .. } | Self::Zip { path, .. } => path,
        }
    }

    /// Lists every entry in archive order
    pub fn list(&mut self) -> Result<Vec<EntryDescriptor>, MirrorError> {
        match self {
            Self::Tar { path, compression } => list_tar(path, *compression),
            Self::Zip { path, archive } => {
                let mut entries = Vec::with_capacity(archive.len());
                for index in 0..archive.len() {
                    let file = archive
                        .by_index_raw(index)
                        .map_err(|e| extraction_failed(path, e))?;
                    entries.push(EntryDescriptor {
                        name: file.name().to_string(),
                        is_dir: file.is_dir(),
                        index,
                    });
                }
                Ok(entries)
            }
        }
    }

    /// Reads the full contents of one entry
    pub fn read_entry(&mut self, entry: &EntryDescriptor) -> Result<Vec<u8>, MirrorError> {
        match self {
            Self::Tar { path, compression } => read_tar_entry(path, *compression, entry),
            Self::Zip { path, archive } => {
                let mut file = archive
                    .by_index(entry.index)
                    .map_err(|e| extraction_failed(path, e))?;
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)
                    .map_err(|e| extraction_failed(path, e))?;
                Ok(buffer)
            }
        }
    }
}

fn extraction_failed(path: &Path, error: impl std::fmt::Display) -> MirrorError {
    MirrorError::ExtractionFailed {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

/// Opens a fresh decompressing stream over a tar file
fn open_tar(path: &Path, compression: TarCompression) -> Result<tar::Archive<Box<dyn Read>>, MirrorError> {
    let file = BufReader::new(File::open(path).map_err(|e| extraction_failed(path, e))?);
    let reader: Box<dyn Read> = match compression {
        TarCompression::None => Box::new(file),
        TarCompression::Gzip => Box::new(MultiGzDecoder::new(file)),
        TarCompression::Bzip2 => Box::new(MultiBzDecoder::new(file)),
        TarCompression::Xz => Box::new(XzDecoder::new(file)),
    };
    Ok(tar::Archive::new(reader))
}

fn list_tar(path: &Path, compression: TarCompression) -> Result<Vec<EntryDescriptor>, MirrorError> {
    let mut archive = open_tar(path, compression)?;
    let mut entries = Vec::new();

    for (index, entry) in archive
        .entries()
        .map_err(|e| extraction_failed(path, e))?
        .enumerate()
    {
        let entry = entry.map_err(|e| extraction_failed(path, e))?;
        let name = entry
            .path()
            .map_err(|e| extraction_failed(path, e))?
            .to_string_lossy()
            .into_owned();
        entries.push(EntryDescriptor {
            name,
            is_dir: entry.header().entry_type().is_dir(),
            index,
        });
    }

    Ok(entries)
}

fn read_tar_entry(
    path: &Path,
    compression: TarCompression,
    descriptor: &EntryDescriptor,
) -> Result<Vec<u8>, MirrorError> {
    let mut archive = open_tar(path, compression)?;
    let mut entry = archive
        .entries()
        .map_err(|e| extraction_failed(path, e))?
        .nth(descriptor.index)
        .ok_or_else(|| extraction_failed(path, format!("entry {} vanished", descriptor.name)))?
        .map_err(|e| extraction_failed(path, e))?;

    let mut buffer = Vec::new();
    entry
        .read_to_end(&mut buffer)
        .map_err(|e| extraction_failed(path, e))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn tar_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn write_tar_gz(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(&tar_bytes(files)).unwrap();
        encoder.finish().unwrap();
        path
    }

    fn write_tar_bz2(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let mut encoder =
            bzip2::write::BzEncoder::new(File::create(&path).unwrap(), bzip2::Compression::default());
        encoder.write_all(&tar_bytes(files)).unwrap();
        encoder.finish().unwrap();
        path
    }

    fn write_tar_xz(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let mut encoder = xz2::write::XzEncoder::new(File::create(&path).unwrap(), 6);
        encoder.write_all(&tar_bytes(files)).unwrap();
        encoder.finish().unwrap();
        path
    }

    fn write_zip(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        writer
            .add_directory("pkg-1.0/", SimpleFileOptions::default())
            .unwrap();
        for (name, content) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_format_detection() {
        let cases = [
            ("foo-1.0.tar.gz", Some(ArchiveFormat::Tar(TarCompression::Gzip))),
            ("foo-1.0.TAR.GZ", Some(ArchiveFormat::Tar(TarCompression::Gzip))),
            ("foo-1.0.tgz", Some(ArchiveFormat::Tar(TarCompression::Gzip))),
            ("foo-1.0.tar.bz2", Some(ArchiveFormat::Tar(TarCompression::Bzip2))),
            ("foo-1.0.tar.xz", Some(ArchiveFormat::Tar(TarCompression::Xz))),
            ("foo-1.0.tar", Some(ArchiveFormat::Tar(TarCompression::None))),
            ("foo-1.0.zip", Some(ArchiveFormat::Zip)),
            ("foo-1.0-py2.6.egg", Some(ArchiveFormat::Zip)),
            ("foo-1.0.tar.Z", None),
            ("foo-1.0.exe", None),
            ("foo-1.0.gz", None),
        ];

        for (name, expected) in cases {
            assert_eq!(ArchiveFormat::from_path(Path::new(name)), expected, "{}", name);
        }
    }

    #[test]
    fn test_open_unsupported_format() {
        let result = Archive::open(Path::new("/tmp/foo-1.0.msi"));
        assert!(matches!(result, Err(MirrorError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_open_missing_file() {
        let result = Archive::open(Path::new("/nonexistent/foo-1.0.tar.gz"));
        assert!(matches!(result, Err(MirrorError::ExtractionFailed { .. })));
    }

    #[test]
    fn test_tar_list_and_read() {
        let dir = TempDir::new().unwrap();
        let path = write_tar_gz(
            dir.path(),
            "foo-1.0.tar.gz",
            &[("foo-1.0/setup.py", "print('hi')\n"), ("foo-1.0/README", "readme")],
        );

        let mut archive = Archive::open(&path).unwrap();
        let entries = archive.list().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["foo-1.0/setup.py", "foo-1.0/README"]);

        let readme = archive.read_entry(&entries[1]).unwrap();
        assert_eq!(readme, b"readme");
        let setup = archive.read_entry(&entries[0]).unwrap();
        assert_eq!(setup, b"print('hi')\n");
    }

    #[test]
    fn test_bzip2_and_xz_tarballs_read() {
        let dir = TempDir::new().unwrap();
        let files = [("bar-2.0/requirements.txt", "six\n"), ("bar-2.0/setup.py", "setup()\n")];
        let paths = [
            write_tar_bz2(dir.path(), "bar-2.0.tar.bz2", &files),
            write_tar_xz(dir.path(), "bar-2.0.tar.xz", &files),
        ];

        for path in paths {
            let mut archive = Archive::open(&path).unwrap();
            let entries = archive.list().unwrap();
            let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
            assert_eq!(names, vec!["bar-2.0/requirements.txt", "bar-2.0/setup.py"], "{}", path.display());

            assert_eq!(archive.read_entry(&entries[0]).unwrap(), b"six\n");
            assert_eq!(archive.read_entry(&entries[1]).unwrap(), b"setup()\n");
        }
    }

    #[test]
    fn test_zip_list_and_read() {
        let dir = TempDir::new().unwrap();
        let path = write_zip(
            dir.path(),
            "pkg-1.0.zip",
            &[("pkg-1.0/requirements.txt", "six\n")],
        );

        let mut archive = Archive::open(&path).unwrap();
        let entries = archive.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].name, "pkg-1.0/requirements.txt");
        assert!(!entries[1].is_dir);

        assert_eq!(archive.read_entry(&entries[1]).unwrap(), b"six\n");
    }

    #[test]
    fn test_corrupt_tar_fails_to_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken-1.0.tar.gz");
        std::fs::write(&path, b"definitely not gzip").unwrap();

        let mut archive = Archive::open(&path).unwrap();
        assert!(matches!(
            archive.list(),
            Err(MirrorError::ExtractionFailed { .. })
        ));
    }
}
