use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Creates a hidden temporary file in `dir`. The filename is generated as
/// `"." || base || "." || hex || ".tmp"`, where `hex` is a randomly generated
/// string. The function returns `ErrorKind::AlreadyExists` only after several
/// retries.
fn create_temp_file(dir: &Path, base: &str) -> io::Result<(PathBuf, File)> {
    const RETRIES: usize = 16;

    let mut rng = StdRng::from_entropy();

    for _ in 0..RETRIES {
        let mut suffix = [0u8; 8];

        rng.fill_bytes(&mut suffix);

        let filename = {
            let mut f = String::new();

            f.push('.');
            f.push_str(base);
            f.push('.');

            for b in suffix {
                let _ = write!(f, "{:02x}", b);
            }

            f.push_str(".tmp");

            f
        };

        let path = dir.join(filename);

        let open_result = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o644)
            .open(&path);

        match open_result {
            Ok(file) => return Ok((path, file)),
            Err(err) => {
                if matches!(err.kind(), ErrorKind::AlreadyExists) {
                    continue;
                }

                return Err(err);
            }
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("failed to create a tempfile after {} retries", RETRIES),
    ))
}

/// A file which becomes visible under its final name only once it has been
/// completely written. The contents are staged in a temporary file next to
/// the target and renamed over it by [`AtomicFile::persist`]. A staged file
/// which is never persisted is unlinked when dropped.
pub(crate) struct AtomicFile {
    staged: Option<PathBuf>,
    file: File,
    target: PathBuf,
}

impl AtomicFile {
    pub(crate) fn new(target: &Path) -> io::Result<AtomicFile> {
        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let base = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (staged, file) = create_temp_file(dir, &base)?;

        Ok(AtomicFile {
            staged: Some(staged),
            file,
            target: target.to_path_buf(),
        })
    }

    pub(crate) fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    /// Flushes the staged contents to disk and moves them into place.
    pub(crate) fn persist(mut self) -> io::Result<()> {
        self.file.sync_all()?;

        if let Some(staged) = self.staged.take() {
            if let Err(err) = std::fs::rename(&staged, &self.target) {
                let _ = std::fs::remove_file(&staged);

                return Err(err);
            }
        }

        Ok(())
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if let Some(staged) = self.staged.take() {
            let _ = std::fs::remove_file(staged);
        }
    }
}
