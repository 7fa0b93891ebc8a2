use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;

/// Files above this size are memory-mapped instead of read into memory.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Raw bytes of an uploaded document, either owned or mapped from disk.
pub enum DocumentBytes {
    Owned(Vec<u8>),
    Mapped { _file: File, mmap: Mmap },
}

impl DocumentBytes {
    pub fn is_mapped(&self) -> bool {
        matches!(self, DocumentBytes::Mapped { .. })
    }
}

impl Deref for DocumentBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            DocumentBytes::Owned(bytes) => bytes.as_slice(),
            DocumentBytes::Mapped { mmap, .. } => &mmap[..],
        }
    }
}

impl AsRef<[u8]> for DocumentBytes {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

/// Load a document, mapping it when it is larger than `mmap_threshold` bytes.
pub fn read_document<P: AsRef<Path>>(path: P, mmap_threshold: u64) -> std::io::Result<DocumentBytes> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();

    if file_size > mmap_threshold && file_size > 0 {
        // The mapping stays valid while `_file` is held; uploads are not modified in place.
        let mmap = unsafe { Mmap::map(&file)? };
        log::debug!("memory-mapped {} ({} bytes)", path.display(), file_size);
        Ok(DocumentBytes::Mapped { _file: file, mmap })
    } else {
        Ok(DocumentBytes::Owned(std::fs::read(path)?))
    }
}
