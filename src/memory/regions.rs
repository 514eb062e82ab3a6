//! Mapped memory region backing a ring

use std::{
    ffi::CString,
    fs::{File, OpenOptions},
    os::fd::{AsRawFd, OwnedFd, RawFd},
    os::unix::fs::OpenOptionsExt,
    ptr::NonNull,
};

use log::debug;
use memmap2::{MmapMut, MmapOptions};
use nix::{
    sys::memfd::{memfd_create, MemFdCreateFlag},
    unistd::ftruncate,
};

use crate::error::{Result, RingprobeError};

use super::config::{BackingType, RingConfig};

/// A mapped region holding a ring's control header and data area
#[derive(Debug)]
pub struct SharedMemoryRegion {
    name: String,
    size: usize,
    backing_type: BackingType,
    /// Memory mapping; accessed through `base` after construction
    mmap: MmapMut,
    base: NonNull<u8>,
    /// Optional file handle for file-backed regions
    _file: Option<File>,
    /// Owned file descriptor for memfd regions
    _owned_fd: Option<OwnedFd>,
}

impl SharedMemoryRegion {
    /// Create or open the region described by `config`
    pub fn new(config: &RingConfig) -> Result<Self> {
        config.validate()?;

        let size = config.region_size();
        let (mut mmap, file, owned_fd) = match config.backing_type {
            BackingType::Anonymous => {
                let mmap = MmapMut::map_anon(size)
                    .map_err(|e| RingprobeError::from_io(e, "Failed to create anonymous mapping"))?;
                (mmap, None, None)
            }
            BackingType::FileBacked => {
                let file = Self::create_file_backing(config, size)?;
                let mmap = Self::map_fd(&file, size)?;
                (mmap, Some(file), None)
            }
            #[cfg(target_os = "linux")]
            BackingType::MemFd => {
                let owned_fd = Self::create_memfd_backing(config, size)?;
                let mmap = Self::map_fd(&owned_fd, size)?;
                (mmap, None, Some(owned_fd))
            }
        };

        let base = NonNull::new(mmap.as_mut_ptr())
            .ok_or_else(|| RingprobeError::memory("Mapping returned a null address"))?;

        debug!(
            "mapped {} region '{}' ({} bytes)",
            config.backing_type.name(),
            config.name,
            size
        );

        Ok(Self {
            name: config.name.clone(),
            size,
            backing_type: config.backing_type,
            mmap,
            base,
            _file: file,
            _owned_fd: owned_fd,
        })
    }

    /// Create or open file-backed storage
    fn create_file_backing(config: &RingConfig, size: usize) -> Result<File> {
        let path = config.default_file_path();

        if config.create {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .mode(config.permissions)
                .open(&path)
                .map_err(|e| RingprobeError::from_io(e, "Failed to create ring file"))?;

            file.set_len(size as u64)
                .map_err(|e| RingprobeError::from_io(e, "Failed to set file size"))?;
            return Ok(file);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| RingprobeError::from_io(e, "Failed to open existing ring file"))?;

        let len = file
            .metadata()
            .map_err(|e| RingprobeError::from_io(e, "Failed to stat ring file"))?
            .len();
        if len != size as u64 {
            return Err(RingprobeError::layout(format!(
                "ring file {} is {} bytes, expected {}",
                path.display(),
                len,
                size
            )));
        }

        Ok(file)
    }

    /// Create memfd-backed storage
    #[cfg(target_os = "linux")]
    fn create_memfd_backing(config: &RingConfig, size: usize) -> Result<OwnedFd> {
        let name_cstr = CString::new(config.name.clone())
            .map_err(|_| RingprobeError::invalid_parameter("name", "Name contains null bytes"))?;

        let owned_fd = memfd_create(&name_cstr, MemFdCreateFlag::MFD_CLOEXEC)
            .map_err(|e| RingprobeError::platform(format!("Failed to create memfd: {}", e)))?;

        ftruncate(&owned_fd, size as i64)
            .map_err(|e| RingprobeError::platform(format!("Failed to set memfd size: {}", e)))?;

        Ok(owned_fd)
    }

    fn map_fd<F: AsRawFd>(fd: &F, size: usize) -> Result<MmapMut> {
        unsafe {
            MmapOptions::new()
                .len(size)
                .map_mut(fd)
                .map_err(|e| RingprobeError::from_io(e, "Failed to create memory mapping"))
        }
    }

    /// Pointer to the first byte of the region
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Get the size of the region
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the name of the region
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the backing type
    pub fn backing_type(&self) -> BackingType {
        self.backing_type
    }

    /// Flush changes to the backing file
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| RingprobeError::from_io(e, "Failed to flush memory mapping"))
    }

    /// Get the file descriptor backing the region, if any
    pub fn fd(&self) -> Option<RawFd> {
        match (&self._file, &self._owned_fd) {
            (Some(file), _) => Some(file.as_raw_fd()),
            (None, Some(fd)) => Some(fd.as_raw_fd()),
            (None, None) => None,
        }
    }

    /// Check if the region is file-backed
    pub fn is_file_backed(&self) -> bool {
        matches!(self.backing_type, BackingType::FileBacked)
    }
}

// The mapping stays valid for the region's lifetime; all mutation goes
// through atomics or exclusively reserved byte ranges.
unsafe impl Send for SharedMemoryRegion {}
unsafe impl Sync for SharedMemoryRegion {}
