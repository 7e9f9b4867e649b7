//! Matrix storage that is either owned or mapped straight from disk.
//!
//! A model loaded in mapped mode keeps its large matrices as read-only
//! memory maps. The first mutation copies the data into an owned array, so
//! training on a mapped model never writes through to the file.

use memmap2::{Mmap, MmapOptions};
use ndarray::{Array2, ArrayView2};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// A read-only `f64` matrix backed by a memory-mapped file of raw
/// little-endian values.
#[derive(Debug)]
pub struct MappedMatrix {
    mmap: Mmap,
    shape: (usize, usize),
    path: PathBuf,
}

impl MappedMatrix {
    pub fn open(path: impl AsRef<Path>, shape: (usize, usize)) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if cfg!(target_endian = "big") {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "mapped arrays are stored little-endian",
            ));
        }
        let file = File::open(&path)?;
        // SAFETY: the file is opened read-only and the map is never written
        // through; truncating it while mapped is outside our control.
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        let expected = shape
            .0
            .checked_mul(shape.1)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f64>()))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{}x{} matrix is too large to map", shape.0, shape.1),
                )
            })?;
        if mmap.len() != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} holds {} bytes, expected {} for a {}x{} matrix",
                    path.display(),
                    mmap.len(),
                    expected,
                    shape.0,
                    shape.1
                ),
            ));
        }
        if expected > 0 && mmap.as_ptr().align_offset(std::mem::align_of::<f64>()) != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "mapped region is not aligned for f64",
            ));
        }
        Ok(Self { mmap, shape, path })
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        let ptr = if self.shape.0 * self.shape.1 == 0 {
            std::ptr::NonNull::<f64>::dangling().as_ptr() as *const f64
        } else {
            self.mmap.as_ptr() as *const f64
        };
        // SAFETY: length and alignment were checked in `open`, every bit
        // pattern is a valid f64 and the map lives as long as `self`.
        unsafe { ArrayView2::from_shape_ptr(self.shape, ptr) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug)]
pub enum ArrayStore {
    Owned(Array2<f64>),
    Mapped(MappedMatrix),
}

impl ArrayStore {
    pub fn view(&self) -> ArrayView2<'_, f64> {
        match self {
            ArrayStore::Owned(a) => a.view(),
            ArrayStore::Mapped(m) => m.view(),
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, ArrayStore::Mapped(_))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.view().dim()
    }

    /// Mutable access, copying a mapped matrix into memory first.
    pub fn to_mut(&mut self) -> &mut Array2<f64> {
        if let ArrayStore::Mapped(m) = self {
            let owned = m.view().to_owned();
            *self = ArrayStore::Owned(owned);
        }
        match self {
            ArrayStore::Owned(a) => a,
            ArrayStore::Mapped(_) => unreachable!("materialized above"),
        }
    }
}

impl From<Array2<f64>> for ArrayStore {
    fn from(a: Array2<f64>) -> Self {
        ArrayStore::Owned(a)
    }
}

impl Clone for ArrayStore {
    fn clone(&self) -> Self {
        ArrayStore::Owned(self.view().to_owned())
    }
}
