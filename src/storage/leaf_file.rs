//! Leaf file writing and memory-mapped reading.
//!
//! The leaf file is a stream of fixed-size pages, each holding one leaf node:
//! a [`LeafHeader`] followed by up to `leaf_capacity::<T>()` payload records
//! and zero padding up to [`LEAF_PAGE_SIZE`]. Writing is strictly sequential
//! and single-threaded; reading maps the whole file read-only and treats it
//! as an array of pages, so a query touches exactly the pages its traversal
//! visits and nothing is deserialized up front.
//!
//! ## Safety model
//!
//! The mapping is validated once at open time: non-empty, an exact multiple
//! of the page size, and mapped at page alignment. After that, every access
//! goes through [`LeafStorage::page`], which bounds-checks the page index,
//! and [`LeafPage::object`], which bounds-checks the slot and copies the
//! record out of the map with `zerocopy`. Payload records are copied, not
//! referenced, so payload alignment never constrains the mapping.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::Mmap;
use zerocopy::{FromBytes, IntoBytes};

use crate::geometry::{mercator, Coordinate, Rectangle};
use crate::tree::node::{LeafHeader, LEAF_HEADER_SIZE};
use crate::tree::{leaf_capacity, SegmentData, LEAF_PAGE_SIZE};

/// Sequential writer that packs segment runs into leaf pages.
pub struct LeafWriter<'a, T> {
    writer: BufWriter<File>,
    coordinates: &'a [Coordinate],
    page: Box<[u8; LEAF_PAGE_SIZE]>,
    leaf_count: u32,
    object_count: u64,
    _payload: std::marker::PhantomData<T>,
}

impl<'a, T: SegmentData> LeafWriter<'a, T> {
    const CAPACITY: usize = leaf_capacity::<T>();

    pub fn create<P: AsRef<Path>>(path: P, coordinates: &'a [Coordinate]) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create leaf file '{}'", path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            coordinates,
            page: Box::new([0u8; LEAF_PAGE_SIZE]),
            leaf_count: 0,
            object_count: 0,
            _payload: std::marker::PhantomData,
        })
    }

    /// Writes one leaf holding `segments`, computing its MBR as the union of
    /// the segments' projected endpoint bounding boxes. Returns the new
    /// leaf's page index and MBR so the caller can wire up its parent.
    pub fn write_leaf(&mut self, segments: &[T]) -> Result<(u32, Rectangle)> {
        debug_assert!(!segments.is_empty(), "leaves must hold at least one segment");
        debug_assert!(segments.len() <= Self::CAPACITY, "leaf overflow");

        let mut mbr = Rectangle::INVALID;
        for segment in segments {
            let u = mercator::from_wgs84(self.coordinates[segment.source() as usize]);
            let v = mercator::from_wgs84(self.coordinates[segment.target() as usize]);
            mbr.extend(u.lon, u.lat);
            mbr.extend(v.lon, v.lat);
        }
        debug_assert!(mbr.is_valid());

        let header = LeafHeader {
            object_count: segments.len() as u32,
            mbr,
        };

        self.page.fill(0);
        self.page[..LEAF_HEADER_SIZE].copy_from_slice(header.as_bytes());
        let payload = segments.as_bytes();
        self.page[LEAF_HEADER_SIZE..LEAF_HEADER_SIZE + payload.len()].copy_from_slice(payload);

        self.writer
            .write_all(&self.page[..])
            .wrap_err("failed to write leaf page")?;

        let index = self.leaf_count;
        self.leaf_count += 1;
        self.object_count += segments.len() as u64;
        Ok((index, mbr))
    }

    /// Flushes buffered pages and returns how many leaves were written.
    pub fn finish(mut self) -> Result<u32> {
        self.writer.flush().wrap_err("failed to flush leaf file")?;
        Ok(self.leaf_count)
    }

    pub fn leaf_count(&self) -> u32 {
        self.leaf_count
    }

    pub fn object_count(&self) -> u64 {
        self.object_count
    }
}

/// Read-only memory mapping of a leaf file.
#[derive(Debug)]
pub struct LeafStorage {
    mmap: Mmap,
    leaf_count: u32,
}

impl LeafStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open leaf file '{}'", path.display()))?;
        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat leaf file '{}'", path.display()))?
            .len();

        ensure!(file_size > 0, "leaf file '{}' is empty", path.display());
        ensure!(
            file_size % LEAF_PAGE_SIZE as u64 == 0,
            "leaf file '{}' size {} is not a multiple of the page size {}",
            path.display(),
            file_size,
            LEAF_PAGE_SIZE
        );

        // SAFETY: Mmap::map is unsafe because the file could be modified
        // externally while mapped. This is safe for our use because:
        // 1. The index is immutable once built; nothing rewrites leaf files
        // 2. The mapping is read-only, so this process cannot corrupt it
        // 3. The mmap lifetime is tied to LeafStorage, preventing
        //    use-after-unmap
        // 4. All access goes through page(), which bounds-checks the index
        let mmap = unsafe {
            Mmap::map(&file)
                .wrap_err_with(|| format!("failed to memory-map leaf file '{}'", path.display()))?
        };

        ensure!(
            mmap.as_ptr() as usize % LEAF_PAGE_SIZE == 0,
            "leaf file '{}' mapped at {:p}, not page-aligned",
            path.display(),
            mmap.as_ptr()
        );

        Ok(Self {
            leaf_count: (file_size / LEAF_PAGE_SIZE as u64) as u32,
            mmap,
        })
    }

    pub fn leaf_count(&self) -> u32 {
        self.leaf_count
    }

    /// Zero-copy view of one leaf page.
    pub fn page(&self, index: u32) -> LeafPage<'_> {
        debug_assert!(index < self.leaf_count, "leaf index out of bounds");
        let offset = index as usize * LEAF_PAGE_SIZE;
        LeafPage {
            bytes: &self.mmap[offset..offset + LEAF_PAGE_SIZE],
        }
    }
}

/// Borrowed view of one page in the mapped leaf file.
#[derive(Clone, Copy)]
pub struct LeafPage<'a> {
    bytes: &'a [u8],
}

impl<'a> LeafPage<'a> {
    pub fn object_count(&self) -> u32 {
        self.header().object_count
    }

    pub fn mbr(&self) -> Rectangle {
        self.header().mbr
    }

    /// Copies payload `index` out of the page.
    pub fn object<T: SegmentData>(&self, index: u32) -> T {
        debug_assert!(index < self.object_count(), "leaf slot out of bounds");
        let offset = LEAF_HEADER_SIZE + index as usize * std::mem::size_of::<T>();
        T::read_from_bytes(&self.bytes[offset..offset + std::mem::size_of::<T>()])
            .expect("leaf payload slot is exactly sized")
    }

    /// Iterates over `(slot, payload)` pairs of the page.
    pub fn objects<T: SegmentData>(&self) -> impl Iterator<Item = (u32, T)> + 'a {
        let page = *self;
        (0..self.object_count()).map(move |i| (i, page.object::<T>(i)))
    }

    fn header(&self) -> LeafHeader {
        LeafHeader::read_from_bytes(&self.bytes[..LEAF_HEADER_SIZE])
            .expect("leaf header is exactly sized")
    }
}
