use super::consts::*;
use crate::binary::{self, BinaryError};
use std::io::{self, Read, Seek, SeekFrom};
use tracing::debug;
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw OLE header structure (512 bytes)
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    /// DLL version (3 = 512-byte sectors, 4 = 4096-byte sectors)
    major_version: U16<LE>,
    /// Must be 0xFFFE (little-endian)
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    num_dir_sectors: U32<LE>,
    num_fat_sectors: U32<LE>,
    first_dir_sector: U32<LE>,
    transaction_signature: U32<LE>,
    /// Streams smaller than this live in the mini stream
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    num_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    num_difat_sectors: U32<LE>,
    /// First 109 FAT sector ids
    difat: [U32<LE>; HEADER_DIFAT_ENTRIES],
}

/// Raw OLE directory entry structure (128 bytes)
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    entry_type: u8,
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// Error types for OLE file parsing
#[derive(Debug, thiserror::Error)]
pub enum OleError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("not an OLE file")]
    NotOleFile,
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("corrupted file: {0}")]
    CorruptedFile(String),
    #[error("stream not found: {0}")]
    StreamNotFound(String),
    #[error(transparent)]
    Binary(#[from] BinaryError),
}

/// Represents an OLE directory entry (stream or storage)
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Storage ID (index in directory)
    pub sid: u32,
    /// Entry name (UTF-16 decoded to UTF-8)
    pub name: String,
    /// Entry type (stream, storage, root, etc.)
    pub entry_type: u8,
    pub sid_left: u32,
    pub sid_right: u32,
    pub sid_child: u32,
    /// First sector of the stream
    pub start_sector: u32,
    /// Size of the stream in bytes
    pub size: u64,
    /// Whether this stream is stored in the mini stream
    pub is_minifat: bool,
}

/// OLE2 structured storage file
///
/// Only the parts needed to extract streams are kept: the FAT, the MiniFAT,
/// and the flat list of directory entries.
#[derive(Debug)]
pub struct OleFile<R: Read + Seek> {
    reader: R,
    file_size: u64,
    sector_size: usize,
    mini_sector_size: usize,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    entries: Vec<DirectoryEntry>,
    /// Mini stream data (loaded on first use)
    ministream: Option<Vec<u8>>,
}

impl<R: Read + Seek> OleFile<R> {
    /// Open and parse an OLE file from a reader
    pub fn open(mut reader: R) -> Result<Self, OleError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_size < MINIMAL_OLEFILE_SIZE as u64 {
            return Err(OleError::NotOleFile);
        }

        let mut raw = [0u8; HEADER_SIZE];
        reader.read_exact(&mut raw)?;
        if &raw[0..8] != MAGIC {
            return Err(OleError::NotOleFile);
        }

        let header = RawHeader::read_from_bytes(&raw[..])
            .map_err(|_| OleError::InvalidFormat("unreadable header".to_string()))?;

        if header.byte_order.get() != 0xFFFE {
            return Err(OleError::InvalidFormat("invalid byte order".to_string()));
        }

        let sector_size = match (header.major_version.get(), header.sector_shift.get()) {
            (3, 9) => 512,
            (4, 12) => 4096,
            (version, shift) => {
                return Err(OleError::InvalidFormat(format!(
                    "sector shift {shift} does not match version {version}"
                )));
            },
        };
        if header.mini_sector_shift.get() != 6 {
            return Err(OleError::InvalidFormat(format!(
                "unsupported mini sector shift {}",
                header.mini_sector_shift.get()
            )));
        }

        let mut ole = OleFile {
            reader,
            file_size,
            sector_size,
            mini_sector_size: 64,
            fat: Vec::new(),
            minifat: Vec::new(),
            entries: Vec::new(),
            ministream: None,
        };

        ole.load_fat(&header)?;
        ole.load_directory(
            header.first_dir_sector.get(),
            header.mini_stream_cutoff.get(),
        )?;
        if header.num_minifat_sectors.get() > 0 {
            ole.load_minifat(header.first_minifat_sector.get())?;
        }

        debug!(
            sector_size,
            fat_entries = ole.fat.len(),
            directory_entries = ole.entries.len(),
            "opened OLE container"
        );
        Ok(ole)
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Load the File Allocation Table
    ///
    /// The first 109 FAT sector ids are stored in the header; any further ids
    /// live in a chain of DIFAT sectors whose last slot links to the next one.
    fn load_fat(&mut self, header: &RawHeader) -> Result<(), OleError> {
        let mut fat_sectors: Vec<u32> = header
            .difat
            .iter()
            .map(|id| id.get())
            .take_while(|&id| id != FREESECT && id != ENDOFCHAIN)
            .collect();

        let ids_per_sector = self.sector_size / 4 - 1;
        let mut difat_sector = header.first_difat_sector.get();
        for _ in 0..header.num_difat_sectors.get() {
            if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                break;
            }
            let data = self.read_sector(difat_sector)?;
            for i in 0..ids_per_sector {
                let id = binary::read_u32_le(&data, i * 4)?;
                if id == FREESECT || id == ENDOFCHAIN {
                    break;
                }
                fat_sectors.push(id);
            }
            difat_sector = binary::read_u32_le(&data, ids_per_sector * 4)?;
        }

        let entries_per_sector = self.sector_size / 4;
        self.fat.reserve(fat_sectors.len() * entries_per_sector);
        for sector_id in fat_sectors {
            let data = self.read_sector(sector_id)?;
            for i in 0..entries_per_sector {
                self.fat.push(binary::read_u32_le(&data, i * 4)?);
            }
        }

        Ok(())
    }

    /// Load the Mini FAT (for small streams)
    fn load_minifat(&mut self, first_minifat_sector: u32) -> Result<(), OleError> {
        let data = self.read_stream_from_fat(first_minifat_sector)?;
        self.minifat = data
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Ok(())
    }

    /// Load every directory entry; entry 0 is the root storage
    fn load_directory(&mut self, first_dir_sector: u32, cutoff: u32) -> Result<(), OleError> {
        let data = self.read_stream_from_fat(first_dir_sector)?;
        let mut entries = Vec::with_capacity(data.len() / DIRENTRY_SIZE);

        for (sid, chunk) in data.chunks_exact(DIRENTRY_SIZE).enumerate() {
            let raw = RawDirectoryEntry::read_from_bytes(chunk).map_err(|_| {
                OleError::InvalidFormat("failed to parse directory entry".to_string())
            })?;

            let name_len = usize::from(raw.name_len.get());
            let name_bytes = &raw.name[..name_len.saturating_sub(2).min(64)];
            let name = binary::decode_utf16le(name_bytes)
                .trim_end_matches('\0')
                .to_string();

            // 512-byte sector files only use the low 32 bits of the size
            let size = if self.sector_size == 512 {
                raw.stream_size.get() & 0xFFFF_FFFF
            } else {
                raw.stream_size.get()
            };

            entries.push(DirectoryEntry {
                sid: sid as u32,
                name,
                entry_type: raw.entry_type,
                sid_left: raw.sid_left.get(),
                sid_right: raw.sid_right.get(),
                sid_child: raw.sid_child.get(),
                start_sector: raw.start_sector.get(),
                size,
                is_minifat: raw.entry_type == STGTY_STREAM && size < u64::from(cutoff),
            });
        }

        match entries.first() {
            Some(root) if root.entry_type == STGTY_ROOT => {},
            _ => return Err(OleError::CorruptedFile("missing root entry".to_string())),
        }

        self.entries = entries;
        Ok(())
    }

    /// Read a single sector, zero-filling a final sector cut short by EOF
    fn read_sector(&mut self, sector_id: u32) -> Result<Vec<u8>, OleError> {
        let position = (u64::from(sector_id) + 1) * self.sector_size as u64;
        if position >= self.file_size {
            return Err(OleError::CorruptedFile(format!(
                "sector {sector_id} lies beyond end of file"
            )));
        }

        self.reader.seek(SeekFrom::Start(position))?;
        let available = (self.file_size - position).min(self.sector_size as u64) as usize;
        let mut buffer = vec![0u8; self.sector_size];
        self.reader.read_exact(&mut buffer[..available])?;
        Ok(buffer)
    }

    /// Read a stream by following the FAT chain
    fn read_stream_from_fat(&mut self, start_sector: u32) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::new();
        let mut sector = start_sector;
        let mut steps = 0usize;

        while sector != ENDOFCHAIN {
            let next = *self.fat.get(sector as usize).ok_or_else(|| {
                OleError::CorruptedFile(format!("sector {sector} is outside the FAT"))
            })?;

            steps += 1;
            if steps > self.fat.len() {
                return Err(OleError::CorruptedFile("cycle in FAT chain".to_string()));
            }

            data.extend_from_slice(&self.read_sector(sector)?);
            sector = next;
        }

        Ok(data)
    }

    /// Read a stream by following the MiniFAT chain
    fn read_stream_from_minifat(
        &mut self,
        start_sector: u32,
        size: u64,
    ) -> Result<Vec<u8>, OleError> {
        if self.ministream.is_none() {
            let root_start = self.entries[0].start_sector;
            let root_size = self.entries[0].size as usize;
            let mut stream = self.read_stream_from_fat(root_start)?;
            stream.truncate(root_size);
            self.ministream = Some(stream);
        }
        let ministream = self.ministream.as_deref().unwrap_or_default();

        let mut data = Vec::with_capacity(size as usize);
        let mut sector = start_sector;
        let mut steps = 0usize;

        while sector != ENDOFCHAIN {
            let next = *self.minifat.get(sector as usize).ok_or_else(|| {
                OleError::CorruptedFile(format!("mini sector {sector} is outside the MiniFAT"))
            })?;

            steps += 1;
            if steps > self.minifat.len() {
                return Err(OleError::CorruptedFile("cycle in MiniFAT chain".to_string()));
            }

            let position = sector as usize * self.mini_sector_size;
            let chunk = ministream
                .get(position..position + self.mini_sector_size)
                .ok_or_else(|| {
                    OleError::CorruptedFile(format!("mini sector {sector} out of bounds"))
                })?;
            data.extend_from_slice(chunk);
            sector = next;
        }

        data.truncate(size as usize);
        Ok(data)
    }

    /// Open a stream by path and return its contents
    ///
    /// Path components are matched case-insensitively, as Office does.
    pub fn open_stream(&mut self, path: &[&str]) -> Result<Vec<u8>, OleError> {
        let entry = self.find_entry(path)?.clone();

        if entry.entry_type != STGTY_STREAM {
            return Err(OleError::InvalidFormat(format!(
                "'{}' is not a stream",
                entry.name
            )));
        }

        if entry.is_minifat {
            self.read_stream_from_minifat(entry.start_sector, entry.size)
        } else {
            let mut data = self.read_stream_from_fat(entry.start_sector)?;
            data.truncate(entry.size as usize);
            Ok(data)
        }
    }

    /// Check if a stream or storage exists
    pub fn exists(&self, path: &[&str]) -> bool {
        self.find_entry(path).is_ok()
    }

    /// Find a directory entry by path
    fn find_entry(&self, path: &[&str]) -> Result<&DirectoryEntry, OleError> {
        let mut current = &self.entries[0];
        for name in path {
            current = self
                .find_child_by_name(current.sid_child, name)
                .ok_or_else(|| OleError::StreamNotFound(path.join("/")))?;
        }
        Ok(current)
    }

    /// Search the red-black tree of siblings rooted at `sid` for `name`
    fn find_child_by_name(&self, sid: u32, name: &str) -> Option<&DirectoryEntry> {
        let wanted = name.to_lowercase();
        let mut visited = vec![false; self.entries.len()];
        let mut stack = vec![sid];

        while let Some(sid) = stack.pop() {
            if sid == NOSTREAM {
                continue;
            }
            let index = sid as usize;
            match visited.get_mut(index) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }

            let entry = &self.entries[index];
            if entry.entry_type != STGTY_EMPTY && entry.name.to_lowercase() == wanted {
                return Some(entry);
            }
            stack.push(entry.sid_left);
            stack.push(entry.sid_right);
        }

        None
    }
}

/// Check if data is an OLE file by checking magic bytes
pub fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= MINIMAL_OLEFILE_SIZE && &data[0..8] == MAGIC
}
