//! ELF image parsing.
//!
//! Decodes the 32/64-bit little-endian ELF header and section-header table,
//! resolving section names through the section-header string table. Unlike
//! the PE side, a single corrupt section header is dropped and the rest of
//! the table is still decoded; only an unusable table as a whole empties the
//! result.

use tracing::debug;

use crate::entropy::shannon_entropy;
use crate::formats::read::ReadExt;

pub const ELF_MAGIC: &[u8; 4] = b"\x7fELF";
const MAX_NAME_LEN: usize = 256;

/// One retained section-header entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ElfSection {
    pub name: String,
    pub addr: u64,
    pub off: u64,
    pub size: u64,
    pub entropy: f64,
}

/// Decoded ELF metadata.
///
/// `valid` is true whenever the magic and encoding were accepted; a
/// section table that cannot be decoded leaves `sections` empty rather
/// than failing the parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ElfInfo {
    pub valid: bool,
    pub is64: bool,
    pub sections: Vec<ElfSection>,
}

/// Parse an ELF image. `None` means the buffer is not a little-endian ELF.
pub fn parse(data: &[u8]) -> Option<ElfInfo> {
    if data.len() < 0x40 {
        return None;
    }
    if &data[0..4] != ELF_MAGIC {
        return None;
    }
    let is64 = data[4] == 2;
    // Big-endian images are out of scope: refuse outright rather than
    // produce a half-trusted decode.
    if data[5] != 1 {
        return None;
    }

    let mut info = ElfInfo {
        valid: true,
        is64,
        sections: Vec::new(),
    };

    let (shoff, shentsize, shnum, shstrndx) = if is64 {
        (
            data.read_u64_le_at(0x28)?,
            data.read_u16_le_at(0x3A)?,
            data.read_u16_le_at(0x3C)?,
            data.read_u16_le_at(0x3E)?,
        )
    } else {
        (
            data.read_u32_le_at(0x20)? as u64,
            data.read_u16_le_at(0x2E)?,
            data.read_u16_le_at(0x30)?,
            data.read_u16_le_at(0x32)?,
        )
    };

    // The whole section-header table must fit before any entry is trusted;
    // a table that does not is undecodable, not fatal.
    let table_bytes = shentsize as u64 * shnum as u64;
    if shoff
        .checked_add(table_bytes)
        .map_or(true, |end| end > data.len() as u64)
    {
        debug!("section-header table extends past the buffer, skipping sections");
        return Some(info);
    }
    if shstrndx >= shnum {
        return Some(info);
    }

    let table = shoff as usize;
    let entsize = shentsize as usize;

    // String-table section first: section names resolve through it.
    let strtab_hdr = table + entsize * shstrndx as usize;
    let (str_off, str_size) = if is64 {
        let (Some(off), Some(size)) = (
            data.read_u64_le_at(strtab_hdr + 0x18),
            data.read_u64_le_at(strtab_hdr + 0x20),
        ) else {
            return Some(info);
        };
        (off, size)
    } else {
        let (Some(off), Some(size)) = (
            data.read_u32_le_at(strtab_hdr + 0x10),
            data.read_u32_le_at(strtab_hdr + 0x14),
        ) else {
            return Some(info);
        };
        (off as u64, size as u64)
    };
    if str_off
        .checked_add(str_size)
        .map_or(true, |end| end > data.len() as u64)
    {
        return Some(info);
    }

    for i in 0..shnum as usize {
        let entry = table + entsize * i;
        let Some(name_off) = data.read_u32_le_at(entry) else {
            continue;
        };
        let fields = if is64 {
            (
                data.read_u64_le_at(entry + 0x10),
                data.read_u64_le_at(entry + 0x18),
                data.read_u64_le_at(entry + 0x20),
            )
        } else {
            (
                data.read_u32_le_at(entry + 0x0C).map(u64::from),
                data.read_u32_le_at(entry + 0x10).map(u64::from),
                data.read_u32_le_at(entry + 0x14).map(u64::from),
            )
        };
        let (Some(addr), Some(off), Some(size)) = fields else {
            continue;
        };

        // Drop a section claiming bytes past the buffer; keep scanning.
        // Corruption in one header does not forfeit the rest.
        let Some(end) = off.checked_add(size) else {
            continue;
        };
        if end > data.len() as u64 {
            continue;
        }

        let name = read_table_name(data, str_off, str_size, name_off);
        let entropy = shannon_entropy(&data[off as usize..end as usize]);
        info.sections.push(ElfSection {
            name,
            addr,
            off,
            size,
            entropy,
        });
    }

    Some(info)
}

/// Bounded name lookup in the string table: stops at a NUL, the name cap,
/// or the end of the table, whichever comes first.
fn read_table_name(data: &[u8], table_off: u64, table_size: u64, name_off: u32) -> String {
    let table_end = table_off + table_size; // caller checked <= len
    let Some(start) = table_off.checked_add(name_off as u64) else {
        return String::new();
    };
    if start >= table_end {
        return String::new();
    }
    let cap = (table_end - start).min(MAX_NAME_LEN as u64) as usize;
    data.read_cstr_at(start as usize, cap).unwrap_or_default()
}
