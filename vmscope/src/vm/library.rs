//! Access to the target VM's loaded library image
//!
//! Offset-table initialization consumes a [`LibraryImage`]: something that
//! can turn an exported symbol name into an absolute address in the target
//! process. [`ElfImage`] is the production implementation, backed by the
//! `object` crate; tests substitute synthetic images through the trait.

use anyhow::{Context, Result};
use log::info;
use object::{Object, ObjectSymbol};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::domain::Pid;

/// A loaded code/data image that exported symbols can be resolved against.
pub trait LibraryImage {
    /// Absolute address of `symbol` in the target process, or `None` if the
    /// image does not export it.
    fn resolve(&self, symbol: &str) -> Option<usize>;
}

/// Symbol index over the VM's ELF image (e.g. `libjvm.so`), relocated to its
/// load base in the monitored process.
pub struct ElfImage {
    base: usize,
    symbols: HashMap<String, u64>,
}

impl ElfImage {
    /// Parse the library at `path` and index its symbol tables. `base` is the
    /// library's load base in the target process (see [`library_base`]).
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid object.
    pub fn open<P: AsRef<Path>>(path: P, base: usize) -> Result<Self> {
        let data = fs::read(path.as_ref()).context("Failed to read VM library")?;
        let obj = object::File::parse(&*data).context("Failed to parse VM library image")?;

        let mut symbols = HashMap::new();
        for sym in obj.symbols().chain(obj.dynamic_symbols()) {
            if let Ok(name) = sym.name() {
                if !name.is_empty() {
                    symbols.insert(name.to_string(), sym.address());
                }
            }
        }

        info!("Indexed {} symbols from {}", symbols.len(), path.as_ref().display());
        Ok(Self { base, symbols })
    }
}

impl LibraryImage for ElfImage {
    fn resolve(&self, symbol: &str) -> Option<usize> {
        self.symbols.get(symbol).map(|&value| self.base + value as usize)
    }
}

/// Find the load base of a library in a process's address space.
///
/// Reads the process's memory maps and returns the lowest start address among
/// mappings of the given path. For a shared object this is the value to add
/// to ELF symbol addresses.
///
/// # Errors
/// Returns an error if /proc/pid/maps cannot be read or the library is not
/// mapped.
pub fn library_base(pid: Pid, library_path: &str) -> Result<usize> {
    let maps_path = format!("/proc/{}/maps", pid.0);
    let maps = fs::read_to_string(&maps_path).context(format!("Failed to read {maps_path}"))?;

    let mut base = None;

    for line in maps.lines() {
        if line.contains(library_path) {
            // Parse the line: "start-end perms offset dev inode pathname"
            if let Some(range) = line.split_whitespace().next() {
                if let Some((start, _end)) = range.split_once('-') {
                    let start = usize::from_str_radix(start, 16)
                        .context("Failed to parse mapping start")?;
                    base = Some(base.map_or(start, |b: usize| b.min(start)));
                }
            }
        }
    }

    match base {
        Some(base) => {
            info!("{library_path} loaded at 0x{base:x} in {pid}");
            Ok(base)
        }
        None => Err(anyhow::anyhow!("{library_path} is not mapped in {pid}")),
    }
}
