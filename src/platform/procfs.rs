//! procfs layer: `/proc/<pid>/mem`, `/proc/<pid>/maps` and process names

use crate::core::types::{Address, ModuleInfo, ProcessId, ProcessInfo};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

pub fn mem_path(pid: ProcessId) -> PathBuf {
    PathBuf::from(format!("/proc/{}/mem", pid))
}

pub fn maps_path(pid: ProcessId) -> PathBuf {
    PathBuf::from(format!("/proc/{}/maps", pid))
}

/// Open handle on a process's memory file
pub struct MemFile {
    file: File,
    writable: bool,
}

impl MemFile {
    /// Opens read-write, falling back to read-only when writing is not permitted
    pub fn open(pid: ProcessId) -> io::Result<Self> {
        let path = mem_path(pid);
        match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => Ok(MemFile {
                file,
                writable: true,
            }),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Ok(MemFile {
                file: File::open(&path)?,
                writable: false,
            }),
            Err(e) => Err(e),
        }
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn read_at(&self, address: u64, buffer: &mut [u8]) -> io::Result<usize> {
        self.file.read_at(buffer, address)
    }

    pub fn write_at(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "memory file opened read-only",
            ));
        }
        self.file.write_at(data, address)
    }
}

/// Whether `/proc/<pid>` still exists and is not a zombie
pub fn is_running(pid: ProcessId) -> bool {
    match fs::read_to_string(format!("/proc/{}/stat", pid)) {
        // State follows the parenthesised command name
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            .map(|state| state != 'Z' && state != 'X')
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Enumerate running processes by `comm` and executable path
pub fn processes() -> io::Result<Vec<ProcessInfo>> {
    let mut processes = Vec::new();

    for entry in fs::read_dir("/proc")? {
        let entry = entry?;
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<ProcessId>().ok())
        else {
            continue;
        };

        // Processes may exit while being listed
        let Ok(comm) = fs::read_to_string(entry.path().join("comm")) else {
            continue;
        };
        let mut info = ProcessInfo::new(pid, comm.trim_end());
        if let Ok(exe) = fs::read_link(entry.path().join("exe")) {
            info = info.with_path(exe);
        }
        processes.push(info);
    }

    Ok(processes)
}

/// One line of `/proc/<pid>/maps`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapsEntry {
    pub start: u64,
    pub end: u64,
    pub path: Option<PathBuf>,
}

/// Parse the contents of a maps file, skipping malformed lines
pub fn parse_maps(contents: &str) -> Vec<MapsEntry> {
    contents.lines().filter_map(parse_maps_line).collect()
}

fn parse_maps_line(line: &str) -> Option<MapsEntry> {
    // start-end perms offset dev inode [path]
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (start, end) = fields.first()?.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;

    let rest = fields.get(5..).unwrap_or_default();
    let path = match rest.first() {
        Some(p) if p.starts_with('/') => Some(PathBuf::from(rest.join(" "))),
        _ => None,
    };

    Some(MapsEntry { start, end, path })
}

/// Collapse every file-backed mapping of `name` into one module
///
/// The base is the lowest mapping start; the size spans to the highest end.
pub fn module_from_maps(entries: &[MapsEntry], name: &str) -> Option<ModuleInfo> {
    let matching = entries.iter().filter(|e| {
        e.path
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .map(|n| n.eq_ignore_ascii_case(name))
            .unwrap_or(false)
    });

    let mut found: Option<(u64, u64, &Path)> = None;
    for entry in matching {
        let path = entry.path.as_deref()?;
        found = Some(match found {
            None => (entry.start, entry.end, path),
            Some((start, end, p)) => (start.min(entry.start), end.max(entry.end), p),
        });
    }

    let (start, end, path) = found?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut module = ModuleInfo::new(file_name, Address::new(start), (end - start) as usize);
    module.path = Some(path.to_path_buf());
    Some(module)
}

/// Find module `name` in process `pid`
pub fn find_module(pid: ProcessId, name: &str) -> io::Result<Option<ModuleInfo>> {
    let contents = fs::read_to_string(maps_path(pid))?;
    Ok(module_from_maps(&parse_maps(&contents), name))
}
