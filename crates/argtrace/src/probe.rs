//! Process-wide probe for loaded shared objects.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

static SO_LOADED: OnceLock<bool> = OnceLock::new();

/// Whether a shared object whose base name starts with `soname` is mapped
/// into this process.
///
/// The answer is computed once, on the first call; later calls return the
/// cached result regardless of the name they ask about. Only a single
/// library is ever probed in practice.
pub fn has_shared_object(soname: &str) -> bool {
    *SO_LOADED.get_or_init(|| scan_loaded_objects(soname))
}

fn scan_loaded_objects(soname: &str) -> bool {
    let Ok(maps) = fs::read_to_string("/proc/self/maps") else {
        return false;
    };
    maps.lines()
        .filter_map(|line| line.split_whitespace().nth(5))
        .filter(|path| path.starts_with('/'))
        .any(|path| {
            Path::new(path)
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(soname))
        })
}
