use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::arena::Arena;
use crate::error::{Result, Shader2hError};

/// Reads a shader file into one arena allocation with a trailing NUL byte.
///
/// The returned text excludes the terminator, which sits right after it in
/// the arena.
pub fn read_shader<'a>(path: &Path, arena: &'a Arena) -> Result<&'a str> {
    let read_error = |source| Shader2hError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_error)?;
    let len = file.metadata().map_err(read_error)?.len() as usize;

    let buf = arena.alloc(len + 1);
    file.read_exact(&mut buf[..len]).map_err(read_error)?;
    buf[len] = 0;

    let buf: &'a [u8] = buf;
    std::str::from_utf8(&buf[..len]).map_err(|_| Shader2hError::Encoding {
        path: path.to_path_buf(),
    })
}
