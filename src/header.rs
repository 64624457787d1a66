use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::arena::Arena;
use crate::error::{Result, Shader2hError};

/// C identifiers derived from the shader path, one byte per input byte.
#[derive(Debug, PartialEq, Eq)]
pub struct HeaderNames<'a> {
    /// Lowercase array name.
    pub var: &'a [u8],
    /// Uppercase include guard, without the `_H` suffix.
    pub guard: &'a [u8],
}

pub fn derive_names<'a>(arena: &'a Arena, name: &[u8]) -> HeaderNames<'a> {
    let len = name.len();
    let var = arena.alloc(len);
    let guard = arena.alloc(len);

    for (i, &ch) in name.iter().enumerate() {
        let (v, g) = match ch {
            b'0'..=b'9' if i == 0 => {
                warn!(
                    "The first character of `{}` is a number, \
                     it is replaced with `_` in the output header",
                    String::from_utf8_lossy(name)
                );
                (b'_', b'_')
            }
            b'0'..=b'9' => (ch, ch),
            b'a'..=b'z' | b'A'..=b'Z' => (ch.to_ascii_lowercase(), ch.to_ascii_uppercase()),
            _ => (b'_', b'_'),
        };
        var[i] = v;
        guard[i] = g;
    }

    HeaderNames { var, guard }
}

/// Output path is the input path with `.h` appended.
pub fn header_path(input: &Path) -> PathBuf {
    let mut path = OsString::from(input.as_os_str());
    path.push(".h");
    PathBuf::from(path)
}

pub fn write_header(out: &mut impl Write, names: &HeaderNames<'_>, source: &[u8]) -> io::Result<()> {
    out.write_all(b"#ifndef ")?;
    out.write_all(names.guard)?;
    out.write_all(b"_H\n#define ")?;
    out.write_all(names.guard)?;
    out.write_all(b"_H\n\nconst char ")?;
    out.write_all(names.var)?;
    out.write_all(b"[] = {\n  ")?;

    for byte in source {
        write!(out, "{byte:#x}, ")?;
    }
    out.write_all(b"0x0\n};\n\n#endif\n")?;
    out.flush()
}

/// Writes the header for `input` next to it and returns the output path.
pub fn emit_header(arena: &Arena, input: &Path, source: &str) -> Result<PathBuf> {
    let out_path = header_path(input);
    let write_error = |source| Shader2hError::Write {
        path: out_path.clone(),
        source,
    };

    let names = derive_names(arena, input.as_os_str().as_encoded_bytes());

    let file = File::create(&out_path).map_err(write_error)?;
    write_header(&mut BufWriter::new(file), &names, source.as_bytes()).map_err(write_error)?;

    Ok(out_path)
}
