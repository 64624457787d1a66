use std::fmt;
use std::io::{self, Write as _};
use std::path::Path;

use crate::arena::Arena;

/// One compiler message, with a 1-based position when the compiler gave one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Option<(u32, u32)>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            location: None,
            message: message.into(),
        }
    }

    pub fn at(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            location: Some((line, column)),
            message: message.into(),
        }
    }
}

#[derive(Default)]
struct ByteCounter(usize);

impl fmt::Write for ByteCounter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.pos + s.len();
        let dst = self.buf.get_mut(self.pos..end).ok_or(fmt::Error)?;
        dst.copy_from_slice(s.as_bytes());
        self.pos = end;
        Ok(())
    }
}

// Every line of every message gets the file name in front, so multi-line
// driver output still points back at the shader.
fn render(out: &mut impl fmt::Write, path: &str, diagnostics: &[Diagnostic]) -> fmt::Result {
    for diagnostic in diagnostics {
        let mut lines = diagnostic.message.lines();
        let first = lines.next().unwrap_or_default();
        match diagnostic.location {
            Some((line, column)) => writeln!(out, "{path}:{line}:{column}: {first}")?,
            None => writeln!(out, "{path}: {first}")?,
        }
        for line in lines {
            writeln!(out, "{path}: {line}")?;
        }
    }
    Ok(())
}

/// Renders `diagnostics` into a single arena allocation sized to fit.
pub fn annotate<'a>(arena: &'a Arena, path: &Path, diagnostics: &[Diagnostic]) -> &'a str {
    let path = path.display().to_string();

    let mut counter = ByteCounter::default();
    let _ = render(&mut counter, &path, diagnostics);

    let mut writer = SliceWriter {
        buf: arena.alloc(counter.0),
        pos: 0,
    };
    let _ = render(&mut writer, &path, diagnostics);

    let SliceWriter { buf, pos } = writer;
    let buf: &'a [u8] = buf;
    std::str::from_utf8(&buf[..pos]).unwrap_or_default()
}

/// Writes annotated diagnostics to stderr.
pub fn report(arena: &Arena, path: &Path, diagnostics: &[Diagnostic]) -> io::Result<()> {
    let text = annotate(arena, path, diagnostics);
    let mut stderr = io::stderr().lock();
    stderr.write_all(text.as_bytes())?;
    stderr.flush()
}
