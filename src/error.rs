use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::shader_kind::SupportedKinds;

#[derive(Debug, Error)]
pub enum Shader2hError {
    #[error("File `{}` not supported\n{}", path.display(), SupportedKinds)]
    Unsupported { path: PathBuf },

    #[error("Failed to read file `{}`: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("File `{}` is not valid UTF-8", path.display())]
    Encoding { path: PathBuf },

    #[error("Shader `{}` failed to compile with {errors} error(s)", path.display())]
    Compile { path: PathBuf, errors: usize },

    #[error("Failed to write file `{}`: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("No GPU adapter available: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("Failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("File watcher stopped unexpectedly")]
    WatchClosed,
}

pub type Result<T, E = Shader2hError> = std::result::Result<T, E>;
