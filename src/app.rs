use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::arena::Arena;
use crate::cli::Cli;
use crate::diagnostics::{report, Diagnostic};
use crate::error::{Result, Shader2hError};
use crate::gpu::DriverCompiler;
use crate::header::emit_header;
use crate::shader_kind::ShaderKind;
use crate::source::read_shader;
use crate::validation::validate_shader;
use crate::watcher::ShaderWatcher;

// AIDEV-NOTE: Main application struct, one arena reused across every shader of the run
pub struct App {
    driver: Option<DriverCompiler>,
    arena: Arena,
}

impl App {
    pub fn new(offline: bool) -> Result<Self> {
        let driver = if offline {
            info!("Offline mode, shaders are validated with naga only");
            None
        } else {
            let driver = DriverCompiler::new_blocking()?;
            let adapter = driver.adapter_info();
            info!("Compiling with {} ({:?})", adapter.name, adapter.backend);
            Some(driver)
        };

        Ok(Self::with_driver(driver))
    }

    pub fn with_driver(driver: Option<DriverCompiler>) -> Self {
        Self {
            driver,
            arena: Arena::new(),
        }
    }

    /// Processes one shader and recycles the arena afterwards.
    pub fn process_shader(&mut self, path: &Path) -> Result<PathBuf> {
        let result = process_shader(path, &self.arena, self.driver.as_ref());
        self.arena.reset();
        result
    }

    /// Stops at the first shader that fails.
    pub fn process_all(&mut self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            self.process_shader(path)?;
        }
        Ok(())
    }

    pub fn watch(&mut self, paths: &[PathBuf]) -> Result<()> {
        let mut watcher = ShaderWatcher::new(paths)?;
        info!("Watching {} shader file(s) for changes", paths.len());

        loop {
            for path in watcher.next_changes()? {
                if let Err(e) = self.rebuild(&path) {
                    error!("{e}");
                }
            }
        }
    }

    /// Re-processes a shader after it changed on disk.
    pub fn rebuild(&mut self, path: &Path) -> Result<PathBuf> {
        debug!("`{}` changed", path.display());
        self.process_shader(path)
    }

    pub fn shutdown(self) {
        self.arena.teardown();
    }
}

pub fn run(cli: &Cli) -> Result<()> {
    let mut app = App::new(cli.offline)?;
    let first_pass = app.process_all(&cli.shaders);

    if !cli.watch {
        app.shutdown();
        return first_pass;
    }

    if let Err(e) = first_pass {
        error!("{e}");
    }
    app.watch(&cli.shaders)
}

/// Validates `path` and writes its header. Every allocation goes to `arena`.
pub fn process_shader(
    path: &Path,
    arena: &Arena,
    driver: Option<&DriverCompiler>,
) -> Result<PathBuf> {
    let kind = ShaderKind::from_path(path).ok_or_else(|| Shader2hError::Unsupported {
        path: path.to_path_buf(),
    })?;

    let source = read_shader(path, arena)?;
    info!("Loaded {kind} shader `{}`", path.display());

    let module = match validate_shader(kind, source) {
        Ok(module) => module,
        Err(diagnostics) => return Err(compile_failure(arena, path, &diagnostics)),
    };
    debug!(
        entry_points = module.entry_points.len(),
        "naga validation passed"
    );

    if let Some(driver) = driver {
        let diagnostics = driver.compile(kind, &path.display().to_string(), source);
        if !diagnostics.is_empty() {
            return Err(compile_failure(arena, path, &diagnostics));
        }
        debug!("driver compile passed");
    }

    let out = emit_header(arena, path, source)?;
    info!("Shader written to file `{}`", out.display());
    Ok(out)
}

fn compile_failure(arena: &Arena, path: &Path, diagnostics: &[Diagnostic]) -> Shader2hError {
    if let Err(e) = report(arena, path, diagnostics) {
        warn!("Failed to print diagnostics: {e}");
    }
    Shader2hError::Compile {
        path: path.to_path_buf(),
        errors: diagnostics.len(),
    }
}
