use std::fmt;
use std::path::Path;

// AIDEV-NOTE: File extension decides both the source language and, for GLSL, the stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Vertex,
    Fragment,
    Compute,
    Wgsl,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 4] = [
        ShaderKind::Vertex,
        ShaderKind::Fragment,
        ShaderKind::Compute,
        ShaderKind::Wgsl,
    ];

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL.into_iter().find(|kind| kind.extension() == ext)
    }

    pub fn extension(self) -> &'static str {
        match self {
            ShaderKind::Vertex => "vert",
            ShaderKind::Fragment => "frag",
            ShaderKind::Compute => "comp",
            ShaderKind::Wgsl => "wgsl",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderKind::Vertex => "vertex",
            ShaderKind::Fragment => "fragment",
            ShaderKind::Compute => "compute",
            ShaderKind::Wgsl => "WGSL",
        }
    }

    /// GLSL stage for the naga frontend, `None` for WGSL modules.
    pub fn glsl_stage(self) -> Option<naga::ShaderStage> {
        match self {
            ShaderKind::Vertex => Some(naga::ShaderStage::Vertex),
            ShaderKind::Fragment => Some(naga::ShaderStage::Fragment),
            ShaderKind::Compute => Some(naga::ShaderStage::Compute),
            ShaderKind::Wgsl => None,
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Listing printed when a file has an unsupported extension.
pub struct SupportedKinds;

impl fmt::Display for SupportedKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Supported file types:")?;
        for kind in ShaderKind::ALL {
            write!(f, "\n  `.{}` for {} shader", kind.extension(), kind.name())?;
        }
        Ok(())
    }
}
