use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    shader2h basic.vert basic.frag            # Writes basic.vert.h and basic.frag.h
    shader2h --offline blur.comp              # Validate with naga only, no GPU needed
    shader2h --watch shaders/*.frag           # Regenerate headers on every save
    RUST_LOG=debug shader2h plasma.wgsl       # Verbose logging")]
pub struct Cli {
    /// Shader files to compile (.vert, .frag, .comp or .wgsl)
    #[arg(required = true, value_name = "SHADER")]
    pub shaders: Vec<PathBuf>,

    /// Skip the GPU driver compile and validate with naga only
    #[arg(long)]
    pub offline: bool,

    /// Keep running and regenerate headers when the shader files change
    #[arg(short, long)]
    pub watch: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
