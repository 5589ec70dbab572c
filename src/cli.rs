use clap::Parser;
use std::path::PathBuf;

use crate::catalog::Layout;

#[derive(Parser, Debug, Clone)]
#[command(name = "slpk-server")]
#[command(version)]
#[command(about = "Serve Scene Layer Packages (.slpk) as I3S SceneServer endpoints", long_about = None)]
#[command(after_help = "Examples:\n  \
  slpk-server --base ./data                 serve ./data/<collection>/slpk/*.slpk\n  \
  slpk-server --base ./slpk --layout flat   serve ./slpk/*.slpk\n  \
  BASE=/srv/scenes slpk-server --port 9000")]
pub struct Cli {
    /// Host name or address to listen on
    #[arg(long, env = "SLPK_HOST", default_value = "localhost")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SLPK_PORT", default_value_t = 8083)]
    pub port: u16,

    /// Storage root holding the archives
    #[arg(short, long, env = "BASE", value_name = "DIR")]
    pub base: PathBuf,

    /// How archives are arranged under the storage root
    #[arg(long, env = "SLPK_LAYOUT", value_enum, default_value_t = Layout::Collections)]
    pub layout: Layout,
}

impl Cli {
    pub fn bind_address(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}
