//! CLI and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Runtime configuration for `parlord`.
#[derive(Parser, Debug, Clone)]
#[command(name = "parlord", about = "Broadcast chat server over a hand-rolled WebSocket layer", version)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "PARLOR_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Directory served for non-upgrade GET requests.
    #[arg(long, env = "PARLOR_PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,

    /// SQLite file recording every name that ever joined.
    #[arg(long, env = "PARLOR_NAMES_DB", default_value = "parlor.sqlite")]
    pub names_db: PathBuf,

    /// Disable name persistence entirely.
    #[arg(long, env = "PARLOR_NO_NAME_STORE")]
    pub no_name_store: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::parse_from(["parlord"]);
        assert_eq!(cfg.bind, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(cfg.public_dir, PathBuf::from("public"));
        assert_eq!(cfg.names_db, PathBuf::from("parlor.sqlite"));
        assert!(!cfg.no_name_store);
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = Config::parse_from([
            "parlord",
            "--bind",
            "0.0.0.0:8080",
            "--public-dir",
            "/srv/www",
            "--no-name-store",
        ]);
        assert_eq!(cfg.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.public_dir, PathBuf::from("/srv/www"));
        assert!(cfg.no_name_store);
    }
}
