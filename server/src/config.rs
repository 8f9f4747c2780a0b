use std::{env, path::PathBuf};
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuración del proceso, leída una vez desde variables de entorno.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Directorio de los `.prg` del sistema viejo
    pub prgs_dir: PathBuf,
    pub max_retries: u32,
}

impl ServerConfig {
    /// - BIND_ADDR (default 0.0.0.0:8080)
    /// - PRGS_DIR (default ./prgs)
    /// - MAX_RETRIES (default 3)
    pub fn from_env() -> Self {
        Self::from_vars(
            env::var("BIND_ADDR").ok(),
            env::var("PRGS_DIR").ok(),
            env::var("MAX_RETRIES").ok(),
        )
    }

    fn from_vars(
        bind_addr: Option<String>,
        prgs_dir: Option<String>,
        max_retries: Option<String>,
    ) -> Self {
        let bind_addr = bind_addr.unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let prgs_dir = prgs_dir.map(PathBuf::from).unwrap_or_else(|| {
            env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("prgs")
        });

        Self {
            bind_addr,
            prgs_dir,
            max_retries: parse_max_retries(max_retries),
        }
    }
}

/// Valor inválido => default, con un warning.
pub fn parse_max_retries(raw: Option<String>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_MAX_RETRIES;
    };
    raw.trim().parse::<u32>().unwrap_or_else(|_| {
        warn!(
            "MAX_RETRIES inválido ({:?}), usando {}",
            raw, DEFAULT_MAX_RETRIES
        );
        DEFAULT_MAX_RETRIES
    })
}
