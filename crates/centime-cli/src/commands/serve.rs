//! Web server command

use std::path::Path;

use anyhow::Result;
use centime_server::ServerConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;

    let config = ServerConfig {
        require_auth: !no_auth,
        ..Default::default()
    };

    centime_server::serve(db, host, port, config).await
}
