#![deny(warnings)]

//! Initialise the save database and its default save slot.
//!
//! Usage: `migrate [--db URL] [--save NAME]`

use persistence::default_sqlite_url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut url = default_sqlite_url().to_string();
    let mut save = "default".to_string();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--db" => url = it.next().unwrap_or(url),
            "--save" => save = it.next().unwrap_or(save),
            _ => {}
        }
    }

    // Ensure the parent directory exists; sqlx only creates the file.
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"));
    if let Some(path) = path {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let pool = persistence::init_db(&url).await?;
    let id = persistence::create_save(&pool, &save, Some("initialized")).await?;
    println!("DB migrated at {} (save '{}' = {})", url, save, id);
    Ok(())
}
