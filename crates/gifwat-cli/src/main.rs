use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use gifwat_core::{filter_gifs, parse_tags, Backend, Gif, GifCollectionStore};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod copy_helpers;
mod file_backend;
mod logging;
mod media;
mod picker;
mod worker;

use copy_helpers::SystemClipboard;
use file_backend::JsonFileBackend;

#[derive(Parser)]
#[command(name = "gifwat", version, about = "Keep GIF links at hand: tag, search, copy")]
struct Cli {
    /// Library file (overrides [storage].data_path)
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive grid picker (default)
    Pick,
    /// List gifs, newest first
    List {
        /// Whitespace-separated terms; each must match the url or a tag
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Add a gif url with optional tags
    Add { url: String, tags: Vec<String> },
    /// Replace the tags of a gif
    Tag { id: String, tags: Vec<String> },
    /// Remove a gif
    Delete { id: String },
    /// Copy a gif's url to the clipboard
    Copy { id: String },
    /// Show effective settings and paths
    Config {
        #[arg(long)]
        json: bool,
    },
}

fn print_list(gifs: &[&Gif], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(gifs)?);
    } else {
        for g in gifs {
            println!("{}\t{}\t{}", g.id, g.url, g.tags.join(" "));
        }
    }
    Ok(())
}

fn loaded(backend: &dyn Backend) -> Result<GifCollectionStore> {
    let mut store = GifCollectionStore::new();
    let req = store.load();
    store.run_blocking(backend, req)?;
    Ok(store)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load_settings();
    let data = cli
        .data
        .clone()
        .unwrap_or_else(|| config::data_path(&settings));
    let clipboard = SystemClipboard::new(settings.force_wl_copy());
    let files = JsonFileBackend::new(&data, Box::new(clipboard));

    let command = cli.command.unwrap_or(Commands::Pick);
    if matches!(command, Commands::Pick) {
        logging::init_file(settings.log_level(), &config::state_dir());
    } else {
        logging::init_stderr(settings.log_level());
    }
    tracing::debug!(data = %files.path().display(), "using library");

    match command {
        Commands::Pick => {
            let backend: Arc<dyn Backend> = Arc::new(files);
            if let Some(id) = picker::run_picker(backend, settings.interaction.clone())? {
                println!("{}", id);
            }
        }
        Commands::List { query, json } => {
            let store = loaded(&files)?;
            let shown = filter_gifs(store.gifs(), query.as_deref().unwrap_or(""));
            print_list(&shown, json)?;
        }
        Commands::Add { url, tags } => {
            let mut store = loaded(&files)?;
            let before: HashSet<String> = store.gifs().iter().map(|g| g.id.clone()).collect();
            let req = store
                .add(&url, parse_tags(&tags.join(" ")))
                .ok_or_else(|| anyhow!("url must not be empty"))?;
            store.run_blocking(&files, req)?;
            match store.gifs().iter().find(|g| !before.contains(&g.id)) {
                Some(g) => println!("added {}", g.id),
                None => println!("added"),
            }
        }
        Commands::Tag { id, tags } => {
            let mut store = loaded(&files)?;
            let req = store.update_tags(&id, parse_tags(&tags.join(" ")));
            store.run_blocking(&files, req)?;
            println!("tagged {}", id);
        }
        Commands::Delete { id } => {
            let mut store = loaded(&files)?;
            let req = store.remove(&id);
            store.run_blocking(&files, req)?;
            println!("deleted {}", id);
        }
        Commands::Copy { id } => {
            let mut store = loaded(&files)?;
            let gif = store
                .get(&id)
                .cloned()
                .ok_or_else(|| anyhow!("no gif with id {id}"))?;
            let req = store.copy(&gif);
            store.run_blocking(&files, req)?;
            println!("copied {}", gif.url);
        }
        Commands::Config { json } => {
            if json {
                let v = serde_json::json!({
                    "config_dir": config::config_dir(),
                    "settings_path": config::settings_path(),
                    "data_path": files.path(),
                    "state_dir": config::state_dir(),
                    "settings": settings,
                });
                println!("{}", serde_json::to_string_pretty(&v)?);
            } else {
                println!("config_dir: {}", config::config_dir().display());
                println!("settings: {}", config::settings_path().display());
                println!("data_path: {}", files.path().display());
                println!("{}", toml::to_string_pretty(&settings)?);
            }
        }
    }
    Ok(())
}
