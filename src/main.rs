use clap::Parser;
use std::{error::Error, path::PathBuf};
use tracing_subscriber::EnvFilter;
use virtual_window::{
    BulkLoader,
    VirtualWindow,
    WindowConfig,
    files::{FileEntry, FileQuery, walk_files},
    scroll::DEFAULT_STAGE_STEP,
};

#[derive(Parser, Debug)]
#[command(about = "Browse a directory tree through a filtered virtual window")]
struct Args {
    // Корень обхода
    #[arg(default_value = ".")]
    directory: PathBuf,
    #[arg(long, default_value_t = 50)]
    initial_size: usize,
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    extension: String,
    // Сколько раз догрузить окно после reset
    #[arg(long, default_value_t = 0)]
    pages: usize,
    #[arg(long, default_value_t = DEFAULT_STAGE_STEP)]
    step: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();
    let root = args.directory.canonicalize().unwrap_or(args.directory.clone());

    let loader = BulkLoader::new();
    let _task = loader.start(walk_files(&root).map(FileEntry::from_path))?;

    let window = VirtualWindow::new(loader.accumulator(), WindowConfig::new(args.initial_size));
    loader.block_until(args.initial_size);

    window.set_filter(FileQuery::new(&args.name, &args.extension).into_predicate());
    window.reset().wait()?;
    for _ in 0..args.pages {
        if !window.stage(args.step) {
            break;
        }
    }

    println!("== {} ==", root.display());
    for entry in window.items() {
        println!("{:>8}  {}", entry.formatted_size(), entry.path.display());
    }
    let counters = window.counters();
    println!(
        "collected: {}  proxy: {}  staged: {}",
        counters.source_size, counters.proxy_size, counters.staged_size
    );

    window.dispose();
    loader.dispose();
    Ok(())
}
