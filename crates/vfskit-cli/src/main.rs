//! vfskit command-line demo.
//!
//! A thin wrapper around the vfskit library for manual smoke testing against
//! real file-backed images. Contains no filesystem or path-resolution logic
//! of its own; every command is a direct call into [`vfskit_vfs`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vfskit_device::FileDevice;
use vfskit_vfs::Vfs;

#[derive(Parser)]
#[command(name = "vfskit", version, about = "Mount and manipulate virtual filesystem images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create and format a new image file.
    Format {
        image: PathBuf,
        #[arg(long, default_value_t = 2880)]
        sectors: u32,
        #[arg(long, default_value_t = 512)]
        sector_size: u32,
        #[arg(long, default_value = "NONAME     ")]
        label: String,
        #[arg(long, default_value = "fat12")]
        backend: String,
    },
    /// List the contents of a directory.
    Ls {
        image: PathBuf,
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print a file's contents to stdout.
    Cat { image: PathBuf, path: String },
    /// Write a local file's bytes into the image.
    Write {
        image: PathBuf,
        path: String,
        source: PathBuf,
    },
    /// Create a directory, and any missing parents, inside the image.
    Mkdir { image: PathBuf, path: String },
    /// Remove a file or directory entry.
    Rm { image: PathBuf, path: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Format { image, sectors, sector_size, label, backend } => {
            cmd_format(&image, sectors, sector_size, &label, &backend)
        }
        Command::Ls { image, path } => cmd_ls(&image, &path),
        Command::Cat { image, path } => cmd_cat(&image, &path),
        Command::Write { image, path, source } => cmd_write(&image, &path, &source),
        Command::Mkdir { image, path } => cmd_mkdir(&image, &path),
        Command::Rm { image, path } => cmd_rm(&image, &path),
    }
}

fn open(image: &Path) -> Result<Vfs> {
    let device = FileDevice::open(image, 512).context("opening image")?;
    Vfs::mount(Box::new(device)).context("mounting image")
}

fn cmd_format(image: &Path, sectors: u32, sector_size: u32, label: &str, backend: &str) -> Result<()> {
    let mut device = FileDevice::create(image, sector_size, sectors).context("creating image")?;
    vfskit_vfs::format(&mut device, backend, label, None).context("formatting image")?;
    println!(
        "formatted {} ({sectors} sectors x {sector_size} bytes, {backend})",
        image.display()
    );
    Ok(())
}

fn cmd_ls(image: &Path, path: &str) -> Result<()> {
    let mut vfs = open(image)?;
    if path != "/" {
        vfs.cd(path).context("resolving directory")?;
    }

    for node in vfs.list_directory().context("listing directory")? {
        println!("{node}");
    }

    vfs.unmount()?;
    Ok(())
}

fn cmd_cat(image: &Path, path: &str) -> Result<()> {
    let mut vfs = open(image)?;
    let data = read_via_parent(&mut vfs, path).context("reading file")?;

    use std::io::Write;
    std::io::stdout().write_all(&data)?;

    vfs.unmount()?;
    Ok(())
}

fn cmd_write(image: &Path, path: &str, source: &Path) -> Result<()> {
    let data = std::fs::read(source).context("reading source file")?;
    let mut vfs = open(image)?;

    let (dir, name) = split_parent(path);
    if dir != "/" {
        vfs.cd(&dir).context("resolving parent directory")?;
    }
    vfs.write(&name, &data).context("writing file")?;

    vfs.unmount()?;
    Ok(())
}

fn cmd_mkdir(image: &Path, path: &str) -> Result<()> {
    let mut vfs = open(image)?;
    vfs.mkdir(path).context("creating directory")?;
    vfs.unmount()?;
    Ok(())
}

fn cmd_rm(image: &Path, path: &str) -> Result<()> {
    let mut vfs = open(image)?;

    let (dir, name) = split_parent(path);
    if dir != "/" {
        vfs.cd(&dir).context("resolving parent directory")?;
    }
    vfs.remove(&name).context("removing entry")?;

    vfs.unmount()?;
    Ok(())
}

fn read_via_parent(vfs: &mut Vfs, path: &str) -> Result<Vec<u8>> {
    let (dir, name) = split_parent(path);
    if dir != "/" {
        vfs.cd(&dir)?;
    }
    Ok(vfs.read(&name)?)
}

/// Split a path into its parent directory (always rooted) and final
/// component. A bare name with no `/` resolves to the root as parent.
fn split_parent(path: &str) -> (String, String) {
    match path.trim_start_matches('/').rsplit_once('/') {
        Some((dir, name)) => (format!("/{dir}"), name.to_string()),
        None => ("/".to_string(), path.trim_start_matches('/').to_string()),
    }
}
