//! `loraota keys`: injects OTAA credentials into a sketch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use loraota_keyload::{Credentials, KeysLoad, find_sketch, inject_file, load_or_template};

#[derive(Debug, Args)]
pub struct KeysArgs {
    /// Keys file; a zero template is written if it does not exist.
    #[arg(default_value = "keys.json")]
    pub keys: PathBuf,

    /// Sketch to update. Searched for next to the keys file's directory if omitted.
    pub sketch: Option<PathBuf>,
}

pub fn run(args: KeysArgs) -> anyhow::Result<ExitCode> {
    let creds = match load_or_template(&args.keys)? {
        KeysLoad::TemplateCreated(path) => {
            println!("{} not found, created template.", path.display());
            println!("Fill in your keys and run again.");
            return Ok(ExitCode::SUCCESS);
        }
        KeysLoad::Loaded(creds) => creds,
    };

    let sketch = match args.sketch {
        Some(path) => path,
        None => {
            let root = search_root(&args.keys)?;
            find_sketch(&root)?.with_context(|| {
                format!(
                    "no .ino sketch found under {}; pass it as the second argument",
                    root.display()
                )
            })?
        }
    };

    let injection = inject_file(&sketch, &creds)?;
    println!("Keys injected into: {}", sketch.display());
    print!("{}", key_summary(&creds));
    for field in &injection.missing_arrays {
        println!("  warning: {field} array not found in sketch");
    }
    Ok(ExitCode::SUCCESS)
}

fn key_summary(creds: &Credentials) -> String {
    format!(
        "  APPEUI : {} (LSB reversed in array)\n  DEVEUI : {} (LSB reversed in array)\n  APPKEY : {} (MSB order in array)\n",
        hex::encode_upper(creds.app_eui),
        hex::encode_upper(creds.dev_eui),
        hex::encode_upper(creds.app_key),
    )
}

/// Parent of the directory holding the keys file.
fn search_root(keys: &Path) -> anyhow::Result<PathBuf> {
    let keys = std::path::absolute(keys)?;
    let dir = keys.parent().unwrap_or(&keys);
    Ok(dir.parent().unwrap_or(dir).to_path_buf())
}
