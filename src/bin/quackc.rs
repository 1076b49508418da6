use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use quack_lang::compiler::{compile, write_modules};
use quack_lang::hierarchy::load_builtins;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Quack source file to compile
    #[arg(short, long)]
    file: PathBuf,

    /// JSON catalog of builtin classes
    #[arg(short, long, default_value = "builtinclass.json")]
    builtins: PathBuf,

    /// Directory receiving the emitted .asm modules and the manifest
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Base name of the synthetic main module (defaults to the file stem)
    #[arg(short, long)]
    name: Option<String>,
}

fn main() {
    simple_logger::init_with_level(log::Level::Warn).unwrap();
    let args = Cli::parse();

    let source = std::fs::read_to_string(&args.file).expect(&format!(
        "Could not read file: '{}'",
        args.file.to_string_lossy()
    ));
    let catalog = std::fs::read_to_string(&args.builtins).expect(&format!(
        "Could not read builtin catalog: '{}'",
        args.builtins.to_string_lossy()
    ));

    let mut hierarchy = match load_builtins(&catalog) {
        Ok(hierarchy) => hierarchy,
        Err(error) => {
            error!("{error}");
            std::process::exit(-1);
        }
    };

    let main_name = args.name.unwrap_or_else(|| {
        args.file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Main".to_owned())
    });

    let modules = match compile(&source, &mut hierarchy, &main_name) {
        Ok(modules) => modules,
        Err(error) => {
            error!("{error}");
            std::process::exit(-1);
        }
    };

    if let Err(error) = write_modules(&modules, &args.output) {
        error!("could not write modules: {error}");
        std::process::exit(-1);
    }

    info!(
        "emitted {} modules to '{}'",
        modules.len(),
        args.output.to_string_lossy()
    );
}
