//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = pcidb_cli::run() {
        eprintln!("pcidb: {err}");
        std::process::exit(1);
    }
}
