//! Symc CLI
//!
//! Generates source code for the built-in catalogue of symbolic functions.

use symc::commands::{generate, list, parse_generate_options};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "generate" => {
            let options = match parse_generate_options(&args[2..]) {
                Ok(options) => options,
                Err(message) => {
                    eprintln!("error: {message}");
                    eprintln!();
                    print_usage();
                    std::process::exit(1);
                }
            };

            symc::init_tracing();
            match generate(&options) {
                Ok(reports) => {
                    for report in &reports {
                        for file in report.generated_files.iter().chain(&report.schema_files) {
                            println!("{}", file.display());
                        }
                    }
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    std::process::exit(1);
                }
            }
        }
        "list" => {
            println!("Catalogue:");
            list();
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-v" => {
            println!("symc {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("symc - symbolic expressions to C++ and Python");
    println!();
    println!("Usage: symc <command> [options]");
    println!();
    println!("Commands:");
    println!("  generate [functions...]  Generate catalogue functions (default: all)");
    println!("  list                     List catalogue functions");
    println!("  help                     Show this help message");
    println!("  version                  Show version information");
    println!();
    println!("Generate options:");
    println!("  --backend=<name>    Backend: cpp (default), python");
    println!("  --config=<file>     JSON backend configuration, overrides --backend");
    println!("  --out=<dir>         Output directory (default: ./generated)");
    println!("  --namespace=<ns>    Namespace of generated code (default: sym)");
    println!("  --flat              Write functions directly into the output directory");
    println!("  --jobs, -j          Build specifications in parallel");
    println!();
    println!("Logging is controlled by RUST_LOG (default: info).");
    println!();
    println!("Examples:");
    println!("  symc list");
    println!("  symc generate --out=gen");
    println!("  symc generate --backend=python product pose_prior_factor");
    println!("  RUST_LOG=symc_codegen=debug symc generate --jobs");
}
