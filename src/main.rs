//! mkdmg - build compressed, signed and notarized macOS disk images.

use std::process;

#[tokio::main]
async fn main() {
    // Run CLI and get exit code
    let exit_code = match mkdmg::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("mkdmg: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
