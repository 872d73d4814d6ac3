use clap::Parser;

fn main() {
    let cli = quarry_core::runtime::Cli::parse();

    if let Err(error) = quarry_core::runtime::run(cli) {
        eprintln!("[quarry-core] {error}");
        std::process::exit(1);
    }
}
