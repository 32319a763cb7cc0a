use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = templar::cli::Cli::parse();
    templar::cli::run(cli)
}
