use clap::Parser;
use sm83_run::Cli;

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = sm83_run::execute(cli.command) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
