mod commands;

#[derive(clap::Parser)]
#[command(name = "gbpack", author = "EF1500", version = "1.0", about = "GBPK pack builder CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Build a GBPK pack from a manifest
    Pack(commands::pack::PackArgs),
}

pub fn app() -> gbpack::Result<()> {
    let argv = <Cli as clap::Parser>::parse();

    match argv.command {
        Commands::Pack(args) => commands::pack::execute(args),
    }
}
