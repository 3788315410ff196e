use anyhow::Result;
use multisum::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let bar = cli.status_line();
    cli.init_logging(&bar);
    cli.run(bar)
}
