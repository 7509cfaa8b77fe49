use anyhow::Result;

use vfetch::cli::build_cli;
use vfetch::commands;

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    vfetch::init_logging(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("get", sub_matches)) => commands::get::execute(sub_matches),
        Some(("preview", sub_matches)) => commands::preview::execute(sub_matches),
        Some(("config", sub_matches)) => commands::config::execute(sub_matches),
        Some(("cookies", sub_matches)) => commands::cookies::execute(sub_matches),
        Some(("completions", sub_matches)) => {
            let mut cli = build_cli();
            commands::completions::execute(sub_matches, &mut cli)
        }
        _ => {
            println!("Use 'vfetch --help' for usage.");
            Ok(())
        }
    }
}
