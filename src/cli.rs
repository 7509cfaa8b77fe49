// Command-line definition, shared by `main` and the completion generator

use clap::{Arg, ArgAction, Command};

use crate::commands::options::with_request_args;

pub fn build_cli() -> Command {
    Command::new("vfetch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Download videos and audio with yt-dlp, then tidy the output folder")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show debug output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(with_request_args(
            Command::new("get")
                .about("Download one or more URLs, one after another")
                .arg(
                    Arg::new("urls")
                        .help("URLs to download")
                        .num_args(1..)
                        .required_unless_present("batch-file"),
                )
                .arg(
                    Arg::new("batch-file")
                        .short('a')
                        .long("batch-file")
                        .value_name("FILE")
                        .help("Read URLs from a file, one per line (# starts a comment)"),
                )
                .arg(
                    Arg::new("notify")
                        .long("notify")
                        .help("Show a desktop notification when the queue finishes")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("open")
                        .long("open")
                        .help("Open the output folder when the queue finishes")
                        .action(ArgAction::SetTrue),
                ),
        ))
        .subcommand(with_request_args(
            Command::new("preview")
                .about("Print the yt-dlp command line for a URL without running it")
                .arg(Arg::new("url").help("URL to preview").required(true)),
        ))
        .subcommand(
            Command::new("config")
                .about("Show or change saved settings")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("show").about("Show saved settings").arg(
                        Arg::new("json")
                            .long("json")
                            .help("Print as JSON")
                            .action(ArgAction::SetTrue),
                    ),
                )
                .subcommand(
                    Command::new("set")
                        .about("Set one setting (e.g. LAST_FORMAT 720p)")
                        .arg(Arg::new("key").help("Setting name").required(true))
                        .arg(Arg::new("value").help("New value (omit to clear)")),
                )
                .subcommand(
                    Command::new("reset")
                        .about("Restore default settings")
                        .arg(
                            Arg::new("yes")
                                .short('y')
                                .long("yes")
                                .help("Do not ask for confirmation")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(Command::new("path").about("Print the settings file location")),
        )
        .subcommand(
            Command::new("cookies")
                .about("Manage the generated cookie file")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("generate")
                        .about("Export cookies from a browser for later downloads")
                        .arg(
                            Arg::new("browser")
                                .short('b')
                                .long("browser")
                                .value_name("BROWSER")
                                .help("Browser to read cookies from (default: chrome)"),
                        ),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .help("Shell to generate completions for")
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .required(true),
                ),
        )
}
