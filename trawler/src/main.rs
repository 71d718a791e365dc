use colored::Colorize;
use trawler::commands::command_argument_builder;
use trawler::handlers::{handle_crawl, init_tracing, print_banner};

#[tokio::main]
async fn main() {
    let chosen_command = command_argument_builder().get_matches();
    let quiet = chosen_command.get_flag("quiet");
    init_tracing(chosen_command.get_count("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        Some((other, _)) => unreachable!("clap accepted unknown subcommand {other}"),
        None => {
            let _ = command_argument_builder().print_help();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
