use clap_markdown::help_markdown;
use magic_stream::cli::Cli;

fn main() {
    // Print header
    println!("# magic-stream CLI Reference");
    println!();
    println!("This page contains the auto-generated reference documentation for the `magic-stream` command-line interface.");
    println!();

    println!("{}", help_markdown::<Cli>());
}
