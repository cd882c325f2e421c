use clap::{App, Arg};
use indexer::build::build_archives;
use indexer::config::Config;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() {
    let matches = App::new("indexer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds paginated archive pages for a blog")
        .arg(
            Arg::with_name("project")
                .short("p")
                .long("project")
                .takes_value(true)
                .default_value(".")
                .help("The project directory (or any directory beneath it)"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .default_value("./_output")
                .help("The directory archive pages are written under"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log every page written"),
        )
        .get_matches();

    FmtSubscriber::builder()
        .with_max_level(match matches.is_present("verbose") {
            true => Level::DEBUG,
            false => Level::INFO,
        })
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run(
        Path::new(matches.value_of("project").unwrap_or(".")),
        Path::new(matches.value_of("output").unwrap_or("./_output")),
    ) {
        eprintln!("ERROR {}", e);
        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  caused by: {}", err);
            source = err.source();
        }
        std::process::exit(1);
    }
}

fn run(project: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_directory(project, output)?;
    build_archives(&config)?;
    Ok(())
}
