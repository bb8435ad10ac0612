use std::fs;
use std::io;

use clap::{crate_authors, crate_description, crate_version, CommandFactory, Parser};
use clap_complete::generate;
use eyre::Result;
use tracing::trace;

use missionctl::{check_file, parse_file, Config, Opts, SubCommand};
use wpmz_common::init_logging;

/// Binary name, using a different binary name
pub const NAME: &str = env!("CARGO_BIN_NAME");
/// Binary version
pub const VERSION: &str = crate_version!();
/// Authors
pub const AUTHORS: &str = crate_authors!();

fn main() -> Result<()> {
    let opts = Opts::parse();

    // Initialise logging early
    //
    init_logging(NAME, opts.use_tree, opts.use_file.clone())?;
    trace!("Logging initialised.");

    let cfg = Config::load(opts.config.as_deref())?;

    handle_subcmd(&cfg, &opts.subcmd)
}

fn handle_subcmd(cfg: &Config, subcmd: &SubCommand) -> Result<()> {
    match subcmd {
        // Handle `parse file`
        //
        SubCommand::Parse(popts) => {
            trace!("parse");

            banner()?;
            let res = parse_file(cfg, popts)?;
            match &popts.output {
                Some(fname) => fs::write(fname, res)?,
                None => println!("{res}"),
            }
        }

        // Handle `check file`
        //
        SubCommand::Check(copts) => {
            trace!("check");

            banner()?;
            let res = check_file(cfg, copts)?;
            println!("{res}");
        }

        // Standalone completion generation
        //
        // NOTE: you can generate UNIX shells completion on Windows and vice-versa.  Not worth
        //       trying to limit depending on the OS.
        //
        SubCommand::Completion(copts) => {
            let generator = copts.shell;
            generate(generator, &mut Opts::command(), NAME, &mut io::stdout());
        }

        SubCommand::Version => {
            println!(
                "{} v{}\n{}\n{}",
                NAME,
                VERSION,
                wpmz_common::version(),
                wpmz_formats::version()
            );
        }
    }
    Ok(())
}

/// Display banner
///
fn banner() -> Result<()> {
    Ok(eprintln!(
        r##"
{}/{} by {}
{}
"##,
        NAME,
        VERSION,
        AUTHORS,
        crate_description!()
    ))
}
