extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;

pub mod preprocessor;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use preprocessor::Config;

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tExclam: {}\n\tIndent: {}\n\tOutfile: {}\n\tInfile: {}",
        match args.occurrences_of("verbose") {
            0 => log::LevelFilter::Error.to_string(),
            1 => log::LevelFilter::Warn.to_string(),
            2 => log::LevelFilter::Info.to_string(),
            3 | _ => log::LevelFilter::Debug.to_string(),
        },
        args.is_present("exclam"),
        args.value_of("indent").unwrap_or("4"),
        args.value_of("output").unwrap_or("None"),
        args.value_of("INPUT").unwrap_or("None")
    );

    // INPUT is a required argument, clap refuses to get here without it.
    let ipath = Path::new(args.value_of("INPUT").unwrap_or_default());

    let indent = match args.value_of("indent").unwrap_or("4").parse::<usize>() {
        Ok(width) => " ".repeat(width),
        Err(err) => {
            error!("fatal: invalid indent width: {}", err);
            std::process::exit(1);
        },
    };

    let config = Config {
        marker: if args.is_present("exclam") { Some('!') } else { None },
        indent,
        ..Config::default()
    };

    let output = match preprocessor::preprocess(ipath, config) {
        Err(err) => {
            error!("fatal: {}", err);
            std::process::exit(1);
        },
        Ok(output) => output,
    };

    if args.is_present("print-debug") {
        let mut grid = Grid::new(GridOptions {
            filling:     Filling::Spaces(1),
            direction:   Direction::LeftToRight,
        });

        for (idx, line) in output.lines().enumerate() {
            grid.add(Cell::from(format!("{:5}:", idx + 1)));
            grid.add(Cell::from(line.to_string()));
        }

        println!("{}", grid.fit_into_columns(2));
    }

    let opath = if let Some(filename) = args.value_of("output") {
        PathBuf::from(filename)
    } else {
        ipath.with_extension("out.s")
    };

    let mut ofile = match File::create(&opath) {
        Err(err) => {
            error!("fatal: unable to open output file `{}`: {}", opath.display(), err);
            std::process::exit(1);
        },
        Ok(file) => file,
    };

    if let Err(err) = ofile.write_all(output.as_bytes()) {
        error!("fatal: unable to write to output file `{}`: {}", opath.display(), err);
        std::process::exit(1);
    }
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(option_env!("CARGO_PKG_NAME").unwrap_or("preasm"))
        .version(option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"))
        .author(option_env!("CARGO_PKG_AUTHORS").unwrap_or(""))
        .about(option_env!("CARGO_PKG_DESCRIPTION").unwrap_or(""))
        .arg(Arg::with_name("INPUT")
            .help("Sets the input file to use")
            .required(true)
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("output")
            .short("o")
            .long("outfile")
            .takes_value(true)
            .help("write output to an outfile (defaults to INPUT with an .out.s extension)"))
        .arg(Arg::with_name("exclam")
            .short("x")
            .long("exclam")
            .takes_value(false)
            .help("directive keywords must be prefixed with `!`"))
        .arg(Arg::with_name("indent")
            .short("i")
            .long("indent")
            .takes_value(true)
            .help("number of spaces used to indent generated instructions"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .takes_value(false)
            .help("prints the expanded source with line numbers to STDOUT"))
        .get_matches()
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(match verbosity {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 | _ => log::LevelFilter::Debug,
        })
        .chain(std::io::stdout())
        .apply().ok();
}
