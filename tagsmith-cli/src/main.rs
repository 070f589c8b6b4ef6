#![forbid(unsafe_code)]

#[macro_use]
mod stdout;

mod args;
mod playlists;
mod show;

#[macro_use]
extern crate clap;

use clap::AppSettings;
use std::process;
use stdout::PedanticLogger;

fn main() {
    let matches = clap_app!(app =>
        (name: "tagsmith")
        (version: crate_version!())
        (about: "Tagsmith is a utility for reading audio metadata and probing playlist formats.")
        (setting: AppSettings::SubcommandRequiredElseHelp)
        (@arg pedantic: -p --pedantic "Print technical information")
        (@subcommand show =>
            (about: "Read audio metadata")
            (@arg path: +required +hidden +takes_value +multiple "A file to read from")
            (@arg fields: -f --fields +takes_value +multiple "Filter to specific fields")
            (@arg all: -a --all "Also show frames without a semantic mapping")
            (settings: &[AppSettings::DisableVersion])
        )
        (@subcommand playlist =>
            (about: "Probe playlist format dispatch")
            (@arg path: +required +hidden +takes_value +multiple "A playlist path to probe")
            (settings: &[AppSettings::DisableVersion])
        )
    )
    .get_matches();

    if matches.is_present("pedantic") {
        PedanticLogger::setup();
    }

    let result = match matches.subcommand() {
        ("show", Some(show)) => show::show(
            show.values_of("path").unwrap(),
            show.values_of("fields"),
            show.is_present("all"),
        ),

        ("playlist", Some(playlist)) => playlists::probe(playlist.values_of("path").unwrap()),

        _ => unreachable!(),
    };

    if let Err(err) = result {
        errorln!("tagsmith: {}", err);
        process::exit(1);
    }
}
