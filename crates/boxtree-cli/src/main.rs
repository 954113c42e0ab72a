mod cli;
mod commands;

use cli::{CheckParams, DumpParams, RoundtripParams, build_cli};

fn main() {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("check", m)) => {
            let params = CheckParams::from_matches(m);
            commands::check::run(params);
        }
        Some(("roundtrip", m)) => {
            let params = RoundtripParams::from_matches(m);
            commands::roundtrip::run(params);
        }
        Some(("dump", m)) => {
            let params = DumpParams::from_matches(m);
            commands::dump::run(params);
        }
        _ => unreachable!("clap should have caught this"),
    }
}
