//! CLI definition and shared argument builders.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

/// Grammar file(s); repeatable. The first one is the document grammar.
fn grammar_arg() -> Arg {
    Arg::new("grammar")
        .short('g')
        .long("grammar")
        .value_name("FILE")
        .action(ArgAction::Append)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Grammar file; repeat for composed inner grammars (first = document grammar)")
}

fn source_arg() -> Arg {
    Arg::new("source")
        .value_name("SOURCE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Source file to import")
}

fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .action(ArgAction::SetTrue)
        .help("Render diagnostics with color")
}

pub fn build_cli() -> Command {
    Command::new("boxtree")
        .about("Incremental parsing core with language boxes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("check")
                .about("Import a file and report parse status and diagnostics")
                .arg(grammar_arg())
                .arg(source_arg())
                .arg(color_arg()),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Import, serialize, reload, export; exit 0 on a clean round-trip")
                .arg(grammar_arg())
                .arg(source_arg()),
        )
        .subcommand(
            Command::new("dump")
                .about("Import a file and print its parse tree")
                .arg(grammar_arg())
                .arg(source_arg()),
        )
}

pub struct CheckParams {
    pub grammars: Vec<PathBuf>,
    pub source: PathBuf,
    pub color: bool,
}

impl CheckParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            grammars: m
                .get_many::<PathBuf>("grammar")
                .expect("required arg")
                .cloned()
                .collect(),
            source: m.get_one::<PathBuf>("source").expect("required arg").clone(),
            color: m.get_flag("color"),
        }
    }
}

pub struct RoundtripParams {
    pub grammars: Vec<PathBuf>,
    pub source: PathBuf,
}

impl RoundtripParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            grammars: m
                .get_many::<PathBuf>("grammar")
                .expect("required arg")
                .cloned()
                .collect(),
            source: m.get_one::<PathBuf>("source").expect("required arg").clone(),
        }
    }
}

pub struct DumpParams {
    pub grammars: Vec<PathBuf>,
    pub source: PathBuf,
}

impl DumpParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            grammars: m
                .get_many::<PathBuf>("grammar")
                .expect("required arg")
                .cloned()
                .collect(),
            source: m.get_one::<PathBuf>("source").expect("required arg").clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_accepts_repeated_grammars() {
        let matches = build_cli()
            .try_get_matches_from([
                "boxtree", "check", "-g", "python.bt", "-g", "sql.bt", "prog.py", "--color",
            ])
            .unwrap();
        let (_, m) = matches.subcommand().unwrap();
        let params = CheckParams::from_matches(m);
        assert_eq!(params.grammars.len(), 2);
        assert_eq!(params.source, PathBuf::from("prog.py"));
        assert!(params.color);
    }

    #[test]
    fn grammar_is_required() {
        let result = build_cli().try_get_matches_from(["boxtree", "check", "prog.py"]);
        assert!(result.is_err());
    }
}
