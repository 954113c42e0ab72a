use std::process::exit;

use boxtree_engine::serialize;

use crate::cli::RoundtripParams;

use super::load_document;

pub fn run(params: RoundtripParams) {
    let (manager, original) = load_document(&params.grammars, &params.source);

    let json = match serialize::save(&manager) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("error: serialization failed: {e}");
            exit(2);
        }
    };
    let reloaded = match serialize::load(&json) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: reload failed: {e}");
            exit(2);
        }
    };

    let exported = reloaded.export_as_text();
    if exported == original && reloaded.tree_equals(&manager) {
        println!("ok");
    } else {
        eprintln!("error: round-trip mismatch");
        exit(1);
    }
}
