pub mod check;
pub mod dump;
pub mod roundtrip;

use std::path::{Path, PathBuf};
use std::process::exit;

use boxtree_engine::TreeManager;
use boxtree_grammar::registry;

/// Register every grammar file and import the source. The first grammar is
/// the document grammar.
pub fn load_document(grammars: &[PathBuf], source: &Path) -> (TreeManager, String) {
    let mut document_grammar: Option<String> = None;
    for path in grammars {
        let text = read_or_exit(path);
        match registry::register(&text) {
            Ok(compiled) => {
                document_grammar.get_or_insert_with(|| compiled.name().to_owned());
            }
            Err(e) => {
                eprintln!("error: {}: {}", path.display(), e);
                exit(2);
            }
        }
    }
    let name = document_grammar.expect("clap enforces at least one grammar");

    let mut manager = match TreeManager::new(&name) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            exit(2);
        }
    };
    let text = read_or_exit(source);
    manager.import_file(&text);
    (manager, text)
}

pub fn read_or_exit(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: {}: {}", path.display(), e);
            exit(2);
        }
    }
}
