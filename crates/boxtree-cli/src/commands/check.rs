use std::process::exit;

use crate::cli::CheckParams;

use super::load_document;

pub fn run(params: CheckParams) {
    let (manager, _) = load_document(&params.grammars, &params.source);

    if manager.last_status() {
        println!("ok");
        return;
    }

    let text = manager.export_as_text();
    let rendered = manager
        .diagnostics()
        .printer(&text)
        .path(&params.source.display().to_string())
        .colored(params.color)
        .render();
    eprint!("{rendered}");
    eprintln!("{} error(s)", manager.error_nodes().len());
    exit(1);
}
