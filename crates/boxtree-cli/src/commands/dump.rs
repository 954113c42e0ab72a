use boxtree_engine::dump_tree;

use crate::cli::DumpParams;

use super::load_document;

pub fn run(params: DumpParams) {
    let (manager, _) = load_document(&params.grammars, &params.source);
    print!(
        "{}",
        dump_tree(manager.arena(), manager.outer_record().root)
    );
    if !manager.last_status() {
        println!("-- parse incomplete: {} error(s)", manager.error_nodes().len());
    }
}
