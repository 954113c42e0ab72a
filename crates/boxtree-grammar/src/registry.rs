//! Process-wide grammar registry.
//!
//! Compiled grammars are expensive (table construction, DFA build) and
//! immutable, so they are cached once per process keyed by grammar name.
//! Inner grammars referenced by composition rules are resolved through the
//! registry by name at box-creation time.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use crate::compile::CompiledGrammar;
use crate::Result;

static REGISTRY: LazyLock<RwLock<HashMap<String, Arc<CompiledGrammar>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Compile a grammar file and cache it under its declared name. Re-registering
/// the same name replaces the cached entry.
pub fn register(source: &str) -> Result<Arc<CompiledGrammar>> {
    let compiled = Arc::new(CompiledGrammar::compile(source)?);
    REGISTRY
        .write()
        .expect("grammar registry lock")
        .insert(compiled.name().to_owned(), Arc::clone(&compiled));
    Ok(compiled)
}

/// Look up a previously registered grammar.
pub fn lookup(name: &str) -> Option<Arc<CompiledGrammar>> {
    REGISTRY
        .read()
        .expect("grammar registry lock")
        .get(name)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup() {
        let src = r#"
            grammar RegistryProbe
            tokens { a = "a" }
            rules { S ::= "a" ; }
        "#;
        let compiled = register(src).unwrap();
        let found = lookup("RegistryProbe").unwrap();
        assert!(Arc::ptr_eq(&compiled, &found));
        assert!(lookup("NoSuchGrammar").is_none());
    }
}
