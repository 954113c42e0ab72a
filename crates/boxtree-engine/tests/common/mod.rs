//! Shared grammar fixtures for the engine tests.
#![allow(dead_code)]

use std::sync::Once;

use boxtree_engine::TreeManager;
use boxtree_grammar::registry;

pub const CALC: &str = r#"
grammar Calc
tokens {
    INT   = "[0-9]+"
    plus  = "\+"
    times = "\*"
    ws    = "[ \t\n]+" ignore
}
rules {
    E ::= E "plus" T | T ;
    T ::= T "times" P | P ;
    P ::= "INT" ;
}
"#;

pub const COLON: &str = r#"
grammar ColonCollapse
tokens {
    a      = "a"
    b      = "b"
    assign = "::="
    colon  = ":"
    equal  = "="
}
rules {
    S ::= "a" "assign" "b" ;
}
"#;

pub const TAGS: &str = r#"
grammar Tags
tokens {
    html  = "<html"
    htm   = "htm"
    brack = "<"
}
rules {
    S ::= "brack" "htm" | "html" ;
}
"#;

pub const MINIPY: &str = r##"
grammar MiniPy
tokens {
    kwclass = "class"
    kwdef   = "def"
    kwpass  = "pass"
    name    = "[a-zA-Z_][a-zA-Z0-9_]*"
    parens  = "\(\)"
    colon   = ":"
    str     = "\"\"\"([^\"]|\"[^\"]|\"\"[^\"])*\"\"\""
    ws      = "[ \t]+" ignore
    nl      = "\n" ignore
    comment = "#[^\n]*" ignore
}
rules {
    file  ::= stmts ;
    stmts ::= stmts stmt | ;
    stmt  ::= "kwpass" "NEWLINE"
            | "name" "NEWLINE"
            | "str" "NEWLINE"
            | header block
            | header ;
    header ::= "kwclass" "name" "colon" "NEWLINE"
             | "kwdef" "name" "parens" "colon" "NEWLINE" ;
    block ::= "INDENT" stmts "DEDENT" ;
}
options { indent }
"##;

pub const PYSQL: &str = r#"
grammar PySql
tokens {
    name = "[a-zA-Z_][a-zA-Z0-9_]*"
    eq   = "="
    ws   = "[ \t\n]+" ignore
}
rules {
    file ::= file stmt | ;
    stmt ::= "name" "eq" atom ;
    atom ::= "name" ;
}
compose {
    atom hosts SQL
}
"#;

pub const SQL: &str = r#"
grammar SQL
tokens {
    select = "SELECT"
    from   = "FROM"
    star   = "\*"
    name   = "[a-zA-Z_][a-zA-Z0-9_]*"
    ws     = "[ \t]+" ignore
}
rules {
    query ::= "select" cols "from" "name" ;
    cols  ::= "star" | "name" ;
}
"#;

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        for source in [CALC, COLON, TAGS, MINIPY, PYSQL, SQL] {
            registry::register(source).expect("fixture grammar compiles");
        }
    });
}

pub fn manager(grammar: &str) -> TreeManager {
    setup();
    TreeManager::new(grammar).expect("fixture grammar registered")
}

pub fn type_str(manager: &mut TreeManager, text: &str) {
    for c in text.chars() {
        manager.insert(c);
    }
}
