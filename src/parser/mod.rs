// Parsers for the two small grammars the engine carries: annotation
// formula expressions and custom tooltip templates.

pub mod formula;
pub mod template;
