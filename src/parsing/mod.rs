//*** START FILE: src/parsing/mod.rs ***//
pub mod story_parser;

// Re-export the main parsing function for convenience
pub use story_parser::parse_story_text;
//*** END FILE: src/parsing/mod.rs ***//
