//! Terminal output helpers

use std::io::{self, Write};

pub fn header(title: &str) {
    println!("\n--- 🤖 {} ---", title.to_uppercase());
}

pub fn info(message: &str) {
    println!("\n💡 {}", message);
}

pub fn success(message: &str) {
    println!("\n✅ {}", message);
}

pub fn error(message: &str) {
    eprintln!("\n❌ {}", message);
}

/// Announce the sync of one collection
pub fn collection(name: &str, file_count: usize) {
    println!("\n📦 Syncing [{}] ({} files)...", name, file_count);
}

pub fn show_help() {
    println!("\n📜 Available Commands:");
    println!("/clear  -> Resets current conversation memory");
    println!("/back   -> Change category (clears memory)");
    println!("/help   -> Shows this list");
    println!("/exit   -> Closes the program");
}

/// Numbered list of collections to pick from
pub fn collection_menu(collections: &[String]) {
    println!("\n📚 Select a Category:");
    for (idx, name) in collections.iter().enumerate() {
        println!("({}) {}", idx + 1, name);
    }
}

/// Start of a streamed or complete answer
pub fn answer_prefix(model: &str) {
    print!("\n🤖 {}: ", model);
    let _ = io::stdout().flush();
}

/// One streamed fragment, shown immediately
pub fn fragment(text: &str) {
    print!("{}", text);
    let _ = io::stdout().flush();
}

pub fn answer(model: &str, text: &str) {
    println!("\n🤖 {}: {}", model, text);
}
