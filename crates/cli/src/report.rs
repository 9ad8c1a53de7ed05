//! Badge-style console lines, one per event, leveled by severity.

use colored::Colorize;

pub fn info(message: &str) {
    println!("{} {message}", " INFO ".white().on_blue());
}

pub fn tip(message: &str) {
    println!("{} {message}", " TIP ".blue());
}

pub fn warn(message: &str) {
    eprintln!("{} {message}", " WARN ".white().on_yellow());
}

pub fn success(message: &str) {
    println!("{} {message}", " SUCCEED ".white().on_green());
}

pub fn error(message: &str) {
    eprintln!("{} {message}", " ERROR ".white().on_red());
}
