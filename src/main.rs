use inlinemark::parse_inlines;
use std::io::{self, Read};

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .expect("Failed to read stdin");
    let nodes = parse_inlines(&input);
    let output = serde_json::to_string_pretty(&nodes).expect("Failed to serialize nodes");
    println!("{}", output);
}
