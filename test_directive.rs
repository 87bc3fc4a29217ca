#![allow(clippy::uninlined_format_args)]

use clap::{Arg, Command};
use unsubscriber::{
    classify, extract_directive, parse_list_unsubscribe, scan_unsubscribe_links, MessageRecord,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = Command::new("test-directive")
        .about("Show which unsubscribe action would be taken for a header and/or HTML body")
        .arg(
            Arg::new("header")
                .long("header")
                .value_name("VALUE")
                .help("List-Unsubscribe header value"),
        )
        .arg(
            Arg::new("html")
                .long("html")
                .value_name("FILE")
                .help("File containing the HTML body"),
        )
        .get_matches();

    let header = matches.get_one::<String>("header").cloned();
    let html = match matches.get_one::<String>("html") {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };

    println!("=== List-Unsubscribe header ===");
    match &header {
        Some(value) => match parse_list_unsubscribe(value) {
            Some(target) => println!("✅ {} → {} ({})", value, target, classify(&target)),
            None => println!("❌ {} → no target", value),
        },
        None => println!("(not given)"),
    }

    println!("\n=== HTML body links ===");
    match &html {
        Some(body) => {
            let links = scan_unsubscribe_links(body);
            if links.is_empty() {
                println!("❌ no candidate links");
            }
            for (i, link) in links.iter().enumerate() {
                println!("  {}. {} ({})", i + 1, link, classify(link));
            }
        }
        None => println!("(not given)"),
    }

    let message = MessageRecord {
        id: "cli".to_string(),
        list_unsubscribe: header,
        html_body: html,
        ..Default::default()
    };

    println!("\n=== Resolved directive ===");
    match extract_directive(&message) {
        Some(directive) => println!("{} {}", directive.method, directive.target),
        None => println!("none - message would be labeled as failed"),
    }

    Ok(())
}
