//
// main.rs
//
// Command line inspection of code links stored on diagram nodes
//

use std::env;

use codelink::position_codec::{self, CodeLocation};
use codelink::symbol_resolver::extract_symbol_name;
use tower_lsp::lsp_types::{Position, Range, Url};

fn print_usage() {
    println!(
        "codelink {}, diagram-to-code link inspector.",
        env!("CARGO_PKG_VERSION")
    );
    print!(
        r#"
Usage: codelink [OPTIONS]

Available options:

--decode <json>                          Decode stored link data into a location
--encode <uri> <line> <col> <line> <col> Encode a location as link data
--tag <label>                            Print the #tag a node label resolves by
--version                                Print the version
--help                                   Print this help message

"#
    );
}

fn parse_u32(arg: Option<String>, what: &str) -> anyhow::Result<u32> {
    let arg = arg.ok_or_else(|| anyhow::anyhow!("Missing {what}"))?;
    arg.parse::<u32>()
        .map_err(|e| anyhow::anyhow!("Invalid {what} '{arg}': {e}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut argv = env::args();
    argv.next(); // skip executable name

    let Some(command) = argv.next() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "--decode" => {
            let json = argv
                .next()
                .ok_or_else(|| anyhow::anyhow!("Missing link data"))?;
            let value: serde_json::Value = serde_json::from_str(&json)?;
            let location = position_codec::decode(&value)?;
            println!("{location}");
        }
        "--encode" => {
            let uri = argv.next().ok_or_else(|| anyhow::anyhow!("Missing uri"))?;
            let uri = Url::parse(&uri)?;
            let start = Position::new(
                parse_u32(argv.next(), "start line")?,
                parse_u32(argv.next(), "start column")?,
            );
            let end = Position::new(
                parse_u32(argv.next(), "end line")?,
                parse_u32(argv.next(), "end column")?,
            );
            let link = position_codec::encode(&CodeLocation::new(uri, Range::new(start, end)));
            println!("{}", link.to_value());
        }
        "--tag" => {
            let label = argv.next().ok_or_else(|| anyhow::anyhow!("Missing label"))?;
            match extract_symbol_name(&label) {
                Some(name) => println!("{name}"),
                None => {
                    log::info!("Label {:?} carries no #tag", label);
                    println!("(no tag)");
                }
            }
        }
        "--version" => {
            println!("codelink {}", env!("CARGO_PKG_VERSION"));
        }
        "--help" => {
            print_usage();
        }
        other => {
            return Err(anyhow::anyhow!("Unknown argument: '{other}'"));
        }
    }

    if let Some(extra) = argv.next() {
        return Err(anyhow::anyhow!("Unexpected argument: '{extra}'"));
    }

    Ok(())
}
