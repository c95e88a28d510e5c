//! # proptree-sync CLI
//!
//! Command-line utilities for encoding, inspecting, and demonstrating records.

use anyhow::{Context, Result};
use proptree_agent::workload;
use proptree_core::{ManualClock, ReceiverTree, SystemClock};
use proptree_proto::{decode_record, encode_record};
use std::env;
use std::fmt::Write;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "encode" => {
            if args.len() < 4 {
                eprintln!("Usage: proptree encode <tree.json> <out.cbor>");
                std::process::exit(1);
            }
            let records = encode_file(Path::new(&args[2]), Path::new(&args[3]))?;
            println!("wrote {records} record(s) to {}", args[3]);
        }
        "decode" => {
            if args.len() < 3 {
                eprintln!("Usage: proptree decode <record.cbor>");
                std::process::exit(1);
            }
            println!("{}", decode_file(Path::new(&args[2]))?);
        }
        "demo" => {
            for line in demo()? {
                println!("{line}");
            }
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Build a tree from JSON and write its full snapshot record as CBOR.
fn encode_file(input: &Path, output: &Path) -> Result<usize> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let mut root = workload::parse_tree(&json)?;
    let record = root
        .encode_now(&SystemClock)
        .context("Tree has nothing to encode")?;
    let bytes = encode_record(&record).context("Failed to encode record")?;
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(record.count())
}

/// Decode one unframed record and render it as JSON plus the resulting tree.
fn decode_file(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let record = decode_record(&bytes).context("Failed to decode")?;

    let mut tree = ReceiverTree::new(0);
    let report = tree.merge(&record);
    let json = serde_json::to_string_pretty(&record)?;

    let mut out = format!("{json}\n{}", tree.dump());
    for issue in &report.issues {
        let _ = write!(out, "\nwarning: {issue}");
    }
    Ok(out)
}

/// Run the portfolio scenario in-process: snapshot, one price change, one removal.
fn demo() -> Result<Vec<String>> {
    let clock = ManualClock::new(0);
    let mut producer = workload::portfolio()?;
    let mut consumer = ReceiverTree::new(0);
    let mut lines = vec![producer.describe()];

    let mut step = |producer: &mut proptree_core::SenderProperty, label: &str| -> Result<()> {
        clock.advance(1);
        if let Some(record) = producer.encode_dirty(&clock) {
            let bytes = encode_record(&record)?;
            let report = consumer.merge(&decode_record(&bytes)?);
            lines.push(format!(
                "-- {label}: {} record(s), {} bytes, {} created, {} updated, {} deleted",
                record.count(),
                bytes.len(),
                report.created,
                report.updated,
                report.deleted
            ));
            lines.push(consumer.dump());
        }
        Ok(())
    };

    step(&mut producer, "snapshot")?;
    producer.set_value_at("TICKER1/Price", 150.0_f32)?;
    step(&mut producer, "price update")?;
    if let Some(group) = producer.as_group_mut() {
        group.remove_child("TICKER2");
    }
    step(&mut producer, "removal")?;

    Ok(lines)
}

fn print_help() {
    println!(
        r#"proptree-sync CLI

USAGE:
    proptree <COMMAND> [OPTIONS]

COMMANDS:
    encode <tree.json> <out>  Encode a JSON tree as one CBOR property record
    decode <record>           Decode a CBOR property record and show the merged tree
    demo                      Run the portfolio sync scenario in-process
    help                      Show this help message

EXAMPLES:
    proptree encode portfolio.json portfolio.cbor
    proptree decode portfolio.cbor
"#
    );
}
