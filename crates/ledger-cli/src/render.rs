use anyhow::Result;
use ledger_core::Chain;
use std::io::{self, Write};

const RULE_WIDTH: usize = 40;

pub fn write_chain<W: Write>(out: &mut W, chain: &Chain) -> io::Result<()> {
    for block in chain {
        writeln!(out, "Index: {}", block.index)?;
        writeln!(out, "Timestamp: {}", block.timestamp)?;
        writeln!(out, "Transactions: {}", block.transactions)?;
        writeln!(out, "Previous Hash: {}", block.previous_hash_hex())?;
        writeln!(out, "Hash: {}", block.hash_hex())?;
        writeln!(out, "Nonce: {}", block.nonce)?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    }
    Ok(())
}

pub fn print_chain(chain: &Chain, json: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, chain.blocks())?;
        writeln!(out)?;
    } else {
        write_chain(&mut out, chain)?;
    }
    Ok(())
}
