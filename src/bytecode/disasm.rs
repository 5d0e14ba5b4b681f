use std::collections::BTreeSet;
use std::fmt::Write;

use crate::bytecode::{Chunk, Op, Word};

/// Print disassembly of a chunk
pub fn print_chunk(chunk: &Chunk) {
    println!("════════════════════════════════════════");
    println!(" chunk");
    println!(" {} words", chunk.len());
    println!("════════════════════════════════════════");
    print!("{}", disassemble(chunk));
}

/// Return disassembly as a String, one instruction per line.
///
/// Addresses that some jump or call targets are marked with `►`. Words that
/// do not decode are printed as `UNKNOWN` and skipped one at a time.
pub fn disassemble(chunk: &Chunk) -> String {
    let targets = collect_targets(chunk);
    let words = chunk.words();
    let mut out = String::new();
    let mut at = 0;

    while at < words.len() {
        let marker = if targets.contains(&at) { "►" } else { " " };

        let Some(op) = Op::from_word(words[at]) else {
            let _ = writeln!(out, "{:04} {} UNKNOWN       {}", at, marker, words[at]);
            at += 1;
            continue;
        };

        let end = (at + op.width()).min(words.len());
        let operands: Vec<String> = words[at + 1..end].iter().map(|w| w.to_string()).collect();
        let mut line = format!("{:04} {} {:<14}{}", at, marker, op.mnemonic(), operands.join(" "));
        if end - at < op.width() {
            line.push_str(" <truncated>");
        }
        if let Some(effect) = op.stack_effect().and_then(format_effect) {
            line = format!("{:<36}; {}", line, effect);
        }
        let _ = writeln!(out, "{}", line.trim_end());

        at += op.width();
    }

    out
}

fn collect_targets(chunk: &Chunk) -> BTreeSet<usize> {
    let words = chunk.words();
    let mut targets = BTreeSet::new();
    let mut at = 0;

    while at < words.len() {
        let Some(op) = Op::from_word(words[at]) else {
            at += 1;
            continue;
        };
        if op.has_target() {
            if let Some(target) = words.get(at + 1).and_then(|w| to_index(*w)) {
                targets.insert(target);
            }
        }
        at += op.width();
    }

    targets
}

fn to_index(word: Word) -> Option<usize> {
    usize::try_from(word).ok()
}

/// Formats (pops, pushes) as a `( a b -- c )` stack comment.
fn format_effect((pops, pushes): (usize, usize)) -> Option<String> {
    if pops == 0 && pushes == 0 {
        return None;
    }
    let names = ['a', 'b', 'c', 'd'];
    let before: Vec<String> = names.iter().take(pops).map(|c| c.to_string()).collect();
    let after: Vec<String> = names
        .iter()
        .skip(pops)
        .take(pushes)
        .map(|c| c.to_string())
        .collect();

    let mut text = String::from("(");
    for name in &before {
        text.push(' ');
        text.push_str(name);
    }
    text.push_str(" --");
    for name in &after {
        text.push(' ');
        text.push_str(name);
    }
    text.push_str(" )");
    Some(text)
}
