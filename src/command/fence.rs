//! Fenced-block scanner for free-text responses
//!
//! Finds every ```` ```label ... ``` ```` block in order. Unterminated
//! fences end the scan.

use nom::bytes::complete::{tag, take_until, take_while};
use nom::{IResult, Parser};

/// Labels that mark a block as carrying a function call
pub const RECOGNIZED_LABELS: [&str; 2] = ["json", "tool_call"];

const FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    pub label: &'a str,
    pub body: &'a str,
}

impl FencedBlock<'_> {
    pub fn is_recognized(&self) -> bool {
        RECOGNIZED_LABELS
            .iter()
            .any(|l| l.eq_ignore_ascii_case(self.label))
    }
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn fenced_block(input: &str) -> IResult<&str, FencedBlock<'_>> {
    let (rest, (_, label, body, _)) = (
        tag(FENCE),
        take_while(is_label_char),
        take_until(FENCE),
        tag(FENCE),
    )
        .parse(input)?;
    Ok((
        rest,
        FencedBlock {
            label,
            body: body.trim(),
        },
    ))
}

/// All complete fenced blocks, in order of appearance
pub fn scan_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(FENCE) {
        match fenced_block(&rest[start..]) {
            Ok((after, block)) => {
                blocks.push(block);
                rest = after;
            }
            Err(_) => break,
        }
    }
    blocks
}
