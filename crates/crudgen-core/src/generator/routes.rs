//! Splicing rendered route blocks into an existing routes file.
//!
//! A rendered block may start with a position directive:
//!
//! ```text
//! // @position: before // @crudgen:routes
//! ```
//!
//! The rest of the block is inserted before (or after) the first line of the
//! target containing the marker. Without a directive, or when the marker is
//! missing, the block is appended.

use once_cell::sync::Lazy;
use regex::Regex;

static POSITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*//\s*@position:\s*(after|before)\s+(.+?)\s*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePatch {
    pub placement: Option<(Placement, String)>,
    pub block: String,
}

impl RoutePatch {
    pub fn parse(rendered: &str) -> Self {
        let (first, rest) = rendered.split_once('\n').unwrap_or((rendered, ""));
        match POSITION.captures(first) {
            Some(caps) => {
                let placement = if &caps[1] == "after" {
                    Placement::After
                } else {
                    Placement::Before
                };
                Self {
                    placement: Some((placement, caps[2].to_string())),
                    block: rest.to_string(),
                }
            }
            None => Self {
                placement: None,
                block: rendered.to_string(),
            },
        }
    }

    fn block_lines(&self) -> String {
        let mut block = self.block.trim_end().to_string();
        block.push('\n');
        block
    }

    /// Content for a routes file that does not exist yet.
    ///
    /// The marker line is kept so later patches land in the same place.
    pub fn fresh(&self) -> String {
        let block = self.block_lines();
        match &self.placement {
            Some((Placement::Before, marker)) => format!("{block}\n{marker}\n"),
            Some((Placement::After, marker)) => format!("{marker}\n\n{block}"),
            None => block,
        }
    }

    /// Apply to existing content. `None` when the block is already present.
    pub fn apply(&self, existing: &str) -> Option<String> {
        let block = self.block_lines();
        if existing.contains(block.trim()) {
            return None;
        }

        let anchored = self.placement.as_ref().and_then(|(placement, marker)| {
            let mut offset = 0;
            for line in existing.split_inclusive('\n') {
                if line.contains(marker.as_str()) {
                    let at = match placement {
                        Placement::Before => offset,
                        Placement::After => offset + line.len(),
                    };
                    return Some((at, *placement, line.ends_with('\n')));
                }
                offset += line.len();
            }
            None
        });

        let mut out = String::with_capacity(existing.len() + block.len() + 2);
        match anchored {
            Some((at, Placement::Before, _)) => {
                out.push_str(&existing[..at]);
                out.push_str(&block);
                out.push('\n');
                out.push_str(&existing[at..]);
            }
            Some((at, Placement::After, terminated)) => {
                out.push_str(&existing[..at]);
                if !terminated {
                    out.push('\n');
                }
                out.push('\n');
                out.push_str(&block);
                out.push_str(&existing[at..]);
            }
            None => {
                out.push_str(existing);
                if !existing.is_empty() && !existing.ends_with('\n') {
                    out.push('\n');
                }
                out.push('\n');
                out.push_str(&block);
            }
        }
        Some(out)
    }
}
