use crate::error::{PageDocError, Result};
use crate::packs::directives::{PatternPack, parse_directive};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Pattern pack file parser
#[derive(Debug)]
pub struct PackParser;

impl PackParser {
    /// Parse a single pack file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<PatternPack> {
        let file = std::fs::File::open(&path)
            .map_err(|e| PageDocError::PackError(format!("Cannot open file {}: {}", path.as_ref().display(), e)))?;

        let reader = BufReader::new(file);
        Self::parse_reader(reader)
    }

    /// Parse a pack from a reader
    pub fn parse_reader<R: BufRead>(reader: R) -> Result<PatternPack> {
        let lines = reader.lines().enumerate().map(|(index, line)| {
            line.map_err(|e| PageDocError::PackError(format!("Read error at line {}: {}", index + 1, e)))
        });
        Self::parse_lines(lines)
    }

    /// Parse a pack from a string
    pub fn parse_string(content: &str) -> Result<PatternPack> {
        Self::parse_lines(content.lines().map(|line| Ok(line.to_string())))
    }

    fn parse_lines<I: Iterator<Item = Result<String>>>(lines: I) -> Result<PatternPack> {
        let mut pack = PatternPack::default();

        for (index, line) in lines.enumerate() {
            let line_number = index + 1;
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            parse_directive(line)
                .and_then(|directive| pack.add_directive(directive))
                .map_err(|e| PageDocError::PackError(format!("Parse error at line {}: {}", line_number, e)))?;
        }

        pack.finish()
    }
}
