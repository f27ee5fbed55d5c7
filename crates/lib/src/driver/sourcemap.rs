//! Line-granular source maps (revision 3).
//!
//! Each generated line maps its first column to the start of one original
//! line. That is enough for stack traces to land on the right line of the
//! right module.

use serde::Serialize;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Append `value` as a base64 VLQ.
pub fn encode_vlq(out: &mut String, value: i64) {
  let mut vlq = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
  loop {
    let mut digit = (vlq & 0b11111) as usize;
    vlq >>= 5;
    if vlq > 0 {
      digit |= 0b100000;
    }
    out.push(BASE64[digit] as char);
    if vlq == 0 {
      break;
    }
  }
}

/// Builds the `mappings` string one generated line at a time.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
  sources: Vec<String>,
  contents: Vec<String>,
  lines: Vec<Option<(usize, usize)>>,
}

impl SourceMapBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a source file, returning its index.
  pub fn add_source(&mut self, path: String, content: String) -> usize {
    self.sources.push(path);
    self.contents.push(content);
    self.sources.len() - 1
  }

  /// Record the next generated line, optionally mapped to `(source, line)`.
  pub fn push_line(&mut self, mapping: Option<(usize, usize)>) {
    self.lines.push(mapping);
  }

  pub fn line_count(&self) -> usize {
    self.lines.len()
  }

  fn mappings(&self) -> String {
    let mut out = String::new();
    let (mut prev_source, mut prev_line) = (0i64, 0i64);
    for (index, mapping) in self.lines.iter().enumerate() {
      if index > 0 {
        out.push(';');
      }
      if let Some((source, line)) = mapping {
        // Generated column is relative to the line start, so always 0.
        encode_vlq(&mut out, 0);
        encode_vlq(&mut out, *source as i64 - prev_source);
        encode_vlq(&mut out, *line as i64 - prev_line);
        encode_vlq(&mut out, 0);
        prev_source = *source as i64;
        prev_line = *line as i64;
      }
    }
    out
  }

  /// Serialize the map for the artifact named `file`.
  pub fn to_json(&self, file: &str) -> String {
    let map = SourceMap {
      version: 3,
      file,
      sources: &self.sources,
      sources_content: &self.contents,
      names: Vec::new(),
      mappings: self.mappings(),
    };
    serde_json::to_string(&map).unwrap_or_default()
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMap<'a> {
  version: u8,
  file: &'a str,
  sources: &'a [String],
  sources_content: &'a [String],
  names: Vec<String>,
  mappings: String,
}
