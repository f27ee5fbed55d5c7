//! JavaScript parsing and printing.
//!
//! Scripts are parsed with swc. Stages locate constructs in the syntax tree
//! and edit the source text at the spans they found, so comments and line
//! structure survive; only [`minify`] prints a tree back out.

use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use swc_common::input::StringInput;
use swc_common::sync::Lrc;
use swc_common::{BytePos, FileName, SourceMap, Span, Spanned};
use swc_ecma_ast::{CallExpr, Callee, EsVersion, Expr, Lit, Module, ModuleItem};
use swc_ecma_codegen::Emitter;
use swc_ecma_codegen::text_writer::JsWriter;
use swc_ecma_parser::lexer::Lexer;
use swc_ecma_parser::{EsConfig, Parser, Syntax, TsConfig};
use swc_ecma_visit::{Visit, VisitWith};
use tracing::debug;

/// A script that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
  /// One-based line of the offending token.
  pub line: usize,
  pub message: String,
}

/// A parsed script and the source map its spans point into.
pub struct Parsed {
  pub module: Module,
  cm: Lrc<SourceMap>,
  start: BytePos,
}

impl std::fmt::Debug for Parsed {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Parsed").field("items", &self.module.body.len()).finish()
  }
}

fn syntax_for(path: &Path) -> Syntax {
  match path.extension().and_then(|e| e.to_str()) {
    Some("ts" | "mts" | "cts") => Syntax::Typescript(TsConfig::default()),
    Some("tsx") => Syntax::Typescript(TsConfig {
      tsx: true,
      ..Default::default()
    }),
    _ => Syntax::Es(EsConfig {
      jsx: true,
      ..Default::default()
    }),
  }
}

/// Parse `source` as an ES module; the extension of `path` picks the
/// JavaScript or TypeScript grammar.
///
/// Errors the parser recovers from are logged and otherwise ignored.
pub fn parse(source: &str, path: &Path) -> Result<Parsed, ParseError> {
  let cm: Lrc<SourceMap> = Default::default();
  let fm = cm.new_source_file(FileName::Real(path.to_path_buf()), source.to_string());
  let lexer = Lexer::new(syntax_for(path), EsVersion::EsNext, StringInput::from(&*fm), None);
  let mut parser = Parser::new_from(lexer);

  let module = parser.parse_module().map_err(|err| ParseError {
    line: cm.lookup_char_pos(err.span().lo).line,
    message: err.kind().msg().to_string(),
  })?;
  for err in parser.take_errors() {
    debug!(path = %path.display(), error = %err.kind().msg(), "recovered from parse error");
  }

  Ok(Parsed {
    module,
    start: fm.start_pos,
    cm,
  })
}

impl Parsed {
  /// Byte range of `span` in the parsed source.
  pub fn range(&self, span: Span) -> Range<usize> {
    let offset = |pos: BytePos| pos.0.saturating_sub(self.start.0) as usize;
    offset(span.lo)..offset(span.hi)
  }

  /// One-based line where `span` starts.
  pub fn line(&self, span: Span) -> usize {
    self.cm.lookup_char_pos(span.lo).line
  }

  /// Whether the script uses `import`/`export` declarations.
  ///
  /// Dynamic `import()` calls do not count.
  pub fn is_esm(&self) -> bool {
    self.first_declaration_line().is_some()
  }

  /// Line of the first `import`/`export` declaration.
  pub fn first_declaration_line(&self) -> Option<usize> {
    self.module.body.iter().find_map(|item| match item {
      ModuleItem::ModuleDecl(decl) => Some(self.line(decl.span())),
      ModuleItem::Stmt(_) => None,
    })
  }

  /// Every `require()` and `import()` call, in source order.
  pub fn import_calls(&self) -> Vec<ImportCall> {
    let mut collector = CallCollector::default();
    self.module.visit_with(&mut collector);
    collector.calls.sort_by_key(|call| call.span.lo);
    collector.calls
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
  Require,
  Dynamic,
}

/// A `require(...)` or `import(...)` call expression.
#[derive(Debug, Clone)]
pub struct ImportCall {
  pub kind: CallKind,
  /// The specifier, when the first argument is a string literal.
  pub specifier: Option<String>,
  pub span: Span,
  /// Span of the first argument.
  pub argument: Option<Span>,
}

#[derive(Default)]
struct CallCollector {
  calls: Vec<ImportCall>,
}

impl Visit for CallCollector {
  fn visit_call_expr(&mut self, call: &CallExpr) {
    let kind = match &call.callee {
      Callee::Import(_) => Some(CallKind::Dynamic),
      Callee::Expr(callee) => match &**callee {
        Expr::Ident(ident) if &*ident.sym == "require" => Some(CallKind::Require),
        _ => None,
      },
      Callee::Super(_) => None,
    };

    if let Some(kind) = kind {
      let first = call.args.first().filter(|arg| arg.spread.is_none());
      let specifier = first.and_then(|arg| match &*arg.expr {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        _ => None,
      });
      self.calls.push(ImportCall {
        kind,
        specifier,
        span: call.span,
        argument: first.map(|arg| arg.expr.span()),
      });
    }
    call.visit_children_with(self);
  }
}

/// A replacement of a byte range of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
  range: Range<usize>,
  text: String,
}

/// Source edits applied in one pass.
#[derive(Debug, Default)]
pub struct Edits {
  edits: Vec<Edit>,
}

impl Edits {
  /// Queue a replacement of `range`. An edit overlapping one queued earlier
  /// is dropped.
  pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
    let overlaps = self
      .edits
      .iter()
      .any(|e| range.start < e.range.end && e.range.start < range.end);
    if !overlaps {
      self.edits.push(Edit {
        range,
        text: text.into(),
      });
    }
  }

  /// Apply every edit to `source`.
  ///
  /// Line breaks of the replaced text are re-emitted after the replacement,
  /// so every untouched line keeps its line number.
  pub fn apply(mut self, source: &str) -> String {
    self.edits.sort_by_key(|e| e.range.start);
    let mut out = String::with_capacity(source.len() + 64);
    let mut cursor = 0;
    for edit in self.edits {
      let Some(replaced) = source.get(edit.range.clone()) else {
        continue;
      };
      out.push_str(&source[cursor..edit.range.start]);
      out.push_str(&edit.text);
      out.extend(std::iter::repeat_n('\n', replaced.matches('\n').count()));
      cursor = edit.range.end;
    }
    out.push_str(&source[cursor..]);
    out
  }
}

/// Extend a statement's range over a `;` directly after it.
pub fn with_semicolon(source: &str, range: Range<usize>) -> Range<usize> {
  match source.get(range.end..) {
    Some(rest) if rest.starts_with(';') => range.start..range.end + 1,
    _ => range,
  }
}

/// Print the script without comments and optional whitespace.
pub fn minify(parsed: &Parsed) -> std::io::Result<String> {
  let mut buf = Vec::new();
  {
    let mut cfg = swc_ecma_codegen::Config::default();
    cfg.minify = true;
    let mut emitter = Emitter {
      cfg,
      cm: parsed.cm.clone(),
      comments: None,
      wr: JsWriter::new(parsed.cm.clone(), "\n", &mut buf, None),
    };
    emitter.emit_module(&parsed.module)?;
  }
  let mut out = String::from_utf8(buf).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
  if !out.is_empty() && !out.ends_with('\n') {
    out.push('\n');
  }
  Ok(out)
}

/// Encode `text` as a double-quoted JavaScript string literal.
pub fn string_literal(text: &str) -> String {
  // JSON strings are valid JavaScript string literals.
  serde_json::to_string(text).unwrap_or_else(|_| String::from("\"\""))
}

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid regex"));

const RESERVED_WORDS: &[&str] = &[
  "await",
  "break",
  "case",
  "catch",
  "class",
  "const",
  "continue",
  "debugger",
  "default",
  "delete",
  "do",
  "else",
  "enum",
  "export",
  "extends",
  "false",
  "finally",
  "for",
  "function",
  "if",
  "implements",
  "import",
  "in",
  "instanceof",
  "interface",
  "let",
  "new",
  "null",
  "package",
  "private",
  "protected",
  "public",
  "return",
  "static",
  "super",
  "switch",
  "this",
  "throw",
  "true",
  "try",
  "typeof",
  "var",
  "void",
  "while",
  "with",
  "yield",
];

/// Whether `name` can be used as a variable name in strict-mode code.
pub fn is_identifier(name: &str) -> bool {
  IDENTIFIER.is_match(name) && !RESERVED_WORDS.contains(&name)
}
