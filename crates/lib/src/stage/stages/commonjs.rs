//! ES module to CommonJS conversion.
//!
//! The module is parsed, and each `import`/`export` declaration found in the
//! tree is rewritten in place in the source text. Every replacement keeps
//! the line count of the text it replaces, so line-granular source maps stay
//! accurate. Exports of local bindings become getters installed at the top
//! of the first line.

use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use swc_common::{Span, Spanned};
use swc_ecma_ast::{
  ClassExpr, Decl, DefaultDecl, ExportSpecifier, FnExpr, ImportDecl, ImportSpecifier, ModuleDecl, ModuleExportName,
  ModuleItem, NamedExport, Pat,
};
use tracing::debug;

use crate::graph::scan::has_runtime_bindings;
use crate::graph::{ModuleGraph, ModuleKind};
use crate::js::{self, CallKind, Edits, Parsed};
use crate::stage::{Capability, GraphStage, Stage, StageContext, StageError, StageErrorKind, parse_options};

pub const NAME: &str = "commonjs";

/// Helper that unwraps the default export of a required module.
pub const IMPORT_DEFAULT_HELPER: &str = "__importDefault";
/// Helper that copies named exports for `export * from`.
pub const EXPORT_STAR_HELPER: &str = "__exportStar";
/// Helper that defines live export getters.
pub const EXPORT_HELPER: &str = "__export";

const ES_MODULE_FLAG: &str = "Object.defineProperty(exports, \"__esModule\", { value: true });";

/// Convert ES module syntax in `source` to CommonJS.
///
/// Sources without `import`/`export` declarations only have their dynamic
/// `import()` calls rewritten.
///
/// # Errors
///
/// `InvalidSyntax` when the source does not parse, `Unsupported` for the
/// first construct that cannot be converted.
pub fn convert(source: &str, path: &Path) -> Result<String, StageErrorKind> {
  let parsed = js::parse(source, path).map_err(|e| StageErrorKind::InvalidSyntax(e.to_string()))?;
  let mut conversion = Conversion {
    source,
    parsed: &parsed,
    edits: Edits::default(),
    exports: Vec::new(),
    temps: 0,
  };

  if parsed.module.shebang.is_some() && source.starts_with("#!") {
    conversion.edits.replace(0..source.find('\n').unwrap_or(source.len()), "");
  }
  for item in &parsed.module.body {
    if let ModuleItem::ModuleDecl(decl) = item {
      conversion.declaration(decl)?;
    }
  }
  for call in parsed.import_calls() {
    if call.kind != CallKind::Dynamic {
      continue;
    }
    let argument = call
      .argument
      .and_then(|span| source.get(parsed.range(span)))
      .unwrap_or("undefined");
    conversion.edits.replace(
      parsed.range(call.span),
      format!("Promise.resolve().then(() => require({}))", argument),
    );
  }

  let Conversion { edits, exports, .. } = conversion;
  let mut out = String::new();
  if parsed.is_esm() {
    out.push_str(ES_MODULE_FLAG);
    out.push(' ');
  }
  if !exports.is_empty() {
    let getters: Vec<String> = exports
      .iter()
      .map(|(exported, local)| format!("{}: () => {}", js::string_literal(exported), local))
      .collect();
    out.push_str(&format!("{}(exports, {{ {} }}); ", EXPORT_HELPER, getters.join(", ")));
  }
  out.push_str(&edits.apply(source));

  let converted = js::parse(&out, path)
    .map_err(|e| StageErrorKind::Unsupported(format!("converted module does not parse: {}", e)))?;
  if let Some(line) = converted.first_declaration_line() {
    return Err(StageErrorKind::Unsupported(format!(
      "unrecognized import/export syntax on line {}",
      line
    )));
  }
  Ok(out)
}

struct Conversion<'a> {
  source: &'a str,
  parsed: &'a Parsed,
  edits: Edits,
  /// `(exported name, local name)` pairs installed as getters.
  exports: Vec<(String, String)>,
  temps: usize,
}

impl Conversion<'_> {
  fn declaration(&mut self, decl: &ModuleDecl) -> Result<(), StageErrorKind> {
    let statement = js::with_semicolon(self.source, self.parsed.range(decl.span()));
    match decl {
      ModuleDecl::Import(import) => {
        let text = if has_runtime_bindings(import) {
          self.import_bindings(import)
        } else {
          String::new()
        };
        self.edits.replace(statement, text);
      }
      ModuleDecl::ExportAll(export) => {
        let text = if export.type_only {
          String::new()
        } else {
          format!(
            "{}(require({}), exports);",
            EXPORT_STAR_HELPER,
            js::string_literal(&export.src.value)
          )
        };
        self.edits.replace(statement, text);
      }
      ModuleDecl::ExportNamed(named) => {
        let text = match &named.src {
          _ if named.type_only => String::new(),
          Some(src) => self.re_export(named, &src.value),
          None => {
            for specifier in &named.specifiers {
              if let ExportSpecifier::Named(n) = specifier
                && !n.is_type_only
              {
                let local = export_name(&n.orig);
                let exported = n.exported.as_ref().map(export_name).unwrap_or_else(|| local.clone());
                self.exports.push((exported, local));
              }
            }
            String::new()
          }
        };
        self.edits.replace(statement, text);
      }
      ModuleDecl::ExportDecl(export) => {
        let names = self.declared_names(&export.decl)?;
        self.exports.extend(names.into_iter().map(|name| (name.clone(), name)));
        let keyword = self.keywords(export.span, false)?;
        self.edits.replace(keyword, "");
      }
      ModuleDecl::ExportDefaultDecl(export) => {
        let keywords = self.keywords(export.span, true)?;
        match &export.decl {
          DefaultDecl::Fn(FnExpr { ident: Some(ident), .. }) | DefaultDecl::Class(ClassExpr { ident: Some(ident), .. }) => {
            self.edits.replace(keywords, "");
            self.exports.push(("default".to_string(), ident.sym.to_string()));
          }
          DefaultDecl::TsInterfaceDecl(_) => self.edits.replace(statement, ""),
          _ => {
            let end = self.parsed.range(export.span).end;
            self.edits.replace(keywords, "exports.default = ");
            self.edits.replace(end..end, ";");
          }
        }
      }
      ModuleDecl::ExportDefaultExpr(export) => {
        let keywords = self.keywords(export.span, true)?;
        self.edits.replace(keywords, "exports.default = ");
      }
      other => {
        return Err(StageErrorKind::Unsupported(format!(
          "TypeScript module syntax on line {} cannot be converted",
          self.parsed.line(other.span())
        )));
      }
    }
    Ok(())
  }

  /// `const` bindings over `require(spec)` for an import declaration.
  fn import_bindings(&mut self, import: &ImportDecl) -> String {
    let spec = js::string_literal(&import.src.value);
    let mut default = None;
    let mut namespace = None;
    let mut named = Vec::new();
    for specifier in &import.specifiers {
      match specifier {
        ImportSpecifier::Default(d) => default = Some(d.local.sym.to_string()),
        ImportSpecifier::Namespace(ns) => namespace = Some(ns.local.sym.to_string()),
        ImportSpecifier::Named(n) if !n.is_type_only => {
          let local = n.local.sym.to_string();
          let imported = n.imported.as_ref().map(export_name).unwrap_or_else(|| local.clone());
          named.push(if imported == local {
            local
          } else {
            format!("{}: {}", property_key(&imported), local)
          });
        }
        ImportSpecifier::Named(_) => {}
      }
    }

    match (default, namespace) {
      (None, None) if named.is_empty() => format!("require({});", spec),
      (None, None) => format!("const {{ {} }} = require({});", named.join(", "), spec),
      (None, Some(ns)) => format!("const {} = require({});", ns, spec),
      (Some(default), Some(ns)) => format!(
        "const {} = require({}); const {} = {}({});",
        ns, spec, default, IMPORT_DEFAULT_HELPER, ns
      ),
      (Some(default), None) if named.is_empty() => {
        format!("const {} = {}(require({}));", default, IMPORT_DEFAULT_HELPER, spec)
      }
      (Some(default), None) => {
        let temp = self.temp("__import");
        format!(
          "const {} = require({}); const {} = {}({}); const {{ {} }} = {};",
          temp,
          spec,
          default,
          IMPORT_DEFAULT_HELPER,
          temp,
          named.join(", "),
          temp
        )
      }
    }
  }

  /// Assignments for `export { a, b as c } from "x"` and `export * as ns from "x"`.
  fn re_export(&mut self, named: &NamedExport, src: &str) -> String {
    let spec = js::string_literal(src);
    let needs_module = named.specifiers.iter().any(|s| match s {
      ExportSpecifier::Named(n) => !n.is_type_only,
      ExportSpecifier::Default(_) => true,
      ExportSpecifier::Namespace(_) => false,
    });
    let temp = needs_module.then(|| self.temp("__reexport"));

    let mut parts = Vec::new();
    if let Some(temp) = &temp {
      parts.push(format!("const {} = require({});", temp, spec));
    }
    for specifier in &named.specifiers {
      match (specifier, &temp) {
        (ExportSpecifier::Namespace(ns), _) => {
          parts.push(format!("exports{} = require({});", member(&export_name(&ns.name)), spec));
        }
        (ExportSpecifier::Named(n), Some(temp)) if !n.is_type_only => {
          let orig = export_name(&n.orig);
          let exported = n.exported.as_ref().map(export_name).unwrap_or_else(|| orig.clone());
          parts.push(format!("exports{} = {}{};", member(&exported), temp, member(&orig)));
        }
        (ExportSpecifier::Default(d), Some(temp)) => {
          parts.push(format!("exports{} = {}.default;", member(&d.exported.sym), temp));
        }
        _ => {}
      }
    }
    parts.join(" ")
  }

  /// Value bindings an exported declaration introduces.
  fn declared_names(&self, decl: &Decl) -> Result<Vec<String>, StageErrorKind> {
    match decl {
      Decl::Class(class) if !class.declare => Ok(vec![class.ident.sym.to_string()]),
      Decl::Fn(function) if !function.declare => Ok(vec![function.ident.sym.to_string()]),
      Decl::TsEnum(e) if !e.declare => Ok(vec![e.id.sym.to_string()]),
      Decl::Var(var) if !var.declare => var
        .decls
        .iter()
        .map(|declarator| match &declarator.name {
          Pat::Ident(binding) => Ok(binding.id.sym.to_string()),
          _ => Err(StageErrorKind::Unsupported(format!(
            "destructuring export on line {} cannot be converted",
            self.parsed.line(declarator.span)
          ))),
        })
        .collect(),
      _ => Ok(Vec::new()),
    }
  }

  /// Range of the leading `export` (or `export default`) keywords of a
  /// declaration and the whitespace after them.
  fn keywords(&self, span: Span, default: bool) -> Result<Range<usize>, StageErrorKind> {
    let start = self.parsed.range(span).start;
    let unexpected = || {
      StageErrorKind::Unsupported(format!(
        "unexpected export syntax on line {}",
        self.parsed.line(span)
      ))
    };
    let text = self.source.get(start..).ok_or_else(unexpected)?;
    let mut rest = text.strip_prefix("export").ok_or_else(unexpected)?.trim_start();
    if default {
      rest = rest.strip_prefix("default").ok_or_else(unexpected)?.trim_start();
    }
    Ok(start..start + (text.len() - rest.len()))
  }

  fn temp(&mut self, prefix: &str) -> String {
    let name = format!("{}{}", prefix, self.temps);
    self.temps += 1;
    name
  }
}

fn export_name(name: &ModuleExportName) -> String {
  match name {
    ModuleExportName::Ident(ident) => ident.sym.to_string(),
    ModuleExportName::Str(s) => s.value.to_string(),
  }
}

fn is_plain_name(name: &str) -> bool {
  name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '$')
    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// `name` as an object literal key.
fn property_key(name: &str) -> String {
  if is_plain_name(name) {
    name.to_string()
  } else {
    js::string_literal(name)
  }
}

/// `name` as a property access suffix.
fn member(name: &str) -> String {
  if is_plain_name(name) {
    format!(".{}", name)
  } else {
    format!("[{}]", js::string_literal(name))
  }
}

/// Whether rendered sources use the conversion helpers.
pub fn uses_helper(source: &str, helper: &str) -> bool {
  static CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(__importDefault|__exportStar|__export)\(").expect("valid regex"));
  CALL.captures_iter(source).any(|caps: Captures| &caps[1] == helper)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Options {
  /// Also convert `.ts`/`.tsx` modules. They are left alone by default
  /// because their syntax is not plain JavaScript.
  typescript: bool,
}

#[derive(Debug)]
pub struct CommonJs {
  typescript: bool,
}

pub fn create(options: &serde_json::Value) -> Result<Stage, StageError> {
  let options: Options = parse_options(NAME, options)?;
  Ok(Stage::Graph(Box::new(CommonJs {
    typescript: options.typescript,
  })))
}

const TYPESCRIPT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".mts", ".cts"];

impl GraphStage for CommonJs {
  fn name(&self) -> &str {
    NAME
  }

  fn requires(&self) -> &[Capability] {
    &[Capability::Resolution]
  }

  fn provides(&self) -> &[Capability] {
    &[Capability::CommonJs]
  }

  fn transform(&self, mut graph: ModuleGraph, _ctx: &StageContext) -> Result<ModuleGraph, StageError> {
    for module in graph.modules_mut().filter(|m| m.kind == ModuleKind::Script) {
      let typescript = module
        .id
        .extension()
        .is_some_and(|ext| TYPESCRIPT_EXTENSIONS.contains(&ext.as_str()));
      if typescript && !self.typescript {
        continue;
      }

      let converted =
        convert(&module.source, module.id.path()).map_err(|kind| StageError::new(NAME, kind).in_module(&module.id))?;
      if converted != module.source {
        debug!(module = %module.id, "converted to commonjs");
      }
      module.set_commonjs_source(converted);
    }
    Ok(graph)
  }
}
