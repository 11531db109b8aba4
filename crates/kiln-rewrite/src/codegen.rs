//! CommonJS code generation from a rewritten program

use kiln_ast::*;

/// Prints a [`Program`] back to source text.
///
/// Verbatim fragments are copied byte for byte; every synthesized statement
/// starts on its own line.
pub struct CodeGenerator<'a> {
    source: &'a str,
    output: String,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            output: String::with_capacity(source.len() + source.len() / 4),
        }
    }

    pub fn generate(mut self, program: &Program) -> String {
        for stmt in program.iter() {
            self.emit_stmt(stmt);
        }
        self.output
    }

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Verbatim(fragment) => fragment.render(self.source, &mut self.output),
            Stmt::Require { binding, source } => {
                self.begin_line();
                if let Some(binding) = binding {
                    self.output.push_str(&format!("var {} = ", binding));
                }
                self.output.push_str(&format!("require({});", quote(source)));
            }
            Stmt::VarBinding { name, init } => {
                self.begin_line();
                self.output.push_str(&format!("var {} = ", name));
                self.emit_expr(init);
                self.output.push(';');
            }
            Stmt::ExportAssign { exported, value } => {
                self.begin_line();
                self.output.push_str(&member("exports", exported));
                self.output.push_str(" = ");
                self.emit_expr(value);
                self.output.push(';');
            }
            Stmt::ExportAllKeys { binding } => {
                self.begin_line();
                self.output.push_str(&format!(
                    "Object.keys({0}).forEach(function (key) {{ if (key === \"default\" || key === \"__esModule\") return; exports[key] = {0}[key]; }});",
                    binding
                ));
            }
            Stmt::Declaration { kind, text } => {
                self.begin_line();
                text.render(self.source, &mut self.output);
                if *kind == DeclKind::Var && text.last_significant_char(self.source) != Some(';') {
                    self.output.push(';');
                }
            }
            Stmt::ModuleMarker => {
                self.begin_line();
                self.output
                    .push_str("Object.defineProperty(exports, \"__esModule\", { value: true });");
            }
            Stmt::InteropHelper { name } => {
                self.begin_line();
                self.output.push_str(&format!(
                    "function {}(obj) {{ return obj && obj.__esModule ? obj : {{ default: obj }}; }}",
                    name
                ));
            }
            // Module syntax the rewriter left alone
            other => {
                if let Some(span) = other.source_span() {
                    self.output.push_str(span.text(self.source));
                }
            }
        }
    }

    fn emit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => self.output.push_str(name),
            Expr::Member { object, property } => self.output.push_str(&member(object, property)),
            Expr::Require(source) => self.output.push_str(&format!("require({})", quote(source))),
            Expr::InteropDefault { helper, binding } => {
                self.output.push_str(&format!("{}({}).default", helper, binding))
            }
            Expr::Source(fragment) => fragment.render(self.source, &mut self.output),
        }
    }

    /// Ensures the next statement starts on a fresh line.
    fn begin_line(&mut self) {
        if !self.output.is_empty() && !self.output.ends_with('\n') {
            self.output.push('\n');
        }
    }
}

/// `object.property`, or `object["property"]` when the name is not an identifier.
fn member(object: &str, property: &str) -> String {
    if is_identifier_name(property) {
        format!("{}.{}", object, property)
    } else {
        format!("{}[{}]", object, quote(property))
    }
}

/// Double-quoted string literal.
fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_statements_start_new_lines() {
        let source = "foo();";
        let mut program = Program::new(Span::new(0, source.len()));
        program.push(Stmt::Verbatim(Fragment::from_span(Span::new(0, source.len()))));
        program.push(Stmt::Require { binding: Some("$kiln__a".into()), source: "./a".into() });
        program.push(Stmt::ExportAssign {
            exported: "a-b".into(),
            value: Expr::Member { object: "$kiln__a".into(), property: "default".into() },
        });

        let output = CodeGenerator::new(source).generate(&program);
        assert_eq!(
            output,
            "foo();\nvar $kiln__a = require(\"./a\");\nexports[\"a-b\"] = $kiln__a.default;"
        );
    }

    #[test]
    fn test_var_declaration_gets_semicolon() {
        let source = "const a = 1";
        let mut program = Program::new(Span::new(0, source.len()));
        program.push(Stmt::Declaration {
            kind: DeclKind::Var,
            text: Fragment::from_span(Span::new(0, source.len())),
        });

        assert_eq!(CodeGenerator::new(source).generate(&program), "const a = 1;");
    }

    #[test]
    fn test_specifiers_are_json_quoted() {
        assert_eq!(quote("a\"b\\c"), "\"a\\\"b\\\\c\"");
        assert_eq!(member("exports", "default"), "exports.default");
    }
}
