use crate::expr::Expr;

/// Renders an [`Expr`] back to canonical source text.
///
/// Output re‑parses to an equal tree for everything the parser can produce;
/// `Stub` nodes have no source form and print as `<value>`.
pub struct Printer;

impl Printer {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Text(text) => {
                let mut out = String::with_capacity(text.len() + 2);
                out.push('"');

                for c in text.chars() {
                    match c {
                        '"' => out.push_str("\\\""),

                        '\\' => out.push_str("\\\\"),

                        '\n' => out.push_str("\\n"),

                        '\t' => out.push_str("\\t"),

                        '\r' => out.push_str("\\r"),

                        c => out.push(c),
                    }
                }

                out.push('"');
                out
            }

            Expr::Number(n) => n.to_string(),

            Expr::Identifier { name, .. } => name.clone(),

            Expr::Option { name, .. } => format!("--{}", name),

            Expr::Deferred(inner) => format!("'{}", self.print(inner)),

            Expr::Chain(exprs) => exprs
                .iter()
                .map(|e| self.print(e))
                .collect::<Vec<_>>()
                .join(" "),

            Expr::Block(inner) => format!("({})", self.print(inner)),

            Expr::Stub(value) => format!("<{}>", value),
        }
    }
}
