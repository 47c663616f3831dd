//! Go parsing on top of the tree-sitter Go grammar.

use std::fs;
use std::path::Path;

use tree_sitter::{Node, Parser};

use super::comments::CommentIndex;
use super::literal::unquote_string;
use super::syntax::{
    BinaryOp, ConstBlock, ConstSpec, Decl, Expr, ExprKind, Ident, ImportSpec, SourceUnit,
    TypeExpr, TypeSpec, UnaryOp,
};
use super::{FileId, FileSet, Pos};
use crate::error::{GoconstError, GoconstResult, IoResultExt};

/// Reusable Go parser.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> GoconstResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| GoconstError::internal(format!("failed to load Go grammar: {}", e)))?;
        Ok(Self { parser })
    }

    /// Reads and parses one file, registering it in `fset`.
    pub fn parse_file(&mut self, fset: &mut FileSet, path: &Path) -> GoconstResult<SourceUnit> {
        let source = fs::read_to_string(path).with_path(path)?;
        self.parse_source(fset, path, &source)
    }

    /// Parses already loaded source text, registering `path` in `fset`.
    pub fn parse_source(
        &mut self,
        fset: &mut FileSet,
        path: &Path,
        source: &str,
    ) -> GoconstResult<SourceUnit> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| GoconstError::parse(path, "parser produced no syntax tree"))?;
        let root = tree.root_node();

        if root.has_error() {
            if let Some(bad) = find_error(root) {
                let pos = bad.start_position();
                let message = if bad.is_missing() {
                    format!("syntax error: missing {}", bad.kind())
                } else {
                    format!("syntax error: unexpected {}", first_token(bad, source.as_bytes()))
                };
                return Err(GoconstError::parse_at(path, message, pos.row + 1, pos.column + 1));
            }
        }

        let file = fset.add_file(path);
        let builder = UnitBuilder {
            src: source.as_bytes(),
            file,
            path,
            comments: CommentIndex::build(root, source.as_bytes()),
        };
        builder.build(root)
    }
}

/// First ERROR or MISSING node in document order.
fn find_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error() || c.is_missing())
        .find_map(find_error)
}

fn first_token(node: Node<'_>, src: &[u8]) -> String {
    let text = node.utf8_text(src).unwrap_or("");
    match text.split_whitespace().next() {
        Some(token) => token.chars().take(32).collect(),
        None => "EOF".to_string(),
    }
}

/// Named children, skipping comments.
fn code_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

/// Identifiers under the `name` field; the field also covers `,` separators.
fn field_names<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let names = node
        .children_by_field_name("name", &mut cursor)
        .filter(|n| n.kind() == "identifier")
        .collect();
    names
}

/// Descendants of `kind`, without descending into matches.
fn collect_kind<'t>(node: Node<'t>, kind: &str, out: &mut Vec<Node<'t>>) {
    for child in code_children(node) {
        if child.kind() == kind {
            out.push(child);
        } else {
            collect_kind(child, kind, out);
        }
    }
}

struct UnitBuilder<'a> {
    src: &'a [u8],
    file: FileId,
    path: &'a Path,
    comments: CommentIndex,
}

impl UnitBuilder<'_> {
    fn text(&self, node: Node<'_>) -> String {
        node.utf8_text(self.src).unwrap_or("").to_string()
    }

    fn pos(&self, node: Node<'_>) -> Pos {
        let p = node.start_position();
        Pos {
            file: self.file,
            line: p.row + 1,
            column: p.column + 1,
        }
    }

    fn syntax_error(&self, node: Node<'_>, message: impl Into<String>) -> GoconstError {
        let p = node.start_position();
        GoconstError::parse_at(self.path, message, p.row + 1, p.column + 1)
    }

    fn ident(&self, node: Node<'_>) -> Ident {
        Ident {
            name: self.text(node),
            pos: self.pos(node),
        }
    }

    fn build(&self, root: Node<'_>) -> GoconstResult<SourceUnit> {
        let mut package = None;
        let mut imports = Vec::new();
        let mut decls = Vec::new();

        for node in code_children(root) {
            match node.kind() {
                "package_clause" => {
                    package = code_children(node).first().map(|n| self.text(*n));
                }
                _ if package.is_none() => {
                    return Err(self.syntax_error(node, "syntax error: package statement must be first"));
                }
                "import_declaration" => {
                    let mut specs = Vec::new();
                    collect_kind(node, "import_spec", &mut specs);
                    for spec in specs {
                        imports.push(self.import_spec(spec)?);
                    }
                }
                "const_declaration" => decls.push(Decl::Const(self.const_block(node))),
                "type_declaration" => {
                    let mut specs = Vec::new();
                    collect_kind(node, "type_spec", &mut specs);
                    collect_kind(node, "type_alias", &mut specs);
                    specs.sort_by_key(|n| n.start_byte());
                    decls.push(Decl::Type(specs.into_iter().filter_map(|s| self.type_spec(s)).collect()));
                }
                "var_declaration" => {
                    let mut specs = Vec::new();
                    collect_kind(node, "var_spec", &mut specs);
                    let names = specs
                        .iter()
                        .flat_map(|spec| field_names(*spec))
                        .map(|n| self.ident(n))
                        .collect();
                    decls.push(Decl::Var(names));
                }
                "function_declaration" => {
                    if let Some(name) = node.child_by_field_name("name") {
                        decls.push(Decl::Func(self.ident(name)));
                    }
                }
                "method_declaration" => decls.push(Decl::Method),
                _ => {
                    return Err(self.syntax_error(
                        node,
                        "syntax error: non-declaration statement outside function body",
                    ));
                }
            }
        }

        let package = package.ok_or_else(|| {
            GoconstError::parse_at(self.path, "expected 'package', found 'EOF'", 1, 1)
        })?;
        Ok(SourceUnit {
            path: self.path.to_path_buf(),
            file: self.file,
            package,
            imports,
            decls,
        })
    }

    fn import_spec(&self, spec: Node<'_>) -> GoconstResult<ImportSpec> {
        let path_node = spec
            .child_by_field_name("path")
            .ok_or_else(|| self.syntax_error(spec, "missing import path"))?;
        let raw = unquote_string(&self.text(path_node))
            .map_err(|e| self.syntax_error(path_node, format!("invalid import path: {}", e)))?;
        Ok(ImportSpec {
            name: spec.child_by_field_name("name").map(|n| self.text(n)),
            path: String::from_utf8_lossy(&raw).to_string(),
            pos: self.pos(spec),
        })
    }

    fn const_block(&self, decl: Node<'_>) -> ConstBlock {
        let mut cursor = decl.walk();
        let grouped = decl.children(&mut cursor).any(|c| c.kind() == "(");
        let mut spec_nodes = Vec::new();
        collect_kind(decl, "const_spec", &mut spec_nodes);

        let specs = spec_nodes
            .into_iter()
            .map(|spec| {
                let names = field_names(spec)
                    .into_iter()
                    .map(|n| self.ident(n))
                    .collect();
                let values = spec
                    .child_by_field_name("value")
                    .map(|list| code_children(list).into_iter().map(|e| self.expr(e)).collect())
                    .unwrap_or_default();
                ConstSpec {
                    names,
                    ty: spec.child_by_field_name("type").map(|t| self.type_expr(t)),
                    values,
                    doc: if grouped { self.comments.doc_for(spec) } else { None },
                    comment: self.comments.trailing_for(spec),
                    pos: self.pos(spec),
                }
            })
            .collect();

        ConstBlock {
            doc: self.comments.doc_for(decl),
            specs,
            pos: self.pos(decl),
        }
    }

    fn type_spec(&self, spec: Node<'_>) -> Option<TypeSpec> {
        let name = spec.child_by_field_name("name")?;
        let ty = spec.child_by_field_name("type")?;
        Some(TypeSpec {
            name: self.ident(name),
            alias: spec.kind() == "type_alias",
            ty: if spec.child_by_field_name("type_parameters").is_some() {
                TypeExpr::Other {
                    text: self.text(ty),
                    pos: self.pos(ty),
                }
            } else {
                self.type_expr(ty)
            },
        })
    }

    fn type_expr(&self, node: Node<'_>) -> TypeExpr {
        match node.kind() {
            "type_identifier" | "identifier" => TypeExpr::Name(self.ident(node)),
            "qualified_type" => match (
                node.child_by_field_name("package"),
                node.child_by_field_name("name"),
            ) {
                (Some(package), Some(name)) => TypeExpr::Qualified {
                    package: self.ident(package),
                    name: self.ident(name),
                },
                _ => self.other_type(node),
            },
            "parenthesized_type" => match code_children(node).first() {
                Some(inner) => self.type_expr(*inner),
                None => self.other_type(node),
            },
            _ => self.other_type(node),
        }
    }

    fn other_type(&self, node: Node<'_>) -> TypeExpr {
        TypeExpr::Other {
            text: self.text(node),
            pos: self.pos(node),
        }
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        let pos = self.pos(node);
        let kind = match node.kind() {
            "identifier" | "true" | "false" | "nil" | "iota" => ExprKind::Ident(self.text(node)),
            "int_literal" => ExprKind::Int(self.text(node)),
            "float_literal" => ExprKind::Float(self.text(node)),
            "imaginary_literal" => ExprKind::Imaginary(self.text(node)),
            "rune_literal" => ExprKind::Rune(self.text(node)),
            "interpreted_string_literal" | "raw_string_literal" => ExprKind::Str(self.text(node)),
            "parenthesized_expression" => match code_children(node).first() {
                Some(inner) => ExprKind::Paren(Box::new(self.expr(*inner))),
                None => ExprKind::Other(self.text(node)),
            },
            "unary_expression" => match (
                node.child_by_field_name("operator"),
                node.child_by_field_name("operand"),
            ) {
                (Some(op), Some(operand)) => ExprKind::Unary {
                    op: UnaryOp::from_token(&self.text(op)),
                    operand: Box::new(self.expr(operand)),
                },
                _ => ExprKind::Other(self.text(node)),
            },
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .and_then(|op| BinaryOp::from_token(&self.text(op)));
                match (op, node.child_by_field_name("left"), node.child_by_field_name("right")) {
                    (Some(op), Some(left), Some(right)) => ExprKind::Binary {
                        op,
                        left: Box::new(self.expr(left)),
                        right: Box::new(self.expr(right)),
                    },
                    _ => ExprKind::Other(self.text(node)),
                }
            }
            "selector_expression" => match (
                node.child_by_field_name("operand"),
                node.child_by_field_name("field"),
            ) {
                (Some(operand), Some(field)) => ExprKind::Selector {
                    operand: Box::new(self.expr(operand)),
                    field: self.ident(field),
                },
                _ => ExprKind::Other(self.text(node)),
            },
            "call_expression" => match node.child_by_field_name("function") {
                Some(func) => ExprKind::Call {
                    func: Box::new(self.expr(func)),
                    args: node
                        .child_by_field_name("arguments")
                        .map(|args| code_children(args).into_iter().map(|a| self.expr(a)).collect())
                        .unwrap_or_default(),
                },
                None => ExprKind::Other(self.text(node)),
            },
            "type_conversion_expression" => match (
                node.child_by_field_name("type"),
                node.child_by_field_name("operand"),
            ) {
                (Some(ty), Some(operand)) => ExprKind::Conversion {
                    ty: self.type_expr(ty),
                    operand: Box::new(self.expr(operand)),
                },
                _ => ExprKind::Other(self.text(node)),
            },
            _ => ExprKind::Other(self.text(node)),
        };
        Expr { kind, pos }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(src: &str) -> GoconstResult<SourceUnit> {
        let mut parser = GoParser::new().unwrap();
        let mut fset = FileSet::new();
        parser.parse_source(&mut fset, &PathBuf::from("const.go"), src)
    }

    fn only_block(unit: &SourceUnit) -> &ConstBlock {
        unit.const_blocks().next().unwrap()
    }

    #[test]
    fn test_package_and_imports() {
        let unit = parse(
            "package limits\n\nimport (\n\t\"time\"\n\tu \"example.com/units\"\n\t. \"math\"\n)\n",
        )
        .unwrap();
        assert_eq!(unit.package, "limits");
        assert_eq!(unit.imports.len(), 3);
        assert_eq!(unit.imports[0].path, "time");
        assert_eq!(unit.imports[0].name, None);
        assert_eq!(unit.imports[1].name.as_deref(), Some("u"));
        assert_eq!(unit.imports[2].name.as_deref(), Some("."));
    }

    #[test]
    fn test_const_block_structure() {
        let unit = parse(
            "package p\n\n// Limits doc.\nconst (\n\t// Max doc.\n\tMax, Min int = 10, 1 // bounds\n\tNext\n)\n",
        )
        .unwrap();
        let block = only_block(&unit);
        assert_eq!(block.doc.as_ref().unwrap().text(), "Limits doc.\n");
        assert_eq!(block.specs.len(), 2);

        let first = &block.specs[0];
        let names: Vec<_> = first.names.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Max", "Min"]);
        assert!(matches!(&first.ty, Some(TypeExpr::Name(id)) if id.name == "int"));
        assert_eq!(first.values.len(), 2);
        assert_eq!(first.doc.as_ref().unwrap().text(), "Max doc.\n");
        assert_eq!(first.comment.as_ref().unwrap().text(), "bounds\n");
        assert_eq!(first.pos.line, 6);

        let second = &block.specs[1];
        assert!(second.values.is_empty());
        assert!(second.ty.is_none());
        assert!(second.doc.is_none());
        assert!(second.comment.is_none());
    }

    #[test]
    fn test_multi_name_specs_skip_separators() {
        let unit = parse("package p\n\nconst (\n\tA, B = iota, iota * 10\n\tC, D\n)\n\nvar x, y, z int\n").unwrap();
        let block = only_block(&unit);
        let names: Vec<Vec<&str>> = block
            .specs
            .iter()
            .map(|s| s.names.iter().map(|n| n.name.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["A", "B"], vec!["C", "D"]]);
        assert_eq!(block.specs[0].names[1].pos.column, 5);
        assert!(matches!(&unit.decls[1], Decl::Var(names) if names.len() == 3));
    }

    #[test]
    fn test_single_const_doc_goes_to_block() {
        let unit = parse("package p\n\n// Pi doc.\nconst Pi = 3.14 // approx\n").unwrap();
        let block = only_block(&unit);
        assert_eq!(block.doc.as_ref().unwrap().text(), "Pi doc.\n");
        assert!(block.specs[0].doc.is_none());
        assert_eq!(block.specs[0].comment.as_ref().unwrap().text(), "approx\n");
    }

    #[test]
    fn test_detached_comment_is_not_doc() {
        let unit = parse("package p\n\n// unrelated\n\nconst A = 1\n").unwrap();
        assert!(only_block(&unit).doc.is_none());
    }

    #[test]
    fn test_trailing_comment_does_not_leak_to_next_spec() {
        let unit = parse("package p\n\nconst (\n\tA = 1 // one\n\tB = 2\n)\n").unwrap();
        let block = only_block(&unit);
        assert_eq!(block.specs[0].comment.as_ref().unwrap().text(), "one\n");
        assert!(block.specs[1].doc.is_none());
        assert!(block.specs[1].comment.is_none());
    }

    #[test]
    fn test_expression_shapes() {
        let unit = parse("package p\n\nconst X = -(1 << 3) + time.Second*int64(2)\n").unwrap();
        let value = &only_block(&unit).specs[0].values[0];
        let ExprKind::Binary { op, left, right } = &value.kind else {
            panic!("expected binary expression, got {:?}", value.kind);
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(left.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_other_declarations_collected() {
        let unit = parse(
            "package p\n\ntype Mode int\ntype Alias = Mode\nvar v, w = 1, 2\nfunc F() {}\nfunc (m Mode) M() {}\n",
        )
        .unwrap();
        assert_eq!(unit.decls.len(), 5);
        assert!(matches!(&unit.decls[0], Decl::Type(specs) if specs.len() == 1 && !specs[0].alias));
        assert!(matches!(&unit.decls[1], Decl::Type(specs) if specs[0].alias));
        assert!(matches!(&unit.decls[2], Decl::Var(names) if names.len() == 2));
        assert!(matches!(&unit.decls[3], Decl::Func(name) if name.name == "F"));
        assert!(matches!(unit.decls[4], Decl::Method));
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = parse("package p\n\nconst (\n\tA = \n").unwrap_err();
        match err {
            GoconstError::Parse { line, column, .. } => {
                assert!(line.is_some());
                assert!(column.is_some());
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_package_clause() {
        assert!(parse("const A = 1\n").is_err());
    }

    #[test]
    fn test_top_level_statement_rejected() {
        let err = parse("package p\n\nx := 1\n").unwrap_err();
        assert!(err.to_string().contains("syntax error"));
    }
}
