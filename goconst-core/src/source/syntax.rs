//! Owned syntax model for the parts of a Go file the exporter cares about.

use std::path::{Path, PathBuf};

use super::comments::CommentGroup;
use super::{FileId, Pos};

/// An identifier with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub pos: Pos,
}

impl Ident {
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

/// Go's visibility rule: a name is exported if its first character is uppercase.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// A type in declaration or conversion position.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `T`
    Name(Ident),
    /// `pkg.T`
    Qualified { package: Ident, name: Ident },
    /// Composite and other non-constant types, kept as source text
    Other { text: String, pos: Pos },
}

impl TypeExpr {
    pub fn pos(&self) -> Pos {
        match self {
            TypeExpr::Name(id) => id.pos,
            TypeExpr::Qualified { package, .. } => package.pos,
            TypeExpr::Other { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    Complement,
    /// `*`, `&`, `<-`: never constant
    Other(&'static str),
}

impl UnaryOp {
    pub fn from_token(token: &str) -> UnaryOp {
        match token {
            "+" => UnaryOp::Plus,
            "-" => UnaryOp::Neg,
            "!" => UnaryOp::Not,
            "^" => UnaryOp::Complement,
            "*" => UnaryOp::Other("*"),
            "&" => UnaryOp::Other("&"),
            _ => UnaryOp::Other("<-"),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::Complement => "^",
            UnaryOp::Other(token) => token,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    AndNot,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogAnd,
    LogOr,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Option<BinaryOp> {
        Some(match token {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Quo,
            "%" => BinaryOp::Rem,
            "&" => BinaryOp::And,
            "|" => BinaryOp::Or,
            "^" => BinaryOp::Xor,
            "&^" => BinaryOp::AndNot,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&&" => BinaryOp::LogAnd,
            "||" => BinaryOp::LogOr,
            _ => return None,
        })
    }

    pub fn token(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Quo => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::AndNot => "&^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
        }
    }

    /// Operation name used in untyped overflow diagnostics.
    pub fn overflow_name(self) -> &'static str {
        match self {
            BinaryOp::Add => "addition",
            BinaryOp::Sub => "subtraction",
            BinaryOp::Mul => "multiplication",
            BinaryOp::Xor => "bitwise XOR",
            BinaryOp::Shl => "shift",
            _ => "",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

/// Expression forms. Literals keep their source text; values are computed
/// during resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Identifiers, including `true`, `false`, `nil` and `iota`
    Ident(String),
    Int(String),
    Float(String),
    Imaginary(String),
    Rune(String),
    Str(String),
    Paren(Box<Expr>),
    Selector { operand: Box<Expr>, field: Ident },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Call { func: Box<Expr>, args: Vec<Expr> },
    Conversion { ty: TypeExpr, operand: Box<Expr> },
    /// Any other expression (composite literals, closures, indexing, ...)
    Other(String),
}

/// One `Name1, Name2 T = v1, v2` line of a const declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstSpec {
    pub names: Vec<Ident>,
    pub ty: Option<TypeExpr>,
    /// Empty when the spec repeats the previous spec's expressions
    pub values: Vec<Expr>,
    pub doc: Option<CommentGroup>,
    pub comment: Option<CommentGroup>,
    pub pos: Pos,
}

/// One `const` declaration, parenthesized or not.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstBlock {
    pub doc: Option<CommentGroup>,
    pub specs: Vec<ConstSpec>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name: Ident,
    /// `type A = B`
    pub alias: bool,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    /// Explicit local name, `.` or `_`
    pub name: Option<String>,
    pub path: String,
    pub pos: Pos,
}

/// Top-level declarations in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Const(ConstBlock),
    Type(Vec<TypeSpec>),
    Var(Vec<Ident>),
    Func(Ident),
    Method,
}

/// One parsed Go file.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub file: FileId,
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
}

impl SourceUnit {
    /// Base file name used in listing headers.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Directory the file lives in, used to resolve module-local imports.
    pub fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    pub fn const_blocks(&self) -> impl Iterator<Item = &ConstBlock> {
        self.decls.iter().filter_map(|decl| match decl {
            Decl::Const(block) => Some(block),
            _ => None,
        })
    }
}
