//! Whole-package constant checking.
//!
//! The checker builds the package scope, expands const blocks (iota and
//! implicit repetition), orders constants through a dependency graph and
//! folds every constant expression to an exact value.

use std::collections::HashMap;
use std::rc::Rc;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use super::importer::Importer;
use super::ops;
use super::Package;
use crate::constant::{Constant, Value};
use crate::source::literal::{parse_float, parse_imaginary, parse_int, unquote_rune, unquote_string};
use crate::source::{
    is_exported, ConstBlock, Decl, Expr, ExprKind, FileSet, Ident, ImportSpec, Pos, SourceUnit,
    TypeExpr, TypeSpec,
};
use crate::types::{Basic, Sizes, Type, Untyped};

/// Builtins that may produce constants.
const CONST_BUILTINS: &[&str] = &["len", "real", "imag", "complex", "min", "max"];

/// Builtins that never produce constants.
const OTHER_BUILTINS: &[&str] = &[
    "append", "cap", "clear", "close", "copy", "delete", "make", "new", "panic", "print",
    "println", "recover",
];

/// A positioned diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Diag {
    pub pos: Pos,
    pub message: String,
    /// Caused by an error reported elsewhere
    pub derived: bool,
}

impl Diag {
    fn new(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
            derived: false,
        }
    }

    /// `path:line:col: message`
    pub fn render(&self, fset: &FileSet) -> String {
        format!("{}: {}", fset.position(self.pos), self.message)
    }
}

#[derive(Debug, Clone, Copy)]
struct ConstEntry<'a> {
    unit: usize,
    name: &'a Ident,
    ty: Option<&'a TypeExpr>,
    value: Option<&'a Expr>,
    iota: usize,
}

#[derive(Debug, Clone, Copy)]
enum Object<'a> {
    Const(usize),
    Type { unit: usize, spec: &'a TypeSpec },
    Var,
    Func,
}

/// How much of a package to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// The exported package: constants only, optionally importing everything
    Root { strict_imports: bool },
    /// An imported package: constants, types and other names
    Imported,
}

enum TypeState {
    Resolving,
    Done(Result<Type, Diag>),
}

/// Everything the checker learned about a package.
pub(crate) struct Checked {
    /// Declared constants in source order
    pub consts: Vec<(String, Result<Constant, Diag>)>,
    pub types: Vec<(String, Result<Type, Diag>)>,
    pub others: Vec<String>,
    /// Declaration errors not tied to a single constant
    pub errors: Vec<Diag>,
}

impl Checked {
    /// The earliest error by position that is not a consequence of another one.
    pub fn first_error(&self) -> Option<&Diag> {
        let const_errors = self.consts.iter().filter_map(|(_, r)| r.as_ref().err());
        let all: Vec<&Diag> = self.errors.iter().chain(const_errors).collect();
        all.iter()
            .copied()
            .filter(|d| !d.derived)
            .min_by_key(|d| (d.pos.file, d.pos.line, d.pos.column))
            .or_else(|| all.first().copied())
    }
}

pub(crate) struct Checker<'a> {
    /// Package label or import path, used for named types
    package: &'a str,
    units: &'a [SourceUnit],
    importer: &'a mut Importer,
    sizes: Sizes,
    scope: HashMap<String, Object<'a>>,
    entries: Vec<ConstEntry<'a>>,
    errors: Vec<Diag>,
    values: Vec<Option<Result<Constant, Diag>>>,
    type_states: HashMap<String, TypeState>,
    iota: usize,
}

impl<'a> Checker<'a> {
    pub fn new(package: &'a str, units: &'a [SourceUnit], importer: &'a mut Importer) -> Self {
        let sizes = importer.sizes();
        let mut checker = Self {
            package,
            units,
            importer,
            sizes,
            scope: HashMap::new(),
            entries: Vec::new(),
            errors: Vec::new(),
            values: Vec::new(),
            type_states: HashMap::new(),
            iota: 0,
        };
        checker.collect();
        checker
    }

    fn collect(&mut self) {
        let units = self.units;
        for (u, unit) in units.iter().enumerate() {
            for decl in &unit.decls {
                match decl {
                    Decl::Const(block) => self.collect_block(u, block),
                    Decl::Type(specs) => {
                        for spec in specs {
                            self.declare(&spec.name, Object::Type { unit: u, spec });
                        }
                    }
                    Decl::Var(names) => {
                        for name in names {
                            self.declare(name, Object::Var);
                        }
                    }
                    Decl::Func(name) if name.name != "init" => self.declare(name, Object::Func),
                    Decl::Func(_) | Decl::Method => {}
                }
            }
        }
    }

    fn declare(&mut self, name: &'a Ident, object: Object<'a>) {
        if name.is_blank() {
            return;
        }
        if self.scope.contains_key(&name.name) {
            self.errors
                .push(Diag::new(name.pos, format!("{} redeclared in this block", name.name)));
            return;
        }
        self.scope.insert(name.name.clone(), object);
    }

    fn collect_block(&mut self, unit: usize, block: &'a ConstBlock) {
        let mut source = None;
        for (index, spec) in block.specs.iter().enumerate() {
            if !spec.values.is_empty() {
                source = Some(spec);
            } else if spec.ty.is_some() {
                self.errors
                    .push(Diag::new(spec.pos, "missing init expr for const declaration"));
            }
            let (ty, values) = match source {
                Some(src) => (src.ty.as_ref(), src.values.as_slice()),
                None => (None, &[][..]),
            };

            if spec.names.len() > values.len() {
                let missing = &spec.names[values.len()];
                self.errors
                    .push(Diag::new(missing.pos, "missing init expr for const declaration"));
            } else if spec.names.len() < values.len() {
                let pos = if spec.values.is_empty() {
                    spec.pos
                } else {
                    values[spec.names.len()].pos
                };
                self.errors.push(Diag::new(pos, "extra init expr"));
            }

            for (n, name) in spec.names.iter().enumerate() {
                let entry = ConstEntry {
                    unit,
                    name,
                    ty,
                    value: values.get(n),
                    iota: index,
                };
                self.entries.push(entry);
                self.declare(name, Object::Const(self.entries.len() - 1));
            }
        }
    }

    /// Evaluates every constant and, for imported packages, resolves every type.
    pub fn run(mut self, mode: Mode) -> Checked {
        if mode == (Mode::Root { strict_imports: true }) {
            self.import_all();
        }
        self.evaluate_constants();

        let mut consts = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let declared_here = matches!(self.scope.get(&entry.name.name), Some(Object::Const(j)) if *j == i);
            if entry.name.is_blank() || !declared_here {
                continue;
            }
            let result = self.values[i]
                .clone()
                .unwrap_or_else(|| Err(Diag::new(entry.name.pos, "constant was not evaluated")));
            consts.push((entry.name.name.clone(), result));
        }
        // blank constants still have to check cleanly
        let blank_errors: Vec<Diag> = self
            .entries
            .iter()
            .zip(&self.values)
            .filter(|(entry, _)| entry.name.is_blank())
            .filter_map(|(_, value)| value.as_ref().and_then(|v| v.as_ref().err()).cloned())
            .collect();

        let mut types = Vec::new();
        let mut others = Vec::new();
        if mode == Mode::Imported {
            let type_objects: Vec<(String, usize, &'a TypeSpec)> = self
                .scope
                .iter()
                .filter_map(|(name, obj)| match obj {
                    Object::Type { unit, spec } => Some((name.clone(), *unit, *spec)),
                    _ => None,
                })
                .collect();
            for (name, unit, spec) in type_objects {
                let resolved = self.named_type(unit, spec);
                types.push((name, resolved));
            }
            others = self
                .scope
                .iter()
                .filter(|(_, obj)| matches!(obj, Object::Var | Object::Func))
                .map(|(name, _)| name.clone())
                .collect();
        }

        let mut errors = self.errors;
        errors.extend(blank_errors);
        Checked {
            consts,
            types,
            others,
            errors,
        }
    }

    fn import_all(&mut self) {
        let units = self.units;
        for (u, unit) in units.iter().enumerate() {
            for spec in &unit.imports {
                if let Err(diag) = self.import(u, spec) {
                    self.errors.push(diag);
                }
            }
        }
    }

    fn evaluate_constants(&mut self) {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.entries.len()).map(|i| graph.add_node(i)).collect();
        for (i, entry) in self.entries.iter().enumerate() {
            let mut refs = Vec::new();
            if let Some(expr) = entry.value {
                self.collect_refs(expr, &mut refs);
            }
            for j in refs {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }

        self.values = vec![None; self.entries.len()];
        // dependencies come out before their dependents
        for component in tarjan_scc(&graph) {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| graph.contains_edge(n, n));
            for node in component {
                let i = graph[node];
                let result = if cyclic {
                    let name = self.entries[i].name;
                    Err(Diag::new(
                        name.pos,
                        format!("initialization cycle: {} refers to itself", name.name),
                    ))
                } else {
                    self.eval_entry(i)
                };
                self.values[i] = Some(result);
            }
        }
    }

    fn collect_refs(&self, expr: &Expr, out: &mut Vec<usize>) {
        match &expr.kind {
            ExprKind::Ident(name) => {
                if let Some(Object::Const(j)) = self.scope.get(name) {
                    out.push(*j);
                }
            }
            ExprKind::Paren(inner) => self.collect_refs(inner, out),
            ExprKind::Selector { operand, .. } => self.collect_refs(operand, out),
            ExprKind::Unary { operand, .. } => self.collect_refs(operand, out),
            ExprKind::Binary { left, right, .. } => {
                self.collect_refs(left, out);
                self.collect_refs(right, out);
            }
            ExprKind::Call { func, args } => {
                self.collect_refs(func, out);
                for arg in args {
                    self.collect_refs(arg, out);
                }
            }
            ExprKind::Conversion { operand, .. } => self.collect_refs(operand, out),
            _ => {}
        }
    }

    fn eval_entry(&mut self, i: usize) -> Result<Constant, Diag> {
        let entry = self.entries[i];
        self.iota = entry.iota;
        let declared = match entry.ty {
            Some(ty) => Some(self.resolve_type(entry.unit, ty)?),
            None => None,
        };
        let Some(expr) = entry.value else {
            return Err(Diag::new(entry.name.pos, "missing init expr for const declaration"));
        };
        let value = self.eval(entry.unit, expr)?;
        match declared {
            Some(ty) => ops::assign(value, &ty, self.sizes).map_err(|m| Diag::new(expr.pos, m)),
            None => Ok(value),
        }
    }

    fn eval(&mut self, unit: usize, expr: &'a Expr) -> Result<Constant, Diag> {
        let pos = expr.pos;
        let at = |m: String| Diag::new(pos, m);
        match &expr.kind {
            ExprKind::Ident(name) => self.ident(unit, name, pos),
            ExprKind::Int(text) => parse_int(text)
                .map(|i| Constant::untyped(Value::Int(i), Untyped::Int))
                .map_err(at),
            ExprKind::Float(text) => parse_float(text)
                .map(|r| Constant::untyped(Value::Float(r), Untyped::Float))
                .map_err(at),
            ExprKind::Imaginary(text) => parse_imaginary(text)
                .map(|im| Constant::untyped(Value::Complex(BigRational::zero(), im), Untyped::Complex))
                .map_err(at),
            ExprKind::Rune(text) => unquote_rune(text)
                .map(|c| Constant::untyped(Value::Int(BigInt::from(c)), Untyped::Rune))
                .map_err(at),
            ExprKind::Str(text) => unquote_string(text)
                .map(|s| Constant::untyped(Value::String(s), Untyped::String))
                .map_err(at),
            ExprKind::Paren(inner) => self.eval(unit, inner),
            ExprKind::Selector { operand, field } => self.selector(unit, operand, field),
            ExprKind::Unary { op, operand } => {
                let x = self.eval(unit, operand)?;
                ops::unary(*op, x, self.sizes).map_err(at)
            }
            ExprKind::Binary { op, left, right } => {
                let x = self.eval(unit, left)?;
                let y = self.eval(unit, right)?;
                ops::binary(*op, x, y, self.sizes).map_err(at)
            }
            ExprKind::Call { func, args } => self.call(unit, func, args, pos),
            ExprKind::Conversion { ty, operand } => {
                let target = self.resolve_type(unit, ty)?;
                let x = self.eval(unit, operand)?;
                ops::convert(x, &target, self.sizes).map_err(at)
            }
            ExprKind::Other(text) => Err(at(format!("{} is not constant", text))),
        }
    }

    fn const_value(&self, j: usize, pos: Pos) -> Result<Constant, Diag> {
        match &self.values[j] {
            Some(Ok(c)) => Ok(c.clone()),
            Some(Err(diag)) => Err(Diag {
                pos,
                message: diag.message.clone(),
                derived: true,
            }),
            None => Err(Diag::new(
                pos,
                format!("initialization cycle: {} refers to itself", self.entries[j].name.name),
            )),
        }
    }

    fn ident(&mut self, unit: usize, name: &str, pos: Pos) -> Result<Constant, Diag> {
        if let Some(object) = self.scope.get(name).copied() {
            return match object {
                Object::Const(j) => self.const_value(j, pos),
                Object::Type { .. } => Err(Diag::new(pos, format!("{} (type) is not an expression", name))),
                Object::Var => Err(Diag::new(pos, format!("{} (variable) is not constant", name))),
                Object::Func => Err(Diag::new(pos, format!("{} (value of type func) is not constant", name))),
            };
        }
        match name {
            "true" | "false" => {
                return Ok(Constant::untyped(Value::Bool(name == "true"), Untyped::Bool))
            }
            "iota" => {
                return Ok(Constant::untyped(Value::Int(BigInt::from(self.iota)), Untyped::Int))
            }
            "nil" => return Err(Diag::new(pos, "nil is not constant")),
            _ if universe_type(name).is_some() => {
                return Err(Diag::new(pos, format!("{} (type) is not an expression", name)))
            }
            _ if CONST_BUILTINS.contains(&name) || OTHER_BUILTINS.contains(&name) => {
                return Err(Diag::new(pos, format!("{} (built-in function) must be called", name)))
            }
            _ => {}
        }
        for package in self.dot_imports(unit)? {
            if package.consts.contains_key(name)
                || package.types.contains_key(name)
                || package.others.contains(name)
            {
                return member_value(&package, name, name, pos);
            }
        }
        Err(Diag::new(pos, format!("undefined: {}", name)))
    }

    fn selector(&mut self, unit: usize, operand: &'a Expr, field: &Ident) -> Result<Constant, Diag> {
        if let ExprKind::Ident(pkg_name) = &operand.kind {
            if let Some(package) = self.package_named(unit, pkg_name)? {
                let qualified = format!("{}.{}", pkg_name, field.name);
                return member_value(&package, &field.name, &qualified, field.pos);
            }
        }
        self.eval(unit, operand)?;
        Err(Diag::new(
            field.pos,
            format!("{} undefined (constant has no field or method {})", field.name, field.name),
        ))
    }

    fn call(&mut self, unit: usize, func: &'a Expr, args: &'a [Expr], pos: Pos) -> Result<Constant, Diag> {
        let callee = strip_parens(func);
        match &callee.kind {
            ExprKind::Ident(name) => {
                match self.scope.get(name).copied() {
                    Some(Object::Type { unit: decl_unit, spec }) => {
                        let target = self.named_type(decl_unit, spec)?;
                        return self.conversion(unit, &target, args, pos);
                    }
                    Some(Object::Const(_)) | Some(Object::Var) => {
                        return Err(Diag::new(
                            pos,
                            format!("invalid operation: cannot call non-function {}", name),
                        ))
                    }
                    Some(Object::Func) => {
                        return Err(Diag::new(pos, format!("{}() (value) is not constant", name)))
                    }
                    None => {}
                }
                if let Some(target) = universe_type(name) {
                    return self.conversion(unit, &target, args, pos);
                }
                if CONST_BUILTINS.contains(&name.as_str()) {
                    return self.builtin(unit, name, args, pos);
                }
                if OTHER_BUILTINS.contains(&name.as_str()) {
                    return Err(Diag::new(pos, format!("{}(...) (value) is not constant", name)));
                }
                for package in self.dot_imports(unit)? {
                    if let Some(found) = package.types.get(name.as_str()) {
                        let target = found.clone().map_err(|m| Diag::new(pos, m))?;
                        return self.conversion(unit, &target, args, pos);
                    }
                }
                Err(Diag::new(callee.pos, format!("undefined: {}", name)))
            }
            ExprKind::Selector { operand, field } => {
                if let ExprKind::Ident(pkg_name) = &operand.kind {
                    if let Some(package) = self.package_named(unit, pkg_name)? {
                        let qualified = format!("{}.{}", pkg_name, field.name);
                        return match package.types.get(&field.name) {
                            Some(Ok(target)) => {
                                let target = target.clone();
                                self.conversion(unit, &target, args, pos)
                            }
                            Some(Err(m)) => Err(Diag::new(field.pos, m.clone())),
                            None if package.consts.contains_key(&field.name)
                                || package.others.contains(&field.name) =>
                            {
                                Err(Diag::new(pos, format!("{}(...) (value) is not constant", qualified)))
                            }
                            None => Err(Diag::new(field.pos, format!("undefined: {}", qualified))),
                        };
                    }
                }
                Err(Diag::new(pos, "call of non-function is not constant"))
            }
            _ => Err(Diag::new(pos, "function call is not constant")),
        }
    }

    fn conversion(&mut self, unit: usize, target: &Type, args: &'a [Expr], pos: Pos) -> Result<Constant, Diag> {
        let [arg] = args else {
            return Err(Diag::new(
                pos,
                format!("wrong argument count in conversion to {}", target),
            ));
        };
        let x = self.eval(unit, arg)?;
        ops::convert(x, target, self.sizes).map_err(|m| Diag::new(pos, m))
    }

    fn builtin(&mut self, unit: usize, name: &str, args: &'a [Expr], pos: Pos) -> Result<Constant, Diag> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(unit, arg)?);
        }
        let arity = |n: usize| {
            if values.len() == n {
                Ok(())
            } else {
                Err(Diag::new(
                    pos,
                    format!(
                        "wrong number of arguments to {}: expected {}, found {}",
                        name,
                        n,
                        values.len()
                    ),
                ))
            }
        };
        let result = match name {
            "len" => {
                arity(1)?;
                ops::len(&values[0])
            }
            "real" | "imag" => {
                arity(1)?;
                ops::real_imag(name == "imag", &values[0])
            }
            "complex" => {
                arity(2)?;
                ops::complex(&values[0], &values[1], self.sizes)
            }
            _ => ops::min_max(name == "max", values, self.sizes),
        };
        result.map_err(|m| Diag::new(pos, m))
    }

    fn resolve_type(&mut self, unit: usize, ty: &'a TypeExpr) -> Result<Type, Diag> {
        match ty {
            TypeExpr::Name(id) => match self.scope.get(&id.name).copied() {
                Some(Object::Type { unit: decl_unit, spec }) => self.named_type(decl_unit, spec),
                Some(_) => Err(Diag::new(id.pos, format!("{} is not a type", id.name))),
                None => {
                    if let Some(t) = universe_type(&id.name) {
                        return Ok(t);
                    }
                    for package in self.dot_imports(unit)? {
                        if let Some(found) = package.types.get(&id.name) {
                            return found.clone().map_err(|m| Diag::new(id.pos, m));
                        }
                    }
                    Err(Diag::new(id.pos, format!("undefined: {}", id.name)))
                }
            },
            TypeExpr::Qualified { package, name } => {
                let qualified = format!("{}.{}", package.name, name.name);
                let Some(imported) = self.package_named(unit, &package.name)? else {
                    return Err(Diag::new(package.pos, format!("undefined: {}", package.name)));
                };
                if !is_exported(&name.name) {
                    return Err(Diag::new(
                        name.pos,
                        format!("name {} not exported by package {}", name.name, imported.name),
                    ));
                }
                match imported.types.get(&name.name) {
                    Some(found) => found.clone().map_err(|m| Diag::new(name.pos, m)),
                    None => Err(Diag::new(name.pos, format!("undefined: {}", qualified))),
                }
            }
            TypeExpr::Other { text, .. } => Ok(Type::Other(text.clone())),
        }
    }

    fn named_type(&mut self, unit: usize, spec: &'a TypeSpec) -> Result<Type, Diag> {
        let name = spec.name.name.clone();
        match self.type_states.get(&name) {
            Some(TypeState::Done(result)) => return result.clone(),
            Some(TypeState::Resolving) => {
                return Err(Diag::new(spec.name.pos, format!("invalid recursive type {}", name)))
            }
            None => {}
        }
        self.type_states.insert(name.clone(), TypeState::Resolving);
        let result = self.resolve_type(unit, &spec.ty).map(|target| {
            if spec.alias {
                target
            } else {
                Type::named(self.package, name.clone(), target.basic())
            }
        });
        self.type_states.insert(name, TypeState::Done(result.clone()));
        result
    }

    fn import(&mut self, unit: usize, spec: &ImportSpec) -> Result<Rc<Package>, Diag> {
        let units = self.units;
        let dir = units[unit].dir();
        self.importer
            .import(&spec.path, dir)
            .map_err(|reason| Diag::new(spec.pos, format!("could not import {} ({})", spec.path, reason)))
    }

    fn dot_imports(&mut self, unit: usize) -> Result<Vec<Rc<Package>>, Diag> {
        let units = self.units;
        let mut packages = Vec::new();
        for spec in units[unit].imports.iter().filter(|s| s.name.as_deref() == Some(".")) {
            packages.push(self.import(unit, spec)?);
        }
        Ok(packages)
    }

    /// The package a file refers to as `name`, if any.
    ///
    /// Explicit import names are matched first, then imports whose last
    /// path element is `name`, then the declared names of the remaining
    /// imports.
    fn package_named(&mut self, unit: usize, name: &str) -> Result<Option<Rc<Package>>, Diag> {
        if self.scope.contains_key(name) || name == "_" {
            return Ok(None);
        }
        let units = self.units;
        let imports = &units[unit].imports;
        if let Some(spec) = imports.iter().find(|s| s.name.as_deref() == Some(name)) {
            return self.import(unit, spec).map(Some);
        }
        let unnamed: Vec<&ImportSpec> = imports.iter().filter(|s| s.name.is_none()).collect();
        let (guessed, rest): (Vec<&ImportSpec>, Vec<&ImportSpec>) = unnamed
            .into_iter()
            .partition(|s| s.path.rsplit('/').next() == Some(name));
        for spec in guessed {
            let package = self.import(unit, spec)?;
            if package.name == name {
                return Ok(Some(package));
            }
        }
        for spec in rest {
            if let Ok(package) = self.import(unit, spec) {
                if package.name == name {
                    return Ok(Some(package));
                }
            }
        }
        Ok(None)
    }
}

fn strip_parens(expr: &Expr) -> &Expr {
    match &expr.kind {
        ExprKind::Paren(inner) => strip_parens(inner),
        _ => expr,
    }
}

fn universe_type(name: &str) -> Option<Type> {
    if let Some(basic) = Basic::from_name(name) {
        return Some(Type::Basic(basic));
    }
    matches!(name, "any" | "error" | "comparable").then(|| Type::Other(name.to_string()))
}

/// Looks up an exported constant of an imported package.
fn member_value(package: &Package, name: &str, qualified: &str, pos: Pos) -> Result<Constant, Diag> {
    if !is_exported(name) {
        return Err(Diag::new(
            pos,
            format!("name {} not exported by package {}", name, package.name),
        ));
    }
    match package.consts.get(name) {
        Some(Ok(c)) => Ok(c.clone()),
        Some(Err(message)) => Err(Diag::new(pos, format!("{} is invalid: {}", qualified, message))),
        None if package.types.contains_key(name) => {
            Err(Diag::new(pos, format!("{} (type) is not an expression", qualified)))
        }
        None if package.others.contains(name) => {
            Err(Diag::new(pos, format!("{} is not constant", qualified)))
        }
        None => Err(Diag::new(pos, format!("undefined: {}", qualified))),
    }
}
