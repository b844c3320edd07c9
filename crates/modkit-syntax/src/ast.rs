//! Syntax tree definitions
//!
//! The tree is deliberately shallow below the statement level: statements are
//! kept as element sequences (tokens, groups, blocks, attributes, type
//! literals) rather than a full expression grammar. Declarations that the build
//! cares about (functions, classes, enums, param blocks, attributes, using
//! directives) are fully structured.

use crate::span::Span;
use crate::token::{Token, TokenKind};
use serde::{Deserialize, Serialize};

/// A parsed script file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScriptFile {
    /// Script-level `param(...)` block, with any attributes before it
    pub param_block: Option<ParamBlock>,
    pub items: Vec<Item>,
    pub span: Span,
}

/// Top-level or block-level item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Using(UsingDirective),
    Function(FunctionDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
    Statement(Statement),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Using(u) => u.span,
            Item::Function(f) => f.span,
            Item::Class(c) => c.span,
            Item::Enum(e) => e.span,
            Item::Statement(s) => s.span,
        }
    }
}

/// What a `using` directive imports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsingKind {
    Module,
    Assembly,
    Namespace,
}

/// `using module Foo`, `using assembly .\lib\a.dll`, `using namespace System.IO`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsingDirective {
    pub kind: UsingKind,
    pub target: String,
    pub span: Span,
}

/// Which keyword introduced a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionKind {
    Function,
    Filter,
    Workflow,
}

/// `function Name { ... }` or `function Name($a, $b) { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub kind: FunctionKind,
    pub name: String,
    pub name_span: Span,
    /// Parameters declared inline after the name
    pub params: Vec<Parameter>,
    pub body: ScriptBlock,
    pub span: Span,
}

impl FunctionDecl {
    /// Name with any scope qualifier (`global:`, `script:`) removed
    pub fn unqualified_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((scope, rest))
                if ["global", "script", "local", "private"]
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(scope)) =>
            {
                rest
            }
            _ => &self.name,
        }
    }

    /// Every parameter: inline ones, then the body's param block
    pub fn all_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().chain(
            self.body
                .param_block
                .iter()
                .flat_map(|block| block.params.iter()),
        )
    }
}

/// `{ param(...) statements }`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScriptBlock {
    pub param_block: Option<ParamBlock>,
    pub items: Vec<Item>,
    pub span: Span,
}

/// `[CmdletBinding()] param(...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamBlock {
    pub attributes: Vec<Attribute>,
    pub params: Vec<Parameter>,
    pub span: Span,
}

/// `[Parameter(Mandatory)] [string] $Name = 'default'`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub attributes: Vec<Attribute>,
    pub type_constraints: Vec<TypeName>,
    pub name: String,
    pub default: Option<Statement>,
    pub span: Span,
}

/// A type name as written inside brackets: `string`, `string[]`,
/// `System.Collections.Generic.List[int]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeName {
    pub name: String,
    pub span: Span,
}

impl TypeName {
    /// Name without generic arguments or array suffix
    pub fn base_name(&self) -> &str {
        match self.name.find('[') {
            Some(idx) => &self.name[..idx],
            None => &self.name,
        }
    }
}

/// `[Name(positional, Named = value, Flag)]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: TypeName,
    pub args: Vec<AttributeArgument>,
    pub span: Span,
}

impl Attribute {
    /// Named arguments, in source order
    pub fn named_args(&self) -> impl Iterator<Item = (&str, Span)> {
        self.args.iter().filter_map(|arg| match arg {
            AttributeArgument::Named { name, span, .. } => Some((name.as_str(), *span)),
            AttributeArgument::Positional { .. } => None,
        })
    }

    /// String values of positional arguments (quoted strings and bare words)
    pub fn positional_strings(&self) -> Vec<String> {
        let mut values = Vec::new();
        for arg in &self.args {
            if let AttributeArgument::Positional { value, .. } = arg {
                collect_string_elements(value, &mut values);
            }
        }
        values
    }
}

fn collect_string_elements(elements: &[Element], out: &mut Vec<String>) {
    for element in elements {
        match &element.kind {
            ElementKind::Token(token) => {
                if matches!(
                    token.kind,
                    TokenKind::StringLiteral | TokenKind::StringExpandable | TokenKind::Word
                ) {
                    out.push(token.lexeme.clone());
                }
            }
            ElementKind::Group { items, .. } => {
                for item in items {
                    if let Item::Statement(stmt) = item {
                        collect_string_elements(&stmt.elements, out);
                    }
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeArgument {
    Positional {
        value: Vec<Element>,
        span: Span,
    },
    /// `Name = value`, or a bare `Name` switch with no value
    Named {
        name: String,
        value: Option<Vec<Element>>,
        span: Span,
    },
}

/// `class Name : Base, IFace { members }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub name_span: Span,
    pub base_types: Vec<TypeName>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

impl ClassDecl {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| {
            let base = a.name.base_name();
            base.eq_ignore_ascii_case(name)
                || base.eq_ignore_ascii_case(&format!("{}Attribute", name))
        })
    }

    /// Property names, in declaration order
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().filter_map(|m| match &m.kind {
            MemberKind::Property { name, .. } => Some(name.as_str()),
            MemberKind::Method { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMember {
    pub attributes: Vec<Attribute>,
    /// `hidden`, `static`
    pub modifiers: Vec<String>,
    pub kind: MemberKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberKind {
    Property {
        type_constraint: Option<TypeName>,
        name: String,
        default: Option<Statement>,
    },
    Method {
        return_type: Option<TypeName>,
        name: String,
        params: Vec<Parameter>,
        body: ScriptBlock,
    },
}

/// `enum Name { A; B = 2 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub attributes: Vec<Attribute>,
    pub name: String,
    pub base_type: Option<TypeName>,
    pub members: Vec<EnumMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<Vec<Element>>,
    pub span: Span,
}

/// A pipeline or expression statement, kept as a flat element sequence
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statement {
    pub elements: Vec<Element>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKind {
    /// `( )`
    Paren,
    /// `$( )`
    Subexpression,
    /// `@( )`
    Array,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    Token(Token),
    Attribute(Attribute),
    TypeLiteral(TypeName),
    Group { kind: GroupKind, items: Vec<Item> },
    ScriptBlock(ScriptBlock),
    Hashtable(Vec<HashEntry>),
    /// `[ ]` applied to the preceding value
    Index(Vec<Item>),
}

/// `Key = value` inside `@{ }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashEntry {
    pub key: Vec<Element>,
    pub value: Statement,
    pub span: Span,
}
