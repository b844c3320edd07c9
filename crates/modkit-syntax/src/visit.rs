//! Read-only tree traversal
//!
//! Implement [`Visitor`] and override the hooks you need; the `walk_*`
//! functions descend into children so overrides can call them to continue.

use crate::ast::*;

pub trait Visitor<'ast> {
    fn visit_item(&mut self, item: &'ast Item) {
        walk_item(self, item);
    }

    fn visit_function(&mut self, function: &'ast FunctionDecl) {
        walk_function(self, function);
    }

    fn visit_class(&mut self, class: &'ast ClassDecl) {
        walk_class(self, class);
    }

    fn visit_enum(&mut self, decl: &'ast EnumDecl) {
        walk_enum(self, decl);
    }

    fn visit_param_block(&mut self, block: &'ast ParamBlock) {
        walk_param_block(self, block);
    }

    fn visit_parameter(&mut self, param: &'ast Parameter) {
        walk_parameter(self, param);
    }

    fn visit_attribute(&mut self, attribute: &'ast Attribute) {
        walk_attribute(self, attribute);
    }

    fn visit_statement(&mut self, statement: &'ast Statement) {
        walk_elements(self, &statement.elements);
    }

    fn visit_script_block(&mut self, block: &'ast ScriptBlock) {
        walk_script_block(self, block);
    }
}

pub fn walk_script<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, script: &'ast ScriptFile) {
    if let Some(block) = &script.param_block {
        visitor.visit_param_block(block);
    }
    for item in &script.items {
        visitor.visit_item(item);
    }
}

pub fn walk_item<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, item: &'ast Item) {
    match item {
        Item::Using(_) => {}
        Item::Function(function) => visitor.visit_function(function),
        Item::Class(class) => visitor.visit_class(class),
        Item::Enum(decl) => visitor.visit_enum(decl),
        Item::Statement(statement) => visitor.visit_statement(statement),
    }
}

pub fn walk_function<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    function: &'ast FunctionDecl,
) {
    for param in &function.params {
        visitor.visit_parameter(param);
    }
    visitor.visit_script_block(&function.body);
}

pub fn walk_script_block<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    block: &'ast ScriptBlock,
) {
    if let Some(params) = &block.param_block {
        visitor.visit_param_block(params);
    }
    for item in &block.items {
        visitor.visit_item(item);
    }
}

pub fn walk_class<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, class: &'ast ClassDecl) {
    for attribute in &class.attributes {
        visitor.visit_attribute(attribute);
    }
    for member in &class.members {
        for attribute in &member.attributes {
            visitor.visit_attribute(attribute);
        }
        match &member.kind {
            MemberKind::Property { default, .. } => {
                if let Some(value) = default {
                    visitor.visit_statement(value);
                }
            }
            MemberKind::Method { params, body, .. } => {
                for param in params {
                    visitor.visit_parameter(param);
                }
                visitor.visit_script_block(body);
            }
        }
    }
}

pub fn walk_enum<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, decl: &'ast EnumDecl) {
    for attribute in &decl.attributes {
        visitor.visit_attribute(attribute);
    }
    for member in &decl.members {
        if let Some(value) = &member.value {
            walk_elements(visitor, value);
        }
    }
}

pub fn walk_param_block<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    block: &'ast ParamBlock,
) {
    for attribute in &block.attributes {
        visitor.visit_attribute(attribute);
    }
    for param in &block.params {
        visitor.visit_parameter(param);
    }
}

pub fn walk_parameter<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, param: &'ast Parameter) {
    for attribute in &param.attributes {
        visitor.visit_attribute(attribute);
    }
    if let Some(default) = &param.default {
        visitor.visit_statement(default);
    }
}

pub fn walk_attribute<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    attribute: &'ast Attribute,
) {
    for arg in &attribute.args {
        match arg {
            AttributeArgument::Positional { value, .. } => walk_elements(visitor, value),
            AttributeArgument::Named { value, .. } => {
                if let Some(value) = value {
                    walk_elements(visitor, value);
                }
            }
        }
    }
}

pub fn walk_elements<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, elements: &'ast [Element]) {
    for element in elements {
        match &element.kind {
            ElementKind::Token(_) | ElementKind::TypeLiteral(_) => {}
            ElementKind::Attribute(attribute) => visitor.visit_attribute(attribute),
            ElementKind::Group { items, .. } | ElementKind::Index(items) => {
                for item in items {
                    visitor.visit_item(item);
                }
            }
            ElementKind::ScriptBlock(block) => visitor.visit_script_block(block),
            ElementKind::Hashtable(entries) => {
                for entry in entries {
                    walk_elements(visitor, &entry.key);
                    visitor.visit_statement(&entry.value);
                }
            }
        }
    }
}

/// Every attribute in the script, at any depth, in source order
pub fn collect_attributes(script: &ScriptFile) -> Vec<&Attribute> {
    struct Collector<'ast> {
        found: Vec<&'ast Attribute>,
    }

    impl<'ast> Visitor<'ast> for Collector<'ast> {
        fn visit_attribute(&mut self, attribute: &'ast Attribute) {
            self.found.push(attribute);
            walk_attribute(self, attribute);
        }
    }

    let mut collector = Collector { found: Vec::new() };
    walk_script(&mut collector, script);
    collector.found
}

/// Functions declared at the top level of the script (not nested)
pub fn top_level_functions(script: &ScriptFile) -> Vec<&FunctionDecl> {
    script
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Function(function) => Some(function),
            _ => None,
        })
        .collect()
}

/// Classes declared at the top level of the script
pub fn top_level_classes(script: &ScriptFile) -> Vec<&ClassDecl> {
    script
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Class(class) => Some(class),
            _ => None,
        })
        .collect()
}

/// Names from `[Alias(...)]` attributes on a function's param block
pub fn function_aliases(function: &FunctionDecl) -> Vec<String> {
    let Some(block) = &function.body.param_block else {
        return Vec::new();
    };
    block
        .attributes
        .iter()
        .filter(|a| {
            let name = a.name.base_name();
            name.eq_ignore_ascii_case("Alias") || name.eq_ignore_ascii_case("AliasAttribute")
        })
        .flat_map(|a| a.positional_strings())
        .collect()
}
