//! Data structures for parsed type annotations.
//!
//! A [`TypeNode`] is the output of the annotation grammar parser and the input
//! of the type resolver. The tree is immutable once built; resolution never
//! mutates it.

use indexmap::IndexMap;

/// A parsed type annotation node.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    /// A bare name: a built-in type (`string`, `int`, ...), a status constant
    /// or an alias reference.
    Identifier(String),
    /// A generic application like `list<string>` or `int<0, max>`.
    Generic { name: String, args: Vec<TypeNode> },
    /// A closed object shape: `array{id: int, name?: string}`.
    ArrayShape(Vec<ShapeItem>),
    /// `A|B|C`
    Union(Vec<TypeNode>),
    /// `A&B`
    Intersection(Vec<TypeNode>),
    /// `?T`
    Nullable(Box<TypeNode>),
    /// The discouraged `T[]` suffix form. Kept as its own variant so the
    /// resolver can reject it with a dedicated diagnostic.
    ArrayOf(Box<TypeNode>),
    /// A string literal: `'yes'`
    ConstString(String),
    /// An integer literal: `42`
    ConstInt(i64),
}

/// One key of an array shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeItem {
    pub key: String,
    pub value: TypeNode,
    pub optional: bool,
}

impl TypeNode {
    pub fn identifier(name: &str) -> Self {
        TypeNode::Identifier(name.to_string())
    }

    /// Whether this node is the identifier `name`.
    pub fn is_identifier(&self, name: &str) -> bool {
        matches!(self, TypeNode::Identifier(n) if n == name)
    }
}

/// Named type aliases declared by a module's response definitions.
///
/// Alias names carry the module's readable identifier as a prefix
/// (`NotesNote` for module `notes`); the prefix is stripped again when the
/// alias is turned into a named schema. Populated once per run, read-only
/// during resolution.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    prefix: String,
    aliases: IndexMap<String, TypeNode>,
}

impl Definitions {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            aliases: IndexMap::new(),
        }
    }

    /// Derives the readable identifier of a module id: underscore-separated
    /// parts, each upper-cased at the first letter (`notes_app` -> `NotesApp`).
    pub fn readable_id(module: &str) -> String {
        module
            .split('_')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Inserts an alias. Returns the previous definition if the name was
    /// already taken.
    pub fn insert(&mut self, name: String, node: TypeNode) -> Option<TypeNode> {
        self.aliases.insert(name, node)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TypeNode> {
        self.aliases.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TypeNode)> {
        self.aliases.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Schema name of an alias: the alias name with the module prefix
    /// stripped.
    pub fn schema_name<'a>(&self, alias: &'a str) -> &'a str {
        alias.strip_prefix(self.prefix.as_str()).unwrap_or(alias)
    }
}
