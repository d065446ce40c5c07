//! Element registry: one record per node kind bundling its structural spec
//! with the parse and serialize rules for that kind. The parser and
//! serializer cores dispatch through it and never special-case kinds
//! themselves, so new elements register without touching either core.

use std::collections::HashMap;

use rich_doc::{Attrs, ElementNode, Node, NodeSpec, Schema};

use crate::elements;

pub type ParseFn =
    fn(kind: &str, attrs: Attrs, children: Vec<Node>, registry: &ElementRegistry) -> Option<Node>;
pub type SerializeFn = fn(el: &ElementNode, children: String, ctx: &SerializeCtx) -> String;

/// Where a node sits while being serialized: its parent element (if any)
/// and its index among the parent's children. List items derive their
/// bullet or number from this.
pub struct SerializeCtx<'a> {
    pub parent: Option<&'a ElementNode>,
    pub index: usize,
}

#[derive(Clone)]
pub struct ElementDef {
    pub spec: NodeSpec,
    /// Children serialize without markdown escaping (code blocks).
    pub raw_children: bool,
    pub from_tokens: ParseFn,
    pub to_markdown: SerializeFn,
}

#[derive(Clone, Default)]
pub struct ElementRegistry {
    defs: HashMap<String, ElementDef>,
    schema: Schema,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full standard element set. Built once per controller; extend
    /// with `register` before first use.
    pub fn standard() -> Self {
        elements::standard_registry()
    }

    pub fn register(&mut self, def: ElementDef) -> Result<(), String> {
        let kind = def.spec.kind.clone();
        if self.defs.contains_key(&kind) {
            return Err(format!("duplicate element definition: {kind}"));
        }
        self.schema.register(def.spec.clone())?;
        self.defs.insert(kind, def);
        Ok(())
    }

    pub fn def(&self, kind: &str) -> Option<&ElementDef> {
        self.defs.get(kind)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}
