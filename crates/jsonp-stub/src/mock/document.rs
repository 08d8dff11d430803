//! In-memory stand-in for a page's script elements.
//!
//! Models only what the interceptor touches: an overridable `src` accessor
//! shared by all script elements, a private backing field per element, and
//! the visible `src` attribute.

use crate::dom::{AccessorHost, ScriptElement, SourceAccessor, SHADOW_SRC_FIELD};
use crate::result::{StubError, StubResult};
use std::collections::HashMap;

/// Index of a script element in a [`MockDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(usize);

/// A script element with a backing field and attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockScriptElement {
    fields: HashMap<String, String>,
    attributes: HashMap<String, String>,
}

impl MockScriptElement {
    /// Read an attribute
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Read a private field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl ScriptElement for MockScriptElement {
    fn shadow_src(&self) -> Option<String> {
        self.fields.get(SHADOW_SRC_FIELD).cloned()
    }

    fn set_shadow_src(&mut self, value: String) {
        self.fields.insert(SHADOW_SRC_FIELD.to_string(), value);
    }

    fn set_src_attribute(&mut self, value: &str) {
        self.attributes.insert("src".to_string(), value.to_string());
    }
}

/// A document whose script `src` accessor can be replaced once
///
/// The installed accessor is the document-wide install flag: a second
/// definition, from any interceptor, is rejected with
/// [`StubError::AlreadyInstalled`].
#[derive(Debug)]
pub struct MockDocument {
    elements: Vec<MockScriptElement>,
    accessor: Option<SourceAccessor>,
    configurable: bool,
    definitions: usize,
}

impl Default for MockDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDocument {
    /// Create a document with a configurable `src` property
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            accessor: None,
            configurable: true,
            definitions: 0,
        }
    }

    /// Create a document that refuses to redefine `src`
    #[must_use]
    pub fn non_configurable() -> Self {
        Self {
            configurable: false,
            ..Self::new()
        }
    }

    /// Create a script element
    pub fn create_script(&mut self) -> ElementId {
        self.elements.push(MockScriptElement::default());
        ElementId(self.elements.len() - 1)
    }

    /// Number of script elements
    #[must_use]
    pub fn script_count(&self) -> usize {
        self.elements.len()
    }

    /// Assign `script.src`, going through the accessor if one is installed
    ///
    /// Unknown ids are ignored.
    pub fn set_src(&mut self, id: ElementId, value: &str) {
        let Some(element) = self.elements.get_mut(id.0) else {
            return;
        };
        match &self.accessor {
            Some(accessor) => accessor.set(element, value),
            None => element.set_src_attribute(value),
        }
    }

    /// Read `script.src`
    #[must_use]
    pub fn src(&self, id: ElementId) -> String {
        let Some(element) = self.elements.get(id.0) else {
            return String::new();
        };
        match &self.accessor {
            Some(accessor) => accessor.get(element),
            None => element.attribute("src").unwrap_or_default().to_string(),
        }
    }

    /// Read an attribute directly
    #[must_use]
    pub fn get_attribute(&self, id: ElementId, name: &str) -> Option<String> {
        self.elements
            .get(id.0)
            .and_then(|e| e.attribute(name))
            .map(ToString::to_string)
    }

    /// Write an attribute directly, bypassing the accessor
    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(element) = self.elements.get_mut(id.0) {
            element
                .attributes
                .insert(name.to_string(), value.to_string());
        }
    }

    /// Borrow an element
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&MockScriptElement> {
        self.elements.get(id.0)
    }

    /// Number of times the accessor was redefined
    #[must_use]
    pub const fn accessor_definitions(&self) -> usize {
        self.definitions
    }

    /// Check if a custom accessor is in place
    #[must_use]
    pub const fn is_intercepted(&self) -> bool {
        self.accessor.is_some()
    }
}

impl AccessorHost for MockDocument {
    fn define_src_accessor(&mut self, accessor: SourceAccessor) -> StubResult<()> {
        if !self.configurable {
            return Err(StubError::InstallRefused {
                message: "HTMLScriptElement.prototype.src is not configurable".to_string(),
            });
        }
        if self.accessor.is_some() {
            return Err(StubError::AlreadyInstalled);
        }
        self.accessor = Some(accessor);
        self.definitions += 1;
        Ok(())
    }
}
