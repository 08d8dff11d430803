//! Host binding seam for the script `src` accessor.
//!
//! The interceptor never touches a DOM directly. It builds a
//! [`SourceAccessor`] and hands it to an [`AccessorHost`], which is whatever
//! can redefine `src` for script elements: the browser prototype on wasm32,
//! or [`crate::mock::MockDocument`] in native tests.

use crate::result::StubResult;
use std::fmt;
use std::rc::Rc;

/// Name of the private backing field on intercepted elements
pub const SHADOW_SRC_FIELD: &str = "_src";

/// A script element as seen by the accessor
pub trait ScriptElement {
    /// Value of the private backing field, if ever set
    fn shadow_src(&self) -> Option<String>;

    /// Store the effective source in the private backing field
    fn set_shadow_src(&mut self, value: String);

    /// Write the visible `src` attribute
    fn set_src_attribute(&mut self, value: &str);
}

/// Maps an assigned source to the effective source
pub type SourceResolver = Rc<dyn Fn(&str) -> String>;

/// Custom get/set pair installed in place of the native `src` accessor
#[derive(Clone)]
pub struct SourceAccessor {
    resolver: SourceResolver,
}

impl fmt::Debug for SourceAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceAccessor").finish_non_exhaustive()
    }
}

impl SourceAccessor {
    /// Create an accessor around a resolver
    pub fn new<F>(resolver: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        Self {
            resolver: Rc::new(resolver),
        }
    }

    /// `get src`: the backing field, or `""` if unset
    pub fn get(&self, element: &dyn ScriptElement) -> String {
        element.shadow_src().unwrap_or_default()
    }

    /// `set src`: resolve, then update both backing field and attribute
    pub fn set(&self, element: &mut dyn ScriptElement, value: &str) {
        let effective = (self.resolver)(value);
        element.set_src_attribute(&effective);
        element.set_shadow_src(effective);
    }
}

/// Something that lets the `src` accessor of script elements be replaced
pub trait AccessorHost {
    /// Replace the accessor
    ///
    /// # Errors
    ///
    /// Returns [`crate::StubError::InstallRefused`] if the host will not
    /// allow the property to be redefined, or
    /// [`crate::StubError::AlreadyInstalled`] if an accessor from any
    /// interceptor is already in place.
    fn define_src_accessor(&mut self, accessor: SourceAccessor) -> StubResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Element {
        shadow: Option<String>,
        attribute: Option<String>,
    }

    impl ScriptElement for Element {
        fn shadow_src(&self) -> Option<String> {
            self.shadow.clone()
        }

        fn set_shadow_src(&mut self, value: String) {
            self.shadow = Some(value);
        }

        fn set_src_attribute(&mut self, value: &str) {
            self.attribute = Some(value.to_string());
        }
    }

    #[test]
    fn test_get_unset_is_empty() {
        let accessor = SourceAccessor::new(|src: &str| src.to_string());
        assert_eq!(accessor.get(&Element::default()), "");
    }

    #[test]
    fn test_set_writes_field_and_attribute() {
        let accessor = SourceAccessor::new(|src: &str| src.to_uppercase());
        let mut element = Element::default();
        accessor.set(&mut element, "ad.js");

        assert_eq!(element.shadow.as_deref(), Some("AD.JS"));
        assert_eq!(element.attribute.as_deref(), Some("AD.JS"));
        assert_eq!(accessor.get(&element), "AD.JS");
    }
}
