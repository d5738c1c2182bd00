//! The owned options object and JSON entry points.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use serde_core::Serialize;
use serde_core::de::DeserializeOwned;

use crate::catalog::TypeCatalog;
use crate::error::{DecodeError, EncodeError};

use super::refs::ReferenceTable;
use super::scope::{self, ScopeFrame, ScopeGuard};
use super::shaped::SetFilterCache;

// -----------------------------------------------------------------------------
// Codec

/// A reusable bundle of codec options.
///
/// Every entry point installs the options as the active scope for the
/// duration of the call, then delegates to `serde_json`. Scopes nest, so a
/// codec call from inside custom (de)serialization code is safe.
///
/// # Examples
///
/// ```
/// use morph_json::{Codec, Shape};
///
/// #[derive(Shape, Default)]
/// struct Point {
///     #[shape(sets("Public"))]
///     x: i32,
///     #[shape(sets("Public"))]
///     y: i32,
///     secret: u64,
/// }
///
/// let codec = Codec::compact().with_property_set("Public");
/// let json = codec.to_string(&Point { x: 1, y: 2, secret: 3 }).unwrap();
/// assert_eq!(json, r#"{"x":1,"y":2}"#);
/// ```
pub struct Codec {
    catalog: Option<Arc<TypeCatalog>>,
    property_set: Option<Arc<str>>,
    preserve_references: bool,
    pretty: bool,
    set_filters: Arc<SetFilterCache>,
}

impl Codec {
    /// Single-line output, global catalog, all fields, no preservation.
    pub fn compact() -> Self {
        Self {
            catalog: None,
            property_set: None,
            preserve_references: false,
            pretty: false,
            set_filters: Arc::new(SetFilterCache::new()),
        }
    }

    /// Like [`compact`](Codec::compact) with pretty-printed output.
    pub fn formatted() -> Self {
        Self {
            pretty: true,
            ..Self::compact()
        }
    }

    /// Turns on `$id`/`$ref` preservation of shared and cyclic references.
    pub fn preserve_references(mut self) -> Self {
        self.preserve_references = true;
        self
    }

    /// Restricts shaped fields to the named property set.
    pub fn with_property_set(mut self, set: impl Into<Arc<str>>) -> Self {
        self.property_set = Some(set.into());
        self
    }

    /// Resolves traits against an explicit catalog instead of the global one.
    pub fn with_catalog(mut self, catalog: Arc<TypeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// A fresh reference table per call; tables never outlive one document.
    fn enter_scope(&self) -> ScopeGuard {
        scope::enter(ScopeFrame {
            catalog: self.catalog.clone(),
            property_set: self.property_set.clone(),
            set_filters: Some(self.set_filters.clone()),
            refs: self
                .preserve_references
                .then(|| Rc::new(RefCell::new(ReferenceTable::new()))),
        })
    }

    // -- encode --

    pub fn to_string<T: ?Sized + Serialize>(&self, value: &T) -> Result<String, EncodeError> {
        let _scope = self.enter_scope();
        let out = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(out)
    }

    pub fn to_vec<T: ?Sized + Serialize>(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        let _scope = self.enter_scope();
        let out = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(out)
    }

    pub fn to_value<T: ?Sized + Serialize>(
        &self,
        value: &T,
    ) -> Result<serde_json::Value, EncodeError> {
        let _scope = self.enter_scope();
        Ok(serde_json::to_value(value)?)
    }

    // -- decode --

    pub fn from_str<T: DeserializeOwned>(&self, input: &str) -> Result<T, DecodeError> {
        let _scope = self.enter_scope();
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_slice<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T, DecodeError> {
        let _scope = self.enter_scope();
        Ok(serde_json::from_slice(input)?)
    }

    pub fn from_value<T: DeserializeOwned>(
        &self,
        input: serde_json::Value,
    ) -> Result<T, DecodeError> {
        let _scope = self.enter_scope();
        Ok(serde_json::from_value(input)?)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::compact()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Shape, Shared, diff, resolvable};

    #[resolvable]
    trait NeedsResolving {
        fn label(&self) -> String;
    }

    #[derive(Shape, Default)]
    #[shape(implements(NeedsResolving), auto_register)]
    struct Class1 {
        id: u32,
        key: String,
        list: Vec<i32>,
        p1: String,
    }

    #[derive(Shape, Default)]
    #[shape(implements(NeedsResolving), auto_register)]
    struct Class2 {
        id: u32,
        key: String,
        list: Vec<i32>,
        p2: String,
    }

    #[derive(Shape, Default)]
    #[shape(implements(NeedsResolving), auto_register)]
    struct Class3 {
        id: u32,
        key: String,
        list: Vec<i32>,
        p3: String,
    }

    impl NeedsResolving for Class1 {
        fn label(&self) -> String {
            format!("Class1:{}", self.p1)
        }
    }
    impl NeedsResolving for Class2 {
        fn label(&self) -> String {
            format!("Class2:{}", self.p2)
        }
    }
    impl NeedsResolving for Class3 {
        fn label(&self) -> String {
            format!("Class3:{}", self.p3)
        }
    }

    #[derive(Shape, Default)]
    struct Holder {
        primary: Option<Box<dyn NeedsResolving>>,
        entries: Vec<Box<dyn NeedsResolving>>,
    }

    fn fixture_catalog() -> Arc<TypeCatalog> {
        let mut catalog = TypeCatalog::new();
        catalog.register::<Class1>();
        catalog.register::<Class2>();
        catalog.register::<Class3>();
        Arc::new(catalog)
    }

    fn holder() -> Holder {
        Holder {
            primary: Some(Box::new(Class2 {
                id: 1,
                key: "k".into(),
                list: vec![3, 1, 2],
                p2: "two".into(),
            })),
            entries: vec![
                Box::new(Class1 {
                    id: 2,
                    key: "a".into(),
                    list: vec![],
                    p1: "one".into(),
                }),
                Box::new(Class3 {
                    id: 3,
                    key: "b".into(),
                    list: vec![9],
                    p3: "three".into(),
                }),
            ],
        }
    }

    #[test]
    fn polymorphic_graph_round_trips() {
        let codec = Codec::compact().with_catalog(fixture_catalog());
        let json = codec.to_string(&holder()).unwrap();
        // No type tag on the wire.
        assert!(!json.contains("Class"));
        let back: Holder = codec.from_str(&json).unwrap();
        assert_eq!(
            back.primary.as_ref().map(|p| p.label()),
            Some("Class2:two".into())
        );
        let labels: Vec<String> = back.entries.iter().map(|e| e.label()).collect();
        assert_eq!(labels, ["Class1:one", "Class3:three"]);
        assert!(diff::compare(&holder(), &back).unwrap().is_match());
    }

    #[cfg(feature = "auto_register")]
    #[test]
    fn plain_serde_json_uses_the_global_catalog() {
        let json = r#"{"id": 4, "key": "g", "list": [], "p3": "auto"}"#;
        let back: Box<dyn NeedsResolving> = serde_json::from_str(json).unwrap();
        assert_eq!(back.label(), "Class3:auto");
    }

    #[resolvable]
    trait Solo {
        fn value(&self) -> i32;
    }

    #[derive(Shape, Default)]
    #[shape(implements(Solo))]
    struct OnlyOne {
        value: i32,
    }

    impl Solo for OnlyOne {
        fn value(&self) -> i32 {
            self.value
        }
    }

    #[test]
    fn sole_candidate_decodes_without_name_matching() {
        let mut catalog = TypeCatalog::new();
        catalog.register::<OnlyOne>();
        let codec = Codec::compact().with_catalog(Arc::new(catalog));
        // None of these names match; the sole implementer still wins.
        let back: Box<dyn Solo> = codec
            .from_str(r#"{"Value": 12, "unrelated": {"deep": []}}"#)
            .unwrap();
        assert_eq!(back.value(), 12);
    }

    #[test]
    fn empty_catalog_is_a_loud_decode_error() {
        let codec = Codec::compact().with_catalog(Arc::new(TypeCatalog::new()));
        // `Box<dyn Solo>` has no `Debug`, so take the error side by hand.
        let error = codec
            .from_str::<Box<dyn Solo>>(r#"{"value": 1}"#)
            .err()
            .unwrap();
        assert!(error.to_string().contains("no types are registered"));
    }

    #[test]
    fn compact_and_formatted_presets_differ_only_in_layout() {
        let compact = Codec::compact().with_catalog(fixture_catalog());
        let formatted = Codec::formatted().with_catalog(fixture_catalog());
        let value = holder();
        let flat = compact.to_string(&value).unwrap();
        let pretty = formatted.to_string(&value).unwrap();
        assert!(!flat.contains('\n'));
        assert!(pretty.contains('\n'));
        // The byte entry points follow the same layout as the string ones.
        assert_eq!(compact.to_vec(&value).unwrap(), flat.as_bytes());
        assert_eq!(formatted.to_vec(&value).unwrap(), pretty.as_bytes());
        let left: serde_json::Value = serde_json::from_str(&flat).unwrap();
        let right: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(left, right);
    }

    #[derive(Shape, Default, Debug)]
    struct Node {
        name: String,
        next: Option<Shared<Node>>,
    }

    fn cycle() -> Shared<Node> {
        let a = Shared::new(Node {
            name: "a".into(),
            next: None,
        });
        let b = Shared::new(Node {
            name: "b".into(),
            next: Some(a.clone()),
        });
        a.borrow_mut().next = Some(b);
        a
    }

    #[test]
    fn preserved_cycle_round_trips_with_one_body_per_instance() {
        let codec = Codec::compact().preserve_references();
        let json = codec.to_string(&cycle()).unwrap();
        assert_eq!(json.matches("\"$id\"").count(), 2);
        assert_eq!(json.matches("\"$ref\"").count(), 1);

        let back: Shared<Node> = codec.from_str(&json).unwrap();
        assert_eq!(back.borrow().name, "a");
        let b = back.borrow().next.clone().unwrap();
        assert_eq!(b.borrow().name, "b");
        let a_again = b.borrow().next.clone().unwrap();
        assert!(a_again.ptr_eq(&back));

        // Mutation through one handle is visible through the other.
        a_again.borrow_mut().name = "renamed".into();
        assert_eq!(back.borrow().name, "renamed");
    }

    #[test]
    fn shared_aliases_write_plain_bodies_without_preservation() {
        let node = Shared::new(Node {
            name: "n".into(),
            next: None,
        });
        let pair = vec![node.clone(), node];
        let json = Codec::compact().to_string(&pair).unwrap();
        assert!(!json.contains("$id"));
        assert_eq!(json.matches("\"name\"").count(), 2);
    }

    #[test]
    fn cyclic_graph_without_preservation_is_an_encode_error() {
        let error = Codec::compact().to_string(&cycle()).unwrap_err();
        assert!(error.to_string().contains("reference preservation"));
    }

    #[test]
    fn ref_marker_without_preservation_errors() {
        let error = Codec::compact()
            .from_str::<Shared<Node>>(r#"{"$ref": "1"}"#)
            .unwrap_err();
        assert!(error.to_string().contains("reference preservation"));
    }

    #[test]
    fn unknown_ref_id_errors() {
        let error = Codec::compact()
            .preserve_references()
            .from_str::<Shared<Node>>(r#"{"$ref": "9"}"#)
            .unwrap_err();
        assert!(error.to_string().contains("has not been defined"));
    }

    #[test]
    fn property_set_writes_are_sorted_and_stable() {
        #[derive(Shape, Default)]
        struct Wide {
            #[shape(sets("Out"))]
            zeta: i32,
            #[shape(sets("Out"))]
            alpha: i32,
            omitted: i32,
        }

        let codec = Codec::compact().with_property_set("Out");
        let value = Wide {
            zeta: 1,
            alpha: 2,
            omitted: 3,
        };
        let first = codec.to_string(&value).unwrap();
        assert_eq!(first, r#"{"alpha":2,"zeta":1}"#);
        assert_eq!(codec.to_string(&value).unwrap(), first);
    }
}
