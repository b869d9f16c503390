// parlor-core/src/state/class.rs
// ============================================================================
// Module: Class Table
// Description: Runtime class descriptors built from the schema DSL.
// Purpose: Construct instances with fixed field sets and primitive defaults.
// Dependencies: crate::{core, state::value}, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The class table is the runtime form of a schema: one descriptor per
//! declared class, recording each field's kind. Construction happens in two
//! passes (declare all names, then resolve field references) so classes can
//! reference one another in any order. Descriptors drive both instance
//! construction and the path resolver's record-vs-collection dispatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::ClassName;
use crate::core::schema::ElementType;
use crate::core::schema::FieldType;
use crate::core::schema::PrimitiveType;
use crate::core::schema::SchemaSpec;
use crate::state::value::Instance;
use crate::state::value::StateValue;

// ============================================================================
// SECTION: Field Kinds
// ============================================================================

/// Resolved array element kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// Primitive elements.
    Primitive(PrimitiveType),
    /// Instances of a declared class.
    Class(ClassName),
}

/// Resolved field kind recorded in a class descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Primitive scalar slot.
    Primitive(PrimitiveType),
    /// Single nested instance slot.
    Ref(ClassName),
    /// Keyed collection of instances.
    Map(ClassName),
    /// Ordered collection of instances or primitives.
    Array(ElementKind),
}

// ============================================================================
// SECTION: Class Descriptors
// ============================================================================

/// Runtime descriptor for one declared class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Declared class name.
    name: ClassName,
    /// Declared fields and their resolved kinds.
    fields: BTreeMap<String, FieldKind>,
}

impl ClassDescriptor {
    /// Returns the class name.
    #[must_use]
    pub const fn name(&self) -> &ClassName {
        &self.name
    }

    /// Returns the declared fields in order.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, FieldKind> {
        &self.fields
    }

    /// Returns a declared field's kind.
    #[must_use]
    pub fn field_kind(&self, field: &str) -> Option<&FieldKind> {
        self.fields.get(field)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema resolution errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Root class is not declared.
    #[error("schema root class is not declared: {0}")]
    UnknownRootClass(String),
    /// A field references an undeclared class.
    #[error("class `{class}` field `{field}` references undeclared class: {referenced}")]
    UnknownFieldClass {
        /// Declaring class.
        class: String,
        /// Declaring field.
        field: String,
        /// Missing referenced class.
        referenced: String,
    },
    /// An instantiation request named an undeclared class.
    #[error("cannot instantiate undeclared class: {0}")]
    UnknownClass(String),
}

// ============================================================================
// SECTION: Class Table
// ============================================================================

/// Runtime class table for one definition.
#[derive(Debug, Clone)]
pub struct ClassTable {
    /// Root class instantiated as the room state.
    root: ClassName,
    /// Descriptors keyed by class name.
    classes: BTreeMap<ClassName, ClassDescriptor>,
    /// Primitive defaults per class.
    defaults: BTreeMap<ClassName, BTreeMap<String, Value>>,
}

impl ClassTable {
    /// Builds a class table from a schema.
    ///
    /// Runs two passes: declare every class name, then resolve every field
    /// type against the declared set so forward references work.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the root or a referenced class is not
    /// declared.
    pub fn build(schema: &SchemaSpec) -> Result<Self, SchemaError> {
        let declared: BTreeSet<&ClassName> = schema.classes.keys().collect();
        if !declared.contains(&schema.root) {
            return Err(SchemaError::UnknownRootClass(schema.root.to_string()));
        }

        let mut classes = BTreeMap::new();
        for (class_name, field_specs) in &schema.classes {
            let mut fields = BTreeMap::new();
            for (field_name, field_type) in field_specs {
                let kind = resolve_field(&declared, class_name, field_name, field_type)?;
                fields.insert(field_name.clone(), kind);
            }
            classes.insert(
                class_name.clone(),
                ClassDescriptor {
                    name: class_name.clone(),
                    fields,
                },
            );
        }

        Ok(Self {
            root: schema.root.clone(),
            classes,
            defaults: schema.defaults.clone(),
        })
    }

    /// Returns the root class name.
    #[must_use]
    pub const fn root(&self) -> &ClassName {
        &self.root
    }

    /// Returns a class descriptor.
    #[must_use]
    pub fn descriptor(&self, class: &ClassName) -> Option<&ClassDescriptor> {
        self.classes.get(class)
    }

    /// Returns true when the class is declared.
    #[must_use]
    pub fn contains(&self, class: &ClassName) -> bool {
        self.classes.contains_key(class)
    }

    /// Constructs a fresh instance of a declared class.
    ///
    /// Collections start empty, scalars and refs start unset, and primitive
    /// defaults declared for the class are applied.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownClass`] for undeclared class names.
    pub fn new_instance(&self, class: &ClassName) -> Result<Instance, SchemaError> {
        let descriptor = self
            .classes
            .get(class)
            .ok_or_else(|| SchemaError::UnknownClass(class.to_string()))?;

        let mut fields = BTreeMap::new();
        for (field_name, kind) in &descriptor.fields {
            let initial = match kind {
                FieldKind::Map(_) => StateValue::empty_map(),
                FieldKind::Array(_) => StateValue::Array(Vec::new()),
                FieldKind::Primitive(_) | FieldKind::Ref(_) => StateValue::Null,
            };
            fields.insert(field_name.clone(), initial);
        }

        let mut instance = Instance::new(class.clone(), fields);
        if let Some(class_defaults) = self.defaults.get(class) {
            for (field_name, default) in class_defaults {
                if matches!(descriptor.field_kind(field_name), Some(FieldKind::Primitive(_))) {
                    let _ = instance.assign(field_name, StateValue::from_json(default));
                }
            }
        }
        Ok(instance)
    }

    /// Instantiates the root class with its primitive defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the root class is somehow undeclared
    /// (prevented by [`ClassTable::build`]).
    pub fn instantiate_with_defaults(&self) -> Result<Instance, SchemaError> {
        let root = self.root.clone();
        self.new_instance(&root)
    }
}

// ============================================================================
// SECTION: Resolution Helpers
// ============================================================================

/// Resolves one field declaration against the declared class set.
fn resolve_field(
    declared: &BTreeSet<&ClassName>,
    class_name: &ClassName,
    field_name: &str,
    field_type: &FieldType,
) -> Result<FieldKind, SchemaError> {
    let check = |referenced: &ClassName| -> Result<(), SchemaError> {
        if declared.contains(referenced) {
            Ok(())
        } else {
            Err(SchemaError::UnknownFieldClass {
                class: class_name.to_string(),
                field: field_name.to_string(),
                referenced: referenced.to_string(),
            })
        }
    };

    match field_type {
        FieldType::Primitive {
            kind,
        } => Ok(FieldKind::Primitive(*kind)),
        FieldType::Ref {
            class,
        } => {
            check(class)?;
            Ok(FieldKind::Ref(class.clone()))
        }
        FieldType::Map {
            map,
        } => {
            check(map)?;
            Ok(FieldKind::Map(map.clone()))
        }
        FieldType::Array {
            array,
        } => match array {
            ElementType::Primitive(primitive) => {
                Ok(FieldKind::Array(ElementKind::Primitive(*primitive)))
            }
            ElementType::Class(class) => {
                check(class)?;
                Ok(FieldKind::Array(ElementKind::Class(class.clone())))
            }
        },
    }
}
