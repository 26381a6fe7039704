//! Object heap
//!
//! Allocation and collection belong to the garbage collector; this heap is the
//! minimal object store the bridge reads from. Objects are never freed, so an
//! [`ObjectRef`] issued here stays valid for the lifetime of the runtime.

use parking_lot::RwLock;
use thiserror::Error;

use rivet_sdk::{ClassId, ObjectRef, Value};

use crate::vm::object::{HeapObject, ObjectBody};

/// Field access errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    /// Field index past the end of the instance
    #[error("Field index {index} out of bounds (object has {count} fields)")]
    FieldOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of fields the object has
        count: usize,
    },

    /// Object is a box, array or throwable
    #[error("Object {0} has no fields")]
    NoFields(ObjectRef),

    /// Reference not issued by this heap
    #[error("Dangling object reference {0}")]
    Dangling(ObjectRef),
}

/// Object store
#[derive(Debug, Default)]
pub struct Heap {
    objects: RwLock<Vec<HeapObject>>,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self, object: HeapObject) -> ObjectRef {
        let mut objects = self.objects.write();
        let index = objects.len() as u32;
        objects.push(object);
        ObjectRef::from_index(index)
    }

    /// Allocate an instance with `field_count` null/zero fields
    pub fn alloc_instance(&self, class_id: ClassId, field_count: usize) -> ObjectRef {
        self.allocate(HeapObject {
            class_id,
            body: ObjectBody::Instance(vec![Value::null(); field_count]),
        })
    }

    /// Allocate a wrapper object holding a primitive value
    pub fn alloc_boxed(&self, class_id: ClassId, value: Value) -> ObjectRef {
        self.allocate(HeapObject {
            class_id,
            body: ObjectBody::Boxed(value),
        })
    }

    /// Allocate a reference array
    pub fn alloc_array(&self, class_id: ClassId, elements: Vec<Option<ObjectRef>>) -> ObjectRef {
        self.allocate(HeapObject {
            class_id,
            body: ObjectBody::Array(elements),
        })
    }

    /// Allocate a throwable with a detail message
    pub fn alloc_throwable(&self, class_id: ClassId, message: impl Into<String>) -> ObjectRef {
        self.allocate(HeapObject {
            class_id,
            body: ObjectBody::Throwable(message.into()),
        })
    }

    /// Runtime class of an object
    pub fn class_of(&self, obj: ObjectRef) -> Option<ClassId> {
        self.objects.read().get(obj.index()).map(|o| o.class_id)
    }

    /// Primitive payload of a wrapper object
    pub fn boxed_value(&self, obj: ObjectRef) -> Option<Value> {
        match self.objects.read().get(obj.index()).map(|o| &o.body) {
            Some(ObjectBody::Boxed(value)) => Some(*value),
            _ => None,
        }
    }

    /// Elements of a reference array
    pub fn array_elements(&self, obj: ObjectRef) -> Option<Vec<Option<ObjectRef>>> {
        match self.objects.read().get(obj.index()).map(|o| &o.body) {
            Some(ObjectBody::Array(elements)) => Some(elements.clone()),
            _ => None,
        }
    }

    /// Detail message of a throwable
    pub fn throwable_message(&self, obj: ObjectRef) -> Option<String> {
        match self.objects.read().get(obj.index()).map(|o| &o.body) {
            Some(ObjectBody::Throwable(message)) => Some(message.clone()),
            _ => None,
        }
    }

    /// Get a field value by index
    pub fn get_field(&self, obj: ObjectRef, index: usize) -> Option<Value> {
        match self.objects.read().get(obj.index()).map(|o| &o.body) {
            Some(ObjectBody::Instance(fields)) => fields.get(index).copied(),
            _ => None,
        }
    }

    /// Set a field value by index
    pub fn set_field(&self, obj: ObjectRef, index: usize, value: Value) -> Result<(), HeapError> {
        let mut objects = self.objects.write();
        match objects.get_mut(obj.index()).map(|o| &mut o.body) {
            Some(ObjectBody::Instance(fields)) => {
                let count = fields.len();
                match fields.get_mut(index) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(HeapError::FieldOutOfBounds { index, count }),
                }
            }
            Some(_) => Err(HeapError::NoFields(obj)),
            None => Err(HeapError::Dangling(obj)),
        }
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Check if nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}
