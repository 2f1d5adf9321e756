//! Remote environment - the managed runtime's native calling surface
//!
//! Handles are opaque indices into tables owned by the environment. A handle
//! is only meaningful to the environment that issued it and only for the
//! operation in which it was issued.

use crate::error::{BridgeError, RemoteFault};

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_index(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            pub const fn index(self) -> u32 {
                self.0
            }
        }
    };
}

handle_type!(
    /// Resolved remote class
    ClassRef
);
handle_type!(
    /// Resolved remote field
    FieldRef
);
handle_type!(
    /// Resolved remote method or constructor
    MethodRef
);
handle_type!(
    /// Reference to a remote object, valid within the current local frame
    ObjRef
);

/// Argument in the runtime's calling convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg {
    Object(ObjRef),
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
}

impl From<Option<ObjRef>> for Arg {
    fn from(obj: Option<ObjRef>) -> Self {
        obj.map_or(Arg::Null, Arg::Object)
    }
}

/// Declared return kind of a remote method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Object,
    Bool,
    Int,
    Void,
}

/// Value returned by a remote method
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ret {
    Object(Option<ObjRef>),
    Bool(bool),
    Int(i32),
    Void,
}

impl Ret {
    pub fn object(self) -> Option<ObjRef> {
        match self {
            Ret::Object(obj) => obj,
            _ => None,
        }
    }

    pub fn int(self) -> Option<i32> {
        match self {
            Ret::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn boolean(self) -> Option<bool> {
        match self {
            Ret::Bool(v) => Some(v),
            _ => None,
        }
    }
}

/// Native calling surface of the managed runtime
///
/// Lookups return `None` when the symbol does not exist. Allocation and
/// construction return `None` when the runtime produced no instance; any
/// exception raised while doing so stays pending until `take_fault`.
pub trait RemoteEnv {
    fn find_class(&mut self, name: &str) -> Option<ClassRef>;
    fn field_id(&mut self, class: ClassRef, name: &str, signature: &str) -> Option<FieldRef>;
    fn method_id(&mut self, class: ClassRef, name: &str, signature: &str) -> Option<MethodRef>;

    /// Open a local frame; references created until `pop_frame` die with it
    fn push_frame(&mut self, capacity: usize) -> bool;
    fn pop_frame(&mut self);

    fn new_string(&mut self, text: &str) -> Option<ObjRef>;
    fn new_double_array(&mut self, values: &[f64]) -> Option<ObjRef>;
    fn new_object_array(&mut self, element: ClassRef, len: usize) -> Option<ObjRef>;
    fn set_array_element(&mut self, array: ObjRef, index: usize, value: ObjRef) -> bool;
    fn new_object(&mut self, class: ClassRef, ctor: MethodRef, args: &[Arg]) -> Option<ObjRef>;

    /// Invoke an instance method
    ///
    /// A raised exception is described to the diagnostic stream, cleared,
    /// and returned as `Err`.
    fn call_method(
        &mut self,
        target: ObjRef,
        method: MethodRef,
        ret: ReturnKind,
        args: &[Arg],
    ) -> Result<Ret, RemoteFault>;

    /// Describe and clear a pending exception, if any
    fn take_fault(&mut self) -> Option<RemoteFault>;

    fn is_instance_of(&mut self, obj: ObjRef, class: ClassRef) -> bool;
    fn object_field(&mut self, obj: ObjRef, field: FieldRef) -> Option<ObjRef>;
    fn double_field(&mut self, obj: ObjRef, field: FieldRef) -> Option<f64>;
    fn string_value(&mut self, obj: ObjRef) -> Option<String>;
    fn double_array_value(&mut self, obj: ObjRef) -> Option<Vec<f64>>;
    fn array_length(&mut self, array: ObjRef) -> Option<usize>;
    fn array_element(&mut self, array: ObjRef, index: usize) -> Option<ObjRef>;

    /// Drop a local reference early
    fn release(&mut self, obj: ObjRef);
}

/// Run `f` inside a local frame, popping it on every path
pub fn with_frame<E, T, F>(env: &mut E, capacity: usize, f: F) -> Result<T, BridgeError>
where
    E: RemoteEnv + ?Sized,
    F: FnOnce(&mut E) -> Result<T, BridgeError>,
{
    if !env.push_frame(capacity) {
        env.take_fault();
        return Err(BridgeError::allocation("local reference frame"));
    }
    let result = f(env);
    env.pop_frame();
    result
}
