//! JNI-backed remote environment
//!
//! Class handles are promoted to global references so they survive local
//! frame pops. Object references are tracked per frame; entries of a popped
//! frame are forgotten without deleting them, since the runtime already has.

use super::env::{Arg, ClassRef, FieldRef, MethodRef, ObjRef, RemoteEnv, Ret, ReturnKind};
use crate::error::RemoteFault;
use jni::objects::{
    GlobalRef, JClass, JDoubleArray, JFieldID, JMethodID, JObject, JObjectArray, JString,
};
use jni::signature::{Primitive, ReturnType};
use jni::sys::{jsize, jvalue, JNI_FALSE, JNI_TRUE};
use jni::AttachGuard;
use tracing::trace;

/// Remote environment over an attached JNI thread
pub struct JniEnv<'a> {
    env: AttachGuard<'a>,
    classes: Vec<GlobalRef>,
    fields: Vec<JFieldID>,
    methods: Vec<JMethodID>,
    objects: Vec<Option<JObject<'a>>>,
    frames: Vec<Vec<u32>>,
}

impl<'a> JniEnv<'a> {
    pub fn new(env: AttachGuard<'a>) -> Self {
        Self {
            env,
            classes: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            objects: Vec::new(),
            frames: vec![Vec::new()],
        }
    }

    fn track(&mut self, obj: JObject<'a>) -> Option<ObjRef> {
        if obj.is_null() {
            return None;
        }
        let id = self.objects.len() as u32;
        self.objects.push(Some(obj));
        if let Some(frame) = self.frames.last_mut() {
            frame.push(id);
        }
        Some(ObjRef::from_index(id))
    }

    /// Borrow-free alias of a tracked reference
    fn raw(&self, obj: ObjRef) -> Option<jni::sys::jobject> {
        self.objects
            .get(obj.index() as usize)
            .and_then(|o| o.as_ref())
            .map(|o| o.as_raw())
    }

    fn object(&self, obj: ObjRef) -> Option<JObject<'a>> {
        // SAFETY: the raw pointer is a live local reference owned by this
        // frame; the alias carries no destructor.
        self.raw(obj).map(|raw| unsafe { JObject::from_raw(raw) })
    }

    fn class(&self, class: ClassRef) -> Option<JClass<'a>> {
        let global = self.classes.get(class.index() as usize)?;
        // SAFETY: global references stay valid until the cache is dropped.
        Some(unsafe { JClass::from_raw(global.as_obj().as_raw()) })
    }

    fn clear_pending(&mut self) {
        if self.env.exception_check().unwrap_or(false) {
            let _ = self.env.exception_clear();
        }
    }

    fn to_jvalues(&self, args: &[Arg]) -> Option<Vec<jvalue>> {
        args.iter()
            .map(|arg| {
                Some(match *arg {
                    Arg::Object(obj) => jvalue { l: self.raw(obj)? },
                    Arg::Null => jvalue { l: std::ptr::null_mut() },
                    Arg::Bool(b) => jvalue { z: if b { JNI_TRUE } else { JNI_FALSE } },
                    Arg::Int(i) => jvalue { i },
                    Arg::Double(d) => jvalue { d },
                })
            })
            .collect()
    }
}

impl<'a> RemoteEnv for JniEnv<'a> {
    fn find_class(&mut self, name: &str) -> Option<ClassRef> {
        let local = match self.env.find_class(name) {
            Ok(class) => class,
            Err(_) => {
                self.clear_pending();
                return None;
            }
        };
        let global = self.env.new_global_ref(&local).ok();
        let _ = self.env.delete_local_ref(local);
        let id = self.classes.len() as u32;
        self.classes.push(global?);
        Some(ClassRef::from_index(id))
    }

    fn field_id(&mut self, class: ClassRef, name: &str, signature: &str) -> Option<FieldRef> {
        let class = self.class(class)?;
        match self.env.get_field_id(&class, name, signature) {
            Ok(id) => {
                self.fields.push(id);
                Some(FieldRef::from_index(self.fields.len() as u32 - 1))
            }
            Err(_) => {
                self.clear_pending();
                None
            }
        }
    }

    fn method_id(&mut self, class: ClassRef, name: &str, signature: &str) -> Option<MethodRef> {
        let class = self.class(class)?;
        match self.env.get_method_id(&class, name, signature) {
            Ok(id) => {
                self.methods.push(id);
                Some(MethodRef::from_index(self.methods.len() as u32 - 1))
            }
            Err(_) => {
                self.clear_pending();
                None
            }
        }
    }

    fn push_frame(&mut self, capacity: usize) -> bool {
        if self.env.push_local_frame(capacity as i32).is_err() {
            return false;
        }
        self.frames.push(Vec::new());
        true
    }

    fn pop_frame(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        if let Some(frame) = self.frames.pop() {
            for id in frame {
                self.objects[id as usize] = None;
            }
        }
        // SAFETY: every reference created in this frame has been forgotten above.
        unsafe {
            let _ = self.env.pop_local_frame(&JObject::null());
        }
    }

    fn new_string(&mut self, text: &str) -> Option<ObjRef> {
        let string = self.env.new_string(text).ok()?;
        self.track(JObject::from(string))
    }

    fn new_double_array(&mut self, values: &[f64]) -> Option<ObjRef> {
        let array = self.env.new_double_array(values.len() as jsize).ok()?;
        if self.env.set_double_array_region(&array, 0, values).is_err() {
            let _ = self.env.delete_local_ref(array);
            return None;
        }
        self.track(JObject::from(array))
    }

    fn new_object_array(&mut self, element: ClassRef, len: usize) -> Option<ObjRef> {
        let class = self.class(element)?;
        let array = self.env.new_object_array(len as jsize, &class, JObject::null()).ok()?;
        self.track(JObject::from(array))
    }

    fn set_array_element(&mut self, array: ObjRef, index: usize, value: ObjRef) -> bool {
        let (Some(array), Some(value)) = (self.raw(array), self.object(value)) else {
            return false;
        };
        // SAFETY: `array` is a live local reference to an object array.
        let array = unsafe { JObjectArray::from_raw(array) };
        self.env.set_object_array_element(&array, index as jsize, value).is_ok()
    }

    fn new_object(&mut self, class: ClassRef, ctor: MethodRef, args: &[Arg]) -> Option<ObjRef> {
        let class = self.class(class)?;
        let ctor = *self.methods.get(ctor.index() as usize)?;
        let args = self.to_jvalues(args)?;
        // SAFETY: the constructor id was resolved against `class` with the
        // signature the arguments were built for.
        let obj = unsafe { self.env.new_object_unchecked(&class, ctor, &args) }.ok()?;
        self.track(obj)
    }

    fn call_method(
        &mut self,
        target: ObjRef,
        method: MethodRef,
        ret: ReturnKind,
        args: &[Arg],
    ) -> Result<Ret, RemoteFault> {
        let target = self
            .object(target)
            .ok_or_else(|| RemoteFault::new("stale runner reference"))?;
        let method = *self
            .methods
            .get(method.index() as usize)
            .ok_or_else(|| RemoteFault::new("unresolved method"))?;
        let args = self
            .to_jvalues(args)
            .ok_or_else(|| RemoteFault::new("stale argument reference"))?;
        let return_type = match ret {
            ReturnKind::Object => ReturnType::Object,
            ReturnKind::Bool => ReturnType::Primitive(Primitive::Boolean),
            ReturnKind::Int => ReturnType::Primitive(Primitive::Int),
            ReturnKind::Void => ReturnType::Primitive(Primitive::Void),
        };

        // SAFETY: the method id and argument list match the resolved signature.
        let value = unsafe { self.env.call_method_unchecked(&target, method, return_type, &args) };
        let value = match value {
            Ok(value) => value,
            Err(_) => {
                return Err(self
                    .take_fault()
                    .unwrap_or_else(|| RemoteFault::new("remote call failed")))
            }
        };

        let ret = match ret {
            ReturnKind::Object => {
                let obj = value.l().map_err(|e| RemoteFault::new(e.to_string()))?;
                Ret::Object(self.track(obj))
            }
            ReturnKind::Bool => Ret::Bool(value.z().map_err(|e| RemoteFault::new(e.to_string()))?),
            ReturnKind::Int => Ret::Int(value.i().map_err(|e| RemoteFault::new(e.to_string()))?),
            ReturnKind::Void => Ret::Void,
        };
        Ok(ret)
    }

    fn take_fault(&mut self) -> Option<RemoteFault> {
        if !self.env.exception_check().unwrap_or(false) {
            return None;
        }
        let throwable = self.env.exception_occurred().ok();
        let _ = self.env.exception_describe();
        let _ = self.env.exception_clear();

        let description = throwable.and_then(|throwable| {
            let text = self
                .env
                .call_method(&throwable, "toString", "()Ljava/lang/String;", &[])
                .and_then(|v| v.l())
                .ok();
            let _ = self.env.delete_local_ref(throwable);
            let text = JString::from(text?);
            let description = self.env.get_string(&text).ok().map(String::from);
            let _ = self.env.delete_local_ref(text);
            description
        });
        self.clear_pending();
        trace!(?description, "exception described and cleared");
        Some(RemoteFault::new(
            description.unwrap_or_else(|| "unknown Java exception".to_string()),
        ))
    }

    fn is_instance_of(&mut self, obj: ObjRef, class: ClassRef) -> bool {
        match (self.object(obj), self.class(class)) {
            (Some(obj), Some(class)) => self.env.is_instance_of(&obj, &class).unwrap_or(false),
            _ => false,
        }
    }

    fn object_field(&mut self, obj: ObjRef, field: FieldRef) -> Option<ObjRef> {
        let obj = self.object(obj)?;
        let field = *self.fields.get(field.index() as usize)?;
        // SAFETY: the field id was resolved with an object signature.
        let value = unsafe { self.env.get_field_unchecked(&obj, field, ReturnType::Object) };
        match value.and_then(|v| v.l()) {
            Ok(value) => self.track(value),
            Err(_) => {
                self.clear_pending();
                None
            }
        }
    }

    fn double_field(&mut self, obj: ObjRef, field: FieldRef) -> Option<f64> {
        let obj = self.object(obj)?;
        let field = *self.fields.get(field.index() as usize)?;
        let double = ReturnType::Primitive(Primitive::Double);
        // SAFETY: the field id was resolved with the `D` signature.
        let value = unsafe { self.env.get_field_unchecked(&obj, field, double) };
        match value.and_then(|v| v.d()) {
            Ok(value) => Some(value),
            Err(_) => {
                self.clear_pending();
                None
            }
        }
    }

    fn string_value(&mut self, obj: ObjRef) -> Option<String> {
        let raw = self.raw(obj)?;
        // SAFETY: callers check the instance against java/lang/String first.
        let string = unsafe { JString::from_raw(raw) };
        self.env.get_string(&string).ok().map(String::from)
    }

    fn double_array_value(&mut self, obj: ObjRef) -> Option<Vec<f64>> {
        let raw = self.raw(obj)?;
        // SAFETY: callers check the instance against `[D` first.
        let array = unsafe { JDoubleArray::from_raw(raw) };
        let len = self.env.get_array_length(&array).ok()?;
        let mut values = vec![0.0; len.max(0) as usize];
        self.env.get_double_array_region(&array, 0, &mut values).ok()?;
        Some(values)
    }

    fn array_length(&mut self, array: ObjRef) -> Option<usize> {
        let raw = self.raw(array)?;
        // SAFETY: callers check the instance against an array class first.
        let array = unsafe { JObjectArray::from_raw(raw) };
        self.env.get_array_length(&array).ok().map(|n| n.max(0) as usize)
    }

    fn array_element(&mut self, array: ObjRef, index: usize) -> Option<ObjRef> {
        let raw = self.raw(array)?;
        // SAFETY: callers check the instance against `[Ljava/lang/Object;` first.
        let array = unsafe { JObjectArray::from_raw(raw) };
        match self.env.get_object_array_element(&array, index as jsize) {
            Ok(element) => self.track(element),
            Err(_) => {
                self.clear_pending();
                None
            }
        }
    }

    fn release(&mut self, obj: ObjRef) {
        if let Some(slot) = self.objects.get_mut(obj.index() as usize) {
            if let Some(local) = slot.take() {
                let _ = self.env.delete_local_ref(local);
            }
        }
    }
}
