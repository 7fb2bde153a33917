#![forbid(unsafe_code)]

//! Type-erased values and batched buffers.
//!
//! Values are stored as `Box<dyn Any + Send + Sync>`; everything that needs to
//! know the concrete element type (copying, destroying, printing, building
//! arrays) goes through the [`CppType`] capability of the value's
//! [`BaseType`].

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Mul, Neg, Sub};

use crate::data_type::{BaseType, DataType};

pub type AnyBox = Box<dyn Any + Send + Sync>;
pub type AnyRef<'a> = &'a (dyn Any + Send + Sync);

/// Element types that can flow through a network.
pub trait MfValue: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const BASE_TYPE: BaseType;

    fn format(&self) -> String {
        format!("{self:?}")
    }
}

impl MfValue for i32 {
    const BASE_TYPE: BaseType = BaseType::Int32;
}

impl MfValue for f32 {
    const BASE_TYPE: BaseType = BaseType::Float;
}

impl MfValue for bool {
    const BASE_TYPE: BaseType = BaseType::Bool;
}

impl MfValue for String {
    const BASE_TYPE: BaseType = BaseType::String;
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Float3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Float3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Float3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }
}

impl Add for Float3 {
    type Output = Float3;

    fn add(self, rhs: Float3) -> Float3 {
        Float3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Float3 {
    type Output = Float3;

    fn sub(self, rhs: Float3) -> Float3 {
        Float3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Float3 {
    type Output = Float3;

    fn mul(self, rhs: f32) -> Float3 {
        Float3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Float3 {
    type Output = Float3;

    fn neg(self) -> Float3 {
        Float3::new(-self.x, -self.y, -self.z)
    }
}

impl MfValue for Float3 {
    const BASE_TYPE: BaseType = BaseType::Float3;

    fn format(&self) -> String {
        format!("({:?}, {:?}, {:?})", self.x, self.y, self.z)
    }
}

/// Runtime capability describing how to handle values of one element type
/// without knowing it statically.
///
/// Methods taking `AnyRef` return `None` when the argument is not of this
/// type.
pub trait CppType: fmt::Debug + Send + Sync {
    fn base_type(&self) -> BaseType;
    fn name(&self) -> &'static str {
        self.base_type().name()
    }
    fn size(&self) -> usize;
    fn alignment(&self) -> usize;

    fn default_construct(&self) -> AnyBox;
    fn copy_construct(&self, src: AnyRef<'_>) -> Option<AnyBox>;
    /// Takes ownership of `src`; hands it back unchanged on a type mismatch.
    fn move_construct(&self, src: AnyBox) -> Result<AnyBox, AnyBox>;
    /// Drops a value through its concrete type. Values of another type are
    /// handed back.
    fn destruct(&self, value: AnyBox) -> Result<(), AnyBox>;
    fn format_value(&self, value: AnyRef<'_>) -> Option<String>;

    /// `Vec<T>` of `size` copies of `value`.
    fn fill_array(&self, value: AnyRef<'_>, size: usize) -> Option<AnyBox>;
    /// `Vec<T>` of `size` default values.
    fn default_array(&self, size: usize) -> AnyBox;
    fn copy_array(&self, array: AnyRef<'_>) -> Option<AnyBox>;
    fn array_len(&self, array: AnyRef<'_>) -> Option<usize>;
    fn format_array_element(&self, array: AnyRef<'_>, index: usize) -> Option<String>;

    /// `Vec<Vec<T>>` of `size` empty lists.
    fn default_vector_array(&self, size: usize) -> AnyBox;
    fn copy_vector_array(&self, array: AnyRef<'_>) -> Option<AnyBox>;
    fn vector_array_len(&self, array: AnyRef<'_>) -> Option<usize>;
    fn format_vector_array_element(&self, array: AnyRef<'_>, index: usize) -> Option<String>;
}

pub struct TypeInfo<T>(PhantomData<fn() -> T>);

impl<T> TypeInfo<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: MfValue> fmt::Debug for TypeInfo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeInfo<{}>", T::BASE_TYPE.name())
    }
}

pub(crate) static INT32: TypeInfo<i32> = TypeInfo::new();
pub(crate) static FLOAT: TypeInfo<f32> = TypeInfo::new();
pub(crate) static BOOL: TypeInfo<bool> = TypeInfo::new();
pub(crate) static STRING: TypeInfo<String> = TypeInfo::new();
pub(crate) static FLOAT3: TypeInfo<Float3> = TypeInfo::new();

impl<T: MfValue> CppType for TypeInfo<T> {
    fn base_type(&self) -> BaseType {
        T::BASE_TYPE
    }

    fn size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn alignment(&self) -> usize {
        std::mem::align_of::<T>()
    }

    fn default_construct(&self) -> AnyBox {
        Box::new(T::default())
    }

    fn copy_construct(&self, src: AnyRef<'_>) -> Option<AnyBox> {
        src.downcast_ref::<T>().map(|v| Box::new(v.clone()) as AnyBox)
    }

    fn move_construct(&self, src: AnyBox) -> Result<AnyBox, AnyBox> {
        src.downcast::<T>().map(|v| v as AnyBox)
    }

    fn destruct(&self, value: AnyBox) -> Result<(), AnyBox> {
        value.downcast::<T>().map(drop)
    }

    fn format_value(&self, value: AnyRef<'_>) -> Option<String> {
        value.downcast_ref::<T>().map(MfValue::format)
    }

    fn fill_array(&self, value: AnyRef<'_>, size: usize) -> Option<AnyBox> {
        let value = value.downcast_ref::<T>()?;
        Some(Box::new(vec![value.clone(); size]))
    }

    fn default_array(&self, size: usize) -> AnyBox {
        Box::new(vec![T::default(); size])
    }

    fn copy_array(&self, array: AnyRef<'_>) -> Option<AnyBox> {
        array
            .downcast_ref::<Vec<T>>()
            .map(|v| Box::new(v.clone()) as AnyBox)
    }

    fn array_len(&self, array: AnyRef<'_>) -> Option<usize> {
        array.downcast_ref::<Vec<T>>().map(Vec::len)
    }

    fn format_array_element(&self, array: AnyRef<'_>, index: usize) -> Option<String> {
        array
            .downcast_ref::<Vec<T>>()
            .and_then(|v| v.get(index))
            .map(MfValue::format)
    }

    fn default_vector_array(&self, size: usize) -> AnyBox {
        Box::new(vec![Vec::<T>::new(); size])
    }

    fn copy_vector_array(&self, array: AnyRef<'_>) -> Option<AnyBox> {
        array
            .downcast_ref::<Vec<Vec<T>>>()
            .map(|v| Box::new(v.clone()) as AnyBox)
    }

    fn vector_array_len(&self, array: AnyRef<'_>) -> Option<usize> {
        array.downcast_ref::<Vec<Vec<T>>>().map(Vec::len)
    }

    fn format_vector_array_element(&self, array: AnyRef<'_>, index: usize) -> Option<String> {
        let list = array.downcast_ref::<Vec<Vec<T>>>()?.get(index)?;
        let items: Vec<String> = list.iter().map(MfValue::format).collect();
        Some(format!("[{}]", items.join(", ")))
    }
}

/// One owned value of a runtime-known element type.
pub struct GenericValue {
    ty: &'static dyn CppType,
    data: Option<AnyBox>,
}

impl GenericValue {
    pub fn new<T: MfValue>(value: T) -> Self {
        Self {
            ty: T::BASE_TYPE.cpp_type(),
            data: Some(Box::new(value)),
        }
    }

    /// Copy-constructs a value of type `ty` from `src`.
    pub fn copy_from(ty: &'static dyn CppType, src: AnyRef<'_>) -> Option<Self> {
        let data = ty.copy_construct(src)?;
        Some(Self {
            ty,
            data: Some(data),
        })
    }

    /// Takes ownership of `src`, which must hold a value of type `ty`.
    pub fn from_box(ty: &'static dyn CppType, src: AnyBox) -> Result<Self, AnyBox> {
        let data = ty.move_construct(src)?;
        Ok(Self {
            ty,
            data: Some(data),
        })
    }

    pub fn cpp_type(&self) -> &'static dyn CppType {
        self.ty
    }

    pub fn data_type(&self) -> DataType {
        DataType::Single(self.ty.base_type())
    }

    pub fn get<T: MfValue>(&self) -> Option<&T> {
        self.data.as_deref()?.downcast_ref::<T>()
    }

    pub fn as_any(&self) -> Option<AnyRef<'_>> {
        self.data.as_deref()
    }
}

impl Clone for GenericValue {
    fn clone(&self) -> Self {
        // `data` always holds a `ty` value, so the copy cannot fail.
        let data = self
            .data
            .as_deref()
            .and_then(|d| self.ty.copy_construct(d))
            .unwrap_or_else(|| self.ty.default_construct());
        Self {
            ty: self.ty,
            data: Some(data),
        }
    }
}

impl Drop for GenericValue {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            // A mismatched box is simply dropped as-is.
            let _ = self.ty.destruct(data);
        }
    }
}

impl fmt::Debug for GenericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.ty.name(), self)
    }
}

impl fmt::Display for GenericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .data
            .as_deref()
            .and_then(|d| self.ty.format_value(d))
            .unwrap_or_else(|| "<invalid>".to_string());
        f.write_str(&text)
    }
}

/// A batch of values: `Vec<T>` for single data types, `Vec<Vec<T>>` for
/// vector data types.
pub struct GenericArray {
    data_type: DataType,
    data: AnyBox,
}

impl GenericArray {
    pub fn from_vec<T: MfValue>(values: Vec<T>) -> Self {
        Self {
            data_type: DataType::single::<T>(),
            data: Box::new(values),
        }
    }

    pub fn from_vector_vec<T: MfValue>(lists: Vec<Vec<T>>) -> Self {
        Self {
            data_type: DataType::vector::<T>(),
            data: Box::new(lists),
        }
    }

    /// `size` copies of a single value.
    pub fn filled(value: &GenericValue, size: usize) -> Self {
        let ty = value.cpp_type();
        let data = value
            .as_any()
            .and_then(|v| ty.fill_array(v, size))
            .unwrap_or_else(|| ty.default_array(size));
        Self {
            data_type: value.data_type(),
            data,
        }
    }

    pub fn default_for(data_type: DataType, size: usize) -> Self {
        let ty = data_type.cpp_type();
        let data = match data_type {
            DataType::Single(_) => ty.default_array(size),
            DataType::Vector(_) => ty.default_vector_array(size),
        };
        Self { data_type, data }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn len(&self) -> usize {
        let ty = self.data_type.cpp_type();
        let len = match self.data_type {
            DataType::Single(_) => ty.array_len(&*self.data),
            DataType::Vector(_) => ty.vector_array_len(&*self.data),
        };
        len.unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice<T: MfValue>(&self) -> Option<&[T]> {
        self.data.downcast_ref::<Vec<T>>().map(Vec::as_slice)
    }

    pub fn as_vector_slice<T: MfValue>(&self) -> Option<&[Vec<T>]> {
        self.data.downcast_ref::<Vec<Vec<T>>>().map(Vec::as_slice)
    }

    pub fn as_mut_vec<T: MfValue>(&mut self) -> Option<&mut Vec<T>> {
        self.data.downcast_mut::<Vec<T>>()
    }

    pub fn as_mut_vector_vec<T: MfValue>(&mut self) -> Option<&mut Vec<Vec<T>>> {
        self.data.downcast_mut::<Vec<Vec<T>>>()
    }

    pub fn into_vec<T: MfValue>(self) -> Option<Vec<T>> {
        self.data.downcast::<Vec<T>>().ok().map(|b| *b)
    }

    pub fn into_vector_vec<T: MfValue>(self) -> Option<Vec<Vec<T>>> {
        self.data.downcast::<Vec<Vec<T>>>().ok().map(|b| *b)
    }

    pub fn format_element(&self, index: usize) -> String {
        let ty = self.data_type.cpp_type();
        let text = match self.data_type {
            DataType::Single(_) => ty.format_array_element(&*self.data, index),
            DataType::Vector(_) => ty.format_vector_array_element(&*self.data, index),
        };
        text.unwrap_or_else(|| "<out of range>".to_string())
    }
}

impl Clone for GenericArray {
    fn clone(&self) -> Self {
        let ty = self.data_type.cpp_type();
        let copy = match self.data_type {
            DataType::Single(_) => ty.copy_array(&*self.data),
            DataType::Vector(_) => ty.copy_vector_array(&*self.data),
        };
        // `data` always matches `data_type`; the fallback is unreachable.
        let len = self.len();
        let data = copy.unwrap_or_else(|| match self.data_type {
            DataType::Single(_) => ty.default_array(len),
            DataType::Vector(_) => ty.default_vector_array(len),
        });
        Self {
            data_type: self.data_type,
            data,
        }
    }
}

impl fmt::Debug for GenericArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = (0..self.len()).map(|i| self.format_element(i)).collect();
        write!(f, "{}[{}]", self.data_type, items.join(", "))
    }
}
