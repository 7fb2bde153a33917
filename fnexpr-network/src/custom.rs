#![forbid(unsafe_code)]

//! Multi-functions built from plain Rust closures and values.

use std::marker::PhantomData;

use crate::data_type::DataType;
use crate::error::EvalError;
use crate::multi_function::{MfParams, MfSignature, MultiFunction};
use crate::value::{GenericArray, GenericValue, MfValue};

/// Outputs the same value for every element.
pub struct CustomMfConstant<T> {
    value: T,
    signature: MfSignature,
}

impl<T: MfValue> CustomMfConstant<T> {
    pub fn new(value: T) -> Self {
        let signature = MfSignature::build(format!("Constant {}", value.format()))
            .single_output::<T>("Value")
            .finish();
        Self { value, signature }
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T: MfValue> MultiFunction for CustomMfConstant<T> {
    fn signature(&self) -> &MfSignature {
        &self.signature
    }

    fn call(&self, size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError> {
        params.set_single_output(0, vec![self.value.clone(); size])
    }
}

/// Constant whose element type is only known at runtime.
pub struct CustomMfGenericConstant {
    value: GenericValue,
    signature: MfSignature,
}

impl CustomMfGenericConstant {
    pub fn new(value: GenericValue) -> Self {
        let signature = MfSignature::build(format!("Constant {value}"))
            .output("Value", value.data_type())
            .finish();
        Self { value, signature }
    }

    pub fn value(&self) -> &GenericValue {
        &self.value
    }
}

impl MultiFunction for CustomMfGenericConstant {
    fn signature(&self) -> &MfSignature {
        &self.signature
    }

    fn call(&self, size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError> {
        params.set_output(0, GenericArray::filled(&self.value, size))
    }
}

/// Single input, single output.
pub struct CustomMfSiSo<In, Out, F> {
    f: F,
    signature: MfSignature,
    _types: PhantomData<fn(In) -> Out>,
}

impl<In, Out, F> CustomMfSiSo<In, Out, F>
where
    In: MfValue,
    Out: MfValue,
    F: Fn(&In) -> Out + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        let signature = MfSignature::build(name)
            .single_input::<In>("In1")
            .single_output::<Out>("Out1")
            .finish();
        Self {
            f,
            signature,
            _types: PhantomData,
        }
    }
}

impl<In, Out, F> MultiFunction for CustomMfSiSo<In, Out, F>
where
    In: MfValue,
    Out: MfValue,
    F: Fn(&In) -> Out + Send + Sync,
{
    fn signature(&self) -> &MfSignature {
        &self.signature
    }

    fn call(&self, _size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError> {
        let a = params.readonly_single_input::<In>(0, "In1")?;
        let out = a.iter().map(&self.f).collect();
        params.set_single_output(1, out)
    }
}

/// Two inputs, single output.
pub struct CustomMfSiSiSo<In1, In2, Out, F> {
    f: F,
    signature: MfSignature,
    _types: PhantomData<fn(In1, In2) -> Out>,
}

impl<In1, In2, Out, F> CustomMfSiSiSo<In1, In2, Out, F>
where
    In1: MfValue,
    In2: MfValue,
    Out: MfValue,
    F: Fn(&In1, &In2) -> Out + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        let signature = MfSignature::build(name)
            .single_input::<In1>("In1")
            .single_input::<In2>("In2")
            .single_output::<Out>("Out1")
            .finish();
        Self {
            f,
            signature,
            _types: PhantomData,
        }
    }
}

impl<In1, In2, Out, F> MultiFunction for CustomMfSiSiSo<In1, In2, Out, F>
where
    In1: MfValue,
    In2: MfValue,
    Out: MfValue,
    F: Fn(&In1, &In2) -> Out + Send + Sync,
{
    fn signature(&self) -> &MfSignature {
        &self.signature
    }

    fn call(&self, _size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError> {
        let a = params.readonly_single_input::<In1>(0, "In1")?;
        let b = params.readonly_single_input::<In2>(1, "In2")?;
        let out = a.iter().zip(b).map(|(a, b)| (self.f)(a, b)).collect();
        params.set_single_output(2, out)
    }
}

/// Three inputs, single output.
pub struct CustomMfSiSiSiSo<In1, In2, In3, Out, F> {
    f: F,
    signature: MfSignature,
    _types: PhantomData<fn(In1, In2, In3) -> Out>,
}

impl<In1, In2, In3, Out, F> CustomMfSiSiSiSo<In1, In2, In3, Out, F>
where
    In1: MfValue,
    In2: MfValue,
    In3: MfValue,
    Out: MfValue,
    F: Fn(&In1, &In2, &In3) -> Out + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        let signature = MfSignature::build(name)
            .single_input::<In1>("In1")
            .single_input::<In2>("In2")
            .single_input::<In3>("In3")
            .single_output::<Out>("Out1")
            .finish();
        Self {
            f,
            signature,
            _types: PhantomData,
        }
    }
}

impl<In1, In2, In3, Out, F> MultiFunction for CustomMfSiSiSiSo<In1, In2, In3, Out, F>
where
    In1: MfValue,
    In2: MfValue,
    In3: MfValue,
    Out: MfValue,
    F: Fn(&In1, &In2, &In3) -> Out + Send + Sync,
{
    fn signature(&self) -> &MfSignature {
        &self.signature
    }

    fn call(&self, _size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError> {
        let a = params.readonly_single_input::<In1>(0, "In1")?;
        let b = params.readonly_single_input::<In2>(1, "In2")?;
        let c = params.readonly_single_input::<In3>(2, "In3")?;
        let out = a
            .iter()
            .zip(b)
            .zip(c)
            .map(|((a, b), c)| (self.f)(a, b, c))
            .collect();
        params.set_single_output(3, out)
    }
}

/// A list input reduced to one value per element.
pub struct CustomMfViSo<In, Out, F> {
    f: F,
    signature: MfSignature,
    _types: PhantomData<fn(In) -> Out>,
}

impl<In, Out, F> CustomMfViSo<In, Out, F>
where
    In: MfValue,
    Out: MfValue,
    F: Fn(&[In]) -> Out + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        let signature = MfSignature::build(name)
            .vector_input::<In>("In1")
            .single_output::<Out>("Out1")
            .finish();
        Self {
            f,
            signature,
            _types: PhantomData,
        }
    }
}

impl<In, Out, F> MultiFunction for CustomMfViSo<In, Out, F>
where
    In: MfValue,
    Out: MfValue,
    F: Fn(&[In]) -> Out + Send + Sync,
{
    fn signature(&self) -> &MfSignature {
        &self.signature
    }

    fn call(&self, _size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError> {
        let lists = params.readonly_vector_input::<In>(0, "In1")?;
        let out = lists.iter().map(|l| (self.f)(l)).collect();
        params.set_single_output(1, out)
    }
}

/// Modifies a single value in place.
pub struct CustomMfSm<T, F> {
    f: F,
    signature: MfSignature,
    _types: PhantomData<fn(T)>,
}

impl<T, F> CustomMfSm<T, F>
where
    T: MfValue,
    F: Fn(&mut T) + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        let signature = MfSignature::build(name).single_mutable::<T>("Value").finish();
        Self {
            f,
            signature,
            _types: PhantomData,
        }
    }
}

impl<T, F> MultiFunction for CustomMfSm<T, F>
where
    T: MfValue,
    F: Fn(&mut T) + Send + Sync,
{
    fn signature(&self) -> &MfSignature {
        &self.signature
    }

    fn call(&self, _size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError> {
        params.single_mutable::<T>(0, "Value")?.iter_mut().for_each(&self.f);
        Ok(())
    }
}

/// Implicit value conversion used by [`CustomMfConvert`].
pub trait MfConvert<To> {
    fn convert(&self) -> To;
}

impl MfConvert<f32> for i32 {
    fn convert(&self) -> f32 {
        *self as f32
    }
}

impl MfConvert<i32> for bool {
    fn convert(&self) -> i32 {
        i32::from(*self)
    }
}

impl MfConvert<f32> for bool {
    fn convert(&self) -> f32 {
        if *self { 1.0 } else { 0.0 }
    }
}

impl MfConvert<String> for i32 {
    fn convert(&self) -> String {
        self.to_string()
    }
}

impl MfConvert<String> for f32 {
    fn convert(&self) -> String {
        self.to_string()
    }
}

pub struct CustomMfConvert<Src, Dst> {
    signature: MfSignature,
    _types: PhantomData<fn(Src) -> Dst>,
}

impl<Src, Dst> CustomMfConvert<Src, Dst>
where
    Src: MfValue + MfConvert<Dst>,
    Dst: MfValue,
{
    pub fn new() -> Self {
        let signature = MfSignature::build(format!(
            "{} to {}",
            Src::BASE_TYPE.name(),
            Dst::BASE_TYPE.name()
        ))
        .single_input::<Src>("Input")
        .single_output::<Dst>("Output")
        .finish();
        Self {
            signature,
            _types: PhantomData,
        }
    }

    pub fn from_type() -> DataType {
        DataType::single::<Src>()
    }

    pub fn to_type() -> DataType {
        DataType::single::<Dst>()
    }
}

impl<Src, Dst> Default for CustomMfConvert<Src, Dst>
where
    Src: MfValue + MfConvert<Dst>,
    Dst: MfValue,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Src, Dst> MultiFunction for CustomMfConvert<Src, Dst>
where
    Src: MfValue + MfConvert<Dst>,
    Dst: MfValue,
{
    fn signature(&self) -> &MfSignature {
        &self.signature
    }

    fn call(&self, _size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError> {
        let input = params.readonly_single_input::<Src>(0, "Input")?;
        let out = input.iter().map(MfConvert::convert).collect();
        params.set_single_output(1, out)
    }
}
