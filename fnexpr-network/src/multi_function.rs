#![forbid(unsafe_code)]

use std::fmt;

use crate::data_type::DataType;
use crate::error::EvalError;
use crate::value::{GenericArray, MfValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamInterface {
    Input,
    Output,
    /// Read and overwritten in place; occupies both an input and an output socket.
    Mutable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParamType {
    pub interface: ParamInterface,
    pub data_type: DataType,
}

impl ParamType {
    pub fn new(interface: ParamInterface, data_type: DataType) -> Self {
        Self {
            interface,
            data_type,
        }
    }

    pub fn is_input_or_mutable(&self) -> bool {
        matches!(
            self.interface,
            ParamInterface::Input | ParamInterface::Mutable
        )
    }

    pub fn is_output_or_mutable(&self) -> bool {
        matches!(
            self.interface,
            ParamInterface::Output | ParamInterface::Mutable
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MfParam {
    pub name: String,
    pub param_type: ParamType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MfSignature {
    pub function_name: String,
    pub params: Vec<MfParam>,
}

impl MfSignature {
    pub fn build(function_name: impl Into<String>) -> MfSignatureBuilder {
        MfSignatureBuilder {
            signature: MfSignature {
                function_name: function_name.into(),
                params: Vec::new(),
            },
        }
    }

    /// Params that consume a value, with their declaration index.
    pub fn input_params(&self) -> impl Iterator<Item = (usize, &MfParam)> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.param_type.is_input_or_mutable())
    }

    /// Params that produce a value, with their declaration index.
    pub fn output_params(&self) -> impl Iterator<Item = (usize, &MfParam)> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.param_type.is_output_or_mutable())
    }

    pub fn input_count(&self) -> usize {
        self.input_params().count()
    }

    pub fn output_count(&self) -> usize {
        self.output_params().count()
    }
}

impl fmt::Display for MfSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function_name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let mode = match p.param_type.interface {
                ParamInterface::Input => "in",
                ParamInterface::Output => "out",
                ParamInterface::Mutable => "mut",
            };
            write!(f, "{mode} {}: {}", p.name, p.param_type.data_type)?;
        }
        f.write_str(")")
    }
}

pub struct MfSignatureBuilder {
    signature: MfSignature,
}

impl MfSignatureBuilder {
    pub fn param(mut self, name: impl Into<String>, interface: ParamInterface, data_type: DataType) -> Self {
        self.signature.params.push(MfParam {
            name: name.into(),
            param_type: ParamType::new(interface, data_type),
        });
        self
    }

    pub fn input(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.param(name, ParamInterface::Input, data_type)
    }

    pub fn output(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.param(name, ParamInterface::Output, data_type)
    }

    pub fn mutable(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.param(name, ParamInterface::Mutable, data_type)
    }

    pub fn single_input<T: MfValue>(self, name: impl Into<String>) -> Self {
        self.input(name, DataType::single::<T>())
    }

    pub fn vector_input<T: MfValue>(self, name: impl Into<String>) -> Self {
        self.input(name, DataType::vector::<T>())
    }

    pub fn single_output<T: MfValue>(self, name: impl Into<String>) -> Self {
        self.output(name, DataType::single::<T>())
    }

    pub fn single_mutable<T: MfValue>(self, name: impl Into<String>) -> Self {
        self.mutable(name, DataType::single::<T>())
    }

    pub fn finish(self) -> MfSignature {
        self.signature
    }
}

/// A function evaluated over a whole batch of elements at once.
pub trait MultiFunction: Send + Sync {
    fn signature(&self) -> &MfSignature;

    /// Reads the input/mutable params and fills every output/mutable param
    /// with `size` elements.
    fn call(&self, size: usize, params: &mut MfParams<'_>) -> Result<(), EvalError>;

    fn name(&self) -> &str {
        &self.signature().function_name
    }
}

enum ParamBuffer<'a> {
    Input(&'a GenericArray),
    Output(Option<GenericArray>),
    Mutable(GenericArray),
}

/// Buffers handed to [`MultiFunction::call`], one per signature param in
/// declaration order.
#[derive(Default)]
pub struct MfParams<'a> {
    buffers: Vec<ParamBuffer<'a>>,
}

impl<'a> MfParams<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_readonly_input(&mut self, array: &'a GenericArray) {
        self.buffers.push(ParamBuffer::Input(array));
    }

    pub fn add_uninitialized_output(&mut self) {
        self.buffers.push(ParamBuffer::Output(None));
    }

    pub fn add_mutable(&mut self, array: GenericArray) {
        self.buffers.push(ParamBuffer::Mutable(array));
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn readonly_input(&self, index: usize) -> Result<&'a GenericArray, EvalError> {
        match self.buffers.get(index) {
            Some(ParamBuffer::Input(array)) => Ok(*array),
            Some(_) => Err(wrong_interface(index, "an input")),
            None => Err(EvalError::MissingParam(index)),
        }
    }

    pub fn readonly_single_input<T: MfValue>(
        &self,
        index: usize,
        name: &str,
    ) -> Result<&'a [T], EvalError> {
        let array = self.readonly_input(index)?;
        array.as_slice::<T>().ok_or_else(|| EvalError::ParamType {
            param: name.to_string(),
            expected: DataType::single::<T>(),
            actual: array.data_type(),
        })
    }

    pub fn readonly_vector_input<T: MfValue>(
        &self,
        index: usize,
        name: &str,
    ) -> Result<&'a [Vec<T>], EvalError> {
        let array = self.readonly_input(index)?;
        array.as_vector_slice::<T>().ok_or_else(|| EvalError::ParamType {
            param: name.to_string(),
            expected: DataType::vector::<T>(),
            actual: array.data_type(),
        })
    }

    pub fn set_output(&mut self, index: usize, array: GenericArray) -> Result<(), EvalError> {
        match self.buffers.get_mut(index) {
            Some(ParamBuffer::Output(slot)) => {
                *slot = Some(array);
                Ok(())
            }
            Some(_) => Err(wrong_interface(index, "an output")),
            None => Err(EvalError::MissingParam(index)),
        }
    }

    pub fn set_single_output<T: MfValue>(&mut self, index: usize, values: Vec<T>) -> Result<(), EvalError> {
        self.set_output(index, GenericArray::from_vec(values))
    }

    pub fn single_mutable<T: MfValue>(
        &mut self,
        index: usize,
        name: &str,
    ) -> Result<&mut Vec<T>, EvalError> {
        match self.buffers.get_mut(index) {
            Some(ParamBuffer::Mutable(array)) => {
                let actual = array.data_type();
                array.as_mut_vec::<T>().ok_or_else(|| EvalError::ParamType {
                    param: name.to_string(),
                    expected: DataType::single::<T>(),
                    actual,
                })
            }
            Some(_) => Err(wrong_interface(index, "mutable")),
            None => Err(EvalError::MissingParam(index)),
        }
    }

    /// Produced values by param index; `None` for inputs and unset outputs.
    pub fn into_outputs(self) -> Vec<Option<GenericArray>> {
        self.buffers
            .into_iter()
            .map(|b| match b {
                ParamBuffer::Input(_) => None,
                ParamBuffer::Output(slot) => slot,
                ParamBuffer::Mutable(array) => Some(array),
            })
            .collect()
    }
}

fn wrong_interface(index: usize, expected: &'static str) -> EvalError {
    EvalError::WrongInterface { index, expected }
}
