#![forbid(unsafe_code)]

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fnexpr_network::{
    AnyRef, BaseType, CustomMfConvert, DataType, GenericValue, MfConvert, MfValue, MultiFunction,
};

use crate::error::SymbolError;
use crate::resources::ResourceCollector;

pub type FunctionRef = Arc<dyn MultiFunction>;

/// Everything an expression can refer to by name.
///
/// Populated up front, then shared read-only (`&SymbolTable`) by any number of
/// lowering calls. Entries are never removed; constants are destroyed with the
/// table.
#[derive(Default)]
pub struct SymbolTable {
    functions: HashMap<String, Vec<FunctionRef>>,
    attributes: HashMap<(DataType, String), FunctionRef>,
    methods: HashMap<(DataType, String), FunctionRef>,
    conversions: HashMap<(DataType, DataType), FunctionRef>,
    constants: HashMap<String, GenericValue>,
    unsupported: HashSet<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an overload; earlier registrations win ties during resolution.
    pub fn add_function(&mut self, name: impl Into<String>, function: FunctionRef) {
        self.functions.entry(name.into()).or_default().push(function);
    }

    pub fn lookup_function_candidates(&self, name: &str) -> &[FunctionRef] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_attribute(
        &mut self,
        ty: DataType,
        name: impl Into<String>,
        function: FunctionRef,
    ) -> Result<(), SymbolError> {
        match self.attributes.entry((ty, name.into())) {
            Entry::Occupied(e) => Err(SymbolError::DuplicateAttribute {
                ty,
                name: e.key().1.clone(),
            }),
            Entry::Vacant(e) => {
                e.insert(function);
                Ok(())
            }
        }
    }

    pub fn try_lookup_attribute(&self, ty: DataType, name: &str) -> Option<&FunctionRef> {
        self.attributes.get(&(ty, name.to_string()))
    }

    pub fn add_method(
        &mut self,
        ty: DataType,
        name: impl Into<String>,
        function: FunctionRef,
    ) -> Result<(), SymbolError> {
        match self.methods.entry((ty, name.into())) {
            Entry::Occupied(e) => Err(SymbolError::DuplicateMethod {
                ty,
                name: e.key().1.clone(),
            }),
            Entry::Vacant(e) => {
                e.insert(function);
                Ok(())
            }
        }
    }

    pub fn try_lookup_method(&self, ty: DataType, name: &str) -> Option<&FunctionRef> {
        self.methods.get(&(ty, name.to_string()))
    }

    /// Registers the converter used for implicit `from -> to` conversions.
    /// Conversions never chain.
    pub fn add_conversion(
        &mut self,
        from: DataType,
        to: DataType,
        function: FunctionRef,
    ) -> Result<(), SymbolError> {
        match self.conversions.entry((from, to)) {
            Entry::Occupied(_) => Err(SymbolError::DuplicateConversion { from, to }),
            Entry::Vacant(e) => {
                e.insert(function);
                Ok(())
            }
        }
    }

    /// Registers a [`CustomMfConvert`] built in `resources`.
    pub fn add_conversion_fn<Src, Dst>(&mut self, resources: &mut ResourceCollector) -> Result<(), SymbolError>
    where
        Src: MfValue + MfConvert<Dst>,
        Dst: MfValue,
    {
        let from = DataType::single::<Src>();
        let to = DataType::single::<Dst>();
        if self.conversions.contains_key(&(from, to)) {
            return Err(SymbolError::DuplicateConversion { from, to });
        }
        let function: FunctionRef =
            resources.construct(format!("conversion {from} to {to}"), CustomMfConvert::<Src, Dst>::new());
        self.add_conversion(from, to, function)
    }

    pub fn try_lookup_conversion(&self, from: DataType, to: DataType) -> Option<&FunctionRef> {
        self.conversions.get(&(from, to))
    }

    /// Whether a registered converter bridges `from` to `to`. Identical types
    /// need no converter and report `false` unless one was registered.
    pub fn can_convert(&self, from: DataType, to: DataType) -> bool {
        self.conversions.contains_key(&(from, to))
    }

    /// Copies `value` (which must be a `ty` value) into the table.
    pub fn add_single_constant(
        &mut self,
        name: impl Into<String>,
        ty: BaseType,
        value: AnyRef<'_>,
    ) -> Result<(), SymbolError> {
        let name = name.into();
        if self.constants.contains_key(&name) {
            return Err(SymbolError::DuplicateConstant { name });
        }
        let Some(value) = GenericValue::copy_from(ty.cpp_type(), value) else {
            return Err(SymbolError::ConstantType {
                name,
                expected: DataType::Single(ty),
            });
        };
        self.constants.insert(name, value);
        Ok(())
    }

    pub fn add_single_constant_value<T: MfValue>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> Result<(), SymbolError> {
        self.add_single_constant(name, T::BASE_TYPE, &value)
    }

    pub fn try_lookup_single_constant(&self, name: &str) -> Option<&GenericValue> {
        self.constants.get(name)
    }

    /// Marks a function name as known but deliberately unimplemented.
    pub fn add_unsupported(&mut self, name: impl Into<String>) {
        self.unsupported.insert(name.into());
    }

    pub fn is_unsupported(&self, name: &str) -> bool {
        self.unsupported.contains(name)
    }

    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn unsupported_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.unsupported.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `(receiver type, name, function)` triples sorted by type then name.
    pub fn attributes(&self) -> Vec<(DataType, &str, &FunctionRef)> {
        sorted_members(&self.attributes)
    }

    pub fn methods(&self) -> Vec<(DataType, &str, &FunctionRef)> {
        sorted_members(&self.methods)
    }

    pub fn conversions(&self) -> Vec<(DataType, DataType)> {
        let mut pairs: Vec<_> = self.conversions.keys().copied().collect();
        pairs.sort();
        pairs
    }

    pub fn constants(&self) -> Vec<(&str, &GenericValue)> {
        let mut constants: Vec<_> = self
            .constants
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect();
        constants.sort_by_key(|(name, _)| *name);
        constants
    }
}

fn sorted_members(table: &HashMap<(DataType, String), FunctionRef>) -> Vec<(DataType, &str, &FunctionRef)> {
    let mut members: Vec<_> = table
        .iter()
        .map(|((ty, name), f)| (*ty, name.as_str(), f))
        .collect();
    members.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    members
}
