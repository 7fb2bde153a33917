#![forbid(unsafe_code)]

//! The default symbol library: arithmetic operators, implicit widening
//! conversions, shader-style math functions, `float3` helpers and a handful
//! of constants.

use std::f32::consts::{E, PI, TAU};

use fnexpr_network::{
    CustomMfSiSiSiSo, CustomMfSiSiSo, CustomMfSiSo, CustomMfViSo, DataType, Float3, MfValue,
    MultiFunction,
};

use crate::error::SymbolError;
use crate::resources::ResourceCollector;
use crate::symbol_table::{FunctionRef, SymbolTable};

/// Names known to the math node set but not implemented here.
pub const UNSUPPORTED_FUNCTIONS: [&str; 4] = ["smooth_min", "smooth_max", "wrap", "pingpong"];

impl SymbolTable {
    /// A table populated by [`register_builtins`].
    pub fn with_builtins(resources: &mut ResourceCollector) -> Result<Self, SymbolError> {
        let mut symbols = SymbolTable::new();
        register_builtins(&mut symbols, resources)?;
        Ok(symbols)
    }
}

pub fn register_builtins(symbols: &mut SymbolTable, resources: &mut ResourceCollector) -> Result<(), SymbolError> {
    let mut lib = Library { symbols, resources };
    lib.conversions()?;
    lib.int_operators();
    lib.float_operators();
    lib.other_operators();
    lib.math_functions();
    lib.float3()?;
    lib.strings_and_lists()?;
    lib.constants()?;
    for name in UNSUPPORTED_FUNCTIONS {
        lib.symbols.add_unsupported(name);
    }
    Ok(())
}

struct Library<'a> {
    symbols: &'a mut SymbolTable,
    resources: &'a mut ResourceCollector,
}

impl Library<'_> {
    fn store<F: MultiFunction + 'static>(&mut self, function: F) -> FunctionRef {
        let name = function.name().to_string();
        self.resources.construct(name, function)
    }

    fn function<F: MultiFunction + 'static>(&mut self, function: F) {
        let name = function.name().to_string();
        let function = self.store(function);
        self.symbols.add_function(name, function);
    }

    fn unary<A, R>(&mut self, name: &str, f: fn(A) -> R)
    where
        A: MfValue + Copy,
        R: MfValue,
    {
        self.function(CustomMfSiSo::new(name, move |a: &A| f(*a)));
    }

    fn binary<A, B, R>(&mut self, name: &str, f: fn(A, B) -> R)
    where
        A: MfValue + Copy,
        B: MfValue + Copy,
        R: MfValue,
    {
        self.function(CustomMfSiSiSo::new(name, move |a: &A, b: &B| f(*a, *b)));
    }

    fn ternary<A, B, C, R>(&mut self, name: &str, f: fn(A, B, C) -> R)
    where
        A: MfValue + Copy,
        B: MfValue + Copy,
        C: MfValue + Copy,
        R: MfValue,
    {
        self.function(CustomMfSiSiSiSo::new(name, move |a: &A, b: &B, c: &C| {
            f(*a, *b, *c)
        }));
    }

    fn attribute<F: MultiFunction + 'static>(
        &mut self,
        ty: DataType,
        name: &str,
        function: F,
    ) -> Result<(), SymbolError> {
        let function = self.store(function);
        self.symbols.add_attribute(ty, name, function)
    }

    fn method<F: MultiFunction + 'static>(&mut self, ty: DataType, name: &str, function: F) -> Result<(), SymbolError> {
        let function = self.store(function);
        self.symbols.add_method(ty, name, function)
    }

    /// Widening only, so exact integer arithmetic never resolves to a float
    /// overload.
    fn conversions(&mut self) -> Result<(), SymbolError> {
        self.symbols.add_conversion_fn::<i32, f32>(self.resources)?;
        self.symbols.add_conversion_fn::<bool, i32>(self.resources)?;
        self.symbols.add_conversion_fn::<bool, f32>(self.resources)?;
        self.symbols.add_conversion_fn::<i32, String>(self.resources)?;
        self.symbols.add_conversion_fn::<f32, String>(self.resources)?;
        Ok(())
    }

    fn int_operators(&mut self) {
        self.binary("a+b", |a: i32, b: i32| a.wrapping_add(b));
        self.binary("a-b", |a: i32, b: i32| a.wrapping_sub(b));
        self.binary("a*b", |a: i32, b: i32| a.wrapping_mul(b));
        self.binary("a/b", |a: i32, b: i32| a.checked_div(b).unwrap_or(0));
        self.binary("a**b", int_pow);
        self.unary("-a", |a: i32| a.wrapping_neg());
        self.binary("a<b", |a: i32, b: i32| a < b);
        self.binary("a>b", |a: i32, b: i32| a > b);
        self.binary("a==b", |a: i32, b: i32| a == b);
        self.binary("a<=b", |a: i32, b: i32| a <= b);
        self.binary("a>=b", |a: i32, b: i32| a >= b);
    }

    fn float_operators(&mut self) {
        self.binary("a+b", |a: f32, b: f32| a + b);
        self.binary("a-b", |a: f32, b: f32| a - b);
        self.binary("a*b", |a: f32, b: f32| a * b);
        self.binary("a/b", safe_divide);
        self.binary("a**b", safe_pow);
        self.unary("-a", |a: f32| -a);
        self.binary("a<b", |a: f32, b: f32| a < b);
        self.binary("a>b", |a: f32, b: f32| a > b);
        self.binary("a==b", |a: f32, b: f32| a == b);
        self.binary("a<=b", |a: f32, b: f32| a <= b);
        self.binary("a>=b", |a: f32, b: f32| a >= b);
    }

    fn other_operators(&mut self) {
        self.binary("a==b", |a: bool, b: bool| a == b);
        self.function(CustomMfSiSiSo::new("a+b", |a: &String, b: &String| format!("{a}{b}")));
        self.function(CustomMfSiSiSo::new("a==b", |a: &String, b: &String| a == b));
    }

    /// Follows the shader math node: operations that would produce NaN or
    /// infinity return 0 instead.
    fn math_functions(&mut self) {
        self.unary("sin", f32::sin);
        self.unary("cos", f32::cos);
        self.unary("tan", f32::tan);
        self.unary("asin", |a: f32| a.clamp(-1.0, 1.0).asin());
        self.unary("acos", |a: f32| a.clamp(-1.0, 1.0).acos());
        self.unary("atan", f32::atan);
        self.binary("atan2", f32::atan2);
        self.unary("sinh", f32::sinh);
        self.unary("cosh", f32::cosh);
        self.unary("tanh", f32::tanh);
        self.unary("sqrt", |a: f32| if a > 0.0 { a.sqrt() } else { 0.0 });
        self.unary("inverse_sqrt", |a: f32| if a > 0.0 { 1.0 / a.sqrt() } else { 0.0 });
        self.unary("abs", |a: i32| a.wrapping_abs());
        self.unary("abs", f32::abs);
        self.unary("sign", |a: f32| if a == 0.0 { 0.0 } else { a.signum() });
        self.unary("exp", f32::exp);
        self.unary("log", |a: f32| if a > 0.0 { a.ln() } else { 0.0 });
        self.binary("log", safe_log);
        self.binary("pow", safe_pow);
        self.binary("min", |a: i32, b: i32| a.min(b));
        self.binary("min", f32::min);
        self.binary("max", |a: i32, b: i32| a.max(b));
        self.binary("max", f32::max);
        self.unary("floor", f32::floor);
        self.unary("ceil", f32::ceil);
        self.unary("round", f32::round);
        self.unary("fract", |a: f32| a - a.floor());
        self.unary("trunc", f32::trunc);
        self.binary("mod", safe_mod);
        self.binary("snap", |a: f32, b: f32| {
            if b == 0.0 { 0.0 } else { (a / b).floor() * b }
        });
        self.ternary("compare", |a: f32, b: f32, epsilon: f32| {
            if (a - b).abs() <= epsilon.max(1e-5) { 1.0 } else { 0.0 }
        });
        self.ternary("multiply_add", |a: f32, b: f32, c: f32| a * b + c);
        self.unary("radians", f32::to_radians);
        self.unary("degrees", f32::to_degrees);
    }

    fn float3(&mut self) -> Result<(), SymbolError> {
        let float3 = DataType::single::<Float3>();
        self.ternary("float3", Float3::new);
        self.binary("a+b", |a: Float3, b: Float3| a + b);
        self.binary("a-b", |a: Float3, b: Float3| a - b);
        self.binary("a*b", |a: Float3, b: f32| a * b);
        self.unary("-a", |a: Float3| -a);

        self.attribute(float3, "x", CustomMfSiSo::new("float3.x", |v: &Float3| v.x))?;
        self.attribute(float3, "y", CustomMfSiSo::new("float3.y", |v: &Float3| v.y))?;
        self.attribute(float3, "z", CustomMfSiSo::new("float3.z", |v: &Float3| v.z))?;
        self.method(float3, "length", CustomMfSiSo::new("float3.length", |v: &Float3| v.length()))?;
        self.method(
            float3,
            "dot",
            CustomMfSiSiSo::new("float3.dot", |a: &Float3, b: &Float3| a.dot(*b)),
        )?;
        self.method(
            float3,
            "scale",
            CustomMfSiSiSo::new("float3.scale", |v: &Float3, f: &f32| *v * *f),
        )?;
        Ok(())
    }

    fn strings_and_lists(&mut self) -> Result<(), SymbolError> {
        let string = DataType::single::<String>();
        self.attribute(
            string,
            "len",
            CustomMfSiSo::new("string.len", |s: &String| {
                i32::try_from(s.chars().count()).unwrap_or(i32::MAX)
            }),
        )?;
        self.method(
            string,
            "repeat",
            CustomMfSiSiSo::new("string.repeat", |s: &String, n: &i32| {
                s.repeat(usize::try_from(*n).unwrap_or(0))
            }),
        )?;

        let floats = DataType::vector::<f32>();
        self.attribute(
            floats,
            "len",
            CustomMfViSo::new("float[].len", |l: &[f32]| i32::try_from(l.len()).unwrap_or(i32::MAX)),
        )?;
        self.method(floats, "sum", CustomMfViSo::new("float[].sum", |l: &[f32]| l.iter().sum::<f32>()))?;
        Ok(())
    }

    fn constants(&mut self) -> Result<(), SymbolError> {
        self.symbols.add_single_constant_value("pi", PI)?;
        self.symbols.add_single_constant_value("tau", TAU)?;
        self.symbols.add_single_constant_value("e", E)?;
        self.symbols.add_single_constant_value("true", true)?;
        self.symbols.add_single_constant_value("false", false)?;
        Ok(())
    }
}

fn int_pow(base: i32, exponent: i32) -> i32 {
    match u32::try_from(exponent) {
        Ok(exponent) => base.wrapping_pow(exponent),
        // Integer reciprocal truncates to 0 except for |base| == 1.
        Err(_) => match base {
            1 => 1,
            -1 if exponent % 2 == 0 => 1,
            -1 => -1,
            _ => 0,
        },
    }
}

pub fn safe_divide(a: f32, b: f32) -> f32 {
    if b == 0.0 { 0.0 } else { a / b }
}

pub fn safe_mod(a: f32, b: f32) -> f32 {
    if b == 0.0 { 0.0 } else { a % b }
}

pub fn safe_pow(base: f32, exponent: f32) -> f32 {
    if base < 0.0 && exponent.fract() != 0.0 {
        0.0
    } else {
        base.powf(exponent)
    }
}

pub fn safe_log(a: f32, base: f32) -> f32 {
    if a > 0.0 && base > 0.0 {
        safe_divide(a.ln(), base.ln())
    } else {
        0.0
    }
}
