//! Heap objects and the Rexx number rules collections depend on.

use crate::array::ArrayClass;
use crate::relation::Relation;
use crate::supplier::Supplier;
use orx_rts_gc::{Trace, Tracer};

/// A heap-managed object.
#[derive(Debug, Clone)]
pub enum Object {
    /// An immutable character string.
    String(String),
    /// An array.
    Array(ArrayClass),
    /// A relation.
    Relation(Relation),
    /// A supplier.
    Supplier(Supplier),
}

impl Object {
    /// Name of the object's class.
    #[must_use]
    pub const fn class_name(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Array(_) => "Array",
            Self::Relation(_) => "Relation",
            Self::Supplier(_) => "Supplier",
        }
    }

    /// The string value of the object.
    ///
    /// Strings are their own value; other objects use their default
    /// description ("an Array", "a Relation").
    #[must_use]
    pub fn string_value(&self) -> String {
        match self {
            Self::String(text) => text.clone(),
            Self::Array(_) => "an Array".to_string(),
            Self::Relation(_) => "a Relation".to_string(),
            Self::Supplier(_) => "a Supplier".to_string(),
        }
    }

    /// The string contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }
}

impl Trace for Object {
    fn trace(&self, tracer: &mut Tracer) {
        match self {
            Self::String(_) => {}
            Self::Array(array) => array.trace(tracer),
            Self::Relation(relation) => relation.trace(tracer),
            Self::Supplier(supplier) => supplier.trace(tracer),
        }
    }
}

/// Parse a Rexx whole number.
///
/// Accepts surrounding blanks, an optional sign, a fractional part made of
/// zeros only, and an exponent, as long as the value is integral and fits
/// in an `i64`. `"3"`, `" +3 "`, `"3.00"` and `"250E-1"` are whole numbers;
/// `"2.5"` is not.
#[must_use]
pub fn parse_whole_number(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(at) => (&body[..at], body[at + 1..].parse::<i32>().ok()?),
        None => (body, 0),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    // digits * 10^scale
    let mut digits: String = format!("{int_part}{frac_part}");
    let scale = i64::from(exponent) - frac_part.len() as i64;
    if scale < 0 {
        let cut = digits.len().checked_sub(scale.unsigned_abs() as usize);
        match cut {
            Some(cut) if digits[cut..].bytes().all(|b| b == b'0') => digits.truncate(cut),
            // everything after the point must be zero
            Some(_) => return None,
            None if digits.bytes().all(|b| b == b'0') => digits.clear(),
            None => return None,
        }
    }

    let mut value: i64 = 0;
    for b in digits.bytes() {
        value = value.checked_mul(10)?.checked_add(i64::from(b - b'0'))?;
    }
    if scale > 0 && value != 0 {
        let factor = 10i64.checked_pow(u32::try_from(scale).ok()?)?;
        value = value.checked_mul(factor)?;
    }
    Some(if negative { -value } else { value })
}
