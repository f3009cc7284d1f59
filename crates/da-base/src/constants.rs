//! R's built-in constants.

use std::sync::Arc;

use arrow::array::StringArray;
use da_columnar::{DatarError, RArray};
use da_types::Value;

pub const PI: f64 = std::f64::consts::PI;
pub const NA: Value = Value::Null;
pub const NULL: Value = Value::Null;
pub const NAN: f64 = f64::NAN;
pub const INF: f64 = f64::INFINITY;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn strings<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<RArray, DatarError> {
    RArray::create(Arc::new(StringArray::from_iter_values(values)))
}

fn alphabet(upper: bool) -> Vec<String> {
    let start = if upper { b'A' } else { b'a' };
    (start..start + 26).map(|c| char::from(c).to_string()).collect()
}

pub fn letters() -> Result<RArray, DatarError> {
    strings(alphabet(false).iter().map(String::as_str))
}

#[allow(non_snake_case)]
pub fn LETTERS() -> Result<RArray, DatarError> {
    strings(alphabet(true).iter().map(String::as_str))
}

pub fn month_name() -> Result<RArray, DatarError> {
    strings(MONTH_NAMES)
}

pub fn month_abb() -> Result<RArray, DatarError> {
    let abbreviations: Vec<&str> = MONTH_NAMES.iter().map(|name| &name[..3]).collect();
    strings(abbreviations)
}

#[cfg(test)]
mod tests {
    use da_types::Value;

    use super::{LETTERS, NA, letters, month_abb, month_name};

    #[test]
    fn alphabets_and_months() {
        let lower = letters().expect("letters");
        assert_eq!(lower.len(), 26);
        assert_eq!(lower.get(25).expect("z"), Value::from("z"));
        assert_eq!(LETTERS().expect("LETTERS").get(0).expect("A"), Value::from("A"));
        assert_eq!(month_name().expect("months").get(8).expect("sep"), Value::from("September"));
        assert_eq!(month_abb().expect("abb").get(4).expect("may"), Value::from("May"));
        assert!(NA.is_missing());
    }
}
