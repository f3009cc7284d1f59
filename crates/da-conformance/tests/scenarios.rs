//! End-to-end scenarios chaining functions across the crates.

use da_base::seq::CItem;
use da_base::string::{GrepOptions, NcharOptions};
use da_base::{arithm, asis, factor, options, seq, sets, string, which};
use da_columnar::{ArrayLike, BinaryOp, RObject, binop, make_array};
use da_types::Value;

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

#[test]
fn remainder_then_filter() {
    let x = seq::seq_len(6i64).expect("seq_len");
    let rem = binop(BinaryOp::Mod, &x, 2i64).expect("mod");
    assert_eq!(rem.values().expect("values"), ints(&[1, 0, 1, 0, 1, 0]));
    let even = binop(BinaryOp::Eq, rem, 0i64).expect("eq");
    let positions = which::which(even).expect("which");
    assert_eq!(positions.values().expect("values"), ints(&[1, 3, 5]));
    let picked = x.take(&[1, 3, 5]).expect("take");
    assert_eq!(arithm::sum(picked, false).expect("sum"), Value::Int(12));
}

#[test]
fn floor_division_matches_r() {
    let x = make_array(vec![7i64, -7, 8], None).expect("array");
    let out = binop(BinaryOp::FloorDiv, x, 2i64).expect("floor div");
    assert_eq!(out.values().expect("values"), ints(&[3, -4, 4]));
}

#[test]
fn factor_codes_and_dropped_levels() {
    let fct = factor::factor(vec!["1", "2", "2"], &factor::FactorOptions::default())
        .expect("factor");
    assert_eq!(asis::as_integer(fct).expect("codes").values().expect("values"), ints(&[0, 1, 1]));

    let opts = factor::FactorOptions {
        levels: Some(ints(&[1, 2, 3, 4])),
        ..factor::FactorOptions::default()
    };
    let fct = factor::factor(vec![1i64, 2, 3], &opts).expect("factor");
    let dropped = factor::droplevels(fct).expect("droplevels");
    let levels = factor::levels(dropped).expect("levels").expect("factor");
    assert_eq!(levels.values().expect("values"), ints(&[1, 2, 3]));
}

#[test]
fn rep_and_c_indexing() {
    let out = seq::rep(vec![1i64, 2], 2i64, None, 1).expect("rep");
    assert_eq!(out.values().expect("values"), ints(&[1, 2, 1, 2]));
    let out = seq::rep(vec![1i64, 2], 1i64, None, 2).expect("rep each");
    assert_eq!(out.values().expect("values"), ints(&[1, 1, 2, 2]));

    let out = seq::c_getitem(vec![
        CItem::Slice {
            start: Some(1),
            stop: Some(3),
            step: Some(1),
        },
        CItem::from(ArrayLike::from(7i64)),
    ])
    .expect("c[1:3, 7]");
    assert_eq!(out.values().expect("values"), ints(&[1, 2, 3, 7]));
}

#[test]
fn string_pipeline() {
    let words = vec!["  apple", "banana ", " cherry "];
    let trimmed = string::trimws(words, string::TrimSide::Both, None).expect("trim");
    let upper = string::toupper(trimmed).expect("upper");
    let hits = string::grepl("AN", upper.clone(), GrepOptions::default()).expect("grepl");
    assert_eq!(
        hits.values().expect("values"),
        vec![Value::Bool(false), Value::Bool(true), Value::Bool(false)]
    );
    let lengths = string::nchar(upper.clone(), NcharOptions::default()).expect("nchar");
    assert_eq!(lengths.values().expect("values"), ints(&[5, 6, 6]));
    let joined = string::paste(vec![ArrayLike::from(upper)], "", Some(",")).expect("paste");
    assert_eq!(joined, RObject::Value(Value::from("APPLE,BANANA,CHERRY")));
}

#[test]
fn sets_and_matching() {
    let x = vec!["b", "a", "c", "a"];
    let u = sets::unique(x.clone()).expect("unique");
    let positions = seq::match_(x, u.clone(), -1).expect("match");
    assert_eq!(positions.values().expect("values"), ints(&[0, 1, 2, 1]));
    let sorted = seq::sort(u, false, true).expect("sort");
    assert_eq!(
        sorted.values().expect("values"),
        vec![Value::from("a"), Value::from("b"), Value::from("c")]
    );
}

#[test]
fn options_drive_missing_lengths() {
    let previous = options::set(options::BackendOptions {
        na_len: 0,
        ..options::BackendOptions::default()
    });
    let opts = NcharOptions {
        keep_na: Some(false),
        ..NcharOptions::default()
    };
    let out = string::nchar(vec![Some("ab"), None], opts).expect("nchar");
    options::set(previous);
    assert_eq!(out.values().expect("values"), ints(&[2, 0]));
}
