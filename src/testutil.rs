use std::fmt;
use std::io::Write;

use goldenfile::Mint;

pub fn golden_test(output: &dyn fmt::Display, golden_path: &str) {
    let mut mint = Mint::new("testdata/ofx");
    let differ = Box::new(goldenfile::differs::text_diff);
    let mut out = mint
        .new_goldenfile_with_differ(golden_path, differ)
        .expect("new goldenfile");

    let s = format!("{}", output);
    out.write_all(s.as_bytes()).expect("write output");
}

/// Compares multi-line text, printing a line diff on mismatch.
pub fn assert_text_eq(want: &str, got: &str) {
    if want != got {
        text_diff::assert_diff(want, got, "\n", 0);
    }
}
