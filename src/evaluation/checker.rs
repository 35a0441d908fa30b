/// Case-insensitive any-match: the test passes when at least one expected
/// substring appears in the generated text. An empty expectation list never
/// passes.
pub fn check_result(output: &str, expected: &[String]) -> bool {
    let output = output.to_lowercase();
    expected
        .iter()
        .any(|e| output.contains(&e.to_lowercase()))
}
