#[test]
fn derive_domain_event_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/*.rs");
}
