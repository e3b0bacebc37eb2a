#![no_main]
//! Style sheet, declaration and selector parsing on arbitrary text.

use isoprint_dom::{StyleDeclarations, SelectorList, Stylesheet};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if text.len() > 20_000 {
        return;
    }

    let sheet = Stylesheet::parse(&text);
    for rule in &sheet.rules {
        let _ = rule.declarations.css_text();
    }

    let declarations = StyleDeclarations::parse(&text);
    let reparsed = StyleDeclarations::parse(&declarations.css_text());
    assert_eq!(declarations.len(), reparsed.len());

    let _ = SelectorList::parse(&text);
});
