#![no_main]
//! Feeds arbitrary markup through parse, clone, wrap and surface setup.
//! None of it may panic, whatever the input looks like.

use arbitrary::Arbitrary;
use isoprint::clone::clone_tree;
use isoprint::wrap::wrap;
use isoprint::{PrintOptions, Surface};
use isoprint_dom::Document;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    html: String,
    selector: String,
    wrap: bool,
    exclude_pattern: Option<String>,
}

fuzz_target!(|input: Input| {
    if input.html.len() > 50_000 {
        return;
    }

    let host = match Document::parse_html(&input.html) {
        Ok(host) => host,
        Err(_) => return,
    };

    let mut options = PrintOptions::default().wrap(input.wrap);
    if let Some(pattern) = &input.exclude_pattern {
        options = match options.exclude_style_pattern(pattern) {
            Ok(options) => options,
            Err(_) => return,
        };
    }

    let target = match host.query_selector(&input.selector) {
        Ok(Some(target)) => target,
        _ => host.node().clone(),
    };

    let content = match clone_tree(&target, &options) {
        Ok(content) => content,
        Err(_) => return,
    };
    let content = match wrap(&target, content, &options) {
        Ok(content) => content,
        Err(_) => return,
    };
    if let Ok(surface) = Surface::create(&host, content, &options) {
        surface.remove();
    }
});
