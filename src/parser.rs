use lol_html::{element, text, HtmlRewriter, Settings};
use std::cell::RefCell;

/// An `<a href>` as it appears in the document: raw href and its visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Collects anchors in document order. Malformed markup is tolerated; whatever
/// was collected before a rewriter error is returned.
pub fn parse_anchors(input: &str) -> Vec<Anchor> {
    let anchors = RefCell::new(Vec::new());

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("a[href]", |el| {
                    if let Some(href) = el.get_attribute("href") {
                        anchors.borrow_mut().push(Anchor {
                            href: href.trim().to_string(),
                            text: String::new(),
                        });
                    }
                    Ok(())
                }),
                text!("a[href]", |t| {
                    if let Some(anchor) = anchors.borrow_mut().last_mut() {
                        anchor.text.push_str(t.as_str());
                    }
                    Ok(())
                }),
            ],
            ..Settings::new()
        },
        |_: &[u8]| {},
    );

    if rewriter.write(input.as_bytes()).is_ok() {
        let _ = rewriter.end();
    } else {
        drop(rewriter);
    }

    anchors.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_anchors_in_document_order() {
        let html = r#"
            <nav>
              <a href="/">Home</a>
              <a href="/links">友链</a>
              <a>no href</a>
              <a href=" https://other.example/ ">Other</a>
            </nav>"#;

        let anchors = parse_anchors(html);
        assert_eq!(
            anchors,
            vec![
                Anchor { href: "/".into(), text: "Home".into() },
                Anchor { href: "/links".into(), text: "友链".into() },
                Anchor { href: "https://other.example/".into(), text: "Other".into() },
            ]
        );
    }

    #[test]
    fn text_is_scoped_to_its_anchor() {
        let html = r#"<p>before <a href="/a">first</a> between <a href="/b">second</a> after</p>"#;
        let anchors = parse_anchors(html);
        assert_eq!(anchors[0].text, "first");
        assert_eq!(anchors[1].text, "second");
    }

    #[test]
    fn empty_document_has_no_anchors() {
        assert!(parse_anchors("").is_empty());
        assert!(parse_anchors("<html><body>plain</body></html>").is_empty());
    }
}
