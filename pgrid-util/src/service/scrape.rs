use scraper::{ElementRef, Html, Node, Selector};

pub trait Scrape {
    fn elem(&self) -> ElementRef;

    fn find_first(&self, selector: &Selector) -> Option<ElementRef> {
        self.elem().select(selector).next()
    }

    fn inner_text(&self) -> String {
        self.elem().text().collect()
    }

    /// Text content where `<br>` counts as a line break unless the text
    /// already has its own newlines.
    fn text_with_breaks(&self) -> String {
        let natural = self.inner_text();
        if natural.contains('\n') {
            return natural;
        }
        self.elem()
            .descendants()
            .fold(String::new(), |mut ret, node| {
                match node.value() {
                    Node::Text(text) => ret.push_str(text),
                    Node::Element(elem) if elem.name() == "br" => ret.push('\n'),
                    _ => {}
                }
                ret
            })
    }
}

impl Scrape for ElementRef<'_> {
    fn elem(&self) -> ElementRef {
        *self
    }
}

impl Scrape for Html {
    fn elem(&self) -> ElementRef {
        self.root_element()
    }
}

/// Replaces the invisible and non-breaking spaces the portal sprinkles into
/// text with plain spaces and drops carriage returns.
pub fn normalize_spaces(text: &str) -> String {
    text.replace('\r', "")
        .replace(&['\u{2003}', '\u{200b}', '\u{a0}'][..], " ")
        .replace("&nbsp;", " ")
}

/// Plain text of an HTML fragment, as a sample input or output is shown.
pub fn fragment_to_text(html: &str) -> String {
    normalize_spaces(&Html::parse_fragment(html).text_with_breaks())
}
