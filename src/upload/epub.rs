use std::collections::HashMap;
use std::io::{Cursor, Read as _};
use std::sync::LazyLock;

use anyhow::Context as _;
use scraper::{ElementRef, Html, Node, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid epub selector")
}

static ROOTFILE: LazyLock<Selector> = LazyLock::new(|| selector("rootfile"));
static MANIFEST_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("manifest item"));
static SPINE_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("spine itemref"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6", "li",
    "tr", "pre", "br", "hr",
];

/// Text of every spine document, in reading order.
pub fn epub_text(bytes: &[u8]) -> anyhow::Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).context("open epub archive")?;

    let container = read_entry(&mut archive, "META-INF/container.xml")?;
    let container = Html::parse_document(&container);
    let opf_path = container
        .select(&ROOTFILE)
        .find_map(|el| el.value().attr("full-path"))
        .map(str::to_owned)
        .ok_or_else(|| anyhow::anyhow!("container.xml has no rootfile"))?;
    let opf_dir = opf_path
        .rsplit_once('/')
        .map(|(dir, _)| format!("{dir}/"))
        .unwrap_or_default();

    let opf = Html::parse_document(&read_entry(&mut archive, &opf_path)?);
    let hrefs: HashMap<&str, &str> = opf
        .select(&MANIFEST_ITEM)
        .filter_map(|item| Some((item.value().attr("id")?, item.value().attr("href")?)))
        .collect();

    let mut parts = Vec::new();
    for itemref in opf.select(&SPINE_ITEM) {
        let Some(href) = itemref.value().attr("idref").and_then(|id| hrefs.get(id)) else {
            continue;
        };
        let href = href.split('#').next().unwrap_or_default();
        let entry = format!("{opf_dir}{href}");
        let xhtml = read_entry(&mut archive, &entry)?;
        let text = xhtml_to_text(&xhtml);
        if !text.is_empty() {
            parts.push(text);
        }
    }

    if parts.is_empty() {
        anyhow::bail!("epub spine has no text documents");
    }
    Ok(parts.join("\n\n"))
}

fn read_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> anyhow::Result<String> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("missing epub entry: {name}"))?;
    let mut out = String::new();
    entry
        .read_to_string(&mut out)
        .with_context(|| format!("read epub entry: {name}"))?;
    Ok(out)
}

/// Flattens an (X)HTML document to text, one block element per line.
pub fn xhtml_to_text(xhtml: &str) -> String {
    let doc = Html::parse_document(xhtml);
    let mut out = String::new();
    match doc.select(&BODY).next() {
        Some(body) => push_blocks(body, &mut out),
        None => push_blocks(doc.root_element(), &mut out),
    }
    out.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_blocks(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let block = BLOCK_TAGS.contains(&el.name());
                if block {
                    out.push('\n');
                }
                if let Some(child) = ElementRef::wrap(child) {
                    push_blocks(child, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}
