//! # 文档序列化与后处理
//!
//! 将 [`Element`] 树写成 HTML 或 XHTML 字节流。缩进规则与常见的 "pretty print"
//! 相同：只有不含文本子节点的元素内部才会换行缩进，含文本的元素（以及它的全部
//! 后代）会被原样写在同一行上，避免改变有意义的空白。

use quick_xml::{
    Writer,
    escape::partial_escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use songbook_core::RenderError;

use crate::tree::{Element, Node};

/// 零宽连接符。作为行容器的首个文本节点写入，迫使序列化器把整行写在一行上，
/// 最终输出前会被移除。
pub const ROW_JOINER: char = '\u{200d}';

/// 电子书格式中替代有意义空格的元素所使用的类名。
pub const WHITESPACE_CLASS: &str = "ws";

const INDENT: &str = "  ";

const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// 标记方言。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// 不带命名空间的 HTML：空元素不闭合，`<script>` 内容不转义。
    Html,
    /// 严格的 XML 语法：带 XML 声明，空元素自闭合，所有文本都转义。
    Xhtml,
}

impl Dialect {
    fn is_void(self, name: &str) -> bool {
        VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
    }

    fn is_raw_text(self, name: &str) -> bool {
        self == Self::Html && RAW_TEXT_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
    }
}

/// 序列化完整文档，包括文档类型声明。
pub fn serialize_document(
    root: &Element,
    dialect: Dialect,
    pretty: bool,
) -> Result<String, RenderError> {
    let mut writer = Writer::new(Vec::new());

    if dialect == Dialect::Xhtml {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
    }
    writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;
    writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;

    write_element(&mut writer, root, dialect, 0, pretty)?;
    writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

/// 序列化单个元素，不带文档声明，也不缩进。主要用于测试和调试。
pub fn serialize_fragment(element: &Element, dialect: Dialect) -> Result<String, RenderError> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, element, dialect, 0, false)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &Element,
    dialect: Dialect,
    depth: usize,
    pretty: bool,
) -> Result<(), RenderError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        if dialect.is_void(&element.name) {
            match dialect {
                Dialect::Html => writer.write_event(Event::Start(start))?,
                Dialect::Xhtml => writer.write_event(Event::Empty(start))?,
            }
        } else {
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
        }
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;

    let indent_children = pretty && !element.has_mixed_content();
    let raw_text = dialect.is_raw_text(&element.name);

    for node in &element.children {
        match node {
            Node::Text(text) => {
                let escaped = if raw_text {
                    text.as_str().into()
                } else {
                    partial_escape(text.as_str())
                };
                writer.write_event(Event::Text(BytesText::from_escaped(escaped)))?;
            }
            Node::Element(child) => {
                if indent_children {
                    write_indent(writer, depth + 1)?;
                }
                write_element(writer, child, dialect, depth + 1, indent_children)?;
            }
        }
    }

    if indent_children {
        write_indent(writer, depth)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

fn write_indent<W: std::io::Write>(writer: &mut Writer<W>, depth: usize) -> Result<(), RenderError> {
    let indent = format!("\n{}", INDENT.repeat(depth));
    writer.write_event(Event::Text(BytesText::from_escaped(indent)))?;
    Ok(())
}

/// 移除所有用于保持单行输出的零宽连接符。两种格式共用。
#[must_use]
pub fn strip_row_joiners(document: &str) -> String {
    document.replace(ROW_JOINER, "")
}

/// 电子书格式的后处理：把紧挨着 `<span>` 的首尾空格改写为显式的空白元素，
/// 因为电子书阅读器会折叠这些普通空格。
pub fn mark_significant_whitespace(element: &mut Element) {
    let children = std::mem::take(&mut element.children);
    let count = children.len();
    let is_span = |node: Option<&Node>| matches!(node, Some(Node::Element(e)) if e.name == "span");
    let span_flags: Vec<bool> = children.iter().map(|node| is_span(Some(node))).collect();

    let mut rewritten = Vec::with_capacity(count);
    for (index, node) in children.into_iter().enumerate() {
        match node {
            Node::Text(text) => {
                let after_span = index > 0 && span_flags[index - 1];
                let before_span = index + 1 < count && span_flags[index + 1];
                split_edge_spaces(text, after_span, before_span, &mut rewritten);
            }
            Node::Element(mut child) => {
                mark_significant_whitespace(&mut child);
                rewritten.push(Node::Element(child));
            }
        }
    }
    element.children = rewritten;
}

fn split_edge_spaces(text: String, after_span: bool, before_span: bool, out: &mut Vec<Node>) {
    if !after_span && !before_span {
        out.push(Node::Text(text));
        return;
    }

    if text.chars().all(|c| c == ' ') {
        out.push(Node::Element(whitespace_marker(&text)));
        return;
    }

    let mut middle = text.as_str();
    let mut leading = "";
    let mut trailing = "";
    if after_span {
        let trimmed = middle.trim_start_matches(' ');
        leading = &middle[..middle.len() - trimmed.len()];
        middle = trimmed;
    }
    if before_span {
        let trimmed = middle.trim_end_matches(' ');
        trailing = &middle[trimmed.len()..];
        middle = trimmed;
    }

    if !leading.is_empty() {
        out.push(Node::Element(whitespace_marker(leading)));
    }
    out.push(Node::Text(middle.to_string()));
    if !trailing.is_empty() {
        out.push(Node::Element(whitespace_marker(trailing)));
    }
}

fn whitespace_marker(spaces: &str) -> Element {
    Element::new("span")
        .with_class(WHITESPACE_CLASS)
        .with_text(spaces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lyric(children: Vec<Node>) -> Element {
        Element {
            name: "div".to_string(),
            attributes: vec![("class".to_string(), "lyric".to_string())],
            children,
        }
    }

    fn stack() -> Node {
        Node::Element(Element::new("span").with_class("ch-stack").with_text("Am"))
    }

    #[test]
    fn test_html_void_and_raw_text() {
        let head = Element::new("head")
            .with_child(Element::new("meta").with_attribute("charset", "utf-8"))
            .with_child(
                Element::new("script")
                    .with_attribute("type", "application/ld+json")
                    .with_text(r#"{"a": "<b> & c"}"#),
            );
        let html = serialize_fragment(&head, Dialect::Html).unwrap();
        assert_eq!(
            html,
            r#"<head><meta charset="utf-8"><script type="application/ld+json">{"a": "<b> & c"}</script></head>"#
        );

        let xhtml = serialize_fragment(&head, Dialect::Xhtml).unwrap();
        assert_eq!(
            xhtml,
            r#"<head><meta charset="utf-8"/><script type="application/ld+json">{"a": "&lt;b&gt; &amp; c"}</script></head>"#
        );
    }

    #[test]
    fn test_pretty_print_keeps_mixed_content_inline() {
        let body = Element::new("body").with_child(
            Element::new("div")
                .with_class("row")
                .with_text("\u{200d}")
                .with_child(Element::new("span").with_text("C"))
                .with_child(Element::new("span").with_text("G")),
        );
        let root = Element::new("html").with_child(body);
        let document = serialize_document(&root, Dialect::Html, true).unwrap();
        assert_eq!(
            document,
            "<!DOCTYPE html>\n<html>\n  <body>\n    <div class=\"row\">\u{200d}<span>C</span><span>G</span></div>\n  </body>\n</html>\n"
        );
        assert!(!strip_row_joiners(&document).contains(ROW_JOINER));
    }

    #[test]
    fn test_xhtml_declaration_and_empty_elements() {
        let root = Element::new("html").with_child(Element::new("span").with_class("block_id"));
        let document = serialize_document(&root, Dialect::Xhtml, false).unwrap();
        assert_eq!(
            document,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE html>\n<html><span class=\"block_id\"></span></html>\n"
        );
    }

    #[test]
    fn test_mark_significant_whitespace() {
        let mut div = lyric(vec![
            Node::Text("Hej ".to_string()),
            stack(),
            Node::Text(" ".to_string()),
            stack(),
            Node::Text(" sokoły ".to_string()),
        ]);
        mark_significant_whitespace(&mut div);
        let html = serialize_fragment(&div, Dialect::Xhtml).unwrap();
        assert_eq!(
            html,
            concat!(
                r#"<div class="lyric">Hej<span class="ws"> </span>"#,
                r#"<span class="ch-stack">Am</span><span class="ws"> </span>"#,
                r#"<span class="ch-stack">Am</span><span class="ws"> </span>sokoły </div>"#
            )
        );
        assert_eq!(div.text_content(), "Hej Am Am sokoły ");
    }

    #[test]
    fn test_whitespace_away_from_spans_is_untouched() {
        let mut div = lyric(vec![Node::Text(" hej ".to_string())]);
        mark_significant_whitespace(&mut div);
        assert_eq!(div.children, vec![Node::Text(" hej ".to_string())]);
    }
}
