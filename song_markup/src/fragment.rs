//! # 外部标记片段
//!
//! 解析调用方提供的 head/prefix/suffix 片段，并在注入每首歌曲之前
//! 深拷贝片段、替换其中所有属性值和文本里的占位符。

use std::{fs, path::Path, str};

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use songbook_core::{RenderError, Substitutions};
use tracing::debug;

use crate::tree::Element;

/// 每首歌曲共用的模板片段。渲染时只读，注入前总是先拷贝。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongTemplates {
    /// 追加到 `<head>` 末尾（`<title>` 之前）的片段。
    pub head: Vec<Element>,
    /// 插入到 `<body>` 开头的片段。
    pub prefix: Vec<Element>,
    /// 追加到 `<body>` 末尾的片段。
    pub suffix: Vec<Element>,
}

impl SongTemplates {
    /// 从三段标记文本解析模板。
    pub fn from_markup(head: &str, prefix: &str, suffix: &str) -> Result<Self, RenderError> {
        Ok(Self {
            head: parse_fragments(head)?,
            prefix: parse_fragments(prefix)?,
            suffix: parse_fragments(suffix)?,
        })
    }

    /// 从文件读取模板。未给出的文件对应空片段列表。
    pub fn load(
        head: Option<&Path>,
        prefix: Option<&Path>,
        suffix: Option<&Path>,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            head: load_fragments(head)?,
            prefix: load_fragments(prefix)?,
            suffix: load_fragments(suffix)?,
        })
    }
}

fn load_fragments(path: Option<&Path>) -> Result<Vec<Element>, RenderError> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    debug!("读取模板片段 {}", path.display());
    let content = fs::read_to_string(path)?;
    parse_fragments(&content)
}

/// 将一段标记解析为若干顶层元素。
///
/// 顶层元素之间只允许出现空白、注释和处理指令。
///
/// # Errors
///
/// * `RenderError::Xml` - 标记不是格式正确的 XML（例如结束标签不匹配）
/// * `RenderError::InvalidFragment` - 顶层出现文本、元素未闭合或遇到未知实体
pub fn parse_fragments(markup: &str) -> Result<Vec<Element>, RenderError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);

    let mut roots: Vec<Element> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(element_from_start(&e, &reader)?),
            Event::Empty(e) => {
                let element = element_from_start(&e, &reader)?;
                attach_element(element, &mut stack, &mut roots);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| RenderError::invalid_fragment("多余的结束标签"))?;
                attach_element(element, &mut stack, &mut roots);
            }
            Event::Text(e) => {
                let text = e.xml_content()?;
                attach_text(&text, &mut stack)?;
            }
            Event::CData(e) => {
                let text = e.decode()?;
                attach_text(&text, &mut stack)?;
            }
            Event::GeneralRef(e) => {
                let entity_name = str::from_utf8(e.as_ref()).map_err(|err| {
                    RenderError::invalid_fragment(format!("无法将实体名解码为UTF-8: {err}"))
                })?;
                let decoded = resolve_entity(entity_name).ok_or_else(|| {
                    RenderError::invalid_fragment(format!("未知的XML实体 '&{entity_name};'"))
                })?;
                attach_text(decoded.encode_utf8(&mut [0; 4]), &mut stack)?;
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(unclosed) = stack.last() {
        return Err(RenderError::invalid_fragment(format!(
            "元素 <{}> 未闭合",
            unclosed.name
        )));
    }

    Ok(roots)
}

fn element_from_start(e: &BytesStart, reader: &Reader<&[u8]>) -> Result<Element, RenderError> {
    let qname = e.name();
    let name = reader.decoder().decode(qname.as_ref())?;
    let mut element = Element::new(name);
    for attr in e.attributes() {
        let attr = attr?;
        let key = reader.decoder().decode(attr.key.as_ref())?;
        let value = attr.decode_and_unescape_value(reader.decoder())?;
        element.set_attribute(key, value);
    }
    Ok(element)
}

fn attach_element(element: Element, stack: &mut [Element], roots: &mut Vec<Element>) {
    if let Some(parent) = stack.last_mut() {
        parent.push(element);
    } else {
        roots.push(element);
    }
}

fn attach_text(text: &str, stack: &mut [Element]) -> Result<(), RenderError> {
    if let Some(parent) = stack.last_mut() {
        parent.push_text(text);
        Ok(())
    } else if text.trim().is_empty() {
        Ok(())
    } else {
        Err(RenderError::invalid_fragment(format!(
            "片段顶层不允许出现文本 '{}'",
            text.trim()
        )))
    }
}

fn resolve_entity(entity_name: &str) -> Option<char> {
    if let Some(num_str) = entity_name.strip_prefix('#') {
        let (radix, code_point_str) = num_str
            .strip_prefix('x')
            .map_or((10, num_str), |stripped| (16, stripped));
        return u32::from_str_radix(code_point_str, radix)
            .ok()
            .and_then(char::from_u32);
    }
    match entity_name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// 深拷贝片段并对拷贝应用占位符替换。传入的片段本身不会被修改。
#[must_use]
pub fn inject_fragments(fragments: &[Element], substitutions: &Substitutions) -> Vec<Element> {
    fragments
        .iter()
        .map(|fragment| {
            let mut copy = fragment.clone();
            if !substitutions.is_empty() {
                copy.map_text(&|text: &str| substitutions.apply(text));
            }
            copy
        })
        .collect()
}
