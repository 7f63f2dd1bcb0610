//! `<head>` 元素的生成。

use serde_json::{Map, Value, json};
use songbook_core::{RenderError, RenderOptions, Song};

use crate::{language::ResolvedLanguage, tree::Element};

const VIEWPORT: &str = "width=device-width, initial-scale=0.8";

/// 文档标题：有演唱者时为 "标题 - 演唱者"。
#[must_use]
pub fn title_text(song: &Song) -> String {
    match song.artist.as_deref().filter(|a| !a.is_empty()) {
        Some(artist) => format!("{} - {artist}", song.title),
        None => song.title.clone(),
    }
}

/// 网页格式的 `<head>`，包含搜索引擎元数据和结构化数据。
pub fn web_head(
    song: &Song,
    language: &ResolvedLanguage,
    options: &RenderOptions,
    base_filename: &str,
    fragments: Vec<Element>,
) -> Result<Element, RenderError> {
    let title = title_text(song);
    let description = if language.code == "pl" {
        format!("Tekst i chwyty piosenki {title}")
    } else {
        format!("Lyrics and chords for {title}")
    };

    let mut head = Element::new("head")
        .with_child(Element::new("meta").with_attribute("charset", "utf-8"))
        .with_child(meta_name("viewport", VIEWPORT))
        .with_child(meta_name("description", &description))
        .with_child(meta_property("og:title", &title))
        .with_child(meta_property("og:type", "music.song"));

    if let Some(url) = canonical_url(options, base_filename) {
        head.push(meta_property("og:url", &url));
        head.push(
            Element::new("link")
                .with_attribute("rel", "canonical")
                .with_attribute("href", url),
        );
    }

    if let Some(artist) = song.artist.as_deref().filter(|a| !a.is_empty()) {
        head.push(meta_name("author", artist));
    }

    head.push(
        Element::new("script")
            .with_attribute("type", "application/ld+json")
            .with_text(&structured_data(song, language)?),
    );

    Ok(finish_head(head, options, fragments, &title))
}

/// 电子书格式的 `<head>`：只有字符集、样式表、外部片段和标题。
#[must_use]
pub fn epub_head(song: &Song, options: &RenderOptions, fragments: Vec<Element>) -> Element {
    let head =
        Element::new("head").with_child(Element::new("meta").with_attribute("charset", "utf-8"));
    finish_head(head, options, fragments, &title_text(song))
}

fn finish_head(
    mut head: Element,
    options: &RenderOptions,
    fragments: Vec<Element>,
    title: &str,
) -> Element {
    for href in &options.stylesheets {
        head.push(
            Element::new("link")
                .with_attribute("rel", "stylesheet")
                .with_attribute("type", "text/css")
                .with_attribute("href", href.as_str())
                .with_attribute("media", "all"),
        );
    }
    head.with_children(fragments)
        .with_child(Element::new("title").with_text(title))
}

fn canonical_url(options: &RenderOptions, base_filename: &str) -> Option<String> {
    let base = options.base_url.as_deref()?.trim().trim_end_matches('/');
    if base.is_empty() {
        return None;
    }
    Some(format!("{base}/{base_filename}.html"))
}

fn meta_name(name: &str, content: &str) -> Element {
    Element::new("meta")
        .with_attribute("name", name)
        .with_attribute("content", content)
}

fn meta_property(property: &str, content: &str) -> Element {
    Element::new("meta")
        .with_attribute("property", property)
        .with_attribute("content", content)
}

fn person(name: &str) -> Value {
    json!({ "@type": "Person", "name": name })
}

/// schema.org `MusicComposition` 结构化数据。
///
/// 输出会被原样写入 `<script>`，因此 `</` 被改写为 `<\/`。
pub fn structured_data(song: &Song, language: &ResolvedLanguage) -> Result<String, RenderError> {
    let mut data = Map::new();
    data.insert("@context".into(), json!("https://schema.org"));
    data.insert("@type".into(), json!("MusicComposition"));
    data.insert("name".into(), json!(song.title));
    data.insert("inLanguage".into(), json!(language.code));

    let people = [
        ("composer", &song.composer),
        ("lyricist", &song.text_author),
        ("author", &song.artist),
    ];
    for (key, value) in people {
        if let Some(name) = value.as_deref().filter(|n| !n.is_empty()) {
            data.insert(key.into(), person(name));
        }
    }

    let lyrics = song.plain_lyrics();
    if !lyrics.is_empty() {
        data.insert(
            "lyrics".into(),
            json!({ "@type": "CreativeWork", "text": lyrics }),
        );
    }

    let text = serde_json::to_string_pretty(&Value::Object(data))
        .map_err(|e| RenderError::json(e, format!("歌曲 '{}' 的结构化数据", song.title)))?;
    Ok(text.replace("</", "<\\/"))
}
