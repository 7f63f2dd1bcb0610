//! 正文：标题、署名行、段落和注释。

use songbook_core::{Block, BlockKind, Song};
use tracing::debug;

use super::row::compose_row;
use crate::tree::Element;

/// 按文档顺序计算每个段落的标签。
///
/// 主歌按出现顺序编号为 "1."、"2."……，不受中间副歌或其它段落影响；
/// 副歌一律为 "Ref:"；其它段落没有标签。
#[must_use]
pub fn block_labels(blocks: &[Block]) -> Vec<String> {
    blocks
        .iter()
        .scan(0_usize, |verse_count, block| {
            Some(match block.kind {
                BlockKind::Verse => {
                    *verse_count += 1;
                    format!("{verse_count}.")
                }
                BlockKind::Chorus => "Ref:".to_string(),
                BlockKind::Other => String::new(),
            })
        })
        .collect()
}

/// 生成 `<body>` 中属于歌曲本身的全部元素（不含外部片段）。
#[must_use]
pub fn compose_song(song: &Song) -> Vec<Element> {
    let mut elements = Vec::with_capacity(3);

    elements.push(
        Element::new("h1")
            .with_class("title")
            .with_attribute("id", "title")
            .with_text(&song.title),
    );
    elements.extend(
        song.credits()
            .map(|(field, value)| creator(field.label(), value)),
    );
    elements.push(compose_blocks(&song.blocks));

    if let Some(comment) = song.comment.as_deref().filter(|c| !c.trim().is_empty()) {
        elements.push(Element::new("div").with_class("comment").with_text(comment));
    }

    elements
}

fn creator(label: &str, value: &str) -> Element {
    Element::new("div")
        .with_class("creator")
        .with_child(Element::new("span").with_class("label").with_text(label))
        .with_child(
            Element::new("span")
                .with_class("content_creator")
                .with_text(value),
        )
}

fn compose_blocks(blocks: &[Block]) -> Element {
    let mut song_body = Element::new("div")
        .with_class("song_body")
        .with_attribute("id", "song_body");

    for (block, label) in blocks.iter().zip(block_labels(blocks)) {
        debug!("段落 {} '{label}'，共 {} 行", block.kind, block.rows.len());
        song_body.push(
            Element::new("div")
                .with_class("block_spacer")
                .with_child(Element::new("span").with_class("block_id").with_text(&label)),
        );
        song_body.push(
            Element::new("div")
                .with_class(block.kind.css_class())
                .with_children(block.rows.iter().map(compose_row)),
        );
    }

    song_body
}
