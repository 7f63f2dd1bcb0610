//! 行的渲染：和弦层、歌词层和重复标记。

use songbook_core::{ChordMode, RepeatMarker, Row};
use tracing::trace;

use super::chunks::{append_group, chord_marker_plain, chord_stack, group_chunks};
use crate::{serializer::ROW_JOINER, tree::Element};

const NO_BREAK_SPACE: &str = "\u{a0}";

/// 渲染一行。器乐行没有歌词层，也不写入行连接符。
#[must_use]
pub fn compose_row(row: &Row) -> Element {
    if row.instrumental {
        return compose_instrumental_row(row);
    }

    let over = row.chord_mode == ChordMode::Over;
    let mut container = Element::new("div").with_class(if over {
        "row over_true"
    } else {
        "row over_false"
    });
    container.push_text(&ROW_JOINER.to_string());

    if over {
        let mut lyric = Element::new("div").with_class("lyric");
        for group in group_chunks(&row.chunks) {
            append_group(&mut lyric, &group);
        }
        container.push(lyric);
    } else {
        container.push(side_chords(row, "chords"));
        container.push(Element::new("div").with_class("lyric").with_text(&row.text()));
    }

    container.push(repeat_marker(row.repeat));
    container
}

fn compose_instrumental_row(row: &Row) -> Element {
    trace!("器乐行，和弦排布: {:?}", row.chord_mode);
    let chords = match (row.chord_mode, row.side_chord_list()) {
        (ChordMode::Over, None) => {
            let stacks = group_chunks(&row.chunks)
                .into_iter()
                .filter(|group| !group.chords.is_empty())
                .map(|group| chord_stack(&group.chords));
            Element::new("span")
                .with_class("chords_ins")
                .with_attribute("aria-hidden", "true")
                .with_children(stacks)
        }
        _ => side_chords(row, "chords_ins"),
    };

    Element::new("div")
        .with_class("row")
        .with_child(chords)
        .with_child(repeat_marker(row.repeat))
}

/// 固定的和弦列表：优先使用侧边和弦字符串，否则取各片段上的和弦。
fn side_chords(row: &Row, class: &str) -> Element {
    let chords: Vec<&str> = row
        .side_chord_list()
        .unwrap_or_else(|| row.chunk_chords().collect());
    Element::new("span")
        .with_class(class)
        .with_attribute("aria-hidden", "true")
        .with_children(chords.into_iter().map(chord_marker_plain))
}

/// 重复标记。三种状态互斥。
#[must_use]
pub fn repeat_marker(repeat: RepeatMarker) -> Element {
    match repeat {
        RepeatMarker::None => Element::new("span")
            .with_class("bis_inactive")
            .with_text(NO_BREAK_SPACE),
        RepeatMarker::Active => Element::new("span")
            .with_class("bis_active")
            .with_text(NO_BREAK_SPACE),
        RepeatMarker::Count(count) => Element::new("span")
            .with_class("bis_active")
            .with_text(&format!("×{count}")),
    }
}
