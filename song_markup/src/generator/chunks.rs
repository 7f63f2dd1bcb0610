//! 和弦分组：把连续的“只有和弦”的片段与其后第一个带文本的片段合并为一组。

use songbook_core::Chunk;

use crate::tree::Element;

/// 一个显示分组：若干和弦，以及闭合该组的片段文本。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkGroup<'a> {
    /// 按出现顺序排列的和弦。
    pub chords: Vec<&'a str>,
    /// 组内所有片段文本的拼接。
    pub text: String,
}

/// 对一行的片段进行分组。
///
/// 从左到右扫描：连续的无文本片段被并入当前组，随后第一个带文本的片段
/// 闭合该组。行尾只剩和弦时，最后一组的文本为空。
#[must_use]
pub fn group_chunks(chunks: &[Chunk]) -> Vec<ChunkGroup<'_>> {
    let mut groups = Vec::new();
    let mut remaining = chunks.iter().peekable();

    while remaining.peek().is_some() {
        let mut group = ChunkGroup::default();

        while let Some(chunk) = remaining.next_if(|chunk| !chunk.has_text()) {
            group.chords.extend(chunk.chord());
        }
        if let Some(chunk) = remaining.next() {
            group.chords.extend(chunk.chord());
            group.text.push_str(chunk.text());
        }

        groups.push(group);
    }

    groups
}

/// 将一个分组追加到容器中。
///
/// 有和弦时写入一个堆叠容器，文本紧随其后；没有和弦时文本直接接在前一个节点之后。
pub fn append_group(container: &mut Element, group: &ChunkGroup<'_>) {
    if !group.chords.is_empty() {
        container.push(chord_stack(&group.chords));
    }
    container.push_text(&group.text);
}

/// 一个堆叠的和弦标记，每个和弦一个 `span.ch`。
#[must_use]
pub fn chord_stack(chords: &[&str]) -> Element {
    Element::new("span")
        .with_class("ch-stack")
        .with_attribute("aria-hidden", "true")
        .with_children(chords.iter().map(|chord| chord_marker(chord)))
}

/// 侧边和弦列表中的和弦标记，不带无障碍属性。
#[must_use]
pub fn chord_marker_plain(chord: &str) -> Element {
    Element::new("span").with_class("ch").with_text(chord)
}

/// 堆叠容器中的单个和弦标记。
#[must_use]
pub fn chord_marker(chord: &str) -> Element {
    Element::new("span")
        .with_class("ch")
        .with_attribute("role", "note")
        .with_attribute("aria-label", format!("chord {chord}"))
        .with_text(chord)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    fn rendered(chunks: &[Chunk]) -> Element {
        let mut lyric = Element::new("div").with_class("lyric");
        for group in group_chunks(chunks) {
            append_group(&mut lyric, &group);
        }
        lyric
    }

    #[test]
    fn test_rapid_chord_changes_form_one_group() {
        let chunks = [
            Chunk::new("Am", ""),
            Chunk::chord_only("F"),
            Chunk::text_only("la la"),
        ];
        let groups = group_chunks(&chunks);
        assert_eq!(
            groups,
            vec![ChunkGroup {
                chords: vec!["Am", "F"],
                text: "la la".to_string(),
            }]
        );

        let lyric = rendered(&chunks);
        let stacks = lyric.find_all_by_class("ch-stack");
        assert_eq!(stacks.len(), 1);
        let chords: Vec<String> = stacks[0].elements().map(Element::text_content).collect();
        assert_eq!(chords, ["Am", "F"]);
        assert_eq!(lyric.children.len(), 2);
    }

    #[test]
    fn test_groups_close_on_each_text_chunk() {
        let chunks = [
            Chunk::text_only("Hej, "),
            Chunk::new("G", "tam "),
            Chunk::new("D", "gdzieś"),
            Chunk::chord_only("C"),
        ];
        let groups = group_chunks(&chunks);
        assert_eq!(groups.len(), 4);
        assert!(groups[0].chords.is_empty());
        assert_eq!(groups[0].text, "Hej, ");
        assert_eq!(groups[1].chords, ["G"]);
        assert_eq!(groups[3].chords, ["C"]);
        assert_eq!(groups[3].text, "");
    }

    #[test]
    fn test_whitespace_counts_as_text() {
        let chunks = [Chunk::new("C", " "), Chunk::new("G", "dalej")];
        let groups = group_chunks(&chunks);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].text, " ");
    }

    #[test]
    fn test_grouping_never_drops_or_reorders_text() {
        let rows: [&[Chunk]; 3] = [
            &[
                Chunk::chord_only("Am"),
                Chunk::text_only("Hej "),
                Chunk::new("", "sokoły, "),
                Chunk::chord_only("E"),
                Chunk::chord_only("E7"),
            ],
            &[Chunk::text_only("tylko tekst")],
            &[Chunk::default(), Chunk::new("C", "a"), Chunk::text_only(" b ")],
        ];
        for chunks in rows {
            let expected: String = chunks.iter().map(Chunk::text).collect();
            let lyric = rendered(chunks);
            let text: String = lyric
                .children
                .iter()
                .filter_map(|node| match node {
                    Node::Text(text) => Some(text.as_str()),
                    Node::Element(_) => None,
                })
                .collect();
            assert_eq!(text, expected);
        }
    }

    #[test]
    fn test_chord_marker_accessibility() {
        let stack = chord_stack(&["D7"]);
        assert_eq!(stack.attribute("aria-hidden"), Some("true"));
        let marker = stack.find_by_class("ch").unwrap();
        assert_eq!(marker.attribute("role"), Some("note"));
        assert_eq!(marker.attribute("aria-label"), Some("chord D7"));
    }
}
