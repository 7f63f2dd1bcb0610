//! # 歌曲数据模型
//!
//! 由外部反序列化器解析得到的歌曲结构。渲染流程只读取这些类型，从不修改它们。

use std::{collections::BTreeMap, num::NonZeroU32};

use derive_builder::Builder;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::warn;

/// 歌词行中的最小单元：一个可选的和弦标记加上一段可选的文本。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 和弦名称，可能为空字符串。
    #[serde(default)]
    pub chord: Option<String>,
    /// 文本片段，可能为空或只包含空白。
    #[serde(default, alias = "content")]
    pub text: Option<String>,
}

impl Chunk {
    /// 创建一个同时带有和弦与文本的片段。
    pub fn new(chord: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chord: Some(chord.into()),
            text: Some(text.into()),
        }
    }

    /// 创建一个只有和弦、没有文本的片段。
    pub fn chord_only(chord: impl Into<String>) -> Self {
        Self {
            chord: Some(chord.into()),
            text: None,
        }
    }

    /// 创建一个只有文本的片段。
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            chord: None,
            text: Some(text.into()),
        }
    }

    /// 非空的和弦名称。
    #[must_use]
    pub fn chord(&self) -> Option<&str> {
        self.chord.as_deref().filter(|c| !c.is_empty())
    }

    /// 文本片段，缺失时为空字符串。
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// 片段是否携带文本。只含空白的文本也算作文本。
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.text().is_empty()
    }
}

/// 行的重复标记（"bis"）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RepeatMarker {
    /// 不重复。
    #[default]
    None,
    /// 重复，但未指定次数。
    Active,
    /// 重复指定的次数。
    Count(NonZeroU32),
}

impl From<bool> for RepeatMarker {
    fn from(value: bool) -> Self {
        if value { Self::Active } else { Self::None }
    }
}

impl From<u32> for RepeatMarker {
    fn from(value: u32) -> Self {
        NonZeroU32::new(value).map_or(Self::None, Self::Count)
    }
}

impl<'de> Deserialize<'de> for RepeatMarker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawRepeat {
            Flag(bool),
            Count(u32),
        }

        Ok(match Option::<RawRepeat>::deserialize(deserializer)? {
            None => Self::None,
            Some(RawRepeat::Flag(flag)) => flag.into(),
            Some(RawRepeat::Count(count)) => count.into(),
        })
    }
}

impl Serialize for RepeatMarker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Active => serializer.serialize_bool(true),
            Self::Count(count) => serializer.serialize_u32(count.get()),
        }
    }
}

/// 和弦的排布方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordMode {
    /// 和弦按变化位置排在歌词上方。
    Over,
    /// 和弦作为固定的一列排在歌词之前。
    #[default]
    Side,
}

/// 歌曲段落中的一行。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// 按顺序排列的片段。
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    /// 以空格分隔的侧边和弦列表，可替代逐片段的和弦。
    #[serde(default, alias = "sidechords")]
    pub side_chords: Option<String>,
    #[serde(default, alias = "bis")]
    pub repeat: RepeatMarker,
    /// 器乐行：只有和弦，没有歌词。
    #[serde(default, alias = "instr")]
    pub instrumental: bool,
    #[serde(default)]
    pub chord_mode: ChordMode,
}

impl Row {
    /// 创建一个和弦排在歌词上方的行。
    #[must_use]
    pub fn over(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks,
            chord_mode: ChordMode::Over,
            ..Default::default()
        }
    }

    /// 创建一个侧边和弦的行。
    #[must_use]
    pub fn side(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks,
            chord_mode: ChordMode::Side,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_repeat(mut self, repeat: impl Into<RepeatMarker>) -> Self {
        self.repeat = repeat.into();
        self
    }

    #[must_use]
    pub fn with_side_chords(mut self, side_chords: impl Into<String>) -> Self {
        self.side_chords = Some(side_chords.into());
        self
    }

    #[must_use]
    pub fn instrumental(mut self) -> Self {
        self.instrumental = true;
        self
    }

    /// 将所有片段的文本按顺序拼接成完整的歌词行。
    #[must_use]
    pub fn text(&self) -> String {
        self.chunks.iter().map(Chunk::text).collect()
    }

    /// 侧边和弦字符串中的和弦，按空格切分。字符串缺失或为空时返回 `None`。
    #[must_use]
    pub fn side_chord_list(&self) -> Option<Vec<&str>> {
        self.side_chords
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.split_whitespace().collect())
    }

    /// 所有片段上的和弦，跳过没有和弦的片段。
    pub fn chunk_chords(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().filter_map(Chunk::chord)
    }
}

/// 段落类型。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BlockKind {
    /// 主歌，按出现顺序编号。
    #[default]
    #[serde(alias = "V")]
    #[strum(to_string = "verse", serialize = "V")]
    Verse,
    /// 副歌，统一标记为 "Ref:"。
    #[serde(alias = "C")]
    #[strum(to_string = "chorus", serialize = "C")]
    Chorus,
    /// 其它段落，没有标签。
    #[serde(alias = "O")]
    #[strum(to_string = "other", serialize = "O")]
    Other,
}

impl BlockKind {
    /// 段落容器使用的 CSS 类名。
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Verse => "verse",
            Self::Chorus => "chorus",
            Self::Other => "other",
        }
    }
}

/// 由若干行组成的段落。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, alias = "block_type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Block {
    #[must_use]
    pub const fn new(kind: BlockKind, rows: Vec<Row>) -> Self {
        Self { kind, rows }
    }

    #[must_use]
    pub const fn verse(rows: Vec<Row>) -> Self {
        Self::new(BlockKind::Verse, rows)
    }

    #[must_use]
    pub const fn chorus(rows: Vec<Row>) -> Self {
        Self::new(BlockKind::Chorus, rows)
    }

    #[must_use]
    pub const fn other(rows: Vec<Row>) -> Self {
        Self::new(BlockKind::Other, rows)
    }
}

/// 歌曲的署名信息字段，按固定顺序排列。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CreditField {
    OriginalTitle,
    Alias,
    TextAuthor,
    Translator,
    Composer,
    MusicSource,
    Artist,
    Album,
    Metre,
    Barre,
}

impl CreditField {
    /// 署名行前显示的标签。
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OriginalTitle => "Tytuł oryginalny: ",
            Self::Alias => "Tytuł alternatywny: ",
            Self::TextAuthor => "Słowa: ",
            Self::Translator => "Tłumaczenie: ",
            Self::Composer => "Muzyka: ",
            Self::MusicSource => "Melodia oparta na: ",
            Self::Artist => "Wykonawca: ",
            Self::Album => "Album: ",
            Self::Metre => "Metrum: ",
            Self::Barre => "Kapodaster: ",
        }
    }

    fn raw_value(self, song: &Song) -> Option<&str> {
        let value = match self {
            Self::OriginalTitle => &song.original_title,
            Self::Alias => &song.alias,
            Self::TextAuthor => &song.text_author,
            Self::Translator => &song.translator,
            Self::Composer => &song.composer,
            Self::MusicSource => &song.music_source,
            Self::Artist => &song.artist,
            Self::Album => &song.album,
            Self::Metre => &song.metre,
            Self::Barre => &song.barre,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }
}

/// 一首已解析的歌曲。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct Song {
    #[builder(setter(into))]
    pub title: String,
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub original_title: Option<String>,
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub alias: Option<String>,
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub text_author: Option<String>,
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub translator: Option<String>,
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub composer: Option<String>,
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub music_source: Option<String>,
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub artist: Option<String>,
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub album: Option<String>,
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub metre: Option<String>,
    /// 变调夹位置，只有解析为正整数时才会显示。
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub barre: Option<String>,
    /// 附在歌曲末尾的自由文本注释。
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub comment: Option<String>,
    /// 反序列化器识别出的语言标记。
    #[serde(default, alias = "lang")]
    #[builder(setter(into, strip_option))]
    pub language: Option<String>,
    /// 源文件根元素上的其它原始属性。
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    #[builder(setter(each(name = "block")))]
    pub blocks: Vec<Block>,
}

impl Song {
    /// 按固定顺序返回所有存在的署名字段及其值。
    pub fn credits(&self) -> impl Iterator<Item = (CreditField, &str)> {
        CreditField::iter().filter_map(|field| {
            let value = field.raw_value(self)?;
            if field == CreditField::Barre {
                match value.trim().parse::<i64>() {
                    Ok(position) if position > 0 => {}
                    Ok(_) => return None,
                    Err(_) => {
                        warn!("歌曲 '{}' 的变调夹值 '{value}' 不是整数，已忽略。", self.title);
                        return None;
                    }
                }
            }
            Some((field, value))
        })
    }

    /// 提取不含和弦的纯文本歌词。
    ///
    /// 行之间用换行分隔，段落之间用空行分隔，器乐行被跳过。
    #[must_use]
    pub fn plain_lyrics(&self) -> String {
        self.blocks
            .iter()
            .map(|block| {
                block
                    .rows
                    .iter()
                    .filter(|row| !row.instrumental)
                    .map(|row| row.text().trim().to_string())
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_marker_from_json() {
        let row: Row = serde_json::from_str(r#"{"bis": true}"#).unwrap();
        assert_eq!(row.repeat, RepeatMarker::Active);

        let row: Row = serde_json::from_str(r#"{"bis": 3}"#).unwrap();
        assert_eq!(row.repeat, RepeatMarker::Count(NonZeroU32::new(3).unwrap()));

        let row: Row = serde_json::from_str(r#"{"bis": null}"#).unwrap();
        assert_eq!(row.repeat, RepeatMarker::None);

        let row: Row = serde_json::from_str("{}").unwrap();
        assert_eq!(row.repeat, RepeatMarker::None);

        let row: Row = serde_json::from_str(r#"{"repeat": false}"#).unwrap();
        assert_eq!(row.repeat, RepeatMarker::None);
    }

    #[test]
    fn test_repeat_marker_serialize() {
        assert_eq!(serde_json::to_string(&RepeatMarker::None).unwrap(), "null");
        assert_eq!(serde_json::to_string(&RepeatMarker::Active).unwrap(), "true");
        assert_eq!(serde_json::to_string(&RepeatMarker::from(2_u32)).unwrap(), "2");
    }

    #[test]
    fn test_chunk_text_flags() {
        assert!(!Chunk::chord_only("Am").has_text());
        assert!(!Chunk::new("Am", "").has_text());
        assert!(Chunk::text_only(" ").has_text());
        assert_eq!(Chunk::new("", "la").chord(), None);
    }

    #[test]
    fn test_row_side_chords() {
        let row = Row::side(vec![Chunk::new("Am", "la "), Chunk::text_only("la")]);
        assert_eq!(row.side_chord_list(), None);
        assert_eq!(row.chunk_chords().collect::<Vec<_>>(), vec!["Am"]);
        assert_eq!(row.text(), "la la");

        let row = row.with_side_chords("C  G a");
        assert_eq!(row.side_chord_list(), Some(vec!["C", "G", "a"]));
    }

    #[test]
    fn test_block_kind_parsing() {
        assert_eq!("V".parse::<BlockKind>().unwrap(), BlockKind::Verse);
        assert_eq!("chorus".parse::<BlockKind>().unwrap(), BlockKind::Chorus);
        let block: Block = serde_json::from_str(r#"{"block_type": "C", "rows": []}"#).unwrap();
        assert_eq!(block.kind, BlockKind::Chorus);
    }

    #[test]
    fn test_credits_order_and_barre() {
        let song = SongBuilder::default()
            .title("Piosenka")
            .artist("Zespół")
            .text_author("Autor")
            .barre("0")
            .build()
            .unwrap();
        let credits: Vec<_> = song.credits().map(|(field, _)| field).collect();
        assert_eq!(credits, vec![CreditField::TextAuthor, CreditField::Artist]);

        let song = SongBuilder::default()
            .title("Piosenka")
            .barre("2")
            .build()
            .unwrap();
        assert_eq!(
            song.credits().collect::<Vec<_>>(),
            vec![(CreditField::Barre, "2")]
        );

        let song = SongBuilder::default()
            .title("Piosenka")
            .barre("II")
            .build()
            .unwrap();
        assert_eq!(song.credits().count(), 0);
    }

    #[test]
    fn test_plain_lyrics() {
        let song = SongBuilder::default()
            .title("Piosenka")
            .block(Block::verse(vec![
                Row::over(vec![Chunk::new("a", "Pierwsza "), Chunk::text_only("linia")]),
                Row::side(vec![Chunk::chord_only("C")]).instrumental(),
                Row::side(vec![Chunk::text_only("druga linia ")]),
            ]))
            .block(Block::chorus(vec![Row::side(vec![Chunk::text_only("Refren")])]))
            .build()
            .unwrap();
        assert_eq!(song.plain_lyrics(), "Pierwsza linia\ndruga linia\n\nRefren");
    }
}
