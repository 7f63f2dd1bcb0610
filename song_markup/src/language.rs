//! # 语言解析
//!
//! 按顺序确定歌曲语言：歌曲对象上的语言属性、原始源文件根元素的
//! `lang`/`xml:lang` 属性、默认语言。随后把语言代码映射为区域标签。

use std::{fs, path::Path};

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use songbook_core::{RenderError, Song};
use tracing::debug;

/// 依次尝试的歌曲属性名。
pub const LANGUAGE_ATTRIBUTES: [&str; 3] = ["lang", "language", "xml_lang"];

const KNOWN_LOCALES: [(&str, &str); 6] = [
    ("pl", "pl-PL"),
    ("en", "en-US"),
    ("de", "de-DE"),
    ("fr", "fr-FR"),
    ("es", "es-ES"),
    ("it", "it-IT"),
];

/// 解析出的语言：原始代码和对应的区域标签。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLanguage {
    /// 小写的语言代码，例如 `pl`。
    pub code: String,
    /// 区域标签，例如 `pl-PL`。
    pub locale: String,
}

impl ResolvedLanguage {
    /// 将语言代码映射为区域标签。未知代码会拼成 `xx-XX` 形式。
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_lowercase();
        let locale = KNOWN_LOCALES
            .iter()
            .find(|(known, _)| *known == code)
            .map_or_else(
                || format!("{code}-{}", code.to_uppercase()),
                |(_, locale)| (*locale).to_string(),
            );
        Self { code, locale }
    }
}

/// 确定歌曲的语言。
///
/// 读取源文件失败不会报错，只记录日志并回退到默认语言。
#[must_use]
pub fn resolve_language(song: &Song, source: Option<&Path>, default: &str) -> ResolvedLanguage {
    if let Some(code) = song_language(song) {
        return ResolvedLanguage::from_code(code);
    }

    if let Some(path) = source {
        match read_source_language(path) {
            Ok(Some(code)) => {
                debug!("从源文件 {} 读取到语言 '{code}'", path.display());
                return ResolvedLanguage::from_code(&code);
            }
            Ok(None) => {}
            Err(e) => debug!("无法从源文件 {} 读取语言: {e}", path.display()),
        }
    }

    ResolvedLanguage::from_code(default)
}

fn song_language(song: &Song) -> Option<&str> {
    let present = |code: &&str| !code.trim().is_empty();
    LANGUAGE_ATTRIBUTES
        .iter()
        .find_map(|name| song.attributes.get(*name).map(String::as_str).filter(present))
        .or_else(|| song.language.as_deref().filter(present))
}

/// 读取源文件根元素上的 `lang` 或 `xml:lang` 属性。
pub fn read_source_language(path: &Path) -> Result<Option<String>, RenderError> {
    let content = fs::read_to_string(path)?;
    root_language(&content)
}

/// 读取根元素的语言属性。整个文档都会被解析，格式错误时返回错误而不是语言。
fn root_language(content: &str) -> Result<Option<String>, RenderError> {
    let mut reader = Reader::from_str(content);
    let mut language = None;
    let mut depth = 0_usize;
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if !seen_root {
                    language = element_language(&e, &reader)?;
                } else if depth == 0 {
                    return Err(RenderError::MalformedSource("多个根元素".to_string()));
                }
                seen_root = true;
                depth += 1;
            }
            Event::Empty(e) => {
                if !seen_root {
                    language = element_language(&e, &reader)?;
                } else if depth == 0 {
                    return Err(RenderError::MalformedSource("多个根元素".to_string()));
                }
                seen_root = true;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof if depth > 0 => {
                return Err(RenderError::MalformedSource("根元素未闭合".to_string()));
            }
            Event::Eof => return Ok(language),
            _ => {}
        }
    }
}

fn element_language(
    element: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<Option<String>, RenderError> {
    let mut plain = None;
    let mut qualified = None;
    for attr in element.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"lang" => plain = Some(attr.decode_and_unescape_value(reader.decoder())?),
            b"xml:lang" => qualified = Some(attr.decode_and_unescape_value(reader.decoder())?),
            _ => {}
        }
    }
    Ok(plain
        .or(qualified)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use songbook_core::SongBuilder;
    use tempfile::NamedTempFile;

    use super::*;

    fn song() -> Song {
        SongBuilder::default().title("Hej sokoły").build().unwrap()
    }

    #[test]
    fn test_known_and_synthesized_locales() {
        assert_eq!(ResolvedLanguage::from_code("en").locale, "en-US");
        assert_eq!(ResolvedLanguage::from_code("PL").locale, "pl-PL");
        assert_eq!(ResolvedLanguage::from_code("xx").locale, "xx-XX");
    }

    #[test]
    fn test_song_attribute_wins() {
        let mut song = song();
        song.attributes.insert("language".to_string(), "fr".to_string());
        song.attributes.insert("xml_lang".to_string(), "de".to_string());
        let resolved = resolve_language(&song, None, "pl");
        assert_eq!(resolved.code, "fr");
        assert_eq!(resolved.locale, "fr-FR");

        let mut song = self::song();
        song.language = Some("en".to_string());
        assert_eq!(resolve_language(&song, None, "pl").locale, "en-US");
    }

    #[test]
    fn test_source_root_fallback() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"<?xml version="1.0"?><song xml:lang="de"><title>Lied</title></song>"#)
            .unwrap();
        let resolved = resolve_language(&song(), Some(file.path()), "pl");
        assert_eq!(resolved.locale, "de-DE");
    }

    #[test]
    fn test_plain_lang_preferred_over_qualified() {
        let lang = root_language(r#"<song xml:lang="de" lang="es"/>"#).unwrap();
        assert_eq!(lang.as_deref(), Some("es"));
        assert_eq!(root_language("<song/>").unwrap(), None);
    }

    #[test]
    fn test_default_when_source_unreadable() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "<song lang=\"de\"").unwrap();
        let malformed = resolve_language(&song(), Some(file.path()), "pl");
        assert_eq!(malformed.locale, "pl-PL");

        let missing = resolve_language(&song(), Some(Path::new("/nonexistent/song.xml")), "pl");
        assert_eq!(missing.locale, "pl-PL");
    }

    #[test]
    fn test_default_when_source_body_is_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"<song lang="de"><title>Lied</wrong></song>"#).unwrap();
        assert_eq!(resolve_language(&song(), Some(file.path()), "pl").locale, "pl-PL");

        assert!(root_language(r#"<song lang="de"><title>Lied</title>"#).is_err());
        assert!(root_language(r#"<song lang="de"/><song/>"#).is_err());
        assert_eq!(
            root_language(r#"<song lang="de"><title>Lied</title></song>"#).unwrap().as_deref(),
            Some("de")
        );
    }

    #[test]
    fn test_empty_attributes_fall_through() {
        let mut song = song();
        song.attributes.insert("lang".to_string(), String::new());
        song.attributes.insert("language".to_string(), "en".to_string());
        assert_eq!(resolve_language(&song, None, "pl").locale, "en-US");

        let mut song = self::song();
        song.attributes.insert("lang".to_string(), " ".to_string());
        song.language = Some("de".to_string());
        assert_eq!(resolve_language(&song, None, "pl").locale, "de-DE");

        song.language = Some(String::new());
        assert_eq!(resolve_language(&song, None, "pl").locale, "pl-PL");
    }
}
