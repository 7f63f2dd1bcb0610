//! # 歌曲文档生成器
//!
//! 两种输出格式共用同一套段落组装和和弦分组逻辑，只在 `<head>`、
//! 根元素属性、序列化方言和后处理上有所不同。

mod body;
mod chunks;
mod epub;
mod head;
mod row;
mod web;

use std::{
    fs::{self, File, Permissions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use songbook_core::{OutputVariant, RenderError, RenderOptions, Song, Substitutions};
use tempfile::NamedTempFile;
use tracing::debug;

pub use body::{block_labels, compose_song};
pub use chunks::{ChunkGroup, group_chunks};
pub use epub::EpubConverter;
pub use head::{structured_data, title_text};
pub use row::{compose_row, repeat_marker};
pub use web::WebConverter;

use crate::{
    fragment::{SongTemplates, inject_fragments},
    tree::Element,
};

/// 相对源路径的占位符。
pub const SOURCE_PLACEHOLDER: &str = "{{SRC}}";
/// 输出文件基本名的占位符。
pub const BASE_FILENAME_PLACEHOLDER: &str = "{{BASE_FILENAME}}";

/// 单首歌曲的渲染上下文。
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// 所有歌曲共用的只读模板片段。
    pub templates: &'a SongTemplates,
    /// 调用方提供的替换规则。
    pub substitutions: &'a Substitutions,
    /// 原始源文件，仅在语言回退时读取。
    pub source_path: Option<&'a Path>,
    /// 相对于歌曲根目录的源路径，用于 `{{SRC}}`。
    pub relative_source: &'a str,
    /// 不带扩展名的输出文件名，用于 `{{BASE_FILENAME}}`。
    pub base_filename: &'a str,
}

impl<'a> RenderContext<'a> {
    #[must_use]
    pub const fn new(
        templates: &'a SongTemplates,
        substitutions: &'a Substitutions,
        base_filename: &'a str,
    ) -> Self {
        Self {
            templates,
            substitutions,
            source_path: None,
            relative_source: "",
            base_filename,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source_path: &'a Path, relative_source: &'a str) -> Self {
        self.source_path = Some(source_path);
        self.relative_source = relative_source;
        self
    }

    /// 本首歌曲的完整替换表：调用方的规则之后追加 `{{SRC}}` 与 `{{BASE_FILENAME}}`。
    #[must_use]
    pub fn song_substitutions(&self) -> Substitutions {
        self.substitutions.extended([
            (SOURCE_PLACEHOLDER, self.relative_source),
            (BASE_FILENAME_PLACEHOLDER, self.base_filename),
        ])
    }
}

/// 歌曲转换器：把歌曲渲染为某种格式的完整文档。
pub trait SongConverter: Send + Sync {
    /// 渲染为完整的文档文本。
    fn render(&self, song: &Song, context: &RenderContext<'_>) -> Result<String, RenderError>;

    /// 输出文件的扩展名，不带点。
    fn extension(&self) -> &'static str;

    /// 渲染并写入文件。渲染失败时不会创建或改动目标文件。
    fn write_song(
        &self,
        song: &Song,
        context: &RenderContext<'_>,
        output: &Path,
    ) -> Result<(), RenderError> {
        let document = self.render(song, context)?;
        write_atomically(output, &document)
    }

    /// 在目录中为歌曲生成输出路径。
    fn output_path(&self, output_dir: &Path, base_filename: &str) -> PathBuf {
        output_dir.join(format!("{base_filename}.{}", self.extension()))
    }
}

/// 按输出格式创建对应的转换器。
#[must_use]
pub fn converter_for(variant: OutputVariant, options: RenderOptions) -> Box<dyn SongConverter> {
    match variant {
        OutputVariant::Web => Box::new(WebConverter::new(options)),
        OutputVariant::Epub => Box::new(EpubConverter::new(options)),
    }
}

/// 先写入同目录下的临时文件，再原子地替换目标文件。
///
/// 已存在的目标文件保留原有权限；新文件使用普通文件的 `0o644`。
pub fn write_atomically(path: &Path, contents: &str) -> Result<(), RenderError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;

    let permissions = match fs::metadata(path) {
        Ok(metadata) => metadata.permissions(),
        Err(_) => new_file_permissions(file.as_file())?,
    };
    file.as_file().set_permissions(permissions)?;
    file.persist(path).map_err(|e| e.error)?;
    debug!("已写入 {}", path.display());
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions(_file: &File) -> io::Result<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions(file: &File) -> io::Result<Permissions> {
    Ok(file.metadata()?.permissions())
}

/// 组装 `<body>`：前缀片段、歌曲正文、后缀片段。片段在注入前被拷贝并替换。
fn compose_body(
    song_elements: Vec<Element>,
    templates: &SongTemplates,
    substitutions: &Substitutions,
) -> Element {
    Element::new("body")
        .with_class("song")
        .with_children(inject_fragments(&templates.prefix, substitutions))
        .with_children(song_elements)
        .with_children(inject_fragments(&templates.suffix, substitutions))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_song_substitutions_follow_caller_rules() {
        let templates = SongTemplates::default();
        let caller: Substitutions = [("{{SITE}}", "spiewnik"), ("{{SRC}}", "nadpisane")]
            .into_iter()
            .collect();
        let path = Path::new("/songs/folk/hej.xml");
        let context =
            RenderContext::new(&templates, &caller, "hej").with_source(path, "folk/hej.xml");

        let merged = context.song_substitutions();
        assert_eq!(merged.get("{{SITE}}"), Some("spiewnik"));
        assert_eq!(merged.get(SOURCE_PLACEHOLDER), Some("folk/hej.xml"));
        assert_eq!(merged.get(BASE_FILENAME_PLACEHOLDER), Some("hej"));
        assert_eq!(caller.get("{{SRC}}"), Some("nadpisane"));
    }

    #[test]
    fn test_converter_extensions() {
        let web = converter_for(OutputVariant::Web, RenderOptions::default());
        let epub = converter_for(OutputVariant::Epub, RenderOptions::default());
        assert_eq!(web.extension(), "html");
        assert_eq!(epub.extension(), "xhtml");
        assert_eq!(
            epub.output_path(Path::new("out"), "hej"),
            Path::new("out/hej.xhtml")
        );
    }

    #[test]
    fn test_write_atomically_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.html");
        fs::write(&path, "stare").unwrap();

        write_atomically(&path, "nowe").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "nowe");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomically_file_modes() {
        use std::os::unix::fs::PermissionsExt;

        let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
        let dir = tempfile::tempdir().unwrap();

        let fresh = dir.path().join("nowa.html");
        write_atomically(&fresh, "nowe").unwrap();
        assert_eq!(mode(&fresh), 0o644);

        let existing = dir.path().join("stara.html");
        fs::write(&existing, "stare").unwrap();
        fs::set_permissions(&existing, Permissions::from_mode(0o640)).unwrap();
        write_atomically(&existing, "nowe").unwrap();
        assert_eq!(mode(&existing), 0o640);
    }

    #[test]
    fn test_write_atomically_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brak").join("song.html");
        assert!(matches!(
            write_atomically(&path, "x"),
            Err(RenderError::Io(_))
        ));
        assert!(!path.exists());
    }
}
